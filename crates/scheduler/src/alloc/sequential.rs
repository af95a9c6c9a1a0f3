//! Sequential register allocation.
//!
//! Every producer gets its own simple register and every operand reads the
//! nearest earlier producer of its register. A loop-carried value then lives in
//! two names (the one read at the top of the body and the one written later in
//! it), so a compensating `mov` is placed at the bottom of the loop for each such
//! pair and the branch is moved to the new last loop bundle.

use tracing::debug;

use super::{allocate_unresolved, destination, writers_of};
use crate::analysis::DependencyMatrix;
use crate::common::error::ScheduleError;
use crate::common::reg::RegisterFile;
use crate::isa::instruction::{Instruction, InstructionKind, Operand, Register};
use crate::program::BasicBlock;
use crate::schedule::{InstrId, Schedule, Scheduler, SequentialSchedule};

/// Allocates registers for a fully placed sequential schedule.
pub fn allocate(
    sched: &mut SequentialSchedule,
    deps: &DependencyMatrix,
    regs: &mut RegisterFile,
) -> Result<(), ScheduleError> {
    allocate_producers(sched.schedule_mut(), regs)?;
    map_consumers(sched.schedule_mut(), deps);
    debug!("mapped producers and consumers");

    if sched.schedule().has_loop() {
        insert_compensating_moves(sched, deps)?;
        let last = sched.schedule().loop_region_end().saturating_sub(1);
        sched.schedule_mut().relocate_branch(last)?;
        debug!(bundle = last, "moved loop branch to the end of the body");
    }

    allocate_unresolved(sched.schedule_mut(), regs)?;
    Ok(())
}

fn allocate_producers(sched: &mut Schedule, regs: &mut RegisterFile) -> Result<(), ScheduleError> {
    let producers: Vec<InstrId> = sched
        .placed()
        .filter(|id| destination(sched, *id).is_some())
        .collect();
    for id in producers {
        let reg = regs.fresh_simple()?;
        if let Some(inst) = sched.instruction_mut(id) {
            inst.mapped_destination = Some(reg);
        }
    }
    Ok(())
}

/// Maps each operand to the closest producer strictly before the consumer, or,
/// failing that, the closest one at or after it (the previous iteration's write).
fn map_consumers(sched: &mut Schedule, deps: &DependencyMatrix) {
    for c in 0..sched.program_len() {
        let Some(dep) = deps.get(c) else {
            continue;
        };
        for op in Operand::BOTH {
            let Some(reg) = sched.instruction(c).and_then(|i| i.kind.operand(op)) else {
                continue;
            };
            let before = writers_of(sched, dep.all(), reg).filter(|p| *p < c).max();
            let after = writers_of(sched, dep.all(), reg).filter(|p| *p >= c).min();
            let mapped = before
                .or(after)
                .and_then(|p| sched.instruction(p))
                .and_then(|p| p.mapped_destination);
            if let (Some(mapped), Some(inst)) = (mapped, sched.instruction_mut(c)) {
                inst.map_operand(op, mapped);
            }
        }
    }
}

/// Copies each loop-carried value from the name written in the body to the name
/// read at the top of the body, once per distinct `(dest, src)` pair.
fn insert_compensating_moves(
    sched: &mut SequentialSchedule,
    deps: &DependencyMatrix,
) -> Result<(), ScheduleError> {
    let s = sched.schedule();
    let Some(ls) = s.loop_start() else {
        return Ok(());
    };

    let mut moves: Vec<(Register, Register)> = Vec::new();
    for c in (0..s.program_len()).filter(|c| s.region(*c) == BasicBlock::Body) {
        let (Some(dep), Some(consumer)) = (deps.get(c), s.instruction(c)) else {
            continue;
        };
        for p in &dep.interloop {
            let Some(producer) = s.instruction(*p) else {
                continue;
            };
            if producer.bundle().is_none_or(|b| b < ls) {
                continue;
            }
            let Some(op) = Operand::BOTH
                .into_iter()
                .find(|op| consumer.kind.operand(*op) == producer.kind.destination())
            else {
                continue;
            };
            if let (Some(dest), Some(src)) = (consumer.mapped_operand(op), producer.mapped_destination)
                && dest != src
                && !moves.contains(&(dest, src))
            {
                moves.push((dest, src));
            }
        }
    }

    for (dest, src) in moves {
        let s = sched.schedule();
        let end = s.loop_region_end();
        let ready = s
            .placed_in(ls..end)
            .filter_map(|id| s.instruction(id))
            .filter(|i| i.mapped_destination == Some(src))
            .filter_map(Instruction::ready_at)
            .max()
            .unwrap_or(0);
        let lower_bound = end.saturating_sub(1).max(ready);

        let id = sched
            .schedule_mut()
            .push_instruction(InstructionKind::Mov { dest, src }, BasicBlock::Body);
        if let Some(inst) = sched.schedule_mut().instruction_mut(id) {
            inst.mapped_destination = Some(dest);
            inst.map_operand(Operand::A, src);
        }
        sched.place_from(id, lower_bound);
        debug!(dest, src, "inserted compensating move");
    }
    Ok(())
}
