//! Rotating register allocation for the modulo schedule.
//!
//! A loop producer writes a fresh rotating register per iteration; the register
//! file rotates by one at every `loop.pip`, so a consumer `d` stages after its
//! producer names the producer's register plus `d`. It provides:
//! 1. **Loop Producers:** One rotating block per producer, sized so that all live
//!    stages fit before the names collide.
//! 2. **Operand Arithmetic:** Local reads add the stage distance, loop-carried
//!    reads one more, post-loop reads the distance to the last stage.
//! 3. **Loop Setup:** Stage predicates, the collapse onto the kernel, and the
//!    `EC`/predicate initialisation ahead of the loop.

use std::ops::Range;

use tracing::{debug, info};

use super::{allocate_unresolved, destination, writers_of};
use crate::analysis::{DependencyMatrix, InstructionDependency};
use crate::common::error::ScheduleError;
use crate::common::reg::RegisterFile;
use crate::isa::instruction::{Instruction, InstructionKind, LoopRegister, Operand, Register};
use crate::program::BasicBlock;
use crate::schedule::{InstrId, PipelinedSchedule, Schedule, Scheduler};

/// Allocates registers for a fully placed, not yet collapsed, modulo schedule.
pub fn allocate(
    sched: &mut PipelinedSchedule,
    deps: &DependencyMatrix,
    regs: &mut RegisterFile,
) -> Result<(), ScheduleError> {
    let s = sched.schedule_mut();
    let stages = s.stage_count();
    let (ls, le) = match s.loop_start() {
        Some(ls) => (ls, s.loop_region_end()),
        None => (s.len(), s.len()),
    };
    let in_loop: Vec<InstrId> = s.placed_in(ls..le).collect();
    let outside: Vec<InstrId> = s
        .placed()
        .filter(|id| {
            s.instruction(*id)
                .and_then(Instruction::bundle)
                .is_some_and(|b| b < ls || b >= le)
        })
        .collect();

    for &id in &in_loop {
        if destination(s, id).is_some() {
            let reg = regs.fresh_rotating(stages)?;
            set_destination(s, id, reg);
        }
    }

    let mut invariants: Vec<usize> = Vec::new();
    for p in deps.iter().flat_map(|d| d.invariant.iter().copied()) {
        if !invariants.contains(&p) {
            invariants.push(p);
        }
    }
    for p in invariants {
        if s.instruction(p).is_some_and(|i| i.mapped_destination.is_none()) {
            let reg = regs.fresh_simple()?;
            set_destination(s, p, reg);
        }
    }
    debug!(stages, "allocated loop producers and invariants");

    for &c in &in_loop {
        if let Some(dep) = deps.get(c) {
            map_loop_consumer(s, regs, dep, c, ls..le);
        }
    }

    seed_carried_values(s, regs, deps, ls..le);

    for &id in &outside {
        let unmapped = s
            .instruction(id)
            .is_some_and(|i| i.kind.destination().is_some() && i.mapped_destination.is_none());
        if unmapped {
            let reg = regs.fresh_simple()?;
            set_destination(s, id, reg);
        }
    }

    for &c in &outside {
        if let Some(dep) = deps.get(c) {
            map_outside_consumer(s, regs, dep, c, stages);
        }
    }

    allocate_unresolved(s, regs)?;
    info!(stages, "rotating registers allocated");
    Ok(())
}

/// Predicates each stage, folds the loop onto its kernel and initialises `EC`
/// and the first stage predicate before the loop.
///
/// # Arguments
///
/// * `sched` - A modulo schedule whose registers are already allocated.
/// * `regs` - Register file the stage predicates are drawn from.
pub fn prepare_loop(
    sched: &mut PipelinedSchedule,
    regs: &mut RegisterFile,
) -> Result<(), ScheduleError> {
    let s = sched.schedule_mut();
    let Some(ls) = s.loop_start() else {
        return Ok(());
    };
    let ii = s.initiation_interval();
    if ii == 0 {
        return Ok(());
    }
    let stages = s.stage_count();

    for stage in 0..stages {
        let pred = regs.fresh_predicate()?;
        let start = ls + stage * ii;
        let members: Vec<InstrId> = s.placed_in(start..start + ii).collect();
        for id in members {
            if let Some(inst) = s.instruction_mut(id)
                && inst.kind.is_predicateable()
            {
                inst.predicate = Some(pred);
            }
        }
    }

    s.collapse_loop()?;
    debug!(ii, stages, "collapsed loop onto its kernel");

    let epilogue_count = InstructionKind::MovLoopReg {
        reg: LoopRegister::Ec,
        imm: stages.saturating_sub(1) as i64,
    };
    let first_stage = InstructionKind::MovPredicate {
        pred: regs.layout().predicate_base,
        value: true,
    };
    for kind in [epilogue_count, first_stage] {
        let id = s.push_instruction(kind, BasicBlock::Prologue);
        place_before_loop(s, id)?;
    }
    Ok(())
}

fn set_destination(sched: &mut Schedule, id: InstrId, reg: Register) {
    if let Some(inst) = sched.instruction_mut(id) {
        inst.mapped_destination = Some(reg);
    }
}

fn mapped_destination(sched: &Schedule, id: InstrId) -> Option<Register> {
    sched.instruction(id).and_then(|i| i.mapped_destination)
}

/// Stage distance from `producer` to `consumer`, as a rotation offset.
fn stage_distance(sched: &Schedule, producer: InstrId, consumer: InstrId) -> i64 {
    let stage = |id| sched.stage_of(id).unwrap_or(0) as i64;
    stage(consumer) - stage(producer)
}

fn map_loop_consumer(
    sched: &mut Schedule,
    regs: &RegisterFile,
    dep: &InstructionDependency,
    consumer: InstrId,
    loop_bundles: Range<usize>,
) {
    for op in Operand::BOTH {
        let Some(reg) = sched.instruction(consumer).and_then(|i| i.kind.operand(op)) else {
            continue;
        };
        let s: &Schedule = sched;
        let mapped = if let Some(p) = writers_of(s, dep.invariant.iter().copied(), reg).max() {
            mapped_destination(s, p)
        } else if let Some(p) = writers_of(s, dep.local.iter().copied(), reg).max() {
            mapped_destination(s, p).map(|r| regs.rotate(r, stage_distance(s, p, consumer)))
        } else if let Some(p) = writers_of(s, dep.interloop.iter().copied(), reg)
            .filter(|p| {
                s.instruction(*p)
                    .and_then(Instruction::bundle)
                    .is_some_and(|b| loop_bundles.contains(&b))
            })
            .max()
        {
            mapped_destination(s, p).map(|r| regs.rotate(r, stage_distance(s, p, consumer) + 1))
        } else {
            None
        };
        if let (Some(mapped), Some(inst)) = (mapped, sched.instruction_mut(consumer)) {
            inst.map_operand(op, mapped);
        }
    }
}

/// Points each prologue producer of a loop-carried value at the rotating name
/// the loop's first iteration reads it from.
fn seed_carried_values(
    sched: &mut Schedule,
    regs: &RegisterFile,
    deps: &DependencyMatrix,
    loop_bundles: Range<usize>,
) {
    let mut seeds: Vec<usize> = deps
        .iter()
        .flat_map(|d| d.interloop.iter().copied())
        .filter(|p| sched.region(*p) == BasicBlock::Prologue)
        .collect();
    seeds.sort_unstable();
    seeds.dedup();

    for p in seeds {
        let Some(reg) = destination(sched, p) else {
            continue;
        };
        let s: &Schedule = sched;
        let last_writer = (0..s.program_len())
            .filter(|id| s.region(*id) == BasicBlock::Body)
            .filter(|id| destination(s, *id) == Some(reg))
            .filter(|id| {
                s.instruction(*id)
                    .and_then(Instruction::bundle)
                    .is_some_and(|b| loop_bundles.contains(&b))
            })
            .max();
        let Some(writer) = last_writer else {
            continue;
        };
        let stage = s.stage_of(writer).unwrap_or(0) as i64;
        if let Some(r) = mapped_destination(s, writer) {
            let seeded = regs.rotate(r, 1 - stage);
            set_destination(sched, p, seeded);
        }
    }
}

fn map_outside_consumer(
    sched: &mut Schedule,
    regs: &RegisterFile,
    dep: &InstructionDependency,
    consumer: InstrId,
    stages: usize,
) {
    let last_stage = stages.saturating_sub(1) as i64;
    for op in Operand::BOTH {
        let Some(reg) = sched.instruction(consumer).and_then(|i| i.kind.operand(op)) else {
            continue;
        };
        let s: &Schedule = sched;
        let mapped = if let Some(p) = writers_of(s, dep.local.iter().copied(), reg).max() {
            mapped_destination(s, p)
        } else if let Some(p) = writers_of(s, dep.post_loop.iter().copied(), reg).max() {
            let stage = s.stage_of(p).unwrap_or(0) as i64;
            mapped_destination(s, p).map(|r| regs.rotate(r, last_stage - stage))
        } else {
            None
        };
        if let (Some(mapped), Some(inst)) = (mapped, sched.instruction_mut(consumer)) {
            inst.map_operand(op, mapped);
        }
    }
}

/// Puts a loop-setup instruction in the bundle just before the loop, opening a
/// new one when there is none or it has no free ALU slot.
fn place_before_loop(sched: &mut Schedule, id: InstrId) -> Result<(), ScheduleError> {
    let ls = sched.loop_start().unwrap_or(0);
    if ls > 0 && sched.insert_into(id, ls - 1).is_some() {
        return Ok(());
    }
    sched.insert_bubble(ls);
    sched.force_into(id, ls)
}
