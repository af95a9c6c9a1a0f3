//! Register allocation.
//!
//! Runs once a schedule's bundle layout is fixed and rewrites every instruction's
//! registers into concrete names. It provides:
//! 1. **Sequential:** One simple register per producer, operands resolved to the
//!    nearest producer, compensating moves for loop-carried values.
//! 2. **Pipelined:** Rotating registers for loop producers with stage-offset
//!    operand arithmetic, simple registers for invariants and straight-line code,
//!    stage predicates, loop collapse, and loop-control setup.
//!
//! Reads of registers the program never writes get a fresh simple register each.

/// Allocation for the modulo schedule.
pub mod pipelined;

/// Allocation for the sequential schedule.
pub mod sequential;

use crate::common::error::RegisterError;
use crate::common::reg::RegisterFile;
use crate::isa::instruction::{Operand, Register};
use crate::schedule::{InstrId, Schedule};

/// Gives every still-unmapped operand of a placed instruction its own fresh
/// simple register.
pub(crate) fn allocate_unresolved(
    sched: &mut Schedule,
    regs: &mut RegisterFile,
) -> Result<(), RegisterError> {
    let placed: Vec<InstrId> = sched.placed().collect();
    for id in placed {
        let Some(inst) = sched.instruction_mut(id) else {
            continue;
        };
        let pending: Vec<Operand> = inst.unmapped_operands().collect();
        for op in pending {
            inst.map_operand(op, regs.fresh_simple()?);
        }
    }
    Ok(())
}

/// Register written by instruction `id`, as written in the program.
pub(crate) fn destination(sched: &Schedule, id: InstrId) -> Option<Register> {
    sched.instruction(id).and_then(|i| i.kind.destination())
}

/// Producers from `candidates` that write `reg`.
pub(crate) fn writers_of<'a>(
    sched: &'a Schedule,
    candidates: impl IntoIterator<Item = usize> + 'a,
    reg: Register,
) -> impl Iterator<Item = usize> + 'a {
    candidates
        .into_iter()
        .filter(move |p| destination(sched, *p) == Some(reg))
}
