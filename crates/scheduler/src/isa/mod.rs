//! Instruction Set.
//!
//! Contains the instruction model and the two textual collaborators around it.
//!
//! # Modules
//!
//! * `instruction`: Instruction kinds, operands, capabilities, latency and unit affinity.
//! * `decode`: Assembly text to [`instruction::Instruction`].
//! * `disasm`: [`instruction::Instruction`] back to assembly text.

/// Assembly decoder.
pub mod decode;

/// Instruction renderer for schedule listings and diagnostics.
pub mod disasm;

/// Instruction kinds, operands and per-instruction scheduling state.
pub mod instruction;

pub use decode::decode;
pub use disasm::render;
pub use instruction::{
    Immediate, Instruction, InstructionKind, LoopRegister, Operand, Placement, Register,
};
