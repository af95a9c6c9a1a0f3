//! Instruction Renderer.
//!
//! Converts an [`Instruction`] back into assembly text for schedule listings,
//! logging, and test diagnostics. Registers are printed under their allocated
//! names when allocation has run and under their original names otherwise, so the
//! output of an unallocated instruction decodes back to the same instruction.
//!
//! # Usage
//!
//! ```
//! use modsched_core::isa::decode::decode;
//! use modsched_core::isa::disasm::render;
//!
//! let inst = decode("ld x2,0x10(x1)", 0).unwrap();
//! assert_eq!(render(&inst), "ld x2, 0x10(x1)");
//! ```

use std::fmt;

use crate::isa::instruction::{Instruction, InstructionKind, Operand, Register};

/// Renders an instruction, including its `(pN)` guard if it has one.
pub fn render(inst: &Instruction) -> String {
    let body = render_body(inst);
    match inst.predicate {
        Some(pred) => format!("(p{pred}) {body}"),
        None => body,
    }
}

fn render_body(inst: &Instruction) -> String {
    let dest = |orig: Register| inst.mapped_destination.unwrap_or(orig);
    let op = |which: Operand, orig: Register| inst.mapped_operand(which).unwrap_or(orig);
    let mn = inst.kind.mnemonic();

    match inst.kind {
        InstructionKind::Add { dest: d, a, b }
        | InstructionKind::Sub { dest: d, a, b }
        | InstructionKind::Mulu { dest: d, a, b } => format!(
            "{mn} x{}, x{}, x{}",
            dest(d),
            op(Operand::A, a),
            op(Operand::B, b)
        ),
        InstructionKind::Addi { dest: d, a, imm } => {
            format!("{mn} x{}, x{}, {imm}", dest(d), op(Operand::A, a))
        }
        InstructionKind::Mov { dest: d, src } => {
            format!("{mn} x{}, x{}", dest(d), op(Operand::A, src))
        }
        InstructionKind::Movi { dest: d, imm } => format!("{mn} x{}, {imm}", dest(d)),
        InstructionKind::Ld {
            dest: d,
            offset,
            base,
        } => format!("{mn} x{}, {offset}(x{})", dest(d), op(Operand::A, base)),
        InstructionKind::St { src, offset, base } => format!(
            "{mn} x{}, {offset}(x{})",
            op(Operand::A, src),
            op(Operand::B, base)
        ),
        InstructionKind::MovLoopReg { reg, imm } => format!("{mn} {reg}, {imm}"),
        InstructionKind::MovPredicate { pred, value } => format!("{mn} p{pred}, {value}"),
        InstructionKind::Loop { target } | InstructionKind::LoopPip { target } => {
            format!("{mn} {target}")
        }
        InstructionKind::Nop => mn.to_string(),
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}
