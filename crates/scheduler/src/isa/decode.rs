//! Assembly Decoder.
//!
//! This module turns one line of assembly text into an [`Instruction`]. It handles
//! register operands (`x5`), decimal and `0x` hex immediates, `offset(xB)` memory
//! operands, the loop-control and predicate forms of `mov`, and an optional
//! `(pN)` predicate prefix. Commas are treated as whitespace.

use crate::common::error::DecodeError;
use crate::isa::instruction::{Immediate, Instruction, InstructionKind, LoopRegister, Register};

/// Prefix of general-purpose register names.
const REGISTER_PREFIX: char = 'x';

/// Prefix of predicate register names.
const PREDICATE_PREFIX: char = 'p';

/// Decodes one line of assembly.
///
/// # Arguments
///
/// * `line` - The instruction text, e.g. `"ld x2, 0x10(x1)"`.
/// * `address` - Position of the instruction in the program.
///
/// # Returns
///
/// The decoded instruction, or a `DecodeError` naming the offending text.
pub fn decode(line: &str, address: usize) -> Result<Instruction, DecodeError> {
    let text = line.trim();
    let (predicate, body) = split_predicate(text, line)?;

    let normalized = body.replace(',', " ");
    let mut tokens = normalized.split_whitespace();
    let mnemonic = tokens.next().ok_or(DecodeError::Empty)?;
    let operands: Vec<&str> = tokens.collect();

    let cx = Context {
        mnemonic,
        operands: &operands,
        line,
    };

    let kind = match mnemonic {
        "add" | "sub" | "mulu" => {
            cx.arity(3)?;
            let dest = cx.register(0)?;
            let a = cx.register(1)?;
            let b = cx.register(2)?;
            match mnemonic {
                "add" => InstructionKind::Add { dest, a, b },
                "sub" => InstructionKind::Sub { dest, a, b },
                _ => InstructionKind::Mulu { dest, a, b },
            }
        }
        "addi" => {
            cx.arity(3)?;
            InstructionKind::Addi {
                dest: cx.register(0)?,
                a: cx.register(1)?,
                imm: cx.immediate(2)?,
            }
        }
        "mov" => {
            cx.arity(2)?;
            decode_mov(&cx)?
        }
        "ld" | "st" => {
            cx.arity(2)?;
            let reg = cx.register(0)?;
            let (offset, base) = cx.memory(1)?;
            if mnemonic == "ld" {
                InstructionKind::Ld {
                    dest: reg,
                    offset,
                    base,
                }
            } else {
                InstructionKind::St {
                    src: reg,
                    offset,
                    base,
                }
            }
        }
        "loop" | "loop.pip" => {
            cx.arity(1)?;
            let target = cx.target(0)?;
            if mnemonic == "loop" {
                InstructionKind::Loop { target }
            } else {
                InstructionKind::LoopPip { target }
            }
        }
        "nop" => {
            cx.arity(0)?;
            InstructionKind::Nop
        }
        _ => {
            return Err(DecodeError::UnknownMnemonic {
                mnemonic: mnemonic.to_string(),
                line: line.to_string(),
            });
        }
    };

    let mut instruction = Instruction::new(address, kind);
    instruction.predicate = predicate;
    Ok(instruction)
}

/// Decodes the four forms of `mov` by the shape of their operands.
fn decode_mov(cx: &Context<'_>) -> Result<InstructionKind, DecodeError> {
    let dest = cx.operands[0];
    let src = cx.operands[1];

    if let Some(reg) = match dest {
        "LC" => Some(LoopRegister::Lc),
        "EC" => Some(LoopRegister::Ec),
        _ => None,
    } {
        let imm = cx.immediate(1)?;
        return Ok(InstructionKind::MovLoopReg {
            reg,
            imm: imm.value(),
        });
    }

    if dest.starts_with(PREDICATE_PREFIX) {
        let pred = parse_prefixed(dest, PREDICATE_PREFIX).ok_or_else(|| cx.malformed("predicate", dest))?;
        let value = match src {
            "true" => true,
            "false" => false,
            _ => return Err(cx.malformed("boolean", src)),
        };
        return Ok(InstructionKind::MovPredicate { pred, value });
    }

    let dest = cx.register(0)?;
    if src.starts_with(REGISTER_PREFIX) {
        Ok(InstructionKind::Mov {
            dest,
            src: cx.register(1)?,
        })
    } else {
        Ok(InstructionKind::Movi {
            dest,
            imm: cx.immediate(1)?,
        })
    }
}

/// Splits a leading `(pN)` guard off the instruction text.
fn split_predicate<'a>(text: &'a str, line: &str) -> Result<(Option<Register>, &'a str), DecodeError> {
    let Some(rest) = text.strip_prefix('(') else {
        return Ok((None, text));
    };
    let malformed = || DecodeError::MalformedOperand {
        expected: "predicate guard",
        operand: text.split_whitespace().next().unwrap_or(text).to_string(),
        line: line.to_string(),
    };
    let (guard, body) = rest.split_once(')').ok_or_else(malformed)?;
    let pred = parse_prefixed(guard.trim(), PREDICATE_PREFIX).ok_or_else(malformed)?;
    Ok((Some(pred), body.trim_start()))
}

/// Parses `<prefix><number>`.
fn parse_prefixed(token: &str, prefix: char) -> Option<Register> {
    token.strip_prefix(prefix)?.parse().ok()
}

/// Parses a decimal or `0x` hex literal with an optional leading `-`.
pub fn parse_immediate(token: &str) -> Option<Immediate> {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let (magnitude, hex) = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex_digits) => (i64::from_str_radix(hex_digits, 16).ok()?, true),
        None => (digits.parse::<i64>().ok()?, false),
    };
    let value = if negative { -magnitude } else { magnitude };
    Some(if hex {
        Immediate::hex(value)
    } else {
        Immediate::decimal(value)
    })
}

/// Operand accessors for one line being decoded.
struct Context<'a> {
    mnemonic: &'a str,
    operands: &'a [&'a str],
    line: &'a str,
}

impl Context<'_> {
    fn arity(&self, expected: usize) -> Result<(), DecodeError> {
        if self.operands.len() == expected {
            Ok(())
        } else {
            Err(DecodeError::OperandCount {
                mnemonic: self.mnemonic.to_string(),
                expected,
                found: self.operands.len(),
                line: self.line.to_string(),
            })
        }
    }

    fn malformed(&self, expected: &'static str, operand: &str) -> DecodeError {
        DecodeError::MalformedOperand {
            expected,
            operand: operand.to_string(),
            line: self.line.to_string(),
        }
    }

    fn register(&self, index: usize) -> Result<Register, DecodeError> {
        let token = self.operands[index];
        parse_prefixed(token, REGISTER_PREFIX).ok_or_else(|| self.malformed("register", token))
    }

    fn immediate(&self, index: usize) -> Result<Immediate, DecodeError> {
        let token = self.operands[index];
        parse_immediate(token).ok_or_else(|| self.malformed("immediate", token))
    }

    fn target(&self, index: usize) -> Result<usize, DecodeError> {
        let token = self.operands[index];
        token
            .parse()
            .map_err(|_| self.malformed("branch target", token))
    }

    /// Parses `offset(xB)`.
    fn memory(&self, index: usize) -> Result<(Immediate, Register), DecodeError> {
        let token = self.operands[index];
        let malformed = || self.malformed("memory operand", token);
        let (offset, rest) = token.split_once('(').ok_or_else(malformed)?;
        let base = rest.strip_suffix(')').ok_or_else(malformed)?;
        let offset = parse_immediate(offset).ok_or_else(malformed)?;
        let base = parse_prefixed(base, REGISTER_PREFIX).ok_or_else(malformed)?;
        Ok((offset, base))
    }
}
