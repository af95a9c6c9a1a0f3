//! Decoded programs and their basic-block partition.
//!
//! A program is a straight-line instruction sequence with at most one backward
//! loop branch. The branch splits it into three basic blocks:
//! 1. **BB0:** Instructions before the branch target (pre-loop).
//! 2. **BB1:** The branch target up to and including the branch (loop body).
//! 3. **BB2:** Everything after the branch (post-loop).

use std::fmt;

use crate::common::error::{Error, ProgramError};
use crate::isa::decode::decode;
use crate::isa::instruction::Instruction;

/// Basic block an instruction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BasicBlock {
    /// Pre-loop block.
    Prologue,
    /// Loop body.
    Body,
    /// Post-loop block.
    Epilogue,
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prologue => "BB0",
            Self::Body => "BB1",
            Self::Epilogue => "BB2",
        })
    }
}

/// Instruction addresses delimiting the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopBounds {
    /// Address of the first body instruction (the branch target).
    pub start: usize,
    /// One past the branch; the first post-loop address.
    pub end: usize,
    /// Address of the branch.
    pub branch: usize,
}

/// A validated program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
    bounds: Option<LoopBounds>,
}

impl Program {
    /// Builds a program from decoded instructions.
    ///
    /// Instructions are re-addressed by position. Fails if there is more than one
    /// loop branch or the branch does not jump backwards.
    pub fn new(mut instructions: Vec<Instruction>) -> Result<Self, ProgramError> {
        let mut branch: Option<(usize, usize)> = None;
        for (address, inst) in instructions.iter_mut().enumerate() {
            inst.address = address;
            let Some(target) = inst.kind.branch_target() else {
                continue;
            };
            if let Some((first, _)) = branch {
                return Err(ProgramError::MultipleBranches {
                    first,
                    second: address,
                });
            }
            if target > address {
                return Err(ProgramError::InvalidBranchTarget {
                    branch: address,
                    target,
                });
            }
            branch = Some((address, target));
        }

        let bounds = branch.map(|(branch, start)| LoopBounds {
            start,
            end: branch + 1,
            branch,
        });
        Ok(Self {
            instructions,
            bounds,
        })
    }

    /// Decodes one instruction per line and builds the program.
    pub fn from_lines<I, S>(lines: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let instructions = lines
            .into_iter()
            .enumerate()
            .map(|(index, line)| {
                decode(line.as_ref(), index).map_err(|source| Error::Decode { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(instructions)?)
    }

    /// All instructions in program order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    pub const fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the program has no instructions.
    pub const fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Loop boundaries, if the program has a loop.
    pub const fn bounds(&self) -> Option<LoopBounds> {
        self.bounds
    }

    /// First loop-body address, or the program length without a loop.
    pub fn loop_start(&self) -> usize {
        self.bounds.map_or(self.len(), |b| b.start)
    }

    /// First post-loop address, or the program length without a loop.
    pub fn loop_end(&self) -> usize {
        self.bounds.map_or(self.len(), |b| b.end)
    }

    /// Basic block containing `address`.
    pub fn block_of(&self, address: usize) -> BasicBlock {
        if address < self.loop_start() {
            BasicBlock::Prologue
        } else if address < self.loop_end() {
            BasicBlock::Body
        } else {
            BasicBlock::Epilogue
        }
    }

    /// Instructions of one basic block.
    pub fn block(&self, block: BasicBlock) -> &[Instruction] {
        let (start, end) = match block {
            BasicBlock::Prologue => (0, self.loop_start()),
            BasicBlock::Body => (self.loop_start(), self.loop_end()),
            BasicBlock::Epilogue => (self.loop_end(), self.len()),
        };
        &self.instructions[start..end]
    }

    /// Register producers of one basic block.
    pub fn producers(&self, block: BasicBlock) -> impl Iterator<Item = &Instruction> + '_ {
        self.block(block).iter().filter(|i| i.kind.is_producer())
    }
}

impl fmt::Display for Program {
    /// Annotated listing: block labels, hex addresses and instructions.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", BasicBlock::Prologue)?;
        for inst in &self.instructions {
            if self.bounds.is_some() && inst.address == self.loop_start() {
                writeln!(f, "{}:", BasicBlock::Body)?;
            }
            if self.bounds.is_some() && inst.address == self.loop_end() {
                writeln!(f, "{}:", BasicBlock::Epilogue)?;
            }
            writeln!(f, "\t{:#x}: {inst}", inst.address)?;
        }
        Ok(())
    }
}
