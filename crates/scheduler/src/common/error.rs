//! Error definitions.
//!
//! This module defines every failure the scheduler can report. It provides:
//! 1. **Decode Errors:** Unrecognised mnemonics and malformed operand syntax.
//! 2. **Program Errors:** Programs whose control flow is outside the single-loop model.
//! 3. **Register Errors:** Exhaustion of a register class.
//! 4. **Schedule Errors:** Infeasible initiation intervals and broken slot invariants.
//!
//! All of them are fatal; the scheduler has no partial-success mode.

use std::path::PathBuf;

use thiserror::Error;

use super::reg::RegisterClass;
use crate::config::FunctionalUnit;

/// Failure to turn one line of assembly into an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The line contained nothing but whitespace and separators.
    #[error("empty instruction")]
    Empty,

    /// The mnemonic is not part of the instruction set.
    #[error("unknown mnemonic `{mnemonic}` in `{line}`")]
    UnknownMnemonic {
        /// Mnemonic as written.
        mnemonic: String,
        /// Full source line.
        line: String,
    },

    /// The mnemonic was followed by the wrong number of operands.
    #[error("`{mnemonic}` expects {expected} operand(s), found {found} in `{line}`")]
    OperandCount {
        /// Mnemonic as written.
        mnemonic: String,
        /// Number of operands the mnemonic takes.
        expected: usize,
        /// Number of operands present.
        found: usize,
        /// Full source line.
        line: String,
    },

    /// An operand could not be parsed as what its position requires.
    #[error("malformed {expected} `{operand}` in `{line}`")]
    MalformedOperand {
        /// What the operand should have been (register, immediate, ...).
        expected: &'static str,
        /// Operand as written.
        operand: String,
        /// Full source line.
        line: String,
    },
}

/// A decoded program that does not fit the single-loop model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    /// More than one loop branch was found.
    #[error("program contains more than one loop branch (at {first} and {second})")]
    MultipleBranches {
        /// Address of the first branch.
        first: usize,
        /// Address of the second branch.
        second: usize,
    },

    /// The loop branch does not jump backwards to an instruction of the program.
    #[error("loop branch at {branch} targets {target}, which is not at or before it")]
    InvalidBranchTarget {
        /// Address of the branch.
        branch: usize,
        /// Target it names.
        target: usize,
    },
}

/// Register allocation ran out of names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// Every register of `class` below `limit` has been handed out.
    #[error("{class} registers exhausted (limit {limit})")]
    Exhausted {
        /// Class that ran out.
        class: RegisterClass,
        /// First register number outside the class.
        limit: u32,
    },
}

/// Failure while building or finishing a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// Register allocation failed.
    #[error(transparent)]
    Register(#[from] RegisterError),

    /// The loop body cannot satisfy its interloop dependencies within the II cap.
    #[error("no feasible initiation interval: II {ii} exceeds the limit of {limit}")]
    InfeasibleInitiationInterval {
        /// II the retry loop wanted to try next.
        ii: usize,
        /// Largest II allowed.
        limit: usize,
    },

    /// The machine has no unit of the class an instruction needs.
    #[error("instruction {address} needs a {unit} unit, but the machine has none")]
    MissingUnit {
        /// Original address of the instruction.
        address: usize,
        /// Class it executes on.
        unit: FunctionalUnit,
    },

    /// A forced placement found its slot occupied.
    #[error("no free slot for instruction {address} in bundle {bundle}")]
    SlotUnavailable {
        /// Original address of the instruction (or its synthetic id).
        address: usize,
        /// Bundle the placement was forced into.
        bundle: usize,
    },
}

/// Crate-level error covering the whole decode → schedule → emit pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// An input line failed to decode.
    #[error("instruction {index}: {source}")]
    Decode {
        /// Position of the line in the input.
        index: usize,
        /// Underlying decode failure.
        #[source]
        source: DecodeError,
    },

    /// The decoded program is outside the single-loop model.
    #[error(transparent)]
    Program(#[from] ProgramError),

    /// Scheduling or register allocation failed.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Reading or writing a file failed.
    #[error("{}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Input or output JSON was not of the expected shape.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<RegisterError> for Error {
    fn from(err: RegisterError) -> Self {
        Self::Schedule(ScheduleError::Register(err))
    }
}

/// Result alias for the crate-level pipeline.
pub type Result<T> = std::result::Result<T, Error>;
