//! Instruction model.
//!
//! Provides the decoded form of one instruction: its kind and operands, its
//! original program position, and the mutable state that scheduling and register
//! allocation attach to it (placement, mapped registers, predicate guard).

use std::fmt;

use crate::config::FunctionalUnit;

/// Architectural register number.
pub type Register = u32;

/// Latency of `mulu` in bundles.
pub const MUL_LATENCY: usize = 3;

/// Latency of every other instruction in bundles.
pub const DEFAULT_LATENCY: usize = 1;

/// Literal operand of `addi` and `mov`, and the offset of `ld`/`st`.
///
/// The radix it was written in is kept so that rendering reproduces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Immediate {
    value: i64,
    hex: bool,
}

impl Immediate {
    /// Creates an immediate that renders in decimal.
    pub const fn decimal(value: i64) -> Self {
        Self { value, hex: false }
    }

    /// Creates an immediate that renders as `0x` hex.
    pub const fn hex(value: i64) -> Self {
        Self { value, hex: true }
    }

    /// Numeric value.
    pub const fn value(self) -> i64 {
        self.value
    }

    /// Whether the literal was written in hex.
    pub const fn is_hex(self) -> bool {
        self.hex
    }
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.hex {
            return write!(f, "{}", self.value);
        }
        if self.value < 0 {
            write!(f, "-0x{:x}", self.value.unsigned_abs())
        } else {
            write!(f, "0x{:x}", self.value)
        }
    }
}

/// Loop-control registers set by `mov LC, imm` and `mov EC, imm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopRegister {
    /// Loop count.
    Lc,
    /// Epilogue stage count.
    Ec,
}

impl fmt::Display for LoopRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lc => "LC",
            Self::Ec => "EC",
        })
    }
}

/// Selects one of the (up to two) register operands an instruction reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// First source operand.
    A,
    /// Second source operand.
    B,
}

impl Operand {
    /// Both operands, in order.
    pub const BOTH: [Self; 2] = [Self::A, Self::B];
}

/// Kind and operands of an instruction.
///
/// Operand registers are the ones written in the source program; the names chosen
/// by register allocation live on [`Instruction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionKind {
    /// `add dest, a, b`
    Add {
        /// Destination register.
        dest: Register,
        /// First source.
        a: Register,
        /// Second source.
        b: Register,
    },
    /// `sub dest, a, b`
    Sub {
        /// Destination register.
        dest: Register,
        /// Minuend.
        a: Register,
        /// Subtrahend.
        b: Register,
    },
    /// `mulu dest, a, b`
    Mulu {
        /// Destination register.
        dest: Register,
        /// First factor.
        a: Register,
        /// Second factor.
        b: Register,
    },
    /// `addi dest, a, imm`
    Addi {
        /// Destination register.
        dest: Register,
        /// Source register.
        a: Register,
        /// Literal addend.
        imm: Immediate,
    },
    /// `mov dest, src`
    Mov {
        /// Destination register.
        dest: Register,
        /// Source register.
        src: Register,
    },
    /// `mov dest, imm`
    Movi {
        /// Destination register.
        dest: Register,
        /// Literal value.
        imm: Immediate,
    },
    /// `ld dest, offset(base)`
    Ld {
        /// Destination register.
        dest: Register,
        /// Byte offset.
        offset: Immediate,
        /// Base address register.
        base: Register,
    },
    /// `st src, offset(base)`
    St {
        /// Register whose value is stored.
        src: Register,
        /// Byte offset.
        offset: Immediate,
        /// Base address register.
        base: Register,
    },
    /// `mov LC, imm` or `mov EC, imm`
    MovLoopReg {
        /// Loop-control register written.
        reg: LoopRegister,
        /// Literal value.
        imm: i64,
    },
    /// `mov pN, true|false`
    MovPredicate {
        /// Predicate register written.
        pred: Register,
        /// Value written.
        value: bool,
    },
    /// `loop target`
    Loop {
        /// Branch target (instruction address before scheduling, bundle after).
        target: usize,
    },
    /// `loop.pip target`
    LoopPip {
        /// Branch target (instruction address before scheduling, bundle after).
        target: usize,
    },
    /// `nop`
    Nop,
}

impl InstructionKind {
    /// Assembly mnemonic.
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Sub { .. } => "sub",
            Self::Mulu { .. } => "mulu",
            Self::Addi { .. } => "addi",
            Self::Mov { .. }
            | Self::Movi { .. }
            | Self::MovLoopReg { .. }
            | Self::MovPredicate { .. } => "mov",
            Self::Ld { .. } => "ld",
            Self::St { .. } => "st",
            Self::Loop { .. } => "loop",
            Self::LoopPip { .. } => "loop.pip",
            Self::Nop => "nop",
        }
    }

    /// Register written, if the instruction is a register producer.
    pub const fn destination(&self) -> Option<Register> {
        match *self {
            Self::Add { dest, .. }
            | Self::Sub { dest, .. }
            | Self::Mulu { dest, .. }
            | Self::Addi { dest, .. }
            | Self::Mov { dest, .. }
            | Self::Movi { dest, .. }
            | Self::Ld { dest, .. } => Some(dest),
            _ => None,
        }
    }

    /// Register read as an operand.
    ///
    /// For `ld` operand A is the base; for `st` it is the stored value and
    /// operand B is the base.
    pub const fn operand(&self, which: Operand) -> Option<Register> {
        match which {
            Operand::A => match *self {
                Self::Add { a, .. }
                | Self::Sub { a, .. }
                | Self::Mulu { a, .. }
                | Self::Addi { a, .. }
                | Self::Mov { src: a, .. }
                | Self::Ld { base: a, .. }
                | Self::St { src: a, .. } => Some(a),
                _ => None,
            },
            Operand::B => match *self {
                Self::Add { b, .. }
                | Self::Sub { b, .. }
                | Self::Mulu { b, .. }
                | Self::St { base: b, .. } => Some(b),
                _ => None,
            },
        }
    }

    /// Whether the instruction writes a general-purpose register.
    pub const fn is_producer(&self) -> bool {
        self.destination().is_some()
    }

    /// Whether the instruction reads at least one general-purpose register.
    ///
    /// `mov` of an immediate is not a true consumer.
    pub const fn is_true_consumer(&self) -> bool {
        self.operand(Operand::A).is_some()
    }

    /// Whether the instruction is the loop branch.
    pub const fn is_branch(&self) -> bool {
        matches!(self, Self::Loop { .. } | Self::LoopPip { .. })
    }

    /// Target of the loop branch.
    pub const fn branch_target(&self) -> Option<usize> {
        match *self {
            Self::Loop { target } | Self::LoopPip { target } => Some(target),
            _ => None,
        }
    }

    /// Whether a stage predicate may guard the instruction.
    pub const fn is_predicateable(&self) -> bool {
        self.is_producer() || matches!(self, Self::St { .. })
    }

    /// Functional-unit class the instruction executes on; `None` for `nop`,
    /// which fits any slot.
    pub const fn unit(&self) -> Option<FunctionalUnit> {
        match self {
            Self::Mulu { .. } => Some(FunctionalUnit::Mul),
            Self::Ld { .. } | Self::St { .. } => Some(FunctionalUnit::Mem),
            Self::Loop { .. } | Self::LoopPip { .. } => Some(FunctionalUnit::Branch),
            Self::Nop => None,
            _ => Some(FunctionalUnit::Alu),
        }
    }

    /// Bundles between issue and the result being readable.
    pub const fn latency(&self) -> usize {
        match self {
            Self::Mulu { .. } => MUL_LATENCY,
            _ => DEFAULT_LATENCY,
        }
    }
}

/// Position of a scheduled instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Placement {
    /// Bundle index.
    pub bundle: usize,
    /// Slot within the bundle.
    pub slot: usize,
}

/// One instruction together with its scheduling and allocation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Position in the source program.
    pub address: usize,
    /// Kind and original operands.
    pub kind: InstructionKind,
    /// Bundle and slot, once scheduled.
    pub placement: Option<Placement>,
    /// Allocated destination register.
    pub mapped_destination: Option<Register>,
    mapped_a: Option<Register>,
    mapped_b: Option<Register>,
    /// Predicate register guarding execution.
    pub predicate: Option<Register>,
}

impl Instruction {
    /// Creates an unscheduled, unallocated instruction.
    pub const fn new(address: usize, kind: InstructionKind) -> Self {
        Self {
            address,
            kind,
            placement: None,
            mapped_destination: None,
            mapped_a: None,
            mapped_b: None,
            predicate: None,
        }
    }

    /// Bundle index, once scheduled.
    pub fn bundle(&self) -> Option<usize> {
        self.placement.map(|p| p.bundle)
    }

    /// First bundle in which a consumer may read this instruction's result.
    pub fn ready_at(&self) -> Option<usize> {
        self.bundle().map(|b| b + self.kind.latency())
    }

    /// Whether `self` reads the register `producer` writes.
    pub fn depends_on(&self, producer: &Self) -> bool {
        producer
            .kind
            .destination()
            .is_some_and(|dest| self.reads(dest))
    }

    /// Whether either operand names `reg`.
    pub fn reads(&self, reg: Register) -> bool {
        Operand::BOTH
            .into_iter()
            .any(|op| self.kind.operand(op) == Some(reg))
    }

    /// Allocated name of an operand.
    pub const fn mapped_operand(&self, which: Operand) -> Option<Register> {
        match which {
            Operand::A => self.mapped_a,
            Operand::B => self.mapped_b,
        }
    }

    /// Records the allocated name of an operand.
    pub const fn map_operand(&mut self, which: Operand, reg: Register) {
        match which {
            Operand::A => self.mapped_a = Some(reg),
            Operand::B => self.mapped_b = Some(reg),
        }
    }

    /// Operands the instruction reads that have not been allocated yet.
    pub fn unmapped_operands(&self) -> impl Iterator<Item = Operand> + '_ {
        Operand::BOTH
            .into_iter()
            .filter(|op| self.kind.operand(*op).is_some() && self.mapped_operand(*op).is_none())
    }
}
