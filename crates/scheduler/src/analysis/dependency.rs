//! Register dependency analysis.
//!
//! This module classifies every producer → consumer register relation of a
//! program relative to the loop. It provides:
//! 1. **Local:** Producer earlier in the consumer's own basic block.
//! 2. **Interloop:** Value carried into a loop iteration, either from BB0 or from
//!    a later (or the same) body instruction of the previous iteration.
//! 3. **Loop-invariant:** BB0 value the loop body never redefines.
//! 4. **Post-loop:** Loop-body value read after the loop.
//!
//! Dependencies are stored as producer addresses in a matrix indexed by the
//! consumer's address.

use std::fmt;

use crate::isa::instruction::{Instruction, Register};
use crate::program::{BasicBlock, Program};

/// The four dependency categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// Same basic block, earlier address.
    Local,
    /// Carried across the loop back edge.
    Interloop,
    /// Defined before the loop and never redefined inside it.
    LoopInvariant,
    /// Defined in the loop, read after it.
    PostLoop,
}

impl DependencyKind {
    /// All categories in matrix column order.
    pub const ALL: [Self; 4] = [
        Self::Local,
        Self::Interloop,
        Self::LoopInvariant,
        Self::PostLoop,
    ];
}

/// Dependency record of one instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionDependency {
    /// Address of the instruction.
    pub address: usize,
    /// Register the instruction writes, if any.
    pub destination: Option<Register>,
    /// Local producers.
    pub local: Vec<usize>,
    /// Interloop producers.
    pub interloop: Vec<usize>,
    /// Loop-invariant producers.
    pub invariant: Vec<usize>,
    /// Post-loop producers.
    pub post_loop: Vec<usize>,
}

impl InstructionDependency {
    /// Producers of one category.
    pub fn of(&self, kind: DependencyKind) -> &[usize] {
        match kind {
            DependencyKind::Local => &self.local,
            DependencyKind::Interloop => &self.interloop,
            DependencyKind::LoopInvariant => &self.invariant,
            DependencyKind::PostLoop => &self.post_loop,
        }
    }

    /// Producers of every category, local first.
    pub fn all(&self) -> impl Iterator<Item = usize> + '_ {
        DependencyKind::ALL
            .into_iter()
            .flat_map(|kind| self.of(kind).iter().copied())
    }

    /// Whether no dependency of any category was recorded.
    pub fn is_empty(&self) -> bool {
        self.all().next().is_none()
    }
}

/// Dependency records of a whole program, indexed by address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyMatrix {
    entries: Vec<InstructionDependency>,
}

impl DependencyMatrix {
    /// Record for `address`, if it is part of the program.
    pub fn get(&self, address: usize) -> Option<&InstructionDependency> {
        self.entries.get(address)
    }

    /// All records in address order.
    pub fn iter(&self) -> impl Iterator<Item = &InstructionDependency> + '_ {
        self.entries.iter()
    }

    /// Number of records (the program length).
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the matrix is empty.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every `(producer, consumer)` interloop pair.
    pub fn interloop_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.entries
            .iter()
            .flat_map(|d| d.interloop.iter().map(move |p| (*p, d.address)))
    }
}

impl fmt::Display for DependencyMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<4} | {:<24} | {:<24} | {:<24} | {:<24}",
            "addr", "local", "interloop", "invariant", "post-loop"
        )?;
        for dep in &self.entries {
            let cols = DependencyKind::ALL.map(|kind| {
                dep.of(kind)
                    .iter()
                    .map(|p| format!("{p:#x}"))
                    .collect::<Vec<_>>()
                    .join(",")
            });
            writeln!(
                f,
                "{:<4} | {:<24} | {:<24} | {:<24} | {:<24}",
                format!("{:#x}", dep.address),
                cols[0],
                cols[1],
                cols[2],
                cols[3]
            )?;
        }
        Ok(())
    }
}

/// Builds the dependency matrix of a program.
///
/// Only true consumers (instructions reading a register) get dependencies; every
/// other record is empty apart from its destination.
pub fn analyze(program: &Program) -> DependencyMatrix {
    let entries = program
        .instructions()
        .iter()
        .map(|inst| {
            let mut dep = InstructionDependency {
                address: inst.address,
                destination: inst.kind.destination(),
                ..InstructionDependency::default()
            };
            if inst.kind.is_true_consumer() {
                dep.local = local(program, inst);
                dep.interloop = interloop(program, inst);
                dep.invariant = invariant(program, inst);
                dep.post_loop = post_loop(program, inst);
            }
            dep
        })
        .collect();

    DependencyMatrix { entries }
}

fn addresses<'a>(producers: impl Iterator<Item = &'a Instruction>) -> Vec<usize> {
    producers.map(|p| p.address).collect()
}

fn local(program: &Program, consumer: &Instruction) -> Vec<usize> {
    let block = program.block_of(consumer.address);
    addresses(
        program
            .producers(block)
            .filter(|p| p.address < consumer.address && consumer.depends_on(p)),
    )
}

fn interloop(program: &Program, consumer: &Instruction) -> Vec<usize> {
    if program.block_of(consumer.address) != BasicBlock::Body {
        return Vec::new();
    }

    let candidates: Vec<&Instruction> = program
        .producers(BasicBlock::Prologue)
        .filter(|p| consumer.depends_on(p))
        .chain(
            program
                .producers(BasicBlock::Body)
                .filter(|p| p.address >= consumer.address && consumer.depends_on(p)),
        )
        .collect();

    // Only values defined on both sides of the back edge are carried.
    let loop_start = program.loop_start();
    let carried = |i: &Instruction| {
        candidates.iter().any(|o| {
            o.address != i.address
                && (i.address < loop_start) != (o.address < loop_start)
                && i.kind.destination() == o.kind.destination()
        })
    };
    addresses(candidates.iter().copied().filter(|&i| carried(i)))
}

fn invariant(program: &Program, consumer: &Instruction) -> Vec<usize> {
    if program.block_of(consumer.address) != BasicBlock::Body {
        return Vec::new();
    }

    let redefined = |reg: Option<Register>| {
        program
            .producers(BasicBlock::Body)
            .any(|p| p.kind.destination() == reg)
    };
    addresses(
        program
            .producers(BasicBlock::Prologue)
            .filter(|p| consumer.depends_on(p) && !redefined(p.kind.destination())),
    )
}

fn post_loop(program: &Program, consumer: &Instruction) -> Vec<usize> {
    if program.block_of(consumer.address) != BasicBlock::Epilogue {
        return Vec::new();
    }

    addresses(
        program
            .producers(BasicBlock::Body)
            .filter(|p| consumer.depends_on(p)),
    )
}
