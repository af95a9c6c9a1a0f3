//! Bundle scheduling.
//!
//! This module packs instructions into VLIW bundles under resource and dependency
//! constraints. It provides:
//! 1. **Schedule Engine:** Bundle list, loop-region bookkeeping, bubble insertion
//!    with renumbering, and forced branch placement.
//! 2. **Placement Policy:** The [`Scheduler`] trait, shared ASAP placement driven by
//!    the dependency matrix.
//! 3. **Variants:** [`SequentialSchedule`] (straight-line) and [`PipelinedSchedule`]
//!    (modulo scheduling with an initiation-interval search).
//!
//! Instructions live in an arena owned by the [`Schedule`]. Ids below the program
//! length are the original addresses; instructions synthesized during allocation
//! (compensating moves, loop-control setup) are appended after them.

/// Fixed-width issue bundles.
pub mod bundle;

/// Modulo-scheduled (software-pipelined) variant.
pub mod pipelined;

/// Straight-line variant.
pub mod sequential;

use std::fmt;
use std::ops::Range;

use tracing::trace;

pub use bundle::{Bundle, InstrId, Slot};
pub use pipelined::PipelinedSchedule;
pub use sequential::SequentialSchedule;

use crate::analysis::DependencyMatrix;
use crate::common::error::ScheduleError;
use crate::config::{FunctionalUnit, MachineConfig};
use crate::isa::disasm::render;
use crate::isa::instruction::{Instruction, InstructionKind, Placement};
use crate::program::{BasicBlock, Program};

/// Which of the two schedules a [`Schedule`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
    /// Straight-line schedule closed by `loop`.
    Sequential,
    /// Modulo schedule closed by `loop.pip`.
    Pipelined,
}

/// Smallest initiation interval the machine's resources allow for the loop body.
///
/// For every functional-unit class, the body instructions that need it divided by
/// the class's unit count (rounded up). `nop` needs no unit and does not count.
/// Zero without a loop.
pub fn resource_bound(program: &Program, machine: &MachineConfig) -> usize {
    let body = program.block(BasicBlock::Body);
    if body.is_empty() {
        return 0;
    }

    FunctionalUnit::ALL
        .into_iter()
        .filter(|unit| machine.units(*unit) > 0)
        .map(|unit| {
            let count = body.iter().filter(|i| i.kind.unit() == Some(unit)).count();
            count.div_ceil(machine.units(unit))
        })
        .max()
        .unwrap_or(0)
}

/// Ordered bundles plus the instructions placed in them.
#[derive(Debug, Clone)]
pub struct Schedule {
    kind: ScheduleKind,
    machine: MachineConfig,
    instructions: Vec<Instruction>,
    regions: Vec<BasicBlock>,
    program_len: usize,
    has_loop: bool,
    bundles: Vec<Bundle>,
    loop_start: Option<usize>,
    loop_end: Option<usize>,
    ii: usize,
    ii_history: Vec<usize>,
    branch: Option<InstrId>,
}

impl Schedule {
    /// Creates an empty schedule for `program`.
    ///
    /// Fails if an instruction needs a functional-unit class the machine lacks.
    pub(crate) fn new(
        kind: ScheduleKind,
        program: &Program,
        machine: &MachineConfig,
    ) -> Result<Self, ScheduleError> {
        for inst in program.instructions() {
            if let Some(unit) = inst.kind.unit()
                && machine.units(unit) == 0
            {
                return Err(ScheduleError::MissingUnit {
                    address: inst.address,
                    unit,
                });
            }
        }

        let ii = resource_bound(program, machine);
        Ok(Self {
            kind,
            machine: machine.clone(),
            instructions: program.instructions().to_vec(),
            regions: program
                .instructions()
                .iter()
                .map(|i| program.block_of(i.address))
                .collect(),
            program_len: program.len(),
            has_loop: program.bounds().is_some(),
            bundles: Vec::new(),
            loop_start: None,
            loop_end: None,
            ii,
            ii_history: vec![ii],
            branch: None,
        })
    }

    /// Which schedule this is.
    pub const fn kind(&self) -> ScheduleKind {
        self.kind
    }

    /// Bundles in issue order.
    pub fn bundles(&self) -> &[Bundle] {
        &self.bundles
    }

    /// Number of bundles.
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Whether the schedule has no bundles.
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Slots per bundle.
    pub const fn width(&self) -> usize {
        self.machine.pipeline_width()
    }

    /// Machine the schedule was built for.
    pub const fn machine(&self) -> &MachineConfig {
        &self.machine
    }

    /// Instruction by arena id.
    pub fn instruction(&self, id: InstrId) -> Option<&Instruction> {
        self.instructions.get(id)
    }

    /// Every instruction, program instructions first.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions that came from the program.
    pub const fn program_len(&self) -> usize {
        self.program_len
    }

    /// Basic block an instruction belongs to.
    pub fn region(&self, id: InstrId) -> BasicBlock {
        self.regions
            .get(id)
            .copied()
            .unwrap_or(BasicBlock::Prologue)
    }

    /// Whether the program has a loop.
    pub const fn has_loop(&self) -> bool {
        self.has_loop
    }

    /// Bundle index of the first loop bundle, once the loop has been entered.
    pub const fn loop_start(&self) -> Option<usize> {
        self.loop_start
    }

    /// First bundle after the loop. Set once post-loop code is scheduled or the
    /// build finishes; `None` only for programs without a loop.
    pub const fn loop_end(&self) -> Option<usize> {
        self.loop_end
    }

    /// One past the last loop bundle: the loop end, or the bundle count while the
    /// loop is still open.
    pub fn loop_region_end(&self) -> usize {
        self.loop_end.unwrap_or(self.bundles.len())
    }

    /// Bundles between the starts of consecutive iterations.
    pub const fn initiation_interval(&self) -> usize {
        self.ii
    }

    /// Every II tried, in order; the last entry is the final one.
    pub fn ii_history(&self) -> &[usize] {
        &self.ii_history
    }

    /// Arena id of the loop branch, once placed.
    pub const fn branch(&self) -> Option<InstrId> {
        self.branch
    }

    /// Number of II-sized stages in the loop region.
    pub fn stage_count(&self) -> usize {
        match self.loop_start {
            Some(ls) if self.ii > 0 => (self.loop_region_end() - ls) / self.ii,
            _ => 0,
        }
    }

    /// Stage of a placed loop instruction, counted from the loop start.
    pub fn stage_of(&self, id: InstrId) -> Option<usize> {
        let ls = self.loop_start?;
        let bundle = self.instruction(id)?.bundle()?;
        if self.ii == 0 || bundle < ls {
            return None;
        }
        Some((bundle - ls) / self.ii)
    }

    /// Arena ids of placed instructions in bundle and slot order.
    pub fn placed(&self) -> impl Iterator<Item = InstrId> + '_ {
        self.bundles
            .iter()
            .flat_map(|b| b.instructions().map(|(_, id)| id))
    }

    /// Arena ids of instructions placed in `range` of bundles.
    pub fn placed_in(&self, range: Range<usize>) -> impl Iterator<Item = InstrId> + '_ {
        self.bundles
            .get(range)
            .unwrap_or_default()
            .iter()
            .flat_map(|b| b.instructions().map(|(_, id)| id))
    }

    /// Rendered listing: one row per bundle, `nop` for fillers.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.bundles
            .iter()
            .map(|b| {
                b.slots()
                    .iter()
                    .map(|slot| match slot.instruction().and_then(|id| self.instruction(id)) {
                        Some(inst) => render(inst),
                        None => InstructionKind::Nop.mnemonic().to_string(),
                    })
                    .collect()
            })
            .collect()
    }

    pub(crate) fn instruction_mut(&mut self, id: InstrId) -> Option<&mut Instruction> {
        self.instructions.get_mut(id)
    }

    /// Adds an instruction that is not part of the program and returns its id.
    pub(crate) fn push_instruction(&mut self, kind: InstructionKind, region: BasicBlock) -> InstrId {
        let id = self.instructions.len();
        self.instructions.push(Instruction::new(id, kind));
        self.regions.push(region);
        id
    }

    pub(crate) fn set_initiation_interval(&mut self, ii: usize) {
        self.ii = ii;
        self.ii_history.push(ii);
    }

    /// Slots the instruction may occupy.
    pub(crate) fn eligible_slots(&self, id: InstrId) -> Range<usize> {
        match self.instruction(id).and_then(|i| i.kind.unit()) {
            Some(unit) => self.machine.slots(unit),
            None => 0..self.width(),
        }
    }

    /// Lowest bundle the instruction's basic block allows.
    ///
    /// The first loop-body instruction opens the loop at the current end of the
    /// schedule; the first post-loop instruction closes it.
    pub(crate) fn block_lower_bound(&mut self, id: InstrId) -> usize {
        if !self.has_loop {
            return 0;
        }
        let len = self.bundles.len();
        match self.region(id) {
            BasicBlock::Prologue => 0,
            BasicBlock::Body => *self.loop_start.get_or_insert(len),
            BasicBlock::Epilogue => *self.loop_end.get_or_insert(len),
        }
    }

    /// Earliest bundle at which every already-placed earlier producer has its
    /// result ready.
    pub(crate) fn dependency_ready(&self, id: InstrId, deps: &DependencyMatrix) -> usize {
        let Some(address) = self.instruction(id).map(|i| i.address) else {
            return 0;
        };
        deps.get(address).map_or(0, |dep| {
            dep.all()
                .filter(|p| *p < address)
                .filter_map(|p| self.instruction(p).and_then(Instruction::ready_at))
                .max()
                .unwrap_or(0)
        })
    }

    /// Appends an empty bundle.
    pub(crate) fn append_bundle(&mut self) {
        self.bundles.push(Bundle::new(self.width()));
    }

    /// Inserts an empty bundle at `index`, shifting every later bundle down.
    ///
    /// Placements of shifted instructions are renumbered, and loop boundaries at
    /// or after `index` move with them. O(n) per insertion.
    pub(crate) fn insert_bubble(&mut self, index: usize) {
        let old_len = self.bundles.len();
        if index >= old_len {
            self.append_bundle();
            if let Some(le) = self.loop_end
                && index <= le
            {
                self.loop_end = Some(le + 1);
            }
            return;
        }

        self.bundles.insert(index, Bundle::new(self.width()));
        for b in index + 1..self.bundles.len() {
            let ids: Vec<InstrId> = self.bundles[b].instructions().map(|(_, id)| id).collect();
            for id in ids {
                if let Some(Placement { bundle, .. }) =
                    self.instructions.get_mut(id).and_then(|i| i.placement.as_mut())
                {
                    *bundle = b;
                }
            }
        }

        if let Some(ls) = self.loop_start
            && index <= ls
        {
            self.loop_start = Some(ls + 1);
            self.retarget_branch();
        }
        if let Some(le) = self.loop_end
            && index <= le
        {
            self.loop_end = Some(le + 1);
        }
    }

    /// Fixes the loop end at the current region end if no post-loop instruction
    /// has done so.
    pub(crate) fn close_loop(&mut self) {
        if self.has_loop && self.loop_start.is_some() && self.loop_end.is_none() {
            self.loop_end = Some(self.bundles.len());
        }
    }

    /// Grows the loop region by one bundle.
    pub(crate) fn push_down_loop_end(&mut self) {
        match self.loop_end {
            Some(le) => self.insert_bubble(le),
            None => self.append_bundle(),
        }
    }

    /// Places `id` in the first eligible free slot of bundle `index`.
    pub(crate) fn insert_into(&mut self, id: InstrId, index: usize) -> Option<usize> {
        let eligible = self.eligible_slots(id);
        let slot = self.bundles.get_mut(index)?.insert(id, eligible)?;
        if let Some(inst) = self.instructions.get_mut(id) {
            inst.placement = Some(Placement {
                bundle: index,
                slot,
            });
            trace!(address = inst.address, bundle = index, slot, "placed {inst}");
        }
        Some(slot)
    }

    /// Places `id` in bundle `index`, failing if no eligible slot is free.
    pub(crate) fn force_into(&mut self, id: InstrId, index: usize) -> Result<(), ScheduleError> {
        self.insert_into(id, index)
            .map(|_| ())
            .ok_or(ScheduleError::SlotUnavailable {
                address: self.instruction(id).map_or(id, |i| i.address),
                bundle: index,
            })
    }

    /// Takes a placed instruction out of its slot.
    pub(crate) fn remove(&mut self, id: InstrId) {
        let Some(placement) = self.instructions.get_mut(id).and_then(|i| i.placement.take()) else {
            return;
        };
        if let Some(bundle) = self.bundles.get_mut(placement.bundle) {
            bundle.clear(placement.slot);
        }
    }

    /// Places the loop branch in the branch slot of bundle `loop_start + II - 1`.
    ///
    /// The branch becomes `loop` or `loop.pip` targeting the loop-start bundle;
    /// bundles are appended until the loop holds at least `II` of them.
    pub(crate) fn place_branch(&mut self, id: InstrId) -> Result<(), ScheduleError> {
        let ls = self.block_lower_bound(id);
        self.branch = Some(id);
        self.retarget_branch();

        let ii = self.ii.max(1);
        while self.bundles.len() < ls + ii {
            self.append_bundle();
        }
        self.force_into(id, ls + ii - 1)
    }

    /// Moves the branch into bundle `index`.
    pub(crate) fn relocate_branch(&mut self, index: usize) -> Result<(), ScheduleError> {
        let Some(id) = self.branch else {
            return Ok(());
        };
        self.remove(id);
        self.force_into(id, index)
    }

    /// Points the branch at the current loop-start bundle.
    fn retarget_branch(&mut self) {
        let (Some(id), Some(target)) = (self.branch, self.loop_start) else {
            return;
        };
        let kind = match self.kind {
            ScheduleKind::Sequential => InstructionKind::Loop { target },
            ScheduleKind::Pipelined => InstructionKind::LoopPip { target },
        };
        if let Some(inst) = self.instructions.get_mut(id) {
            inst.kind = kind;
        }
    }

    /// Marks every slot at the same modulo-II offset as `id` in the loop region
    /// as reserved, so later iterations keep it.
    pub(crate) fn reserve_modulo_slots(&mut self, id: InstrId) {
        let (Some(ls), Some(placement)) = (
            self.loop_start,
            self.instruction(id).and_then(|i| i.placement),
        ) else {
            return;
        };
        let end = self.loop_region_end();
        if self.ii == 0 || placement.bundle < ls || placement.bundle >= end {
            return;
        }

        let offset = (placement.bundle - ls) % self.ii;
        for b in (ls + offset..end).step_by(self.ii) {
            if b != placement.bundle {
                self.bundles[b].reserve(placement.slot);
            }
        }
    }

    /// Discards the loop region and every placement in it, keeping prologue bundles.
    pub(crate) fn discard_loop(&mut self) {
        let Some(ls) = self.loop_start else {
            return;
        };
        self.bundles.truncate(ls);
        self.loop_end = None;
        for (inst, region) in self.instructions.iter_mut().zip(&self.regions) {
            if *region != BasicBlock::Prologue {
                inst.placement = None;
            }
        }
    }

    /// Folds the loop region onto its first `II` bundles.
    ///
    /// Each instruction at loop offset `k` moves to offset `k mod II` in the same
    /// slot; the emptied bundles are removed and later bundles renumbered.
    pub(crate) fn collapse_loop(&mut self) -> Result<(), ScheduleError> {
        let Some(ls) = self.loop_start else {
            return Ok(());
        };
        if self.ii == 0 {
            return Ok(());
        }
        let end = self.loop_region_end();
        let kernel_end = ls + self.ii;
        if end <= kernel_end {
            return Ok(());
        }

        for b in kernel_end..end {
            let moved: Vec<(usize, InstrId)> = self.bundles[b].instructions().collect();
            let target = ls + (b - ls) % self.ii;
            for (slot, id) in moved {
                let unavailable = ScheduleError::SlotUnavailable {
                    address: self.instruction(id).map_or(id, |i| i.address),
                    bundle: target,
                };
                if !matches!(self.bundles[target].slot(slot), Some(Slot::Free { .. })) {
                    return Err(unavailable);
                }
                self.bundles[b].clear(slot);
                self.bundles[target].clear(slot);
                if !self.bundles[target].insert_at(id, slot) {
                    return Err(unavailable);
                }
                if let Some(inst) = self.instructions.get_mut(id) {
                    inst.placement = Some(Placement {
                        bundle: target,
                        slot,
                    });
                }
            }
        }

        let _ = self.bundles.drain(kernel_end..end);
        let removed = end - kernel_end;
        for inst in &mut self.instructions {
            if let Some(p) = inst.placement.as_mut()
                && p.bundle >= end
            {
                p.bundle -= removed;
            }
        }
        for bundle in &mut self.bundles[ls..kernel_end] {
            bundle.clear_reservations();
        }
        self.loop_end = Some(kernel_end);
        Ok(())
    }
}

impl fmt::Display for Schedule {
    /// Bundle table; in a pipelined schedule, stage boundaries of the loop are
    /// marked with a rule.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.rows();
        for (index, row) in rows.iter().enumerate() {
            if self.kind == ScheduleKind::Pipelined
                && let Some(ls) = self.loop_start
                && self.ii > 0
                && index >= ls
                && index <= self.loop_region_end()
                && (index - ls) % self.ii == 0
            {
                writeln!(f, "{}", "-".repeat(24 * self.width()))?;
            }
            write!(f, "{index:<3}")?;
            for cell in row {
                write!(f, " | {cell:<20}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Placement policy shared by both schedule variants.
///
/// Implementors decide how a loop grows when an instruction does not fit; the
/// ASAP search itself is common.
pub trait Scheduler {
    /// The schedule being built.
    fn schedule(&self) -> &Schedule;

    /// Mutable access to the schedule being built.
    fn schedule_mut(&mut self) -> &mut Schedule;

    /// Tries to place `id` in bundle `index`, growing the bundle list (and the
    /// loop) as needed.
    ///
    /// # Returns
    ///
    /// `true` if the instruction now occupies a slot of bundle `index`.
    fn try_place(&mut self, id: InstrId, index: usize) -> bool;

    /// Scans forward from `lower_bound` until `id` is placed.
    fn place_from(&mut self, id: InstrId, lower_bound: usize) {
        let mut index = lower_bound;
        while !self.try_place(id, index) {
            index += 1;
        }
    }

    /// Places one program instruction at the earliest bundle its basic block and
    /// its dependencies allow; the branch goes to its fixed slot.
    fn schedule_instruction(
        &mut self,
        id: InstrId,
        deps: &DependencyMatrix,
    ) -> Result<(), ScheduleError> {
        let is_branch = self
            .schedule()
            .instruction(id)
            .is_some_and(|i| i.kind.is_branch());
        if is_branch {
            return self.schedule_mut().place_branch(id);
        }

        let block = self.schedule_mut().block_lower_bound(id);
        let ready = self.schedule().dependency_ready(id, deps);
        self.place_from(id, block.max(ready));
        Ok(())
    }
}
