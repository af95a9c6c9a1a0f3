//! Issue bundles.
//!
//! A bundle is one VLIW issue group: a fixed number of slots, each bound to a
//! functional-unit class by the machine configuration. Slots hold either an
//! instruction (by arena id) or a filler `nop`, which may be reserved for a
//! later iteration of a pipelined loop.

use std::ops::Range;

/// Index of an instruction in a schedule's arena.
pub type InstrId = usize;

/// Content of one bundle slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Filler `nop`. A reserved filler belongs to an overlapping iteration and
    /// must not be handed out.
    Free {
        /// Whether the slot is promised to another iteration.
        reserved: bool,
    },
    /// Real instruction.
    Occupied(InstrId),
}

impl Slot {
    /// Whether an instruction may be placed here.
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Free { reserved: false })
    }

    /// Instruction in the slot, if any.
    pub const fn instruction(self) -> Option<InstrId> {
        match self {
            Self::Occupied(id) => Some(id),
            Self::Free { .. } => None,
        }
    }
}

/// One issue group of the schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    slots: Vec<Slot>,
}

impl Bundle {
    /// Creates a bundle of `width` unreserved fillers.
    pub fn new(width: usize) -> Self {
        Self {
            slots: vec![Slot::Free { reserved: false }; width],
        }
    }

    /// All slots in order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Number of slots.
    pub fn width(&self) -> usize {
        self.slots.len()
    }

    /// Content of one slot.
    pub fn slot(&self, index: usize) -> Option<Slot> {
        self.slots.get(index).copied()
    }

    /// Real instructions in the bundle with their slot index.
    pub fn instructions(&self) -> impl Iterator<Item = (usize, InstrId)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, s)| s.instruction().map(|id| (slot, id)))
    }

    /// Places `id` in the first available slot of `eligible`.
    ///
    /// # Returns
    ///
    /// The chosen slot, or `None` (without mutation) if every eligible slot is
    /// taken or reserved.
    pub fn insert(&mut self, id: InstrId, eligible: Range<usize>) -> Option<usize> {
        let slot = eligible
            .into_iter()
            .find(|s| self.slots.get(*s).is_some_and(|slot| slot.is_available()))?;
        self.slots[slot] = Slot::Occupied(id);
        Some(slot)
    }

    /// Places `id` in exactly `slot`, if it is available.
    pub fn insert_at(&mut self, id: InstrId, slot: usize) -> bool {
        match self.slots.get_mut(slot) {
            Some(s) if s.is_available() => {
                *s = Slot::Occupied(id);
                true
            }
            _ => false,
        }
    }

    /// Marks a filler slot as promised to another iteration.
    pub fn reserve(&mut self, slot: usize) {
        if let Some(Slot::Free { reserved }) = self.slots.get_mut(slot) {
            *reserved = true;
        }
    }

    /// Turns a slot back into an unreserved filler.
    pub fn clear(&mut self, slot: usize) {
        if let Some(s) = self.slots.get_mut(slot) {
            *s = Slot::Free { reserved: false };
        }
    }

    /// Drops every reservation, keeping real instructions.
    pub fn clear_reservations(&mut self) {
        for s in &mut self.slots {
            if let Slot::Free { reserved } = s {
                *reserved = false;
            }
        }
    }
}
