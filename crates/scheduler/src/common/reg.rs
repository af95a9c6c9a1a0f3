//! Register Naming.
//!
//! This module provides the `RegisterFile` allocator that hands out concrete register
//! names after scheduling. It provides:
//! 1. **Register Classes:** Simple, rotating, and rotating-predicate name spaces.
//! 2. **Allocation:** Monotonic counters per class with capacity checks.
//! 3. **Rotation:** Stage-offset arithmetic that wraps inside the rotating class.
//!
//! A fresh `RegisterFile` is built for every scheduling run, so sequential and
//! pipelined runs never share counters.

use std::fmt;

use super::error::RegisterError;
use crate::config::RegisterLayout;

/// The three register name spaces the allocator draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterClass {
    /// Plain general-purpose registers, never renamed by the hardware.
    Simple,
    /// General-purpose registers renamed by one position per loop stage.
    Rotating,
    /// Rotating predicate registers guarding pipeline stages.
    Predicate,
}

impl fmt::Display for RegisterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Simple => "simple",
            Self::Rotating => "rotating",
            Self::Predicate => "predicate",
        };
        f.write_str(name)
    }
}

/// Allocator state for one scheduling run.
///
/// Counters only move forward; `reset` returns them to their bases.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    layout: RegisterLayout,
    simple_limit: u32,
    next_simple: u32,
    next_rotating: u32,
    next_predicate: u32,
}

impl RegisterFile {
    /// Creates an allocator for a pipelined run.
    ///
    /// Simple registers end where the rotating class begins.
    pub const fn new(layout: RegisterLayout) -> Self {
        Self::with_simple_limit(layout, layout.rotating_base)
    }

    /// Creates an allocator for a run without rotating registers.
    ///
    /// The simple class extends over the whole register file.
    pub const fn without_rotation(layout: RegisterLayout) -> Self {
        Self::with_simple_limit(layout, layout.register_count)
    }

    const fn with_simple_limit(layout: RegisterLayout, simple_limit: u32) -> Self {
        Self {
            layout,
            simple_limit,
            next_simple: layout.simple_base,
            next_rotating: layout.rotating_base,
            next_predicate: layout.predicate_base,
        }
    }

    /// Returns the layout this allocator was built from.
    pub const fn layout(&self) -> &RegisterLayout {
        &self.layout
    }

    /// Returns the next simple register.
    ///
    /// # Returns
    ///
    /// The register number, or `RegisterError::Exhausted` once the class is full.
    pub fn fresh_simple(&mut self) -> Result<u32, RegisterError> {
        if self.next_simple >= self.simple_limit {
            return Err(RegisterError::Exhausted {
                class: RegisterClass::Simple,
                limit: self.simple_limit,
            });
        }
        let reg = self.next_simple;
        self.next_simple += 1;
        Ok(reg)
    }

    /// Returns the next rotating register and reserves room for `stages` rotations.
    ///
    /// The counter advances by `stages + 1` so that every stage of the value's
    /// lifetime, plus the copy read by the next iteration, has its own name. When
    /// the counter runs past the class it wraps back into it.
    ///
    /// # Arguments
    ///
    /// * `stages` - Number of stages of the pipelined loop.
    pub fn fresh_rotating(&mut self, stages: usize) -> Result<u32, RegisterError> {
        let size = self.layout.rotating_count();
        if size == 0 {
            return Err(RegisterError::Exhausted {
                class: RegisterClass::Rotating,
                limit: self.layout.register_count,
            });
        }

        let reg = self.next_rotating;
        let base = self.layout.rotating_base;
        let advanced = u64::from(self.next_rotating) + stages as u64 + 1;
        self.next_rotating = if advanced >= u64::from(self.layout.register_count) {
            ((advanced - u64::from(base)) % u64::from(size)) as u32 + base
        } else {
            advanced as u32
        };
        Ok(reg)
    }

    /// Returns the next rotating predicate register.
    pub fn fresh_predicate(&mut self) -> Result<u32, RegisterError> {
        let limit = self.layout.predicate_base + self.layout.predicate_count;
        if self.next_predicate >= limit {
            return Err(RegisterError::Exhausted {
                class: RegisterClass::Predicate,
                limit,
            });
        }
        let reg = self.next_predicate;
        self.next_predicate += 1;
        Ok(reg)
    }

    /// Names the register `offset` rotations away from `reg`.
    ///
    /// The result wraps inside `[rotating_base, register_count)`.
    pub fn rotate(&self, reg: u32, offset: i64) -> u32 {
        let size = i64::from(self.layout.rotating_count());
        if size == 0 {
            return reg;
        }
        let base = i64::from(self.layout.rotating_base);
        ((i64::from(reg) - base + offset).rem_euclid(size) + base) as u32
    }

    /// Restores every counter to its base.
    pub const fn reset(&mut self) {
        self.next_simple = self.layout.simple_base;
        self.next_rotating = self.layout.rotating_base;
        self.next_predicate = self.layout.predicate_base;
    }
}
