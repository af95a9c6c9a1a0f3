//! Configuration for the scheduler.
//!
//! This module defines the machine and allocation parameters the scheduler works
//! against. It provides:
//! 1. **Defaults:** Baseline functional-unit counts and register-file layout.
//! 2. **Structures:** Machine resources, register layout, and scheduling limits.
//! 3. **Slot Mapping:** The fixed assignment of bundle slots to functional units.
//!
//! Configuration is supplied as JSON (`Config::from_json`) or taken from `Config::default()`.

use std::fmt;
use std::ops::Range;

use serde::Deserialize;

/// Default configuration constants.
///
/// These values describe the reference VLIW machine: five issue slots, two of
/// them ALUs, and a 96-entry register file whose upper two thirds rotate.
mod defaults {
    /// Number of ALU slots per bundle.
    pub const ALU_UNITS: usize = 2;

    /// Number of multiplier slots per bundle.
    pub const MUL_UNITS: usize = 1;

    /// Number of load/store slots per bundle.
    pub const MEM_UNITS: usize = 1;

    /// Number of branch slots per bundle.
    pub const BRANCH_UNITS: usize = 1;

    /// First allocatable simple register (`x0` is reserved).
    pub const SIMPLE_REGISTER_BASE: u32 = 1;

    /// First rotating register.
    ///
    /// In pipelined schedules the simple class ends here.
    pub const ROTATING_REGISTER_BASE: u32 = 32;

    /// Total number of general-purpose registers (`x0`..`x95`).
    pub const REGISTER_COUNT: u32 = 96;

    /// First rotating predicate register.
    pub const PREDICATE_BASE: u32 = 32;

    /// Number of rotating predicate registers.
    pub const PREDICATE_COUNT: u32 = 64;
}

/// Functional-unit classes of the machine.
///
/// Every instruction executes on exactly one class; the class decides which
/// bundle slots the instruction may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionalUnit {
    /// Integer ALU: add, sub, addi, mov and the loop-control moves.
    Alu,
    /// Multiplier: mulu.
    Mul,
    /// Load/store unit: ld, st.
    Mem,
    /// Branch unit: loop, loop.pip.
    Branch,
}

impl FunctionalUnit {
    /// All classes, in slot order.
    pub const ALL: [Self; 4] = [Self::Alu, Self::Mul, Self::Mem, Self::Branch];
}

impl fmt::Display for FunctionalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Alu => "ALU",
            Self::Mul => "MUL",
            Self::Mem => "MEM",
            Self::Branch => "BR",
        };
        f.write_str(name)
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Functional units and bundle layout.
    #[serde(default)]
    pub machine: MachineConfig,

    /// Register-file layout used by the allocator.
    #[serde(default)]
    pub registers: RegisterLayout,

    /// Limits for the scheduling search.
    #[serde(default)]
    pub scheduling: SchedulingConfig,
}

impl Config {
    /// Parses a configuration from JSON; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Functional-unit counts of the machine.
///
/// Slots are laid out class by class in [`FunctionalUnit::ALL`] order, so the
/// default machine has ALU slots 0 and 1, MUL slot 2, MEM slot 3 and BR slot 4.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MachineConfig {
    /// Number of ALU slots
    #[serde(default = "MachineConfig::default_alu_units")]
    pub alu_units: usize,

    /// Number of multiplier slots
    #[serde(default = "MachineConfig::default_mul_units")]
    pub mul_units: usize,

    /// Number of load/store slots
    #[serde(default = "MachineConfig::default_mem_units")]
    pub mem_units: usize,

    /// Number of branch slots
    #[serde(default = "MachineConfig::default_branch_units")]
    pub branch_units: usize,
}

impl MachineConfig {
    fn default_alu_units() -> usize {
        defaults::ALU_UNITS
    }

    fn default_mul_units() -> usize {
        defaults::MUL_UNITS
    }

    fn default_mem_units() -> usize {
        defaults::MEM_UNITS
    }

    fn default_branch_units() -> usize {
        defaults::BRANCH_UNITS
    }

    /// Number of units (and therefore slots) of one class.
    pub const fn units(&self, unit: FunctionalUnit) -> usize {
        match unit {
            FunctionalUnit::Alu => self.alu_units,
            FunctionalUnit::Mul => self.mul_units,
            FunctionalUnit::Mem => self.mem_units,
            FunctionalUnit::Branch => self.branch_units,
        }
    }

    /// Number of slots in every bundle.
    pub const fn pipeline_width(&self) -> usize {
        self.alu_units + self.mul_units + self.mem_units + self.branch_units
    }

    /// Slot indices belonging to one class, in ascending order.
    pub fn slots(&self, unit: FunctionalUnit) -> Range<usize> {
        let start: usize = FunctionalUnit::ALL
            .iter()
            .take_while(|u| **u != unit)
            .map(|u| self.units(*u))
            .sum();
        start..start + self.units(unit)
    }

    /// The class that owns a slot, or `None` past the end of the bundle.
    pub fn unit_of_slot(&self, slot: usize) -> Option<FunctionalUnit> {
        FunctionalUnit::ALL
            .into_iter()
            .find(|unit| self.slots(*unit).contains(&slot))
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            alu_units: defaults::ALU_UNITS,
            mul_units: defaults::MUL_UNITS,
            mem_units: defaults::MEM_UNITS,
            branch_units: defaults::BRANCH_UNITS,
        }
    }
}

/// Register numbering used by the allocator.
///
/// Simple registers count up from `simple_base`; rotating registers occupy
/// `[rotating_base, register_count)`; predicates count up from `predicate_base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RegisterLayout {
    /// First simple register
    #[serde(default = "RegisterLayout::default_simple_base")]
    pub simple_base: u32,

    /// First rotating register
    #[serde(default = "RegisterLayout::default_rotating_base")]
    pub rotating_base: u32,

    /// Total number of general-purpose registers
    #[serde(default = "RegisterLayout::default_register_count")]
    pub register_count: u32,

    /// First rotating predicate register
    #[serde(default = "RegisterLayout::default_predicate_base")]
    pub predicate_base: u32,

    /// Number of rotating predicate registers
    #[serde(default = "RegisterLayout::default_predicate_count")]
    pub predicate_count: u32,
}

impl RegisterLayout {
    fn default_simple_base() -> u32 {
        defaults::SIMPLE_REGISTER_BASE
    }

    fn default_rotating_base() -> u32 {
        defaults::ROTATING_REGISTER_BASE
    }

    fn default_register_count() -> u32 {
        defaults::REGISTER_COUNT
    }

    fn default_predicate_base() -> u32 {
        defaults::PREDICATE_BASE
    }

    fn default_predicate_count() -> u32 {
        defaults::PREDICATE_COUNT
    }

    /// Number of registers in the rotating class.
    pub const fn rotating_count(&self) -> u32 {
        self.register_count.saturating_sub(self.rotating_base)
    }
}

impl Default for RegisterLayout {
    fn default() -> Self {
        Self {
            simple_base: defaults::SIMPLE_REGISTER_BASE,
            rotating_base: defaults::ROTATING_REGISTER_BASE,
            register_count: defaults::REGISTER_COUNT,
            predicate_base: defaults::PREDICATE_BASE,
            predicate_count: defaults::PREDICATE_COUNT,
        }
    }
}

/// Limits for the initiation-interval search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SchedulingConfig {
    /// Largest II the pipelined scheduler may try. `None` derives the bound
    /// from the loop body (the sum of its latencies).
    #[serde(default)]
    pub max_initiation_interval: Option<usize>,
}
