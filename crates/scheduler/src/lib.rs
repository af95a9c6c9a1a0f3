//! Offline VLIW instruction scheduler.
//!
//! This crate turns a small straight-line program with at most one counted loop
//! into bundle-by-bundle VLIW schedules, with the following:
//! 1. **ISA:** Decoding, the instruction model, and rendering back to text.
//! 2. **Analysis:** Local, interloop, loop-invariant and post-loop dependencies.
//! 3. **Scheduling:** A sequential schedule and a modulo-scheduled (software
//!    pipelined) one with an initiation-interval search.
//! 4. **Allocation:** Simple registers for the sequential schedule; rotating
//!    registers, stage predicates and loop collapse for the pipelined one.
//! 5. **I/O:** JSON programs in, JSON bundle listings out.
//!
//! ```
//! use modsched_core::{Config, Program, schedule_program};
//!
//! let program = Program::from_lines(["mov x1, 5", "add x2, x1, x1"]).unwrap();
//! let schedules = schedule_program(&program, &Config::default()).unwrap();
//! assert_eq!(schedules.sequential.len(), 2);
//! ```

/// Register allocation for both schedule kinds.
pub mod alloc;
/// Dependency analysis.
pub mod analysis;
/// Register classes, the register file, and error types.
pub mod common;
/// Machine, register-layout and scheduling configuration.
pub mod config;
/// Analysis, scheduling and allocation end to end.
pub mod driver;
/// JSON loading and emission.
pub mod io;
/// Instruction set (instruction model, decoder, renderer).
pub mod isa;
/// Decoded programs and their basic blocks.
pub mod program;
/// Bundles and the two schedule variants.
pub mod schedule;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Crate-level error and result types.
pub use crate::common::error::{Error, Result};
/// End-to-end entry point and its output.
pub use crate::driver::{Schedules, schedule_program};
/// Decoded program; construct with `Program::from_lines` or `io::load_program`.
pub use crate::program::Program;
/// A finished schedule.
pub use crate::schedule::Schedule;
