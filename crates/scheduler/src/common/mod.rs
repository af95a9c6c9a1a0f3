//! Common types shared by every stage of the scheduler.
//!
//! This module provides the building blocks used from decoding through register
//! allocation. It includes:
//! 1. **Error Handling:** Decode, program, register and schedule failures.
//! 2. **Register Management:** Register classes and the per-run allocator.

/// Error types for every pipeline stage.
pub mod error;

/// Register classes and the register-name allocator.
pub mod reg;

pub use error::{DecodeError, Error, ProgramError, RegisterError, Result, ScheduleError};
pub use reg::{RegisterClass, RegisterFile};
