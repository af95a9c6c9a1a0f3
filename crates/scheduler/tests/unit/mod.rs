//! # Unit Components
//!
//! This module mirrors the library's module tree: instruction set, program
//! model, dependency analysis, scheduling, allocation and I/O.

/// Unit tests for the register file and error types.
pub mod common;


/// Unit tests for the instruction set.
///
/// This module aggregates tests for:
/// - Decoding every instruction form and rejecting malformed text.
/// - Rendering, including predicate guards and allocated registers.
pub mod isa;




/// Unit tests for register allocation and loop preparation.
pub mod alloc;

/// End-to-end tests for the driver and JSON I/O.
pub mod driver;
