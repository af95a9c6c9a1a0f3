//! Program analysis.
//!
//! Contains the register dependency analysis the schedulers and the register
//! allocator are driven by.

/// Dependency classification (local, interloop, loop-invariant, post-loop).
pub mod dependency;

pub use dependency::{analyze, DependencyKind, DependencyMatrix, InstructionDependency};
