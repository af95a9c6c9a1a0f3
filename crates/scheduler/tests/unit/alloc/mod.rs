//! Register allocation tests.

/// Simple-register allocation and compensating moves.
pub mod sequential;

/// Rotating registers, stage predicates, and loop setup.
pub mod pipelined;
