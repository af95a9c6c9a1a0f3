//! Instruction set tests.
