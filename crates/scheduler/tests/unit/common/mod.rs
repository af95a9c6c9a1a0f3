//! Common component tests.
//!
//! This module contains unit tests for the register file and the error types.
