//! JSON input and output.
//!
//! Programs arrive as a JSON array of instruction strings; schedules leave as a
//! JSON array of bundles, each an array of rendered slots.

/// Program loading.
pub mod loader;

/// Schedule emission.
pub mod writer;

pub use loader::{load_program, parse_program};
pub use writer::{to_json, write_schedule};
