//! Program loading.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::common::error::{Error, Result};
use crate::program::Program;

/// Reads a program from a JSON file holding an array of instruction strings.
///
/// # Arguments
///
/// * `path` - Path to the JSON file.
///
/// # Returns
///
/// The decoded program; each instruction's address is its index in the array.
pub fn load_program(path: impl AsRef<Path>) -> Result<Program> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let program = parse_program(&text)?;
    debug!(path = %path.display(), instructions = program.len(), "loaded program");
    Ok(program)
}

/// Decodes a program from JSON text.
pub fn parse_program(text: &str) -> Result<Program> {
    let lines: Vec<String> = serde_json::from_str(text)?;
    Program::from_lines(lines)
}
