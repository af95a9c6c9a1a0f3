//! Schedule emission.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::common::error::{Error, Result};
use crate::schedule::Schedule;

/// Converts a schedule into a JSON array of bundles.
///
/// Every bundle is an array of `PIPELINE_WIDTH` rendered instructions, with
/// `nop` for empty slots.
pub fn to_json(schedule: &Schedule) -> Value {
    Value::Array(
        schedule
            .rows()
            .into_iter()
            .map(|row| Value::Array(row.into_iter().map(Value::String).collect()))
            .collect(),
    )
}

/// Writes a schedule to `path` as pretty-printed JSON.
pub fn write_schedule(schedule: &Schedule, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(&to_json(schedule))?;
    fs::write(path, text).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bundles = schedule.len(), "wrote schedule");
    Ok(())
}
