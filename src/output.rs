//! JSON output writing.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// Write records as a pretty-printed UTF-8 JSON array.
///
/// The document is fully serialized in memory before anything touches the
/// filesystem, so a failed run never leaves a truncated output file.
/// Non-ASCII text is written literally, not escaped.
pub fn write_records<T: Serialize, P: AsRef<Path>>(path: P, records: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(records).context("Failed to serialize records")?;
    fs::write(path.as_ref(), json)
        .with_context(|| format!("Failed to write {}", path.as_ref().display()))?;
    Ok(())
}
