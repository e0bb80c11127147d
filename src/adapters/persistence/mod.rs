//! Persistence Adapters - Report Files
//!
//! Implements the `ReportSink` port with CSV and JSON writers. Every file
//! is written atomically (tmp file, then rename), so a crashed run never
//! leaves a half-written report behind.

pub mod csv_report;
pub mod json_report;

pub use csv_report::{CsvLayout, CsvReportWriter};
pub use json_report::JsonReportWriter;

use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;

/// Write `contents` to `path` via a sibling `.tmp` file and rename.
///
/// Creates the parent directory if it doesn't exist.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");

    fs::write(&tmp, contents)
        .await
        .with_context(|| format!("Failed to write tmp file for {}", path.display()))?;

    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to rename into {}", path.display()))?;

    Ok(())
}
