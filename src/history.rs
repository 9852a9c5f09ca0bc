//! CSV log of successful predictions.
//!
//! Append-only: every row is written by reopening the file, so results are
//! kept even if the process dies later.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::predict::Prediction;

/// CSV header row.
const CSV_HEADER: &str = "timestamp,slot1,slot2,slot3,volume";

/// Default history location: `<output_dir>/predictions.csv`
pub fn default_history_path() -> PathBuf {
    crate::paths::get_output_dir().join("predictions.csv")
}

/// Writes the header row unless the file already has content.
///
/// Existing rows are never touched.
pub fn init_csv(path: &Path) -> Result<()> {
    let has_content = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
    if has_content {
        return Ok(());
    }

    fs::write(path, format!("{}\n", CSV_HEADER))
        .with_context(|| format!("Failed to write CSV header to {}", path.display()))
}

/// Appends one prediction row.
pub fn append_prediction(
    path: &Path,
    prediction: &Prediction,
    predicted_at: DateTime<Local>,
) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open CSV for append")?;

    // Format: timestamp,slot1,slot2,slot3,volume
    let line = format!(
        "{},{},{},{},{}",
        predicted_at.format("%Y-%m-%dT%H:%M:%S"),
        prediction.digits[0],
        prediction.digits[1],
        prediction.digits[2],
        prediction.volume.value(),
    );

    writeln!(file, "{}", line).context("Failed to write CSV row")?;
    Ok(())
}
