//! Digit Volume
//!
//! Turns three hand-drawn digits into a playback volume. Ink from each of the
//! three surfaces is cropped, centered and downscaled into a 28x28 tensor,
//! classified by a pre-trained ONNX model, and the three predicted digits are
//! read as a percentage clamped to 100.

pub mod benchmark;
pub mod classifier;
pub mod config;
pub mod history;
pub mod ink;
pub mod paths;
pub mod predict;
pub mod preprocess;
pub mod session;

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;

/// Number of ink surfaces (one per digit of the volume).
pub const SLOT_COUNT: usize = 3;

/// Prints `msg` with a millisecond timestamp and appends it to the log file.
///
/// Logging never fails the caller; a log file that cannot be opened is skipped.
pub fn log(msg: &str) {
    let line = format!("[{}] {}", Local::now().format("%H:%M:%S%.3f"), msg);
    println!("{}", line);

    let _ = OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths::get_log_file())
        .and_then(|mut file| writeln!(file, "{}", line));
}
