//! Inference latency benchmark.
//!
//! Classifies one preprocessed tensor repeatedly: a few untimed warm-up runs,
//! then a timed loop. Reports the mean latency and the predicted digit.

use std::time::Instant;

use crate::classifier::{ClassifierAdapter, ClassifierError, Digit};
use crate::preprocess::NormalizedTensor;

/// Outcome of a benchmark run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BenchmarkReport {
    /// Number of timed runs
    pub runs: u32,
    /// Mean latency per classification, in milliseconds
    pub avg_ms: f64,
    /// Digit predicted after the timed loop
    pub digit: Digit,
}

/// Runs `warmup_runs` untimed and `runs` timed classifications of `tensor`.
pub fn run_benchmark(
    adapter: &ClassifierAdapter,
    tensor: &NormalizedTensor,
    warmup_runs: u32,
    runs: u32,
) -> Result<BenchmarkReport, ClassifierError> {
    for _ in 0..warmup_runs {
        adapter.classify(tensor)?;
    }

    let start = Instant::now();
    for _ in 0..runs {
        adapter.classify(tensor)?;
    }
    let elapsed = start.elapsed();

    let avg_ms = if runs == 0 {
        0.0
    } else {
        elapsed.as_secs_f64() * 1000.0 / runs as f64
    };

    let digit = adapter.classify(tensor)?.argmax();

    crate::log(&format!(
        "Benchmark: {} runs, avg {:.3} ms, predicted digit {}",
        runs, avg_ms, digit
    ));

    Ok(BenchmarkReport {
        runs,
        avg_ms,
        digit,
    })
}
