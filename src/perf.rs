//! Performance monitoring utilities.
//!
//! Scoped timers for the hot paths (applying ingestion chunks, extracting
//! series) and running statistics for a load in progress.
//!
//! Build with the `profiling` feature to trace every timed scope instead of
//! only the slow ones:
//! ```toml
//! [dependencies]
//! gridplot = { features = ["profiling"] }
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Number of recent chunk timings kept for averages
const SAMPLE_COUNT: usize = 64;

// ============================================================================
// Scoped Timer
// ============================================================================

/// A scoped timer that logs its duration on drop.
///
/// Exceeding the threshold logs a warning. With the `profiling` feature every
/// timer is also traced.
pub struct ScopedTimer {
    name: &'static str,
    start: Instant,
    threshold_ms: f64,
}

impl ScopedTimer {
    /// Create a new scoped timer with a warning threshold.
    pub fn new(name: &'static str, threshold_ms: f64) -> Self {
        Self {
            name,
            start: Instant::now(),
            threshold_ms,
        }
    }

    /// Get elapsed time without stopping the timer.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed_ms();

        if cfg!(feature = "profiling") {
            trace!("[PERF] {}: {:.2}ms", self.name, elapsed_ms);
        }

        if elapsed_ms > self.threshold_ms {
            warn!(
                operation = self.name,
                elapsed_ms = format!("{:.2}", elapsed_ms),
                threshold_ms = format!("{:.2}", self.threshold_ms),
                "Slow operation"
            );
        }
    }
}

/// Measure execution time of a closure and return both the result and elapsed time.
#[inline]
pub fn measure<T, F: FnOnce() -> T>(f: F) -> (T, f64) {
    let start = Instant::now();
    let result = f();
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    (result, elapsed_ms)
}

// ============================================================================
// Load Statistics
// ============================================================================

/// Running statistics for one ingestion job, as seen by the owner applying it.
#[derive(Debug, Clone)]
pub struct LoadStats {
    started: Instant,
    rows: usize,
    chunks: usize,
    apply_samples: VecDeque<f64>,
    max_apply_ms: f64,
}

impl Default for LoadStats {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            rows: 0,
            chunks: 0,
            apply_samples: VecDeque::with_capacity(SAMPLE_COUNT),
            max_apply_ms: 0.0,
        }
    }

    /// Record one applied chunk of `rows` rows that took `apply_ms` to apply.
    pub fn record_chunk(&mut self, rows: usize, apply_ms: f64) {
        if self.apply_samples.len() >= SAMPLE_COUNT {
            self.apply_samples.pop_front();
        }
        self.apply_samples.push_back(apply_ms);
        self.rows += rows;
        self.chunks += 1;
        self.max_apply_ms = self.max_apply_ms.max(apply_ms);
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Average time to apply a chunk over recent samples.
    pub fn average_apply_ms(&self) -> f64 {
        if self.apply_samples.is_empty() {
            return 0.0;
        }
        self.apply_samples.iter().sum::<f64>() / self.apply_samples.len() as f64
    }

    pub fn max_apply_ms(&self) -> f64 {
        self.max_apply_ms
    }

    /// Rows applied per second since the load started.
    pub fn rows_per_second(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.rows as f64 / secs
    }
}

/// Format row count for display (e.g., "1.2M rows")
pub fn format_row_count(count: usize) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M rows", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K rows", count as f64 / 1_000.0)
    } else {
        format!("{} rows", count)
    }
}
