//! Unit tests for perf module.

use gridplot::perf::{LoadStats, ScopedTimer, format_row_count, measure};

#[test]
fn test_scoped_timer_creation() {
    // High threshold: dropping must not warn or panic
    let timer = ScopedTimer::new("test_op", 1000.0);
    assert_eq!(timer.name(), "test_op");
    assert!(timer.elapsed_ms() >= 0.0);
}

#[test]
fn test_measure_returns_result() {
    let (value, elapsed) = measure(|| 6 * 7);
    assert_eq!(value, 42);
    assert!(elapsed >= 0.0);
}

#[test]
fn test_load_stats_empty() {
    let stats = LoadStats::new();
    assert_eq!(stats.rows(), 0);
    assert_eq!(stats.average_apply_ms(), 0.0);
    assert!(stats.rows_per_second() >= 0.0);
}

#[test]
fn test_load_stats_keeps_recent_samples() {
    let mut stats = LoadStats::new();
    for _ in 0..100 {
        stats.record_chunk(10, 1.0);
    }
    stats.record_chunk(10, 9.0);

    assert_eq!(stats.rows(), 1010);
    assert_eq!(stats.chunks(), 101);
    assert_eq!(stats.max_apply_ms(), 9.0);
    assert!(stats.average_apply_ms() > 1.0);
}

#[test]
fn test_format_row_count_boundaries() {
    assert_eq!(format_row_count(0), "0 rows");
    assert_eq!(format_row_count(999), "999 rows");
    assert_eq!(format_row_count(1000), "1.0K rows");
    assert_eq!(format_row_count(1_000_000), "1.0M rows");
}
