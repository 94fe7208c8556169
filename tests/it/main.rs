//! Single test binary entry point.
//!
//! All tests compile into one binary to keep linking to a single pass.
//!
//! Structure:
//! - unit: single-component tests (grid store, CSV, settings, perf)
//! - integration: end-to-end load, plot and export workflows
