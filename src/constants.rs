//! Application-wide constants.
//!
//! Centralizes defaults and tuning values so the grid, the ingestion
//! pipeline and the extractor agree on them.

// ============================================================================
// Grid Defaults
// ============================================================================

/// Headers of the grid a fresh workbench starts with
pub const DEFAULT_HEADERS: [&str; 2] = ["Name", "Age"];

/// Number of empty rows in a fresh workbench grid
pub const DEFAULT_ROW_COUNT: usize = 3;

/// Prefix for synthesized column headers ("Col 0", "Col 1", ...)
pub const SYNTHETIC_COLUMN_PREFIX: &str = "Col";

/// Prefix for synthesized row series labels ("Row 0", ...)
pub const SYNTHETIC_ROW_PREFIX: &str = "Row";

// ============================================================================
// Ingestion
// ============================================================================

/// Rows per emitted chunk when nothing else is configured
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Encoding label used when none is declared
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Raw bytes pulled from the source per decode step
pub const DECODE_BUFFER_BYTES: usize = 8 * 1024;

/// Name given to ingestion worker threads
pub const INGEST_THREAD_NAME: &str = "gridplot-ingest";

// ============================================================================
// Plotting
// ============================================================================

/// Total width shared by one group of side-by-side bars
pub const BAR_GROUP_WIDTH: f64 = 0.8;

// ============================================================================
// Timing
// ============================================================================

/// Applying a chunk slower than this is logged as a warning
pub const SLOW_CHUNK_APPLY_MS: f64 = 50.0;

/// Extracting series slower than this is logged as a warning
pub const SLOW_EXTRACTION_MS: f64 = 100.0;
