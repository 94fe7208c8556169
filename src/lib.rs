//! gridplot: a spreadsheet-style data grid with attached plotting.
//!
//! The crate has two engines:
//!
//! - a streaming, cancellable CSV ingestion pipeline ([`data::IngestionJob`])
//!   that loads delimited text into the grid on a worker thread, and
//! - a series extractor ([`data::extract_series`]) that turns a selection or
//!   an axis/index choice into aligned numeric series for a renderer.
//!
//! [`Workbench`] ties them together around a single-writer [`data::GridStore`].
//! Rendering, dialogs and any chat front end are left to the caller.

pub mod constants;
pub mod data;
pub mod perf;
pub mod settings;
pub mod settings_watcher;
pub mod types;
pub mod workbench;

pub use settings::Settings;
pub use types::{AxisMode, AxisSpec, Grid, PlotKind, PlotSource, Selection, SelectionShape};
pub use workbench::{PlotSelection, Workbench};
