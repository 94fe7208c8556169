//! Data handling module
//!
//! Everything between a delimited-text source and a plottable series:
//!
//! - `GridStore`: single-writer owner of the grid, with change notifications
//! - `csv_parser`: incremental, encoding-aware CSV reading and CSV export
//! - `ingest`: the background load pipeline and its owner-side applier
//! - `chart_engine`: series extraction from grid snapshots
//!
//! ## Error Handling
//!
//! All data operations return `DataResult<T>` which uses the `DataError` type.
//! Common errors include:
//! - `OutOfRange`: grid read or mutation outside the current bounds
//! - `InvalidIndex`: extraction against a row/column that does not exist
//! - `Io`/`Decode`: unreadable or undecodable source
//! - `InvalidOptions`/`UnknownEncoding`: a load rejected before it starts

mod chart_engine;
mod csv_parser;
mod error;
mod grid_store;
mod ingest;

pub use chart_engine::*;
pub use csv_parser::*;
pub use error::*;
pub use grid_store::*;
pub use ingest::*;
