//! Series extraction engine
//!
//! Turns "which part of the grid, viewed how" into numeric series ready for a
//! renderer. Extraction always runs against an immutable [`Grid`] snapshot, so
//! it never observes a load or edit in progress.
//!
//! Every rule shares one coercion policy: a cell is usable when its trimmed
//! text parses as a finite decimal number. Unusable cells are skipped and the
//! remaining points compact toward the start of the series (no gaps).

use crate::constants::{BAR_GROUP_WIDTH, SLOW_EXTRACTION_MS};
use crate::data::error::{Axis, DataError, DataResult};
use crate::perf::ScopedTimer;
use crate::types::{
    AxisMode, AxisSpec, Grid, PlotKind, PlotSource, Selection, SelectionShape, synthetic_header,
    synthetic_row_label,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// One plotted value
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Display label on the position axis
    pub label: String,
    pub value: f64,
    /// Position on the x axis
    pub position: f64,
    /// Absolute grid row (column-wise series) or column (row-wise series)
    pub source: usize,
}

/// A labeled sequence of points
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn positions(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.position).collect()
    }
}

/// A labeled mark on the position axis
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AxisTick {
    pub position: f64,
    pub label: String,
}

/// Horizontal placement of one series in a grouped bar chart
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BarGroup {
    pub series_index: usize,
    pub width: f64,
    /// One bar center per point, in point order
    pub offsets: Vec<f64>,
}

/// Extracted series plus the hints a renderer needs to draw them
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeriesSet {
    pub kind: PlotKind,
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub series: Vec<Series>,
    pub ticks: Vec<AxisTick>,
}

impl SeriesSet {
    /// Grouped bar layout using the default group width
    pub fn bar_layout(&self) -> Vec<BarGroup> {
        self.bar_layout_with(BAR_GROUP_WIDTH)
    }

    /// Grouped bar layout: `n` series share `group_width` around each position,
    /// so bars for the same position sit side by side.
    pub fn bar_layout_with(&self, group_width: f64) -> Vec<BarGroup> {
        let n = self.series.len().max(1);
        let width = group_width / n as f64;
        let half = group_width / 2.0;

        self.series
            .iter()
            .enumerate()
            .map(|(j, series)| BarGroup {
                series_index: j,
                width,
                offsets: series
                    .points
                    .iter()
                    .map(|p| p.position - half + j as f64 * width + width / 2.0)
                    .collect(),
            })
            .collect()
    }

    /// Minimum and maximum value across all series
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut values = self.series.iter().flat_map(|s| s.points.iter().map(|p| p.value));
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    pub fn tick_labels(&self) -> Vec<&str> {
        self.ticks.iter().map(|t| t.label.as_str()).collect()
    }

    pub fn point_count(&self) -> usize {
        self.series.iter().map(Series::len).sum()
    }
}

/// Why an extraction produced nothing to draw
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EmptyReason {
    /// Selection mode with no selection
    NoSelection,
    /// Every cell in scope was unusable
    NoNumericData,
}

impl EmptyReason {
    pub fn message(&self) -> &'static str {
        match self {
            EmptyReason::NoSelection => "No selection made",
            EmptyReason::NoNumericData => "No numeric data",
        }
    }
}

/// Outcome of a successful extraction
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Extraction {
    Series(SeriesSet),
    Empty(EmptyReason),
}

impl Extraction {
    pub fn series_set(&self) -> Option<&SeriesSet> {
        match self {
            Extraction::Series(set) => Some(set),
            Extraction::Empty(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Extraction::Empty(_))
    }
}

// ============================================================================
// Coercion / Labels
// ============================================================================

/// Numeric value of a cell, or `None` when the cell is unusable
pub fn coerce_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

/// Label for a row: its first cell, or the row index when that is blank
fn row_label(grid: &Grid, row: usize) -> String {
    non_blank(grid.cell(row, 0))
        .map(str::to_string)
        .unwrap_or_else(|| row.to_string())
}

/// Label for a column position: its header, or the column index when blank
fn column_position_label(grid: &Grid, col: usize) -> String {
    non_blank(grid.header(col))
        .map(str::to_string)
        .unwrap_or_else(|| col.to_string())
}

/// Series name for a column: its header, or `"Col {index}"` when blank
fn column_series_label(grid: &Grid, col: usize) -> String {
    match grid.header(col) {
        Some(header) if !header.trim().is_empty() => header.to_string(),
        _ => synthetic_header(col),
    }
}

/// Entries for an index picker: headers in column mode, first cells in row mode.
/// Blank entries fall back to the index.
pub fn axis_choices(grid: &Grid, mode: AxisMode) -> Vec<String> {
    match mode {
        AxisMode::Column => (0..grid.column_count())
            .map(|c| column_position_label(grid, c))
            .collect(),
        AxisMode::Row => (0..grid.row_count()).map(|r| row_label(grid, r)).collect(),
    }
}

fn check_index(axis: Axis, index: usize, len: usize) -> DataResult<()> {
    if index >= len {
        return Err(DataError::InvalidIndex { axis, index, len });
    }
    Ok(())
}

fn check_selection(grid: &Grid, sel: &Selection) -> DataResult<()> {
    check_index(Axis::Row, sel.bottom(), grid.row_count())?;
    check_index(Axis::Column, sel.right(), grid.column_count())
}

fn ticks_of(series: &Series) -> Vec<AxisTick> {
    series
        .points
        .iter()
        .map(|p| AxisTick {
            position: p.position,
            label: p.label.clone(),
        })
        .collect()
}

// ============================================================================
// Extraction
// ============================================================================

/// Extract series from a grid snapshot.
///
/// `kind` only changes the rendering hints; the extracted values are the same
/// for every plot family. Out-of-range indices and selections that reach past
/// the grid are `InvalidIndex`.
pub fn extract_series(grid: &Grid, source: PlotSource, kind: PlotKind) -> DataResult<Extraction> {
    let _timer = ScopedTimer::new("extract_series", SLOW_EXTRACTION_MS);

    let set = match source {
        PlotSource::Selection(None) => return Ok(Extraction::Empty(EmptyReason::NoSelection)),
        PlotSource::Selection(Some(sel)) => {
            check_selection(grid, &sel)?;
            match sel.shape() {
                SelectionShape::SingleColumn => {
                    selected_column(grid, sel.left(), sel.top()..=sel.bottom(), kind)
                }
                SelectionShape::SingleRow => {
                    row_series(grid, sel.top(), sel.left()..=sel.right(), kind, true)
                }
                SelectionShape::Rectangular => rectangular(grid, &sel, kind),
            }
        }
        PlotSource::Axis(AxisSpec::Column { x_column, y_column }) => {
            check_index(Axis::Column, y_column, grid.column_count())?;
            check_index(Axis::Column, x_column, grid.column_count())?;
            indexed_column(grid, x_column, y_column, kind)
        }
        PlotSource::Axis(AxisSpec::Row { row }) => {
            check_index(Axis::Row, row, grid.row_count())?;
            let columns = grid.column_count();
            if columns == 0 {
                None
            } else {
                row_series(grid, row, 0..=columns - 1, kind, false)
            }
        }
    };

    let extraction = match set {
        Some(set) => {
            debug!(
                series = set.series.len(),
                points = set.point_count(),
                kind = kind.label(),
                "Extracted series"
            );
            Extraction::Series(set)
        }
        None => Extraction::Empty(EmptyReason::NoNumericData),
    };
    Ok(extraction)
}

/// Column mode without a selection: Y from `y_column`, positioned by `x_column`
/// when every contributing row has a numeric X.
fn indexed_column(grid: &Grid, x_column: usize, y_column: usize, kind: PlotKind) -> Option<SeriesSet> {
    let contributing: Vec<(usize, f64)> = (0..grid.row_count())
        .filter_map(|r| grid.cell(r, y_column).and_then(coerce_number).map(|v| (r, v)))
        .collect();
    if contributing.is_empty() {
        return None;
    }

    let numeric_x: Option<Vec<f64>> = contributing
        .iter()
        .map(|&(r, _)| grid.cell(r, x_column).and_then(coerce_number))
        .collect();

    let points = contributing
        .iter()
        .enumerate()
        .map(|(i, &(row, value))| {
            let label = non_blank(grid.cell(row, x_column))
                .map(str::to_string)
                .unwrap_or_else(|| row.to_string());
            let position = match &numeric_x {
                Some(xs) => xs[i],
                None => i as f64,
            };
            SeriesPoint {
                label,
                value,
                position,
                source: row,
            }
        })
        .collect();

    let series = Series {
        label: column_series_label(grid, y_column),
        points,
    };
    Some(SeriesSet {
        kind,
        title: format!("{} of column {}", kind.label(), y_column),
        x_title: column_series_label(grid, x_column),
        y_title: series.label.clone(),
        ticks: ticks_of(&series),
        series: vec![series],
    })
}

/// Single-column selection: compacted positions, labels from column 0
fn selected_column(
    grid: &Grid,
    col: usize,
    rows: std::ops::RangeInclusive<usize>,
    kind: PlotKind,
) -> Option<SeriesSet> {
    let points: Vec<SeriesPoint> = rows
        .filter_map(|r| grid.cell(r, col).and_then(coerce_number).map(|v| (r, v)))
        .enumerate()
        .map(|(i, (row, value))| SeriesPoint {
            label: row_label(grid, row),
            value,
            position: i as f64,
            source: row,
        })
        .collect();
    if points.is_empty() {
        return None;
    }

    let series = Series {
        label: column_series_label(grid, col),
        points,
    };
    Some(SeriesSet {
        kind,
        title: format!("{} of column {} (selection)", kind.label(), col),
        x_title: "Row".to_string(),
        y_title: series.label.clone(),
        ticks: ticks_of(&series),
        series: vec![series],
    })
}

/// One series across `columns` of `row`, labeled by header
fn row_series(
    grid: &Grid,
    row: usize,
    columns: std::ops::RangeInclusive<usize>,
    kind: PlotKind,
    from_selection: bool,
) -> Option<SeriesSet> {
    let points: Vec<SeriesPoint> = columns
        .filter_map(|c| grid.cell(row, c).and_then(coerce_number).map(|v| (c, v)))
        .enumerate()
        .map(|(i, (col, value))| SeriesPoint {
            label: column_position_label(grid, col),
            value,
            position: i as f64,
            source: col,
        })
        .collect();
    if points.is_empty() {
        return None;
    }

    let suffix = if from_selection { " (selection)" } else { "" };
    let series = Series {
        label: synthetic_row_label(row),
        points,
    };
    Some(SeriesSet {
        kind,
        title: format!("{} of row {}{}", kind.label(), row, suffix),
        x_title: "Column".to_string(),
        y_title: format!("{} values", series.label),
        ticks: ticks_of(&series),
        series: vec![series],
    })
}

/// One series per selected column; positions are slots on the union row axis
fn rectangular(grid: &Grid, sel: &Selection, kind: PlotKind) -> Option<SeriesSet> {
    let columns: Vec<(usize, Vec<(usize, f64)>)> = (sel.left()..=sel.right())
        .map(|c| {
            let cells = (sel.top()..=sel.bottom())
                .filter_map(|r| grid.cell(r, c).and_then(coerce_number).map(|v| (r, v)))
                .collect::<Vec<_>>();
            (c, cells)
        })
        .filter(|(_, cells)| !cells.is_empty())
        .collect();
    if columns.is_empty() {
        return None;
    }

    // Rows used by at least one series, in row order, mapped to their slot
    let mut slots: BTreeMap<usize, usize> = columns
        .iter()
        .flat_map(|(_, cells)| cells.iter().map(|&(r, _)| (r, 0)))
        .collect();
    for (slot, index) in slots.values_mut().enumerate() {
        *index = slot;
    }

    let labels: BTreeMap<usize, String> = slots.keys().map(|&r| (r, row_label(grid, r))).collect();

    let series = columns
        .into_iter()
        .map(|(col, cells)| Series {
            label: column_series_label(grid, col),
            points: cells
                .into_iter()
                .map(|(row, value)| SeriesPoint {
                    label: labels[&row].clone(),
                    value,
                    position: slots[&row] as f64,
                    source: row,
                })
                .collect(),
        })
        .collect();

    let ticks = slots
        .iter()
        .map(|(row, &slot)| AxisTick {
            position: slot as f64,
            label: labels[row].clone(),
        })
        .collect();

    Some(SeriesSet {
        kind,
        title: format!("{} of selection", kind.label()),
        x_title: "Row (selection)".to_string(),
        y_title: "Value".to_string(),
        series,
        ticks,
    })
}
