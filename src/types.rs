//! Core types for the gridplot data model.
//!
//! Defines the grid itself, the selection and axis descriptions callers use
//! to scope an extraction, and the plot families a renderer understands.

use crate::constants::{SYNTHETIC_COLUMN_PREFIX, SYNTHETIC_ROW_PREFIX};
use serde::{Deserialize, Serialize};

// ============================================================================
// Grid
// ============================================================================

/// A 2-D table of text cells with one header per column.
///
/// Invariant: every row holds exactly `headers.len()` cells. Only
/// [`GridStore`](crate::data::GridStore) mutates a grid; everyone else reads an
/// immutable snapshot of it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Grid {
    /// Create a grid with the given headers and `row_count` empty rows
    pub fn with_shape(headers: Vec<String>, row_count: usize) -> Self {
        let width = headers.len();
        Self {
            headers,
            rows: vec![vec![String::new(); width]; row_count],
        }
    }

    /// Build a grid from headers and rows, padding or widening to a common width
    pub fn from_rows(mut headers: Vec<String>, mut rows: Vec<Vec<String>>) -> Self {
        let width = rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(headers.len());
        headers.resize(width, String::new());
        for row in &mut rows {
            row.resize(width, String::new());
        }
        Self { headers, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Header text, or `None` when `col` is out of range
    pub fn header(&self, col: usize) -> Option<&str> {
        self.headers.get(col).map(String::as_str)
    }

    /// Cell text, or `None` when either index is out of range
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    pub(crate) fn headers_mut(&mut self) -> &mut Vec<String> {
        &mut self.headers
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<String>> {
        &mut self.rows
    }
}

/// Synthesized header for a column: `"Col {index}"`
pub fn synthetic_header(index: usize) -> String {
    format!("{} {}", SYNTHETIC_COLUMN_PREFIX, index)
}

/// Series name for a row: `"Row {index}"`
pub fn synthetic_row_label(index: usize) -> String {
    format!("{} {}", SYNTHETIC_ROW_PREFIX, index)
}

// ============================================================================
// Selection
// ============================================================================

/// An inclusive rectangular region of the grid.
///
/// Contract: `top <= bottom` and `left <= right`, enforced by [`Selection::new`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    top: usize,
    bottom: usize,
    left: usize,
    right: usize,
}

/// The one shape a selection classifies as
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionShape {
    /// `left == right` (includes a single cell)
    SingleColumn,
    /// `top == bottom` with more than one column
    SingleRow,
    /// Several rows and several columns
    Rectangular,
}

impl Selection {
    /// Create a selection from two corner rows and two corner columns, in any order.
    pub fn new(row_a: usize, row_b: usize, col_a: usize, col_b: usize) -> Self {
        Self {
            top: row_a.min(row_b),
            bottom: row_a.max(row_b),
            left: col_a.min(col_b),
            right: col_a.max(col_b),
        }
    }

    /// A selection covering exactly one cell
    pub fn cell(row: usize, col: usize) -> Self {
        Self::new(row, row, col, col)
    }

    pub fn top(&self) -> usize {
        self.top
    }

    pub fn bottom(&self) -> usize {
        self.bottom
    }

    pub fn left(&self) -> usize {
        self.left
    }

    pub fn right(&self) -> usize {
        self.right
    }

    pub fn row_count(&self) -> usize {
        self.bottom - self.top + 1
    }

    pub fn column_count(&self) -> usize {
        self.right - self.left + 1
    }

    pub fn shape(&self) -> SelectionShape {
        if self.left == self.right {
            SelectionShape::SingleColumn
        } else if self.top == self.bottom {
            SelectionShape::SingleRow
        } else {
            SelectionShape::Rectangular
        }
    }

    /// Short description for axis pickers, e.g. `"Selection r0-r2 c0-c1"`
    pub fn summary(&self) -> String {
        format!(
            "Selection r{}-r{} c{}-c{}",
            self.top, self.bottom, self.left, self.right
        )
    }
}

// ============================================================================
// Axis / Plot Types
// ============================================================================

/// What to plot when no selection is in use
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisSpec {
    /// One series from `y_column`, positioned by `x_column` when it is numeric
    Column { x_column: usize, y_column: usize },
    /// One series across all columns of `row`
    Row { row: usize },
}

/// Which dimension an axis picker lists
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisMode {
    #[default]
    Column,
    Row,
}

/// The region a plot request draws from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlotSource {
    /// "Use selection" mode; `None` when nothing is selected
    Selection(Option<Selection>),
    /// Axis/index mode
    Axis(AxisSpec),
}

/// Plot families. Affects rendering hints only, never the extracted values.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotKind {
    #[default]
    Line,
    Scatter,
    Bar,
}

impl PlotKind {
    pub fn label(&self) -> &'static str {
        match self {
            PlotKind::Line => "Line",
            PlotKind::Scatter => "Scatter",
            PlotKind::Bar => "Bar",
        }
    }
}

impl std::str::FromStr for PlotKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "line" => Ok(PlotKind::Line),
            "scatter" => Ok(PlotKind::Scatter),
            "bar" => Ok(PlotKind::Bar),
            other => Err(format!("unknown plot kind: {}", other)),
        }
    }
}
