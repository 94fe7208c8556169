//! Single-writer owner of the data grid.
//!
//! `GridStore` is the only thing allowed to mutate a [`Grid`]. Mutators take
//! `&mut self`, so writes are serialized through whoever owns the store. Readers
//! call [`GridStore::snapshot`] and get an `Arc<Grid>` that later writes never
//! touch (mutation goes through `Arc::make_mut`, which copies when a snapshot is
//! still alive).
//!
//! Observers register a [`GridObserver`] and are told when the shape changed
//! (structure-changed) or when cell content changed (data-changed).

use crate::data::error::{DataError, DataResult};
use crate::types::{Grid, synthetic_header};
use std::sync::Arc;

/// Immutable view of the grid at one point in time
pub type GridSnapshot = Arc<Grid>;

/// Receives change notifications from a [`GridStore`].
///
/// Both callbacks carry no payload: observers re-read what they need.
pub trait GridObserver {
    /// Rows or columns were added, removed or reset, or a header changed
    fn on_structure_changed(&self);
    /// Cell content changed
    fn on_data_changed(&self);
}

/// Handle returned by [`GridStore::subscribe`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Clone, Copy)]
enum Change {
    Structure,
    Data,
}

/// Owns the grid and notifies observers about changes.
pub struct GridStore {
    grid: Arc<Grid>,
    observers: Vec<(ObserverId, Arc<dyn GridObserver>)>,
    next_observer_id: u64,
}

impl Default for GridStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GridStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridStore")
            .field("rows", &self.grid.row_count())
            .field("columns", &self.grid.column_count())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl GridStore {
    /// Create a store with an empty grid
    pub fn new() -> Self {
        Self::from_grid(Grid::default())
    }

    /// Create a store with the given headers and `row_count` empty rows
    pub fn with_shape(headers: Vec<String>, row_count: usize) -> Self {
        Self::from_grid(Grid::with_shape(headers, row_count))
    }

    pub fn from_grid(grid: Grid) -> Self {
        Self {
            grid: Arc::new(grid),
            observers: Vec::new(),
            next_observer_id: 0,
        }
    }

    // ------------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------------

    /// Register an observer. Events are delivered in the order they occur.
    pub fn subscribe(&mut self, observer: Arc<dyn GridObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Remove an observer. Returns false if `id` was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    fn notify(&self, change: Change) {
        for (_, observer) in &self.observers {
            match change {
                Change::Structure => observer.on_structure_changed(),
                Change::Data => observer.on_data_changed(),
            }
        }
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub fn row_count(&self) -> usize {
        self.grid.row_count()
    }

    pub fn column_count(&self) -> usize {
        self.grid.column_count()
    }

    pub fn get_cell(&self, row: usize, col: usize) -> DataResult<&str> {
        self.check_cell(row, col)?;
        Ok(self.grid.rows()[row][col].as_str())
    }

    pub fn header(&self, col: usize) -> DataResult<&str> {
        self.grid
            .header(col)
            .ok_or_else(|| DataError::column_out_of_range(col, self.column_count()))
    }

    pub fn headers(&self) -> &[String] {
        self.grid.headers()
    }

    /// Consistent read-only view, unaffected by later writes
    pub fn snapshot(&self) -> GridSnapshot {
        Arc::clone(&self.grid)
    }

    fn check_cell(&self, row: usize, col: usize) -> DataResult<()> {
        if row >= self.row_count() {
            return Err(DataError::row_out_of_range(row, self.row_count()));
        }
        if col >= self.column_count() {
            return Err(DataError::column_out_of_range(col, self.column_count()));
        }
        Ok(())
    }

    fn grid_mut(&mut self) -> &mut Grid {
        Arc::make_mut(&mut self.grid)
    }

    // ------------------------------------------------------------------------
    // Cell edits
    // ------------------------------------------------------------------------

    /// Replace one cell's text
    pub fn set_cell(&mut self, row: usize, col: usize, text: impl Into<String>) -> DataResult<()> {
        self.check_cell(row, col)?;
        self.grid_mut().rows_mut()[row][col] = text.into();
        self.notify(Change::Data);
        Ok(())
    }

    /// Rename a column
    pub fn set_header(&mut self, col: usize, text: impl Into<String>) -> DataResult<()> {
        if col >= self.column_count() {
            return Err(DataError::column_out_of_range(col, self.column_count()));
        }
        self.grid_mut().headers_mut()[col] = text.into();
        self.notify(Change::Structure);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Structural edits
    // ------------------------------------------------------------------------

    /// Insert an empty row before `at`; `at == row_count()` appends
    pub fn insert_row(&mut self, at: usize) -> DataResult<()> {
        if at > self.row_count() {
            return Err(DataError::row_out_of_range(at, self.row_count()));
        }
        let width = self.column_count();
        self.grid_mut().rows_mut().insert(at, vec![String::new(); width]);
        self.notify(Change::Structure);
        Ok(())
    }

    /// Remove the row at `at`, returning its cells
    pub fn remove_row(&mut self, at: usize) -> DataResult<Vec<String>> {
        if at >= self.row_count() {
            return Err(DataError::row_out_of_range(at, self.row_count()));
        }
        let removed = self.grid_mut().rows_mut().remove(at);
        self.notify(Change::Structure);
        Ok(removed)
    }

    /// Insert an empty column before `at`; `at == column_count()` appends
    pub fn insert_column(&mut self, at: usize, header: impl Into<String>) -> DataResult<()> {
        if at > self.column_count() {
            return Err(DataError::column_out_of_range(at, self.column_count()));
        }
        let header = header.into();
        let grid = self.grid_mut();
        grid.headers_mut().insert(at, header);
        for row in grid.rows_mut() {
            row.insert(at, String::new());
        }
        self.notify(Change::Structure);
        Ok(())
    }

    /// Remove the column at `at`, returning its header
    pub fn remove_column(&mut self, at: usize) -> DataResult<String> {
        if at >= self.column_count() {
            return Err(DataError::column_out_of_range(at, self.column_count()));
        }
        let grid = self.grid_mut();
        let header = grid.headers_mut().remove(at);
        for row in grid.rows_mut() {
            row.remove(at);
        }
        self.notify(Change::Structure);
        Ok(header)
    }

    /// Add an empty row at the end
    pub fn append_row(&mut self) {
        let width = self.column_count();
        self.grid_mut().rows_mut().push(vec![String::new(); width]);
        self.notify(Change::Structure);
    }

    /// Add an empty column at the end. A blank header becomes `"Col {index}"`.
    pub fn append_column(&mut self, header: &str) {
        let index = self.column_count();
        let header = if header.trim().is_empty() {
            synthetic_header(index)
        } else {
            header.to_string()
        };
        let grid = self.grid_mut();
        grid.headers_mut().push(header);
        for row in grid.rows_mut() {
            row.push(String::new());
        }
        self.notify(Change::Structure);
    }

    // ------------------------------------------------------------------------
    // Bulk operations (ingestion)
    // ------------------------------------------------------------------------

    /// Drop every row and install a new header row
    pub fn reset(&mut self, headers: Vec<String>) {
        self.grid = Arc::new(Grid::with_shape(headers, 0));
        self.notify(Change::Structure);
    }

    /// Append rows at the end, padding short rows and widening the grid for long ones.
    ///
    /// Columns created by widening get an empty header, or `"Col {index}"` when
    /// `synthesized_headers` is set.
    pub fn append_rows(&mut self, rows: Vec<Vec<String>>, synthesized_headers: bool) {
        if rows.is_empty() {
            return;
        }
        let incoming = rows.iter().map(Vec::len).max().unwrap_or(0);
        let grid = self.grid_mut();
        let width = grid.column_count().max(incoming);

        if width > grid.column_count() {
            let start = grid.column_count();
            grid.headers_mut().extend((start..width).map(|i| {
                if synthesized_headers {
                    synthetic_header(i)
                } else {
                    String::new()
                }
            }));
            for row in grid.rows_mut() {
                row.resize(width, String::new());
            }
        }

        grid.rows_mut().extend(rows.into_iter().map(|mut row| {
            row.resize(width, String::new());
            row
        }));

        self.notify(Change::Structure);
        self.notify(Change::Data);
    }
}
