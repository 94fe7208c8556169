//! The owning context.
//!
//! A `Workbench` owns the [`GridStore`] and is the only place that writes to it.
//! Loads run on a worker thread; the workbench drains their events with
//! [`Workbench::pump`] (non-blocking, call it from the owner's loop) or
//! [`Workbench::finish_load`] (blocking), applying chunks between any other
//! edits the caller makes. Plot and export requests read a snapshot.

use crate::data::{
    BarGroup, DataResult, Extraction, GridObserver, GridSnapshot, GridStore, IngestOptions,
    IngestSource, IngestionApplier, IngestionJob, JobState, SeriesSet, axis_choices,
    extract_series, write_csv_content, write_csv_file,
};
use crate::settings::Settings;
use crate::settings_watcher::{SettingsEvent, SettingsWatcher};
use crate::types::{AxisMode, PlotKind, PlotSource, Selection};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::TryRecvError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Remembers whether the grid changed since it was last asked
#[derive(Debug, Default)]
struct ChangeTracker {
    dirty: AtomicBool,
}

impl GridObserver for ChangeTracker {
    fn on_structure_changed(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    fn on_data_changed(&self) {
        self.dirty.store(true, Ordering::Release);
    }
}

struct ActiveLoad {
    job: IngestionJob,
    applier: IngestionApplier,
}

pub struct Workbench {
    store: GridStore,
    settings: Settings,
    settings_watcher: Option<SettingsWatcher>,
    changes: Arc<ChangeTracker>,
    load: Option<ActiveLoad>,
    last_load: JobState,
}

impl Default for Workbench {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl std::fmt::Debug for Workbench {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbench")
            .field("store", &self.store)
            .field("loading", &self.is_loading())
            .field("state", &self.ingestion_state())
            .finish()
    }
}

impl Workbench {
    /// Start with the grid shape from `settings.grid`
    pub fn new(settings: Settings) -> Self {
        let store = GridStore::with_shape(
            settings.grid.default_headers.clone(),
            settings.grid.default_rows,
        );
        Self::with_store(store, settings)
    }

    pub fn with_store(mut store: GridStore, settings: Settings) -> Self {
        let changes = Arc::new(ChangeTracker::default());
        store.subscribe(changes.clone());
        Self {
            store,
            settings,
            settings_watcher: None,
            changes,
            load: None,
            last_load: JobState::Idle,
        }
    }

    /// Reload settings whenever `path` changes
    pub fn watch_settings(&mut self, path: PathBuf) -> notify::Result<()> {
        self.settings_watcher = Some(SettingsWatcher::new(path)?);
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &GridStore {
        &self.store
    }

    /// Direct edits, interleaved with chunk application
    pub fn store_mut(&mut self) -> &mut GridStore {
        &mut self.store
    }

    pub fn snapshot(&self) -> GridSnapshot {
        self.store.snapshot()
    }

    /// True once after any grid change, for callers that re-plot automatically
    pub fn take_changed(&self) -> bool {
        self.changes.dirty.swap(false, Ordering::AcqRel)
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Load a CSV file with the configured ingestion options
    pub fn load_csv(&mut self, path: impl Into<PathBuf>) -> DataResult<Uuid> {
        let options = self.settings.ingest.clone();
        self.load_with(IngestSource::Path(path.into()), &options)
    }

    /// Start a load, cancelling any load still running.
    ///
    /// The grid is only reset when the new job's header arrives.
    pub fn load_with(&mut self, source: IngestSource, options: &IngestOptions) -> DataResult<Uuid> {
        if let Some(previous) = self.load.take() {
            info!(job = %previous.job.id(), "Superseding running load");
            previous.job.cancel();
        }

        let job = IngestionJob::start(source, options)?;
        let id = job.id();
        self.last_load = JobState::Running;
        self.load = Some(ActiveLoad {
            job,
            applier: IngestionApplier::new(),
        });
        Ok(id)
    }

    pub fn is_loading(&self) -> bool {
        self.load.is_some()
    }

    /// Current load's job id
    pub fn load_id(&self) -> Option<Uuid> {
        self.load.as_ref().map(|l| l.job.id())
    }

    /// Ask the running load to stop at its next chunk boundary
    pub fn cancel_load(&self) {
        if let Some(load) = &self.load {
            load.job.cancel();
        }
    }

    /// State of the current or most recent load, as applied to the grid
    pub fn ingestion_state(&self) -> JobState {
        self.last_load.clone()
    }

    /// Apply every queued load event without blocking.
    ///
    /// Returns the terminal state when the load ended during this call.
    /// A worker that exits without a terminal event ends the load as `Failed`.
    pub fn pump(&mut self) -> Option<JobState> {
        let load = self.load.as_mut()?;
        let terminal = loop {
            match load.job.try_next() {
                Ok(event) => {
                    if let Some(state) = load.applier.apply(&mut self.store, event) {
                        break Some(state);
                    }
                }
                Err(TryRecvError::Empty) => break None,
                Err(TryRecvError::Disconnected) => {
                    warn!(job = %load.job.id(), "Event channel closed before a terminal event");
                    break Some(worker_exited_early());
                }
            }
        };
        if let Some(state) = &terminal {
            self.end_load(state.clone());
        }
        terminal
    }

    /// Block until the current load ends, applying events as they arrive
    pub fn finish_load(&mut self) -> JobState {
        let Some(load) = self.load.as_mut() else {
            return self.last_load.clone();
        };

        let state = loop {
            match load.job.next_blocking() {
                Some(event) => {
                    if let Some(state) = load.applier.apply(&mut self.store, event) {
                        break state;
                    }
                }
                None => {
                    warn!(job = %load.job.id(), "Event channel closed before a terminal event");
                    break worker_exited_early();
                }
            }
        };
        self.end_load(state.clone());
        state
    }

    fn end_load(&mut self, state: JobState) {
        if let Some(load) = self.load.take() {
            debug!(
                job = %load.job.id(),
                state = state.label(),
                rows = load.applier.stats().rows(),
                "Load ended"
            );
            load.job.join();
        }
        self.last_load = state;
    }

    // ------------------------------------------------------------------------
    // Plotting / Export
    // ------------------------------------------------------------------------

    /// Extract series from the current snapshot
    pub fn plot(&self, kind: PlotKind, source: PlotSource) -> DataResult<Extraction> {
        extract_series(&self.store.snapshot(), source, kind)
    }

    /// Grouped bar layout using the configured group width
    pub fn bar_layout(&self, set: &SeriesSet) -> Vec<BarGroup> {
        set.bar_layout_with(self.settings.plot.bar_group_width)
    }

    /// Entries for the index picker.
    ///
    /// In selection mode the picker shows the selection summary (or a
    /// placeholder) instead of row/column names.
    pub fn index_choices(&self, mode: AxisMode, selection: Option<PlotSelection>) -> Vec<String> {
        match selection {
            Some(PlotSelection(Some(sel))) => vec![sel.summary()],
            Some(PlotSelection(None)) => vec!["No selection".to_string()],
            None => axis_choices(&self.store.snapshot(), mode),
        }
    }

    pub fn export_csv(&self) -> DataResult<String> {
        write_csv_content(&self.store.snapshot())
    }

    pub fn export_csv_file(&self, path: &Path) -> DataResult<()> {
        write_csv_file(&self.store.snapshot(), path)
    }

    // ------------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------------

    /// Check for settings file changes and reload if needed.
    ///
    /// New settings apply to the next load and plot; a running load keeps its
    /// options.
    pub fn check_settings_reload(&mut self) -> Option<SettingsEvent> {
        let watcher = self.settings_watcher.as_mut()?;
        let event = watcher.poll()?;
        match &event {
            SettingsEvent::Modified | SettingsEvent::Created => {
                info!("Settings file changed, reloading...");
                match Settings::load_from(watcher.path()) {
                    Ok(settings) => self.settings = settings,
                    Err(e) => warn!(error = %e, "Keeping previous settings"),
                }
            }
            SettingsEvent::Deleted => {
                warn!("Settings file deleted");
            }
            SettingsEvent::Error(e) => {
                error!("Settings watch error: {}", e);
            }
        }
        Some(event)
    }
}

fn worker_exited_early() -> JobState {
    JobState::Failed("ingestion worker exited early".to_string())
}

/// "Use selection" mode for [`Workbench::index_choices`], carrying the current selection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlotSelection(pub Option<Selection>);
