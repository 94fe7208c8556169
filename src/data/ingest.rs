//! Streaming, cancellable CSV ingestion.
//!
//! An [`IngestionJob`] reads a source on its own worker thread and sends
//! [`IngestionEvent`]s back over a channel. It never touches the grid: the owner
//! drains the events and hands them to an [`IngestionApplier`], which applies
//! them to its [`GridStore`] one chunk at a time.
//!
//! Event order per job is fixed: one `HeaderReady`, zero or more `ChunkReady`,
//! then exactly one terminal event (`Completed`, `Failed` or `Cancelled`).

use crate::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_ENCODING, INGEST_THREAD_NAME, SLOW_CHUNK_APPLY_MS};
use crate::data::csv_parser::{RecordReader, resolve_encoding};
use crate::data::error::{DataError, DataResult};
use crate::data::grid_store::GridStore;
use crate::perf::{LoadStats, ScopedTimer};
use crate::types::synthetic_header;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

// ============================================================================
// Options / Source
// ============================================================================

/// Parameters of one load
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    /// Treat the first parsed row as the header row
    pub has_header: bool,
    /// WHATWG encoding label of the source bytes
    pub encoding: String,
    /// Maximum data rows per `ChunkReady`
    pub chunk_size: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            encoding: DEFAULT_ENCODING.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl IngestOptions {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    fn validate(&self) -> DataResult<&'static encoding_rs::Encoding> {
        if self.chunk_size == 0 {
            return Err(DataError::InvalidOptions(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        resolve_encoding(&self.encoding)
    }
}

/// Where a load reads its bytes from
pub enum IngestSource {
    /// A file, opened on the worker thread
    Path(PathBuf),
    /// Any byte stream, e.g. a pipe or an in-memory buffer
    Reader(Box<dyn Read + Send>),
}

impl IngestSource {
    pub fn reader(source: impl Read + Send + 'static) -> Self {
        IngestSource::Reader(Box::new(source))
    }

    fn describe(&self) -> String {
        match self {
            IngestSource::Path(path) => path.display().to_string(),
            IngestSource::Reader(_) => "<stream>".to_string(),
        }
    }
}

impl std::fmt::Debug for IngestSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("IngestSource").field(&self.describe()).finish()
    }
}

impl From<PathBuf> for IngestSource {
    fn from(path: PathBuf) -> Self {
        IngestSource::Path(path)
    }
}

impl From<&std::path::Path> for IngestSource {
    fn from(path: &std::path::Path) -> Self {
        IngestSource::Path(path.to_path_buf())
    }
}

// ============================================================================
// Events / State
// ============================================================================

/// Messages from the worker to the owner, in emission order
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum IngestionEvent {
    /// Always first. `synthesized` is set when the headers are `"Col N"` names.
    HeaderReady { headers: Vec<String>, synthesized: bool },
    /// Up to `chunk_size` data rows, each padded to the widest row seen so far
    ChunkReady(Vec<Vec<String>>),
    /// End of input; `rows` data rows were emitted
    Completed { rows: usize },
    /// Read or decode error; nothing follows
    Failed(String),
    /// Cancellation observed at a chunk boundary; `rows` data rows were emitted
    Cancelled { rows: usize },
}

impl IngestionEvent {
    pub fn is_terminal(&self) -> bool {
        self.terminal_state().is_some()
    }

    /// The job state this event ends in, if it is a terminal event
    pub fn terminal_state(&self) -> Option<JobState> {
        match self {
            IngestionEvent::Completed { .. } => Some(JobState::Completed),
            IngestionEvent::Failed(reason) => Some(JobState::Failed(reason.clone())),
            IngestionEvent::Cancelled { .. } => Some(JobState::Cancelled),
            _ => None,
        }
    }
}

/// `Idle → Running → {Completed | Failed | Cancelled}`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub enum JobState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed(String),
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed(_) | JobState::Cancelled
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed(_) => "failed",
            JobState::Cancelled => "cancelled",
        }
    }
}

// ============================================================================
// Worker Loop
// ============================================================================

/// Drive a record reader to a terminal state, emitting events as it goes.
///
/// `cancel` is checked before every chunk is read and again before it is
/// emitted; a chunk read after cancellation is dropped. `emit` returns false
/// when nobody is listening any more, which stops the loop like a cancel.
pub(crate) fn pump_source<R: Read>(
    reader: &mut RecordReader<R>,
    has_header: bool,
    chunk_size: usize,
    cancel: &AtomicBool,
    mut emit: impl FnMut(IngestionEvent) -> bool,
) -> JobState {
    fn fail(err: DataError, emit: &mut impl FnMut(IngestionEvent) -> bool) -> JobState {
        let reason = err.to_string();
        warn!(error = %reason, "Ingestion failed");
        emit(IngestionEvent::Failed(reason.clone()));
        JobState::Failed(reason)
    }

    let mut emitted = 0usize;

    let first = match reader.next_row() {
        Ok(first) => first,
        Err(err) => return fail(err, &mut emit),
    };

    let Some(first) = first else {
        if emit(IngestionEvent::HeaderReady {
            headers: Vec::new(),
            synthesized: !has_header,
        }) {
            emit(IngestionEvent::Completed { rows: 0 });
        }
        return JobState::Completed;
    };

    let mut width = first.len();
    let (headers, mut pending) = if has_header {
        (first, Vec::new())
    } else {
        ((0..width).map(synthetic_header).collect(), vec![first])
    };

    if !emit(IngestionEvent::HeaderReady {
        headers,
        synthesized: !has_header,
    }) {
        return JobState::Cancelled;
    }

    loop {
        if cancel.load(Ordering::Acquire) {
            emit(IngestionEvent::Cancelled { rows: emitted });
            return JobState::Cancelled;
        }

        let mut chunk = std::mem::take(&mut pending);
        match reader.next_chunk(chunk_size - chunk.len()) {
            Ok(rows) => chunk.extend(rows),
            Err(err) => return fail(err, &mut emit),
        }

        if chunk.is_empty() {
            emit(IngestionEvent::Completed { rows: emitted });
            return JobState::Completed;
        }

        if cancel.load(Ordering::Acquire) {
            debug!(dropped = chunk.len(), "Dropping chunk read after cancel");
            emit(IngestionEvent::Cancelled { rows: emitted });
            return JobState::Cancelled;
        }

        width = chunk.iter().map(Vec::len).fold(width, usize::max);
        for row in &mut chunk {
            row.resize(width, String::new());
        }

        emitted += chunk.len();
        debug!(rows = chunk.len(), total = emitted, width, "Chunk ready");
        if !emit(IngestionEvent::ChunkReady(chunk)) {
            return JobState::Cancelled;
        }
    }
}

// ============================================================================
// Job Handle
// ============================================================================

/// Handle to one running load.
///
/// Dropping the handle cancels the job. The worker is detached rather than
/// joined, since a blocked source would otherwise block the owner.
pub struct IngestionJob {
    id: Uuid,
    cancel: Arc<AtomicBool>,
    state: Arc<Mutex<JobState>>,
    events: Receiver<IngestionEvent>,
    worker: Option<JoinHandle<()>>,
}

impl IngestionJob {
    /// Validate the options and spawn the worker.
    ///
    /// Bad options are rejected here, before any worker exists. Failing to open
    /// the source happens on the worker and arrives as `Failed`.
    pub fn start(source: IngestSource, options: &IngestOptions) -> DataResult<Self> {
        let encoding = options.validate()?;
        let id = Uuid::new_v4();
        let cancel = Arc::new(AtomicBool::new(false));
        let state = Arc::new(Mutex::new(JobState::Running));
        let (tx, events) = mpsc::channel();

        info!(
            job = %id,
            source = %source.describe(),
            encoding = encoding.name(),
            chunk_size = options.chunk_size,
            has_header = options.has_header,
            "Starting ingestion"
        );

        let worker = {
            let cancel = Arc::clone(&cancel);
            let state = Arc::clone(&state);
            let has_header = options.has_header;
            let chunk_size = options.chunk_size;
            std::thread::Builder::new()
                .name(INGEST_THREAD_NAME.to_string())
                .spawn(move || {
                    let span = info_span!("ingest", job = %id);
                    let _enter = span.enter();
                    run_worker(source, encoding, has_header, chunk_size, &cancel, &state, tx);
                })?
        };

        Ok(Self {
            id,
            cancel,
            state,
            events,
            worker: Some(worker),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Ask the worker to stop at the next chunk boundary
    pub fn cancel(&self) {
        if !self.cancel.swap(true, Ordering::AcqRel) {
            info!(job = %self.id, "Cancellation requested");
        }
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Worker-side state. Becomes terminal just before the terminal event is sent.
    pub fn state(&self) -> JobState {
        self.state.lock().clone()
    }

    /// Next event if one is queued.
    ///
    /// `Disconnected` means the worker is gone and every event it sent has
    /// been received.
    pub fn try_next(&self) -> Result<IngestionEvent, TryRecvError> {
        self.events.try_recv()
    }

    /// Wait for the next event; `None` once the worker is gone and the queue is empty
    pub fn next_blocking(&self) -> Option<IngestionEvent> {
        self.events.recv().ok()
    }

    /// Wait up to `timeout` for the next event
    pub fn next_timeout(&self, timeout: Duration) -> Option<IngestionEvent> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Wait for the worker thread to exit
    pub fn join(mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!(job = %self.id, "Ingestion worker panicked");
            }
        }
    }
}

impl Drop for IngestionJob {
    fn drop(&mut self) {
        if !self.state.lock().is_terminal() {
            self.cancel.store(true, Ordering::Release);
        }
    }
}

impl std::fmt::Debug for IngestionJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionJob")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

fn run_worker(
    source: IngestSource,
    encoding: &'static encoding_rs::Encoding,
    has_header: bool,
    chunk_size: usize,
    cancel: &AtomicBool,
    state: &Mutex<JobState>,
    tx: Sender<IngestionEvent>,
) {
    let emit = |event: IngestionEvent| {
        if let Some(terminal) = event.terminal_state() {
            *state.lock() = terminal;
        }
        tx.send(event).is_ok()
    };

    let stream: Box<dyn Read + Send> = match source {
        IngestSource::Path(path) => match File::open(&path) {
            Ok(file) => Box::new(file),
            Err(err) => {
                let reason = DataError::Io(err).to_string();
                warn!(path = %path.display(), error = %reason, "Failed to open source");
                emit(IngestionEvent::Failed(reason));
                return;
            }
        },
        IngestSource::Reader(reader) => reader,
    };

    let mut reader = RecordReader::new(stream, encoding);
    let outcome = pump_source(&mut reader, has_header, chunk_size, cancel, emit);

    // A dropped receiver ends the loop without a terminal event
    {
        let mut state = state.lock();
        if !state.is_terminal() {
            *state = outcome.clone();
        }
    }
    info!(state = outcome.label(), rows_read = reader.rows_read(), "Ingestion finished");
}

// ============================================================================
// Applying Events
// ============================================================================

/// Owner-side consumer of one job's events.
///
/// `HeaderReady` resets the store to the new header row; each `ChunkReady` is
/// appended as new rows.
#[derive(Debug, Default)]
pub struct IngestionApplier {
    synthesized: bool,
    state: JobState,
    stats: LoadStats,
}

impl IngestionApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Returns the terminal state once the job has ended.
    pub fn apply(&mut self, store: &mut GridStore, event: IngestionEvent) -> Option<JobState> {
        if self.state.is_terminal() {
            warn!("Ignoring ingestion event after terminal state");
            return Some(self.state.clone());
        }

        match event {
            IngestionEvent::HeaderReady { headers, synthesized } => {
                self.synthesized = synthesized;
                self.state = JobState::Running;
                self.stats = LoadStats::new();
                store.reset(headers);
                None
            }
            IngestionEvent::ChunkReady(rows) => {
                let count = rows.len();
                let timer = ScopedTimer::new("apply_chunk", SLOW_CHUNK_APPLY_MS);
                store.append_rows(rows, self.synthesized);
                self.stats.record_chunk(count, timer.elapsed_ms());
                None
            }
            IngestionEvent::Completed { rows } => {
                info!(
                    rows,
                    chunks = self.stats.chunks(),
                    avg_apply_ms = format!("{:.2}", self.stats.average_apply_ms()),
                    "Load completed"
                );
                self.finish(JobState::Completed)
            }
            IngestionEvent::Cancelled { rows } => {
                info!(rows, "Load cancelled");
                self.finish(JobState::Cancelled)
            }
            IngestionEvent::Failed(reason) => {
                warn!(reason = %reason, rows = self.stats.rows(), "Load failed");
                self.finish(JobState::Failed(reason))
            }
        }
    }

    fn finish(&mut self, state: JobState) -> Option<JobState> {
        self.state = state.clone();
        Some(state)
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }
}
