//! Hot reload support for the settings file.
//!
//! Watches the settings file's directory (editors often replace the file rather
//! than write it in place) and reports changes to that one file through
//! [`SettingsWatcher::poll`], which never blocks.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use tracing::debug;

pub use crate::settings::default_settings_path;

/// A change to the watched settings file
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettingsEvent {
    Modified,
    Created,
    Deleted,
    Error(String),
}

pub struct SettingsWatcher {
    path: PathBuf,
    // Dropping the watcher stops delivery
    _watcher: RecommendedWatcher,
    events: Receiver<notify::Result<Event>>,
}

impl SettingsWatcher {
    /// Start watching `path`. The file itself need not exist yet, its directory must.
    pub fn new(path: PathBuf) -> notify::Result<Self> {
        let (tx, events) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        debug!(path = %path.display(), "Watching settings file");

        Ok(Self {
            path,
            _watcher: watcher,
            events,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next pending change to the settings file, if any.
    ///
    /// Events for other files in the directory are discarded.
    pub fn poll(&mut self) -> Option<SettingsEvent> {
        loop {
            match self.events.try_recv() {
                Ok(Ok(event)) => {
                    if let Some(change) = self.classify(&event) {
                        return Some(change);
                    }
                }
                Ok(Err(e)) => return Some(SettingsEvent::Error(e.to_string())),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
            }
        }
    }

    fn classify(&self, event: &Event) -> Option<SettingsEvent> {
        let file_name = self.path.file_name()?;
        if !event.paths.iter().any(|p| p.file_name() == Some(file_name)) {
            return None;
        }
        match event.kind {
            EventKind::Create(_) => Some(SettingsEvent::Created),
            EventKind::Modify(_) => Some(SettingsEvent::Modified),
            EventKind::Remove(_) => Some(SettingsEvent::Deleted),
            _ => None,
        }
    }
}

impl std::fmt::Debug for SettingsWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsWatcher").field("path", &self.path).finish()
    }
}
