//! Persisted user settings.
//!
//! Stored as JSON at `<config dir>/gridplot/settings.json`. Missing fields take
//! their defaults, so an empty object is a valid settings file.

use crate::constants::{BAR_GROUP_WIDTH, DEFAULT_HEADERS, DEFAULT_ROW_COUNT};
use crate::data::{DataResult, IngestOptions};
use crate::types::PlotKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Plot defaults
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotSettings {
    pub default_kind: PlotKind,
    /// Total width shared by one group of bars
    pub bar_group_width: f64,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            default_kind: PlotKind::default(),
            bar_group_width: BAR_GROUP_WIDTH,
        }
    }
}

/// Shape of a fresh, unloaded grid
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub default_headers: Vec<String>,
    pub default_rows: usize,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            default_headers: DEFAULT_HEADERS.iter().map(|h| h.to_string()).collect(),
            default_rows: DEFAULT_ROW_COUNT,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ingest: IngestOptions,
    pub plot: PlotSettings,
    pub grid: GridSettings,
}

/// Location of the settings file, if the platform has a config directory
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gridplot").join("settings.json"))
}

impl Settings {
    /// Load from the default location, falling back to defaults on any problem
    pub fn load() -> Self {
        let Some(path) = default_settings_path() else {
            debug!("No config directory, using default settings");
            return Self::default();
        };
        if !path.exists() {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load settings, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> DataResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write as pretty JSON, creating parent directories as needed
    pub fn save_to(&self, path: &Path) -> DataResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
