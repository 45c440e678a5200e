//! Durable tab-list persistence
//!
//! The whole tab list is rewritten on every save; the write goes to a
//! sibling temp file first and is renamed into place, so a reader never
//! observes a half-written snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

use super::tab::Tab;

/// Persistence errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config unreadable: {0}")]
    Unreadable(String),

    #[error("config write failed: {0}")]
    WriteFailed(String),
}

impl From<ConfigError> for String {
    fn from(err: ConfigError) -> String {
        err.to_string()
    }
}

/// The persisted form of the full tab list.
///
/// The active-tab marker travels inside the tabs themselves (`Tab::active`).
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSnapshot {
    #[serde(default)]
    pub tabs: Vec<Tab>,
}

/// File-backed store for [`TabSnapshot`]
pub struct ConfigStore {
    path: PathBuf,
    // Serializes saves so two writers cannot interleave on the temp file
    save_lock: Mutex<()>,
}

impl ConfigStore {
    /// Create a store persisting to the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            save_lock: Mutex::new(()),
        }
    }

    /// Default config file location, `None` when the platform exposes no
    /// config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("drivefarm").join("tabs.json"))
    }

    /// Create a store at the platform default location
    pub fn at_default_location() -> Option<Self> {
        Self::default_path().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted snapshot.
    ///
    /// A missing or unparseable file is `Unreadable`; the caller decides
    /// whether to fall back to an empty snapshot.
    pub fn load(&self) -> Result<TabSnapshot, ConfigError> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| ConfigError::Unreadable(format!("{}: {}", self.path.display(), e)))?;

        let snapshot: TabSnapshot = serde_json::from_str(&content)
            .map_err(|e| ConfigError::Unreadable(format!("{}: {}", self.path.display(), e)))?;

        info!("Loaded {} tabs from {:?}", snapshot.tabs.len(), self.path);
        Ok(snapshot)
    }

    /// Overwrite the persisted snapshot wholesale.
    pub fn save(&self, snapshot: &TabSnapshot) -> Result<(), ConfigError> {
        let _guard = self.save_lock.lock();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteFailed(format!("{}: {}", parent.display(), e)))?;
        }

        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| ConfigError::WriteFailed(e.to_string()))?;

        // Write-then-rename keeps the snapshot on disk whole at all times
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .map_err(|e| ConfigError::WriteFailed(format!("{}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| ConfigError::WriteFailed(format!("{}: {}", self.path.display(), e)))?;

        info!("Saved {} tabs to {:?}", snapshot.tabs.len(), self.path);
        Ok(())
    }
}
