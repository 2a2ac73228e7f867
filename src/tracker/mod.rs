//! Installed-version bookkeeping.
//!
//! `versions.json` in the downloads directory maps each object name to the
//! file and release tag last extracted for it:
//!
//! ```json
//! {
//!   "OBS": { "filename": "OBS-Studio-30.1.2-Windows.zip", "tag": "30.1.2" },
//!   "move-transition": { "filename": "move-transition-3.0.2-windows.zip", "tag": null }
//! }
//! ```
//!
//! The file is read once when a run starts and written back once when it
//! ends, through a temporary file renamed over the old one.

use crate::error::PersistenceError;
use crate::resolver::{FilenamePattern, ResolvedAsset};

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the state file inside the downloads directory.
pub const STATE_FILE: &str = "versions.json";

/// What is installed for one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledRecord {
    pub filename: String,
    #[serde(default, deserialize_with = "tag_or_false")]
    pub tag: Option<String>,
}

/// Older state files wrote `false` for "no tag".
fn tag_or_false<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(tag)) => Some(tag),
        _ => None,
    })
}

/// Why an object has to be downloaded again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateReason {
    Forced,
    NotInstalled,
    NewVersion,
    FilenameChanged,
}

impl fmt::Display for UpdateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UpdateReason::Forced => "forced",
            UpdateReason::NotInstalled => "not installed",
            UpdateReason::NewVersion => "new version",
            UpdateReason::FilenameChanged => "file name changed",
        })
    }
}

/// Persistent map of object name to [`InstalledRecord`].
#[derive(Debug, Clone)]
pub struct VersionTracker {
    path: PathBuf,
    records: BTreeMap<String, InstalledRecord>,
    dirty: bool,
}

impl VersionTracker {
    /// Empty tracker that will be saved at `path`.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            records: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Read `path`. A missing file gives an empty tracker; an unreadable or
    /// corrupt one does too, with a warning, and is replaced on save.
    pub fn load(path: &Path) -> Self {
        let mut tracker = Self::new(path.to_path_buf());

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No version state at {:?}", path);
                return tracker;
            }
            Err(e) => {
                warn!("Cannot read version state {:?}: {}", path, e);
                return tracker;
            }
        };

        match serde_json::from_str::<BTreeMap<String, serde_json::Value>>(&text) {
            Ok(map) => {
                for (name, value) in map {
                    match serde_json::from_value::<InstalledRecord>(value) {
                        Ok(record) => {
                            tracker.records.insert(name, record);
                        }
                        Err(e) => warn!("Dropping version record for '{}': {}", name, e),
                    }
                }
            }
            Err(e) => warn!("Version state {:?} is corrupt, starting empty: {}", path, e),
        }
        tracker
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&InstalledRecord> {
        self.records.get(name)
    }

    pub fn records(&self) -> &BTreeMap<String, InstalledRecord> {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record a successful install.
    pub fn record(&mut self, name: &str, filename: &str, tag: Option<&str>) {
        self.records.insert(
            name.to_string(),
            InstalledRecord {
                filename: filename.to_string(),
                tag: tag.map(str::to_string),
            },
        );
        self.dirty = true;
    }

    /// Whether a record changed since load.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Decide whether `resolved` must be downloaded for `name`.
    ///
    /// Precedence: force, no record, a differing release tag, then a
    /// differing file name for a pattern that names one exact file.
    pub fn update_reason(
        &self,
        name: &str,
        pattern: &FilenamePattern,
        resolved: &ResolvedAsset,
        force: bool,
    ) -> Option<UpdateReason> {
        if force {
            return Some(UpdateReason::Forced);
        }
        let Some(record) = self.records.get(name) else {
            return Some(UpdateReason::NotInstalled);
        };
        if let Some(version) = &resolved.version {
            if record.tag.as_ref() != Some(version) {
                return Some(UpdateReason::NewVersion);
            }
        }
        if pattern.is_static() && record.filename != resolved.filename {
            return Some(UpdateReason::FilenameChanged);
        }
        None
    }

    pub fn needs_update(
        &self,
        name: &str,
        pattern: &FilenamePattern,
        resolved: &ResolvedAsset,
        force: bool,
    ) -> bool {
        self.update_reason(name, pattern, resolved, force).is_some()
    }

    /// Write the state file atomically, keys sorted.
    pub fn save(&mut self) -> Result<(), PersistenceError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_error = |source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        };

        std::fs::create_dir_all(&dir).map_err(io_error)?;
        let json = serde_json::to_string_pretty(&self.records)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_error)?;
        tmp.write_all(json.as_bytes()).map_err(io_error)?;
        tmp.as_file().sync_all().map_err(io_error)?;
        tmp.persist(&self.path).map_err(|source| PersistenceError::Persist {
            path: self.path.clone(),
            source,
        })?;

        debug!("Saved {} version records to {:?}", self.records.len(), self.path);
        self.dirty = false;
        Ok(())
    }
}
