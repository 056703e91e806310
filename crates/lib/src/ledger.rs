//! Run ledger persistence.
//!
//! The root ledger maps each container's folder identity to where it came from
//! and the modification time seen when it was last extracted. It is read once
//! at the start of a run and rewritten wholesale at the end.
//!
//! # Storage Layout
//!
//! ```text
//! <scripts root>/
//! ├── log.json                  # RunLedger
//! └── <container folder>/
//!     └── log.json              # ContainerLog
//! ```
//!
//! # Example Root Ledger
//!
//! ```json
//! {
//!   "tower_hda_3f2a9c0d11e84b7aa0c6d2e5f4b1a978": {
//!     "file_path": "/job/assets/tower.hda",
//!     "last_mod_time": "2024-03-01 14:02:11.482913"
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::LOG_FILENAME;

/// Where a container came from and when it was last modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
  pub file_path: String,
  pub last_mod_time: String,
}

impl LedgerRecord {
  pub fn new(file_path: impl Into<String>, last_mod_time: impl Into<String>) -> Self {
    Self {
      file_path: file_path.into(),
      last_mod_time: last_mod_time.into(),
    }
  }
}

/// Errors that can occur when reading or writing ledgers.
#[derive(Debug, Error)]
pub enum LedgerError {
  /// Failed to read a ledger file.
  #[error("failed to read ledger {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to write a ledger file.
  #[error("failed to write ledger {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The ledger exists but is not valid JSON of the expected shape.
  #[error("failed to parse ledger {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  /// Failed to serialize a ledger.
  #[error("failed to serialize ledger: {0}")]
  Serialize(#[source] serde_json::Error),
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>, LedgerError> {
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
    Err(source) => {
      return Err(LedgerError::Read {
        path: path.to_path_buf(),
        source,
      });
    }
  };

  serde_json::from_str(&content).map(Some).map_err(|source| LedgerError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

/// Write pretty JSON atomically: write to a temp file, then rename.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), LedgerError> {
  let content = serde_json::to_string_pretty(value).map_err(LedgerError::Serialize)?;
  let temp_path = path.with_extension("json.tmp");
  let write_error = |source| LedgerError::Write {
    path: path.to_path_buf(),
    source,
  };
  fs::write(&temp_path, content).map_err(write_error)?;
  fs::rename(&temp_path, path).map_err(write_error)?;
  Ok(())
}

/// The root ledger, keyed by container identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunLedger {
  records: BTreeMap<String, LedgerRecord>,
}

impl RunLedger {
  pub fn new() -> Self {
    Self::default()
  }

  /// Path of the root ledger under `scripts_root`.
  pub fn path(scripts_root: &Path) -> PathBuf {
    scripts_root.join(LOG_FILENAME)
  }

  /// Load the ledger from `scripts_root`.
  ///
  /// Returns an empty ledger if none has been written yet. A ledger that exists
  /// but cannot be read or parsed is an error.
  pub fn load(scripts_root: &Path) -> Result<Self, LedgerError> {
    let path = Self::path(scripts_root);
    let ledger: Self = read_json(&path)?.unwrap_or_default();
    debug!(path = %path.display(), records = ledger.len(), "loaded run ledger");
    Ok(ledger)
  }

  /// Replace the ledger at `scripts_root` with this one.
  pub fn save(&self, scripts_root: &Path) -> Result<(), LedgerError> {
    let path = Self::path(scripts_root);
    write_json(&path, self)?;
    debug!(path = %path.display(), records = self.len(), "saved run ledger");
    Ok(())
  }

  pub fn get(&self, identity: &str) -> Option<&LedgerRecord> {
    self.records.get(identity)
  }

  pub fn insert(&mut self, identity: String, record: LedgerRecord) {
    self.records.insert(identity, record);
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &LedgerRecord)> {
    self.records.iter()
  }
}

/// Per-container log mapping definition identities to `category/type` labels.
///
/// Informational only; never consulted for staleness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerLog {
  definitions: BTreeMap<String, String>,
}

impl ContainerLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn load(container_folder: &Path) -> Result<Self, LedgerError> {
    Ok(read_json(&container_folder.join(LOG_FILENAME))?.unwrap_or_default())
  }

  pub fn save(&self, container_folder: &Path) -> Result<(), LedgerError> {
    write_json(&container_folder.join(LOG_FILENAME), self)
  }

  pub fn insert(&mut self, identity: String, label: String) {
    self.definitions.insert(identity, label);
  }

  pub fn get(&self, identity: &str) -> Option<&str> {
    self.definitions.get(identity).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.definitions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.definitions.is_empty()
  }
}
