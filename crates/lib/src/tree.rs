//! Output tree construction.
//!
//! # Layout
//!
//! ```text
//! <scripts root>/
//! ├── log.json
//! └── <container folder>/                  # <basename>_<identity>, sanitized
//!     ├── log.json
//!     └── <definition folder>/             # <type name>_<identity>, sanitized
//!         ├── main_python_scripts/
//!         ├── item_generation_scripts/
//!         └── parameter_callbacks/
//! ```
//!
//! A container folder is rebuilt as a unit: when the container is stale the
//! whole folder is deleted before extraction repopulates it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::container::DefinitionSource;
use crate::ledger::{LedgerRecord, RunLedger};
use crate::stale::{format_timestamp, is_stale};
use crate::util::hash::unique_name;

#[derive(Debug, Error)]
pub enum TreeError {
  #[error("failed to remove stale folder {path}: {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to create folder {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// A container file as seen at extraction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
  /// Canonical path of the container.
  pub path: PathBuf,
  /// Folder name derived from the path, also the ledger key.
  pub identity: String,
  /// Modification time in ledger format.
  pub last_modified: String,
}

impl Container {
  /// Canonicalize `path` and date it with `modified`, usually the source's
  /// [`ContainerSource::modified`](crate::container::ContainerSource::modified).
  pub fn inspect(path: &Path, modified: impl FnOnce(&Path) -> io::Result<SystemTime>) -> io::Result<Self> {
    let path = dunce::canonicalize(path)?;
    let last_modified = format_timestamp(modified(&path)?);
    let identity = container_identity(&path);
    Ok(Self {
      path,
      identity,
      last_modified,
    })
  }

  pub fn record(&self) -> LedgerRecord {
    LedgerRecord::new(self.path.display().to_string(), self.last_modified.clone())
  }
}

/// Folder name for a container: its base filename plus the digest of its path.
pub fn container_identity(path: &Path) -> String {
  let base = path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_default();
  unique_name(&path.to_string_lossy(), &base)
}

/// Folder name for a definition: its type name plus the digest of its descriptor.
pub fn definition_identity<D: DefinitionSource>(definition: &D) -> String {
  unique_name(&definition.descriptor(), &definition.type_name())
}

/// What happened to a container folder before extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderState {
  /// The folder did not exist and was created.
  Created,
  /// The folder was stale, deleted and recreated.
  Rebuilt,
  /// The folder was current and kept as is.
  Reused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerFolder {
  pub path: PathBuf,
  pub state: FolderState,
}

fn count_files(path: &Path) -> usize {
  WalkDir::new(path)
    .into_iter()
    .filter_map(|e| e.ok())
    .filter(|e| e.file_type().is_file())
    .count()
}

/// Create or reuse the folder for `container` under `scripts_root`.
///
/// An existing folder is deleted first when the ledger has no record for the
/// container or records a different modification time.
pub fn ensure_container_folder(
  container: &Container,
  scripts_root: &Path,
  ledger: &RunLedger,
) -> Result<ContainerFolder, TreeError> {
  let path = scripts_root.join(&container.identity);
  let mut state = FolderState::Created;

  if path.exists() {
    if is_stale(&container.last_modified, ledger.get(&container.identity)) {
      let files = count_files(&path);
      info!(
        identity = %container.identity,
        files,
        "{} was modified, updating it",
        container.identity
      );
      fs::remove_dir_all(&path).map_err(|source| TreeError::Remove {
        path: path.clone(),
        source,
      })?;
      state = FolderState::Rebuilt;
    } else {
      debug!(identity = %container.identity, "container unchanged, reusing folder");
      state = FolderState::Reused;
    }
  }

  if !path.exists() {
    fs::create_dir_all(&path).map_err(|source| TreeError::CreateDir {
      path: path.clone(),
      source,
    })?;
  }

  Ok(ContainerFolder { path, state })
}
