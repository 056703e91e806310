//! Extraction runs.
//!
//! A run walks the input containers strictly in order:
//! - Inspects the path (canonical path, identity, modification time)
//! - Installs the container into the host session and enumerates definitions
//! - Creates, reuses or rebuilds the container folder
//! - Materializes each definition into its own folder
//! - Writes the per-container log
//!
//! The root ledger is loaded once before the first container and replaced once
//! after the last. Missing paths, load and install failures and unreadable
//! definitions are skipped; filesystem and ledger failures abort the run.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consts::DEFAULT_FOLDER_NAME;
use crate::container::{ContainerSource, DefinitionSource, Session, SourceError};
use crate::ledger::{ContainerLog, LedgerError, RunLedger};
use crate::materialize::{MaterializeError, Materialized, WriteStats, materialize};
use crate::tree::{Container, FolderState, TreeError, definition_identity, ensure_container_folder};

#[derive(Debug, Error)]
pub enum ExtractError {
  #[error("failed to read container list {path}: {source}")]
  ReadList {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to create scripts folder {path}: {source}")]
  CreateRoot {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Ledger(#[from] LedgerError),

  #[error(transparent)]
  Tree(#[from] TreeError),

  #[error(transparent)]
  Materialize(#[from] MaterializeError),
}

/// Where a run writes its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
  pub output_dir: PathBuf,
  pub folder_name: String,
}

impl ExtractOptions {
  pub fn new(output_dir: impl Into<PathBuf>) -> Self {
    Self {
      output_dir: output_dir.into(),
      folder_name: DEFAULT_FOLDER_NAME.to_string(),
    }
  }

  pub fn with_folder_name(mut self, folder_name: impl Into<String>) -> Self {
    self.folder_name = folder_name.into();
    self
  }

  /// Root of the output tree.
  pub fn scripts_root(&self) -> PathBuf {
    self.output_dir.join(&self.folder_name)
  }
}

/// Why an input was not extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
  /// The path does not exist or its metadata cannot be read.
  InvalidPath,
  /// The host could not register the container.
  Install,
  /// The host could not open or parse the container.
  Load,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedInput {
  pub path: PathBuf,
  pub reason: SkipReason,
  pub message: String,
}

/// Outcome for one extracted container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerReport {
  pub identity: String,
  pub file_path: PathBuf,
  pub state: FolderState,
  pub definitions: usize,
  pub abandoned_definitions: usize,
  pub files: WriteStats,
}

/// Summary of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractReport {
  pub scripts_root: PathBuf,
  pub containers: Vec<ContainerReport>,
  pub skipped: Vec<SkippedInput>,
}

impl ExtractReport {
  /// Files written across all containers.
  pub fn files_written(&self) -> usize {
    self.containers.iter().map(|c| c.files.written).sum()
  }

  pub fn files_existing(&self) -> usize {
    self.containers.iter().map(|c| c.files.existing).sum()
  }
}

/// Read a container list file: one path per line, blank lines ignored.
pub fn read_path_list(list_file: &Path) -> Result<Vec<PathBuf>, ExtractError> {
  let content = fs::read_to_string(list_file).map_err(|source| ExtractError::ReadList {
    path: list_file.to_path_buf(),
    source,
  })?;
  Ok(
    content
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty())
      .map(PathBuf::from)
      .collect(),
  )
}

/// Extract scripts from every container in `paths` into the options' scripts root.
pub fn extract<S: ContainerSource>(
  paths: &[PathBuf],
  options: &ExtractOptions,
  source: &mut S,
) -> Result<ExtractReport, ExtractError> {
  let scripts_root = options.scripts_root();
  fs::create_dir_all(&scripts_root).map_err(|source| ExtractError::CreateRoot {
    path: scripts_root.clone(),
    source,
  })?;

  let prior = RunLedger::load(&scripts_root)?;
  let mut ledger = RunLedger::new();
  let mut report = ExtractReport {
    scripts_root: scripts_root.clone(),
    ..ExtractReport::default()
  };
  // Identity of every container opened so far, with the reason it was skipped if it failed.
  let mut seen: BTreeMap<String, Option<(SkipReason, String)>> = BTreeMap::new();

  let mut session = Session::begin(source);

  for path in paths {
    let container = match Container::inspect(path, |p| session.modified(p)) {
      Ok(container) => container,
      Err(e) => {
        warn!(path = %path.display(), "file path not valid, continuing to other containers");
        report.skipped.push(SkippedInput {
          path: path.clone(),
          reason: SkipReason::InvalidPath,
          message: e.to_string(),
        });
        continue;
      }
    };

    if let Some(outcome) = seen.get(&container.identity) {
      match outcome {
        Some((reason, message)) => {
          warn!(path = %path.display(), "container already failed in this run, skipping it");
          report.skipped.push(SkippedInput {
            path: path.clone(),
            reason: reason.clone(),
            message: message.clone(),
          });
        }
        None => debug!(path = %path.display(), "container already extracted in this run"),
      }
      continue;
    }

    let definitions = match session.open(&container.path) {
      Ok(definitions) => definitions,
      Err(e) => {
        let reason = match e {
          SourceError::Install { .. } => SkipReason::Install,
          _ => SkipReason::Load,
        };
        warn!(path = %path.display(), error = %e, "could not open container, skipping it");
        seen.insert(container.identity.clone(), Some((reason.clone(), e.to_string())));
        report.skipped.push(SkippedInput {
          path: path.clone(),
          reason,
          message: e.to_string(),
        });
        continue;
      }
    };
    seen.insert(container.identity.clone(), None);

    info!(path = %container.path.display(), identity = %container.identity, "extracting container");
    let folder = ensure_container_folder(&container, &scripts_root, &prior)?;
    let container_report = extract_definitions(&container, &folder.path, folder.state, &definitions)?;
    ledger.insert(container.identity.clone(), container.record());
    report.containers.push(container_report);
  }

  drop(session);

  ledger.save(&scripts_root)?;
  info!(
    root = %scripts_root.display(),
    containers = report.containers.len(),
    skipped = report.skipped.len(),
    written = report.files_written(),
    "extraction complete"
  );

  Ok(report)
}

fn extract_definitions<D: DefinitionSource>(
  container: &Container,
  container_folder: &Path,
  state: FolderState,
  definitions: &[D],
) -> Result<ContainerReport, ExtractError> {
  let mut log = ContainerLog::new();
  let mut files = WriteStats::default();
  let mut abandoned = 0;

  for definition in definitions {
    let identity = definition_identity(definition);
    let type_name = definition.type_name();

    match materialize(definition, &container_folder.join(&identity))? {
      Materialized::Written(stats) => {
        files += stats;
        let category = definition.type_category().unwrap_or_else(|e| {
          warn!(definition = %type_name, error = %e, "could not read definition category");
          "unknown".to_string()
        });
        log.insert(identity, format!("{}/{}", category, type_name));
      }
      Materialized::Abandoned(e) => {
        warn!(definition = %type_name, error = %e, "could not access definition, skipping it");
        abandoned += 1;
      }
    }
  }

  log.save(container_folder)?;

  Ok(ContainerReport {
    identity: container.identity.clone(),
    file_path: container.path.clone(),
    state,
    definitions: definitions.len(),
    abandoned_definitions: abandoned,
    files,
  })
}
