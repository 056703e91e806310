//! Script materialization for a single definition.
//!
//! Scripts are gathered from the definition first and only then written, so a
//! definition whose sections or parameters cannot be read leaves no files
//! behind. Writes are write-once: an existing file is never touched, whatever
//! its contents.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::consts::{ITEM_GENERATION_DIR, MAIN_SCRIPTS_DIR, PARAMETER_CALLBACKS_DIR, SCRIPT_EXTENSION};
use crate::container::{DefinitionSource, Parameter, Section, SourceError};
use crate::util::hash::sanitize;

#[derive(Debug, Error)]
pub enum MaterializeError {
  #[error("failed to create folder {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write script {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// The folder a script artifact is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptCategory {
  Main,
  ItemGeneration,
  ParameterCallback,
}

impl ScriptCategory {
  pub fn folder_name(self) -> &'static str {
    match self {
      ScriptCategory::Main => MAIN_SCRIPTS_DIR,
      ScriptCategory::ItemGeneration => ITEM_GENERATION_DIR,
      ScriptCategory::ParameterCallback => PARAMETER_CALLBACKS_DIR,
    }
  }
}

/// One piece of embedded script text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptArtifact {
  pub category: ScriptCategory,
  /// Sanitized file stem.
  pub name: String,
  pub contents: String,
}

impl ScriptArtifact {
  pub fn new(category: ScriptCategory, name: &str, contents: &str) -> Self {
    Self {
      category,
      name: sanitize(name),
      contents: contents.to_string(),
    }
  }

  /// Target path of this artifact under a definition folder.
  pub fn path_in(&self, definition_folder: &Path) -> PathBuf {
    definition_folder
      .join(self.category.folder_name())
      .join(format!("{}.{}", self.name, SCRIPT_EXTENSION))
  }
}

/// Main script for a section flagged as Python.
pub fn main_script(section: &Section) -> Option<ScriptArtifact> {
  section
    .is_python
    .then(|| ScriptArtifact::new(ScriptCategory::Main, &section.name, &section.contents))
}

/// Item generation script of a string, menu or integer parameter.
pub fn item_generation_script(parameter: &Parameter) -> Option<ScriptArtifact> {
  let applies = parameter.kind.supports_item_generator()
    && parameter.item_generator_language.is_python()
    && !parameter.item_generator.is_empty();
  applies.then(|| ScriptArtifact::new(ScriptCategory::ItemGeneration, &parameter.name, &parameter.item_generator))
}

/// Callback script of a parameter of any kind.
pub fn callback_script(parameter: &Parameter) -> Option<ScriptArtifact> {
  let applies = parameter.callback_language.is_python() && !parameter.callback.is_empty();
  applies.then(|| ScriptArtifact::new(ScriptCategory::ParameterCallback, &parameter.name, &parameter.callback))
}

/// Gather every script artifact of a definition, in write order.
///
/// Main scripts come first, then for each parameter its item generation
/// script followed by its callback.
pub fn collect_artifacts<D: DefinitionSource>(definition: &D) -> Result<Vec<ScriptArtifact>, SourceError> {
  let sections = definition.sections()?;
  let parameters = definition.parameters()?;

  let mut artifacts: Vec<ScriptArtifact> = sections.iter().filter_map(main_script).collect();
  for parameter in &parameters {
    artifacts.extend(item_generation_script(parameter));
    artifacts.extend(callback_script(parameter));
  }
  Ok(artifacts)
}

/// Counts of files handled for one definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteStats {
  pub written: usize,
  pub existing: usize,
}

impl std::ops::AddAssign for WriteStats {
  fn add_assign(&mut self, other: Self) {
    self.written += other.written;
    self.existing += other.existing;
  }
}

fn ensure_folder(path: &Path) -> Result<(), MaterializeError> {
  if path.exists() {
    return Ok(());
  }
  fs::create_dir_all(path).map_err(|source| MaterializeError::CreateDir {
    path: path.to_path_buf(),
    source,
  })
}

/// Write artifacts under `definition_folder`, skipping files that already exist.
///
/// Category folders are created on first write.
pub fn write_artifacts(definition_folder: &Path, artifacts: &[ScriptArtifact]) -> Result<WriteStats, MaterializeError> {
  let mut stats = WriteStats::default();

  for artifact in artifacts {
    let path = artifact.path_in(definition_folder);
    if path.exists() {
      debug!(path = %path.display(), "script already present, leaving it");
      stats.existing += 1;
      continue;
    }

    if let Some(folder) = path.parent() {
      ensure_folder(folder)?;
    }

    fs::write(&path, &artifact.contents).map_err(|source| MaterializeError::Write {
      path: path.clone(),
      source,
    })?;
    debug!(path = %path.display(), "wrote script");
    stats.written += 1;
  }

  Ok(stats)
}

/// Outcome of materializing one definition.
#[derive(Debug)]
pub enum Materialized {
  Written(WriteStats),
  /// The definition could not be read; nothing was written.
  Abandoned(SourceError),
}

/// Extract every script of `definition` into `definition_folder`.
///
/// The definition folder is created once the definition has been read, even
/// when it carries no scripts. Source access failures abandon the definition
/// and are returned as a value; filesystem failures are errors.
pub fn materialize<D: DefinitionSource>(
  definition: &D,
  definition_folder: &Path,
) -> Result<Materialized, MaterializeError> {
  let artifacts = match collect_artifacts(definition) {
    Ok(artifacts) => artifacts,
    Err(e) => return Ok(Materialized::Abandoned(e)),
  };
  ensure_folder(definition_folder)?;
  Ok(Materialized::Written(write_artifacts(definition_folder, &artifacts)?))
}
