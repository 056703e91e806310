//! Access to asset containers through the host application.
//!
//! The extraction pipeline never parses containers itself. It talks to a
//! [`ContainerSource`], which installs containers into the host, enumerates
//! their definitions, and hands back script-bearing data that has already been
//! classified (section Python flags, [`ParmKind`], [`ScriptLanguage`]).
//!
//! Two adapters ship with the crate:
//! - [`memory::MemorySource`]: containers described in memory
//! - [`expanded::ExpandedSource`]: containers expanded to a directory on disk

pub mod dialog;
pub mod expanded;
pub mod memory;
mod session;

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use session::Session;

/// Errors reported by a container source.
///
/// Every variant is a soft failure: the caller skips the container or
/// definition it refers to and carries on with the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
  /// The container is absent, corrupt, or unsupported.
  #[error("failed to load container {path}: {message}")]
  Load { path: PathBuf, message: String },

  /// The host refused to register the container's definitions.
  #[error("failed to install container {path}: {message}")]
  Install { path: PathBuf, message: String },

  /// The host failed to unregister a container.
  #[error("failed to uninstall container {path}: {message}")]
  Uninstall { path: PathBuf, message: String },

  /// A definition's sections, parameters or category could not be read.
  #[error("failed to access definition {definition}: {message}")]
  Access { definition: String, message: String },
}

/// Language tag attached to a parameter script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptLanguage {
  Python,
  #[default]
  Hscript,
}

impl ScriptLanguage {
  /// Parse a host language tag. Anything other than `python` is treated as hscript.
  pub fn from_tag(tag: &str) -> Self {
    if tag.trim().eq_ignore_ascii_case("python") {
      ScriptLanguage::Python
    } else {
      ScriptLanguage::Hscript
    }
  }

  pub fn is_python(self) -> bool {
    matches!(self, ScriptLanguage::Python)
  }
}

/// Parameter template kind, decided once by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParmKind {
  String,
  Menu,
  Integer,
  Other,
}

impl ParmKind {
  /// Whether parameters of this kind can carry an item generation script.
  pub fn supports_item_generator(self) -> bool {
    matches!(self, ParmKind::String | ParmKind::Menu | ParmKind::Integer)
  }
}

/// A named section of a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
  pub name: String,
  pub is_python: bool,
  pub contents: String,
}

impl Section {
  pub fn new(name: impl Into<String>, contents: impl Into<String>, is_python: bool) -> Self {
    Self {
      name: name.into(),
      is_python,
      contents: contents.into(),
    }
  }
}

/// A parameter template of a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
  pub name: String,
  pub kind: ParmKind,
  pub callback: String,
  pub callback_language: ScriptLanguage,
  pub item_generator: String,
  pub item_generator_language: ScriptLanguage,
}

impl Parameter {
  /// Create a parameter with no scripts attached.
  pub fn new(name: impl Into<String>, kind: ParmKind) -> Self {
    Self {
      name: name.into(),
      kind,
      callback: String::new(),
      callback_language: ScriptLanguage::default(),
      item_generator: String::new(),
      item_generator_language: ScriptLanguage::default(),
    }
  }

  pub fn with_callback(mut self, script: impl Into<String>, language: ScriptLanguage) -> Self {
    self.callback = script.into();
    self.callback_language = language;
    self
  }

  pub fn with_item_generator(mut self, script: impl Into<String>, language: ScriptLanguage) -> Self {
    self.item_generator = script.into();
    self.item_generator_language = language;
    self
  }
}

/// One addressable definition inside a container.
pub trait DefinitionSource {
  /// Textual representation of the definition, used to derive its identity.
  fn descriptor(&self) -> String;

  fn type_name(&self) -> String;

  fn type_category(&self) -> Result<String, SourceError>;

  fn sections(&self) -> Result<Vec<Section>, SourceError>;

  fn parameters(&self) -> Result<Vec<Parameter>, SourceError>;
}

/// The host's view of containers.
pub trait ContainerSource {
  type Definition: DefinitionSource;

  /// Containers currently loaded in the host.
  fn loaded_files(&self) -> Vec<PathBuf>;

  /// Last modification time of the container at `path`.
  fn modified(&self, path: &Path) -> io::Result<SystemTime> {
    crate::stale::file_modified(path)
  }

  /// Register a container's definitions as active.
  fn install(&mut self, path: &Path) -> Result<(), SourceError>;

  /// Unregister a container previously installed.
  fn uninstall(&mut self, path: &Path) -> Result<(), SourceError>;

  /// Open a container and enumerate its definitions.
  fn definitions(&mut self, path: &Path) -> Result<Vec<Self::Definition>, SourceError>;
}
