//! Container source for containers expanded to a directory.
//!
//! # Layout
//!
//! ```text
//! tower.hda/
//! ├── Sections.list             # ""  then  <file>\t<section> per line
//! ├── INDEX__SECTION
//! ├── houdini.hdalibrary
//! └── Sop_1tower/               # one directory per definition
//!     ├── Sections.list
//!     ├── DialogScript          # parameter layout, see `dialog`
//!     ├── ExtraFileOptions      # {"PythonModule/IsPython": {"type": "bool", "value": true}}
//!     └── PythonModule
//! ```
//!
//! Root entries whose section name has the form `Category/TypeName` are
//! definitions; the rest are library bookkeeping and ignored.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use super::dialog::parse_parameters;
use crate::stale::newest_modified;
use super::{ContainerSource, DefinitionSource, Parameter, Section, SourceError};

pub const SECTIONS_LIST: &str = "Sections.list";
pub const EXTRA_FILE_OPTIONS: &str = "ExtraFileOptions";
pub const DIALOG_SCRIPT: &str = "DialogScript";

/// One `<file> <section>` line of a `Sections.list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionEntry {
  pub file: String,
  pub section: String,
}

/// Parse a `Sections.list`.
///
/// The quoted header line is skipped. Returns the offending line on error.
pub fn parse_sections_list(content: &str) -> Result<Vec<SectionEntry>, String> {
  let mut entries = Vec::new();
  for line in content.lines() {
    let line = line.trim();
    if line.is_empty() || line == "\"\"" {
      continue;
    }
    let (file, section) = line
      .split_once(char::is_whitespace)
      .ok_or_else(|| format!("malformed entry: {}", line))?;
    entries.push(SectionEntry {
      file: file.to_string(),
      section: section.trim().to_string(),
    });
  }
  Ok(entries)
}

/// Read the `<Section>/IsPython` flags from an `ExtraFileOptions` document.
pub fn python_sections(content: &str) -> Result<HashMap<String, bool>, serde_json::Error> {
  let options: HashMap<String, serde_json::Value> = serde_json::from_str(content)?;
  Ok(
    options
      .into_iter()
      .filter_map(|(key, value)| {
        let section = key.strip_suffix("/IsPython")?;
        let flag = value
          .get("value")
          .and_then(serde_json::Value::as_bool)
          .or_else(|| value.as_bool())
          .unwrap_or(false);
        Some((section.to_string(), flag))
      })
      .collect(),
  )
}

/// A definition stored in its own directory inside an expanded container.
#[derive(Debug, Clone)]
pub struct ExpandedDefinition {
  dir: PathBuf,
  category: String,
  type_name: String,
  container: PathBuf,
}

impl ExpandedDefinition {
  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn access_error(&self, message: impl std::fmt::Display) -> SourceError {
    SourceError::Access {
      definition: self.descriptor(),
      message: message.to_string(),
    }
  }

  fn read_optional(&self, file: &str) -> Result<Option<String>, SourceError> {
    match fs::read(self.dir.join(file)) {
      Ok(bytes) => String::from_utf8(bytes)
        .map(Some)
        .map_err(|e| self.access_error(format!("{}: {}", file, e))),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(self.access_error(format!("{}: {}", file, e))),
    }
  }
}

impl DefinitionSource for ExpandedDefinition {
  fn descriptor(&self) -> String {
    format!(
      "<definition {}/{} in {}>",
      self.category,
      self.type_name,
      self.container.display()
    )
  }

  fn type_name(&self) -> String {
    self.type_name.clone()
  }

  fn type_category(&self) -> Result<String, SourceError> {
    Ok(self.category.clone())
  }

  fn sections(&self) -> Result<Vec<Section>, SourceError> {
    let listing = self
      .read_optional(SECTIONS_LIST)?
      .ok_or_else(|| self.access_error(format!("missing {}", SECTIONS_LIST)))?;
    let entries = parse_sections_list(&listing).map_err(|e| self.access_error(e))?;

    let flags = match self.read_optional(EXTRA_FILE_OPTIONS)? {
      Some(content) => {
        python_sections(&content).map_err(|e| self.access_error(format!("{}: {}", EXTRA_FILE_OPTIONS, e)))?
      }
      None => HashMap::new(),
    };

    let mut sections = Vec::with_capacity(entries.len());
    for entry in entries {
      let contents = self
        .read_optional(&entry.file)?
        .ok_or_else(|| self.access_error(format!("missing section file {}", entry.file)))?;
      let is_python = flags.get(&entry.section).copied().unwrap_or(false);
      sections.push(Section::new(entry.section, contents, is_python));
    }
    Ok(sections)
  }

  fn parameters(&self) -> Result<Vec<Parameter>, SourceError> {
    match self.read_optional(DIALOG_SCRIPT)? {
      Some(content) => {
        parse_parameters(&content).map_err(|e| self.access_error(format!("{}: {}", DIALOG_SCRIPT, e)))
      }
      None => Ok(Vec::new()),
    }
  }
}

/// Container source reading expanded containers from disk.
///
/// Installing a container only marks it as loaded; nothing is cached between
/// calls, so each query reflects the directory as it is on disk.
#[derive(Debug, Default)]
pub struct ExpandedSource {
  loaded: BTreeSet<PathBuf>,
}

impl ExpandedSource {
  pub fn new() -> Self {
    Self::default()
  }
}

impl ContainerSource for ExpandedSource {
  type Definition = ExpandedDefinition;

  fn loaded_files(&self) -> Vec<PathBuf> {
    self.loaded.iter().cloned().collect()
  }

  /// The newest entry in the expanded tree, since editing a section file
  /// leaves the container directory's own mtime untouched.
  fn modified(&self, path: &Path) -> io::Result<SystemTime> {
    newest_modified(path)
  }

  fn install(&mut self, path: &Path) -> Result<(), SourceError> {
    if !path.join(SECTIONS_LIST).is_file() {
      let message = if path.is_file() {
        "packed containers are not supported, expand it to a directory first"
      } else {
        "not an expanded container (missing Sections.list)"
      };
      return Err(SourceError::Install {
        path: path.to_path_buf(),
        message: message.to_string(),
      });
    }
    self.loaded.insert(path.to_path_buf());
    Ok(())
  }

  fn uninstall(&mut self, path: &Path) -> Result<(), SourceError> {
    if self.loaded.remove(path) {
      Ok(())
    } else {
      Err(SourceError::Uninstall {
        path: path.to_path_buf(),
        message: "container not loaded".to_string(),
      })
    }
  }

  fn definitions(&mut self, path: &Path) -> Result<Vec<ExpandedDefinition>, SourceError> {
    let load_error = |message: String| SourceError::Load {
      path: path.to_path_buf(),
      message,
    };

    let listing = fs::read_to_string(path.join(SECTIONS_LIST)).map_err(|e| load_error(e.to_string()))?;
    let entries = parse_sections_list(&listing).map_err(load_error)?;

    let definitions: Vec<_> = entries
      .into_iter()
      .filter_map(|entry| {
        let (category, type_name) = entry.section.split_once('/')?;
        Some(ExpandedDefinition {
          dir: path.join(&entry.file),
          category: category.to_string(),
          type_name: type_name.to_string(),
          container: path.to_path_buf(),
        })
      })
      .collect();

    debug!(path = %path.display(), count = definitions.len(), "enumerated definitions");
    Ok(definitions)
  }
}
