//! In-memory container source.
//!
//! Containers are registered by path together with their definitions. Install,
//! load and per-definition access failures can be injected to exercise the
//! pipeline's skip paths.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::{ContainerSource, DefinitionSource, Parameter, Section, SourceError};

/// A definition held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDefinition {
  pub category: String,
  pub type_name: String,
  pub descriptor: String,
  pub sections: Vec<Section>,
  pub parameters: Vec<Parameter>,
  pub fail_category: bool,
  pub fail_sections: bool,
  pub fail_parameters: bool,
}

impl MemoryDefinition {
  /// Create a definition whose descriptor follows the expanded adapter's format.
  pub fn new(category: &str, type_name: &str, container: &str) -> Self {
    Self {
      category: category.to_string(),
      type_name: type_name.to_string(),
      descriptor: format!("<definition {}/{} in {}>", category, type_name, container),
      ..Self::default()
    }
  }

  pub fn with_section(mut self, section: Section) -> Self {
    self.sections.push(section);
    self
  }

  pub fn with_parameter(mut self, parameter: Parameter) -> Self {
    self.parameters.push(parameter);
    self
  }

  fn access_error(&self, what: &str) -> SourceError {
    SourceError::Access {
      definition: self.descriptor.clone(),
      message: format!("{} unavailable", what),
    }
  }
}

impl DefinitionSource for MemoryDefinition {
  fn descriptor(&self) -> String {
    self.descriptor.clone()
  }

  fn type_name(&self) -> String {
    self.type_name.clone()
  }

  fn type_category(&self) -> Result<String, SourceError> {
    if self.fail_category {
      return Err(self.access_error("category"));
    }
    Ok(self.category.clone())
  }

  fn sections(&self) -> Result<Vec<Section>, SourceError> {
    if self.fail_sections {
      return Err(self.access_error("sections"));
    }
    Ok(self.sections.clone())
  }

  fn parameters(&self) -> Result<Vec<Parameter>, SourceError> {
    if self.fail_parameters {
      return Err(self.access_error("parameters"));
    }
    Ok(self.parameters.clone())
  }
}

/// A container held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
  pub definitions: Vec<MemoryDefinition>,
}

impl MemoryContainer {
  pub fn with_definition(mut self, definition: MemoryDefinition) -> Self {
    self.definitions.push(definition);
    self
  }
}

#[derive(Debug, Default)]
pub struct MemorySource {
  containers: BTreeMap<PathBuf, MemoryContainer>,
  loaded: BTreeSet<PathBuf>,
  failing_install: BTreeSet<PathBuf>,
  failing_load: BTreeSet<PathBuf>,
  install_count: usize,
}

impl MemorySource {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a container under `path`.
  pub fn add(&mut self, path: impl Into<PathBuf>, container: MemoryContainer) {
    self.containers.insert(path.into(), container);
  }

  /// Mark a container as already loaded before any session starts.
  pub fn preload(&mut self, path: impl Into<PathBuf>) {
    self.loaded.insert(path.into());
  }

  pub fn fail_install(&mut self, path: impl Into<PathBuf>) {
    self.failing_install.insert(path.into());
  }

  pub fn fail_load(&mut self, path: impl Into<PathBuf>) {
    self.failing_load.insert(path.into());
  }

  /// Number of successful installs since creation.
  pub fn install_count(&self) -> usize {
    self.install_count
  }
}

impl ContainerSource for MemorySource {
  type Definition = MemoryDefinition;

  fn loaded_files(&self) -> Vec<PathBuf> {
    self.loaded.iter().cloned().collect()
  }

  fn install(&mut self, path: &Path) -> Result<(), SourceError> {
    if self.failing_install.contains(path) || !self.containers.contains_key(path) {
      return Err(SourceError::Install {
        path: path.to_path_buf(),
        message: "host rejected container".to_string(),
      });
    }
    self.loaded.insert(path.to_path_buf());
    self.install_count += 1;
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

  fn definitions(&mut self, path: &Path) -> Result<Vec<MemoryDefinition>, SourceError> {
    if self.failing_load.contains(path) {
      return Err(SourceError::Load {
        path: path.to_path_buf(),
        message: "container is corrupt".to_string(),
      });
    }
    self
      .containers
      .get(path)
      .map(|container| container.definitions.clone())
      .ok_or_else(|| SourceError::Load {
        path: path.to_path_buf(),
        message: "unknown container".to_string(),
      })
  }
}
