//! Shared helpers for library integration tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use otlx_lib::container::memory::{MemoryContainer, MemoryDefinition, MemorySource};
use otlx_lib::container::{ParmKind, Parameter, ScriptLanguage, Section};
use otlx_lib::extract::{ExtractOptions, ExtractReport, extract};
use otlx_lib::stale::TIMESTAMP_FORMAT;
use tempfile::TempDir;
use walkdir::WalkDir;

pub const PY: ScriptLanguage = ScriptLanguage::Python;
pub const HSCRIPT: ScriptLanguage = ScriptLanguage::Hscript;

/// Isolated extraction workspace: container files in `assets/`, output in `out/`.
pub struct Workspace {
  pub temp: TempDir,
  pub source: MemorySource,
}

impl Workspace {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("assets")).unwrap();
    fs::create_dir_all(temp.path().join("out")).unwrap();
    Self {
      temp,
      source: MemorySource::new(),
    }
  }

  /// Write a placeholder container file and register `container` under its canonical path.
  pub fn add_container(&mut self, name: &str, container: MemoryContainer) -> PathBuf {
    let path = self.temp.path().join("assets").join(name);
    fs::write(&path, name).unwrap();
    let path = dunce::canonicalize(&path).unwrap();
    self.source.add(path.clone(), container);
    path
  }

  pub fn options(&self) -> ExtractOptions {
    ExtractOptions::new(self.temp.path().join("out"))
  }

  pub fn scripts_root(&self) -> PathBuf {
    self.options().scripts_root()
  }

  pub fn run(&mut self, paths: &[PathBuf]) -> ExtractReport {
    let options = self.options();
    extract(paths, &options, &mut self.source).unwrap()
  }
}

/// A `Sop/tower` definition exercising every script kind.
pub fn tower(container: &str) -> MemoryDefinition {
  MemoryDefinition::new("Sop", "tower", container)
    .with_section(Section::new("PythonModule", "def build(kwargs):\n    pass\n", true))
    .with_section(Section::new("OnCreated", "print('created')\n", true))
    .with_section(Section::new("Help", "= Tower =", false))
    .with_parameter(Parameter::new("style", ParmKind::String).with_item_generator("return ['a', 'a']", PY))
    .with_parameter(Parameter::new("mode", ParmKind::Menu).with_item_generator("echo fast", HSCRIPT))
    .with_parameter(
      Parameter::new("count", ParmKind::Integer)
        .with_item_generator("return ['1', 'one']", PY)
        .with_callback("hou.phm().count(kwargs)", PY),
    )
    .with_parameter(Parameter::new("toggle", ParmKind::Other).with_item_generator("return []", PY))
    .with_parameter(Parameter::new("build", ParmKind::Other).with_callback("hou.phm().build(kwargs)", PY))
    .with_parameter(Parameter::new("reset", ParmKind::Other).with_callback("opparm . height 1", HSCRIPT))
}

/// An `Object/empty` definition with no scripts.
pub fn empty(container: &str) -> MemoryDefinition {
  MemoryDefinition::new("Object", "empty", container).with_section(Section::new("Help", "", false))
}

/// Map every file under `root` (relative path) to its contents.
pub fn read_tree(root: &Path) -> BTreeMap<String, String> {
  WalkDir::new(root)
    .sort_by_file_name()
    .into_iter()
    .filter_map(|entry| entry.ok())
    .filter(|entry| entry.file_type().is_file())
    .map(|entry| {
      let relative = entry.path().strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
      (relative, fs::read_to_string(entry.path()).unwrap())
    })
    .collect()
}

/// Whether `value` parses as a ledger timestamp with six fractional digits.
pub fn is_ledger_timestamp(value: &str) -> bool {
  NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).is_ok() && value.rsplit('.').next().map(str::len) == Some(6)
}
