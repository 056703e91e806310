//! End-to-end extraction runs against in-memory containers.

use std::fs;
use std::path::PathBuf;

use otlx_lib::consts::{ITEM_GENERATION_DIR, LOG_FILENAME, MAIN_SCRIPTS_DIR, PARAMETER_CALLBACKS_DIR};
use otlx_lib::container::memory::MemoryContainer;
use otlx_lib::container::ContainerSource;
use otlx_lib::extract::SkipReason;
use otlx_lib::ledger::{ContainerLog, RunLedger};
use otlx_lib::tree::{FolderState, container_identity, definition_identity};

use super::common::{Workspace, empty, is_ledger_timestamp, read_tree, tower};

fn tower_container(ws: &mut Workspace, name: &str) -> PathBuf {
  let path = ws.temp.path().join("assets").join(name);
  let descriptor_path = path.display().to_string();
  ws.add_container(
    name,
    MemoryContainer::default()
      .with_definition(tower(&descriptor_path))
      .with_definition(empty(&descriptor_path)),
  )
}

mod layout {
  use super::*;

  #[test]
  fn writes_only_python_scripts_into_category_folders() {
    let mut ws = Workspace::new();
    let path = tower_container(&mut ws, "tower.hda");
    let report = ws.run(&[path.clone()]);

    let definition = tower(&ws.temp.path().join("assets").join("tower.hda").display().to_string());
    let prefix = format!("{}/{}", container_identity(&path), definition_identity(&definition));
    let files: Vec<String> = read_tree(&ws.scripts_root())
      .into_keys()
      .filter(|file| file.starts_with(&prefix))
      .collect();

    assert_eq!(
      files,
      vec![
        format!("{}/{}/count.py", prefix, ITEM_GENERATION_DIR),
        format!("{}/{}/style.py", prefix, ITEM_GENERATION_DIR),
        format!("{}/{}/OnCreated.py", prefix, MAIN_SCRIPTS_DIR),
        format!("{}/{}/PythonModule.py", prefix, MAIN_SCRIPTS_DIR),
        format!("{}/{}/build.py", prefix, PARAMETER_CALLBACKS_DIR),
        format!("{}/{}/count.py", prefix, PARAMETER_CALLBACKS_DIR),
      ]
    );
    assert_eq!(report.files_written(), 6);
  }

  #[test]
  fn script_files_hold_raw_script_text() {
    let mut ws = Workspace::new();
    let path = tower_container(&mut ws, "tower.hda");
    ws.run(&[path.clone()]);

    let tree = read_tree(&ws.scripts_root());
    let module = tree
      .iter()
      .find(|(file, _)| file.ends_with("/PythonModule.py"))
      .map(|(_, contents)| contents.as_str());
    assert_eq!(module, Some("def build(kwargs):\n    pass\n"));
  }

  #[test]
  fn definition_without_scripts_gets_empty_folder() {
    let mut ws = Workspace::new();
    let path = tower_container(&mut ws, "tower.hda");
    ws.run(&[path.clone()]);

    let definition = empty(&ws.temp.path().join("assets").join("tower.hda").display().to_string());
    let folder = ws
      .scripts_root()
      .join(container_identity(&path))
      .join(definition_identity(&definition));
    assert!(folder.is_dir());
    assert_eq!(fs::read_dir(&folder).unwrap().count(), 0);
  }

  #[test]
  fn separate_outputs_get_identical_trees() {
    let mut ws = Workspace::new();
    let path = tower_container(&mut ws, "tower.hda");
    let first = ws.run(&[path.clone()]);

    let other = ws.temp.path().join("elsewhere");
    let options = otlx_lib::extract::ExtractOptions::new(&other);
    let second = otlx_lib::extract::extract(&[path], &options, &mut ws.source).unwrap();

    assert_eq!(first.containers[0].identity, second.containers[0].identity);
    assert_eq!(read_tree(&ws.scripts_root()), read_tree(&options.scripts_root()));
  }
}

mod ledger {
  use super::*;

  #[test]
  fn single_container_scenario() {
    let mut ws = Workspace::new();
    let path = tower_container(&mut ws, "tower.hda");
    ws.run(&[path.clone()]);

    let ledger = RunLedger::load(&ws.scripts_root()).unwrap();
    assert_eq!(ledger.len(), 1);
    let record = ledger.get(&container_identity(&path)).unwrap();
    assert_eq!(record.file_path, path.display().to_string());
    assert!(is_ledger_timestamp(&record.last_mod_time), "{}", record.last_mod_time);

    let log = ContainerLog::load(&ws.scripts_root().join(container_identity(&path))).unwrap();
    assert_eq!(log.len(), 2);
    let assets = ws.temp.path().join("assets").join("tower.hda").display().to_string();
    assert_eq!(log.get(&definition_identity(&tower(&assets))), Some("Sop/tower"));
    assert_eq!(log.get(&definition_identity(&empty(&assets))), Some("Object/empty"));
  }

  #[test]
  fn root_ledger_holds_only_this_runs_containers() {
    let mut ws = Workspace::new();
    let a = tower_container(&mut ws, "a.hda");
    let b = tower_container(&mut ws, "b.hda");

    ws.run(&[a.clone()]);
    ws.run(&[b.clone()]);

    let ledger = RunLedger::load(&ws.scripts_root()).unwrap();
    assert_eq!(ledger.len(), 1);
    assert!(ledger.get(&container_identity(&b)).is_some());
    assert!(ws.scripts_root().join(container_identity(&a)).is_dir());
  }

  #[test]
  fn container_dropped_from_ledger_is_rebuilt_next_time() {
    let mut ws = Workspace::new();
    let a = tower_container(&mut ws, "a.hda");
    let b = tower_container(&mut ws, "b.hda");

    ws.run(&[a.clone()]);
    ws.run(&[b]);
    let report = ws.run(&[a]);

    assert_eq!(report.containers[0].state, FolderState::Rebuilt);
    assert_eq!(report.files_written(), 6);
  }
}

mod caching {
  use super::*;

  #[test]
  fn unchanged_rerun_touches_nothing() {
    let mut ws = Workspace::new();
    let path = tower_container(&mut ws, "tower.hda");
    ws.run(&[path.clone()]);
    let before = read_tree(&ws.scripts_root());

    let report = ws.run(&[path]);

    assert_eq!(report.containers[0].state, FolderState::Reused);
    assert_eq!(report.files_written(), 0);
    assert_eq!(report.files_existing(), 6);
    assert_eq!(read_tree(&ws.scripts_root()), before);
  }

  #[test]
  fn existing_script_is_never_overwritten() {
    let mut ws = Workspace::new();
    let path = tower_container(&mut ws, "tower.hda");
    ws.run(&[path.clone()]);

    let tree = read_tree(&ws.scripts_root());
    let (module, _) = tree.iter().find(|(file, _)| file.ends_with("/PythonModule.py")).unwrap();
    let module = ws.scripts_root().join(module);
    fs::write(&module, "SENTINEL").unwrap();

    ws.run(&[path]);
    assert_eq!(fs::read_to_string(&module).unwrap(), "SENTINEL");
  }

  #[test]
  fn modified_container_is_rebuilt_from_scratch() {
    let mut ws = Workspace::new();
    let path = tower_container(&mut ws, "tower.hda");
    ws.run(&[path.clone()]);

    let folder = ws.scripts_root().join(container_identity(&path));
    fs::write(folder.join("leftover.txt"), "stale").unwrap();

    let mut ledger = RunLedger::load(&ws.scripts_root()).unwrap();
    let mut record = ledger.get(&container_identity(&path)).unwrap().clone();
    record.last_mod_time = "2000-01-01 00:00:00.000000".to_string();
    ledger.insert(container_identity(&path), record);
    ledger.save(&ws.scripts_root()).unwrap();

    let report = ws.run(&[path]);

    assert_eq!(report.containers[0].state, FolderState::Rebuilt);
    assert_eq!(report.files_written(), 6);
    assert!(!folder.join("leftover.txt").exists());
  }

  #[test]
  fn folder_without_ledger_is_rebuilt() {
    let mut ws = Workspace::new();
    let path = tower_container(&mut ws, "tower.hda");
    ws.run(&[path.clone()]);
    fs::remove_file(ws.scripts_root().join(LOG_FILENAME)).unwrap();

    let report = ws.run(&[path]);
    assert_eq!(report.containers[0].state, FolderState::Rebuilt);
  }
}

mod failures {
  use super::*;

  #[test]
  fn missing_middle_path_does_not_stop_the_run() {
    let mut ws = Workspace::new();
    let a = tower_container(&mut ws, "a.hda");
    let missing = ws.temp.path().join("assets").join("missing.hda");
    let c = tower_container(&mut ws, "c.hda");

    let report = ws.run(&[a.clone(), missing.clone(), c.clone()]);

    assert_eq!(report.containers.len(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].path, missing);
    assert_eq!(report.skipped[0].reason, SkipReason::InvalidPath);

    let ledger = RunLedger::load(&ws.scripts_root()).unwrap();
    assert_eq!(ledger.len(), 2);
    assert!(ledger.get(&container_identity(&a)).is_some());
    assert!(ledger.get(&container_identity(&c)).is_some());
  }

  #[test]
  fn unloadable_container_is_skipped() {
    let mut ws = Workspace::new();
    let broken = tower_container(&mut ws, "broken.hda");
    let good = tower_container(&mut ws, "good.hda");
    ws.source.fail_load(broken.clone());

    let report = ws.run(&[broken.clone(), good]);

    assert_eq!(report.skipped[0].reason, SkipReason::Load);
    assert_eq!(report.containers.len(), 1);
    assert!(!ws.scripts_root().join(container_identity(&broken)).exists());
  }

  #[test]
  fn unreadable_definition_is_abandoned_alone() {
    let mut ws = Workspace::new();
    let assets = ws.temp.path().join("assets").join("tower.hda").display().to_string();
    let mut broken = empty(&assets);
    broken.fail_parameters = true;
    let path = ws.add_container(
      "tower.hda",
      MemoryContainer::default()
        .with_definition(broken.clone())
        .with_definition(tower(&assets)),
    );

    let report = ws.run(&[path.clone()]);

    let folder = ws.scripts_root().join(container_identity(&path));
    let log = ContainerLog::load(&folder).unwrap();
    assert_eq!(report.containers[0].abandoned_definitions, 1);
    assert_eq!(report.files_written(), 6);
    assert_eq!(log.len(), 1);
    assert!(log.get(&definition_identity(&broken)).is_none());
    assert!(!folder.join(definition_identity(&broken)).exists());
  }
}

mod session {
  use super::*;

  #[test]
  fn host_returns_to_preloaded_state() {
    let mut ws = Workspace::new();
    let preloaded = tower_container(&mut ws, "preloaded.hda");
    let a = tower_container(&mut ws, "a.hda");
    ws.source.preload(preloaded.clone());

    ws.run(&[a]);
    assert_eq!(ws.source.loaded_files(), vec![preloaded]);
  }

  #[test]
  fn host_is_released_when_run_aborts() {
    let mut ws = Workspace::new();
    let a = tower_container(&mut ws, "a.hda");
    let root = ws.scripts_root();
    ws.run(&[a.clone()]);

    // A folder where the container log should go makes the log write fail.
    let folder = root.join(container_identity(&a));
    fs::remove_file(folder.join(LOG_FILENAME)).unwrap();
    fs::create_dir(folder.join(LOG_FILENAME)).unwrap();

    let options = ws.options();
    let result = otlx_lib::extract::extract(&[a], &options, &mut ws.source);
    assert!(result.is_err());
    assert!(ws.source.loaded_files().is_empty());
  }
}
