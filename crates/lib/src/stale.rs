//! Change detection for previously extracted containers.
//!
//! A container's output is current only while the modification time recorded
//! in the ledger is exactly the container's modification time now. Any drift
//! invalidates the whole container subtree, even when the embedded scripts
//! are byte-identical.

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use walkdir::WalkDir;

use crate::ledger::LedgerRecord;

/// Format used for recorded modification times, e.g. `2024-03-01 14:02:11.482913`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Render a filesystem time as local wall-clock text.
pub fn format_timestamp(time: SystemTime) -> String {
  let local: DateTime<Local> = time.into();
  local.format(TIMESTAMP_FORMAT).to_string()
}

/// Modification time of `path` itself.
pub fn file_modified(path: &Path) -> io::Result<SystemTime> {
  fs::metadata(path)?.modified()
}

/// Newest modification time of `path` and everything below it.
///
/// A directory's own mtime does not move when a file inside it is edited, so
/// containers stored as directories are dated by their newest entry.
pub fn newest_modified(path: &Path) -> io::Result<SystemTime> {
  let mut newest = file_modified(path)?;
  for entry in WalkDir::new(path).min_depth(1) {
    let modified = entry?.metadata()?.modified()?;
    newest = newest.max(modified);
  }
  Ok(newest)
}

/// Whether previously extracted output for a container must be rebuilt.
///
/// True when no record exists or when the recorded time differs from `current`.
pub fn is_stale(current: &str, prior: Option<&LedgerRecord>) -> bool {
  match prior {
    Some(record) => record.last_mod_time != current,
    None => true,
  }
}
