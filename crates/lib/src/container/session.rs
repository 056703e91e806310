//! Scoped host session.
//!
//! A [`Session`] records which containers the host had loaded when it began.
//! Every container loaded after that point is uninstalled when the session is
//! dropped, so the host's loaded set returns to its starting state on success
//! and on error paths alike.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use super::{ContainerSource, SourceError};

pub struct Session<'a, S: ContainerSource> {
  source: &'a mut S,
  baseline: BTreeSet<PathBuf>,
}

impl<'a, S: ContainerSource> Session<'a, S> {
  /// Start a session, snapshotting the host's currently loaded containers.
  pub fn begin(source: &'a mut S) -> Self {
    let baseline: BTreeSet<PathBuf> = source.loaded_files().into_iter().collect();
    debug!(preloaded = baseline.len(), "host session started");
    Self { source, baseline }
  }

  /// Modification time of a container as the source sees it.
  pub fn modified(&self, path: &Path) -> io::Result<SystemTime> {
    self.source.modified(path)
  }

  /// Install a container and enumerate its definitions.
  pub fn open(&mut self, path: &Path) -> Result<Vec<S::Definition>, SourceError> {
    self.source.install(path)?;
    self.source.definitions(path)
  }

  /// Containers loaded since the session began.
  pub fn acquired(&self) -> Vec<PathBuf> {
    self
      .source
      .loaded_files()
      .into_iter()
      .filter(|path| !self.baseline.contains(path))
      .collect()
  }
}

impl<S: ContainerSource> Drop for Session<'_, S> {
  fn drop(&mut self) {
    for path in self.acquired() {
      match self.source.uninstall(&path) {
        Ok(()) => debug!(path = %path.display(), "uninstalled container"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to uninstall container"),
      }
    }
  }
}
