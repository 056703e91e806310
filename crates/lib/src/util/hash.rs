//! Identity hashing for output folder names.
//!
//! This module provides:
//! - `Identity`: a 32-character truncated SHA-256 digest of a normalized key
//! - `identity()`: digest a key
//! - `sanitize()`: replace path-hostile characters with underscores
//! - `unique_name()`: `<prefix>_<identity>` made safe for use as a folder name

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::IDENTITY_HEX_LEN;

/// A deterministic digest naming a container or definition.
///
/// The digest is the first 128 bits of the SHA-256 of the key, rendered as
/// lowercase hexadecimal, e.g. `"3f2a9c0d11e84b7aa0c6d2e5f4b1a978"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity(pub String);

impl std::fmt::Display for Identity {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Digest a normalized key.
pub fn identity(key: &str) -> Identity {
  let mut hasher = Sha256::new();
  hasher.update(key.as_bytes());
  let full = format!("{:x}", hasher.finalize());
  Identity(full[..IDENTITY_HEX_LEN].to_string())
}

/// Replace `/`, space and `.` with `_`.
pub fn sanitize(name: &str) -> String {
  name
    .chars()
    .map(|c| match c {
      '/' | ' ' | '.' => '_',
      other => other,
    })
    .collect()
}

/// Build a human-scannable, collision-resistant folder name.
///
/// The digest of `key` is appended to `prefix` and the whole name is sanitized,
/// so `unique_name("/job/sky scraper.hda", "sky scraper.hda")` yields
/// `sky_scraper_hda_<32 hex chars>`.
pub fn unique_name(key: &str, prefix: &str) -> String {
  sanitize(&format!("{}_{}", prefix, identity(key)))
}
