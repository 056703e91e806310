//! otlx-lib: script extraction from digital asset containers
//!
//! This crate provides the pieces of an extraction run:
//! - `container`: the host seam (`ContainerSource`, `DefinitionSource`) and its adapters
//! - `tree`: deterministic folder names and the stale-folder rebuild
//! - `materialize`: writing a definition's Python scripts, write-once
//! - `ledger`: the root and per-container `log.json` files
//! - `extract`: the run orchestrator tying them together

pub mod consts;
pub mod container;
pub mod extract;
pub mod ledger;
pub mod materialize;
pub mod stale;
pub mod tree;
pub mod util;
