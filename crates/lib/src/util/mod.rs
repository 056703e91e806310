//! Shared utilities.
//!
//! Common utilities used across the crate including identity hashing and test helpers.

pub mod hash;
