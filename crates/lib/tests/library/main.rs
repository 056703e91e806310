//! Integration tests for otlx-lib extraction runs.

mod common;
mod extract_tests;
