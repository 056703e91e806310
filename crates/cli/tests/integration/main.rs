//! CLI integration tests for otlx.
