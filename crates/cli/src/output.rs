//! Terminal output for extraction runs.
//!
//! Container lines carry a colored marker for what happened to their folder.
//! Skipped inputs share stdout with the log lines reporting them.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use otlx_lib::tree::FolderState;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const WARNING: &str = "⚠";
  pub const CREATED: &str = "+";
  pub const REBUILT: &str = "~";
  pub const REUSED: &str = "=";
}

/// Short label for a container folder state.
pub fn state_label(state: FolderState) -> &'static str {
  match state {
    FolderState::Created => "new",
    FolderState::Rebuilt => "rebuilt",
    FolderState::Reused => "unchanged",
  }
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    format!("{}m {}s", secs / 60, secs % 60)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

/// A skipped input or unreadable definition, on stdout.
pub fn print_skipped(message: &str) {
  println!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stdout, |s| s.yellow()),
    message.if_supports_color(Stream::Stdout, |s| s.yellow())
  );
}

/// One line per extracted container: marker, path, then a dimmed detail.
pub fn print_container(state: FolderState, path: &Path, detail: &str) {
  let marker = match state {
    FolderState::Created => symbols::CREATED.if_supports_color(Stream::Stdout, |s| s.green()).to_string(),
    FolderState::Rebuilt => symbols::REBUILT.if_supports_color(Stream::Stdout, |s| s.yellow()).to_string(),
    FolderState::Reused => symbols::REUSED.if_supports_color(Stream::Stdout, |s| s.dimmed()).to_string(),
  };
  let detail = format!("({}, {})", state_label(state), detail);
  println!(
    "  {} {} {}",
    marker,
    path.display(),
    detail.if_supports_color(Stream::Stdout, |s| s.dimmed())
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
  println!("{}", json);
  Ok(())
}
