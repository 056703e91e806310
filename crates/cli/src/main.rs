mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgGroup, Parser};
use tracing_subscriber::EnvFilter;

use otlx_lib::consts::DEFAULT_FOLDER_NAME;

use crate::output::OutputFormat;

/// Extract embedded Python scripts from digital asset containers.
#[derive(Parser)]
#[command(name = "otlx")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("input").required(true).multiple(true).args(["otl_paths_file", "otl"])))]
struct Cli {
  /// Text file listing container paths, one per line
  #[arg(short = 'f', long)]
  otl_paths_file: Option<PathBuf>,

  /// Container paths to extract
  #[arg(short = 'o', long, num_args = 1..)]
  otl: Vec<PathBuf>,

  /// Name of the output folder
  #[arg(short, long, default_value = DEFAULT_FOLDER_NAME)]
  name: String,

  /// Directory the output folder is created in
  #[arg(short, long)]
  directory: Option<PathBuf>,

  /// Summary format
  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  format: OutputFormat,

  /// Enable verbose output
  #[arg(short, long)]
  verbose: bool,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  let subscriber = tracing_subscriber::fmt().with_env_filter(filter).without_time();
  // Keep stdout parseable when it carries the JSON report.
  if cli.format.is_json() {
    subscriber.with_writer(std::io::stderr).init();
  } else {
    subscriber.init();
  }

  cmd::cmd_extract(
    cmd::ExtractArgs {
      otl_paths_file: cli.otl_paths_file,
      otl: cli.otl,
      name: cli.name,
      directory: cli.directory,
    },
    cli.format,
  )
}
