use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::warn;

use otlx_lib::container::expanded::ExpandedSource;
use otlx_lib::extract::{ExtractOptions, ExtractReport, extract, read_path_list};

use crate::output::{
  OutputFormat, format_duration, print_container, print_json, print_stat, print_skipped, print_success,
};

/// Inputs of an extraction run as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ExtractArgs {
  pub otl_paths_file: Option<PathBuf>,
  pub otl: Vec<PathBuf>,
  pub name: String,
  pub directory: Option<PathBuf>,
}

/// Output directory: explicit override, else the list file's directory, else the working directory.
fn output_dir(args: &ExtractArgs) -> Result<PathBuf> {
  if let Some(dir) = &args.directory {
    return Ok(dir.clone());
  }
  if let Some(list) = &args.otl_paths_file
    && let Some(parent) = list.parent()
    && !parent.as_os_str().is_empty()
  {
    return Ok(parent.to_path_buf());
  }
  std::env::current_dir().context("Failed to determine current directory")
}

fn input_paths(args: &ExtractArgs) -> Result<Vec<PathBuf>> {
  match &args.otl_paths_file {
    Some(list) => {
      if !args.otl.is_empty() {
        warn!("both a container list and container paths were given, using the list");
      }
      read_path_list(list).with_context(|| format!("Failed to read container list {}", list.display()))
    }
    None => Ok(args.otl.clone()),
  }
}

pub fn cmd_extract(args: ExtractArgs, output: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let paths = input_paths(&args)?;
  let options = ExtractOptions::new(output_dir(&args)?).with_folder_name(&args.name);

  let mut source = ExpandedSource::new();
  let report = extract(&paths, &options, &mut source).context("Extraction failed")?;

  if output.is_json() {
    print_json(&report)?;
  } else {
    print_summary(&report, &options.scripts_root());
    print_stat("Duration", &format_duration(start.elapsed()));
  }

  Ok(())
}

fn print_summary(report: &ExtractReport, scripts_root: &Path) {
  println!();
  print_success("Extraction complete!");
  print_stat("Output", &scripts_root.display().to_string());

  for container in &report.containers {
    print_container(
      container.state,
      &container.file_path,
      &format!("{} definitions, {} scripts written", container.definitions, container.files.written),
    );
    if container.abandoned_definitions > 0 {
      print_skipped(&format!(
        "{} definitions of {} could not be read",
        container.abandoned_definitions,
        container.file_path.display()
      ));
    }
  }

  for skipped in &report.skipped {
    print_skipped(&format!("Skipped {}: {}", skipped.path.display(), skipped.message));
  }

  print_stat("Containers", &report.containers.len().to_string());
  print_stat("Skipped", &report.skipped.len().to_string());
  print_stat("Scripts written", &report.files_written().to_string());
  print_stat("Scripts already present", &report.files_existing().to_string());
}
