use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::debug;

use natpack_lib::resource::open_package;
use natpack_platform::{Platform, artifact_path};

use crate::output::{OutputFormat, print_info, print_json, print_success, print_warning};

#[derive(Serialize)]
struct CheckEntry {
  platform: String,
  path: String,
  present: bool,
}

#[derive(Serialize)]
struct CheckOutput {
  package: String,
  host: Option<String>,
  host_present: bool,
  entries: Vec<CheckEntry>,
}

pub fn cmd_check(library: &str, package: &Path, output: OutputFormat) -> Result<()> {
  let source = open_package(package).with_context(|| format!("Failed to open package: {}", package.display()))?;
  debug!(package = %source.describe(), "opened package");

  let mut entries = Vec::new();
  for platform in Platform::all_supported() {
    let path = artifact_path(library, &platform)?;
    let present = source
      .contains(&path)
      .with_context(|| format!("Failed to read {} from {}", path, source.describe()))?;
    entries.push(CheckEntry {
      platform: platform.to_string(),
      path,
      present,
    });
  }

  let host = Platform::current().ok();
  let host_name = host.map(|p| p.to_string());
  let host_present = host_name
    .as_ref()
    .is_some_and(|name| entries.iter().any(|e| e.present && e.platform == *name));

  if output.is_json() {
    return print_json(&CheckOutput {
      package: source.describe(),
      host: host_name,
      host_present,
      entries,
    });
  }

  let found: Vec<_> = entries.iter().filter(|e| e.present).collect();
  if found.is_empty() {
    bail!("{} has no builds of {}", source.describe(), library);
  }

  print_info(&format!("{}: {} of {} platforms", source.describe(), found.len(), entries.len()));
  for entry in &found {
    println!("  {} {}", entry.platform, entry.path);
  }

  match host_name {
    Some(name) if host_present => print_success(&format!("Host platform {} is covered", name)),
    Some(name) => print_warning(&format!("Host platform {} is not covered", name)),
    None => print_warning("Host platform could not be detected"),
  }

  Ok(())
}
