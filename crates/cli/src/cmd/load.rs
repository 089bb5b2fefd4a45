use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use natpack_lib::resource::open_package;
use natpack_lib::{Cleanup, NativeLoader};

use crate::output::{OutputFormat, print_json, print_stat, print_success};

#[derive(Serialize)]
struct LoadOutput {
  resource: String,
  extracted_to: String,
  cleanup: Cleanup,
  size: Option<u64>,
}

pub fn cmd_load(library: &str, package: &Path, resource: Option<&str>, output: OutputFormat) -> Result<()> {
  let source = open_package(package).with_context(|| format!("Failed to open package: {}", package.display()))?;
  debug!(package = %source.describe(), "opened package");
  let loader = NativeLoader::new(source);

  let loaded = match resource {
    Some(path) => loader.load_library(path)?,
    None => loader.load(library)?,
  };
  let size = std::fs::metadata(loaded.extracted_path()).ok().map(|m| m.len());

  let result = LoadOutput {
    resource: loaded.resource_path().to_string(),
    extracted_to: loaded.extracted_path().display().to_string(),
    cleanup: loaded.cleanup(),
    size,
  };

  if output.is_json() {
    return print_json(&result);
  }

  print_success(&format!("Loaded {}", result.resource));
  print_stat("Extracted to", &result.extracted_to);
  print_stat(
    "Cleanup",
    match result.cleanup {
      Cleanup::Deleted => "deleted",
      Cleanup::Deferred => "deferred until exit",
    },
  );
  if let Some(size) = result.size {
    print_stat("Size", &crate::output::format_bytes(size));
  }

  Ok(())
}
