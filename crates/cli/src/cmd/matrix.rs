use anyhow::Result;
use serde::Serialize;

use natpack_platform::{Platform, artifact_path};

use crate::output::{OutputFormat, print_json};

#[derive(Serialize)]
struct MatrixEntry {
  platform: String,
  triple: String,
  path: String,
}

pub fn cmd_matrix(library: &str, output: OutputFormat) -> Result<()> {
  let entries = matrix(library)?;

  if output.is_json() {
    return print_json(&entries);
  }

  let width = entries.iter().map(|e| e.platform.len()).max().unwrap_or(0);
  for entry in &entries {
    println!("{:<width$}  {}", entry.platform, entry.path);
  }
  Ok(())
}

fn matrix(library: &str) -> Result<Vec<MatrixEntry>> {
  Platform::all_supported()
    .into_iter()
    .map(|platform| {
      Ok(MatrixEntry {
        platform: platform.to_string(),
        triple: platform.triple()?,
        path: artifact_path(library, &platform)?,
      })
    })
    .collect()
}
