use anyhow::{Context, Result};
use serde::Serialize;

use natpack_platform::{Arch, Os, Platform, artifact_path};

use crate::output::{OutputFormat, print_json};

#[derive(Serialize)]
struct LocateOutput {
  library: String,
  platform: Platform,
  triple: String,
  path: String,
}

pub fn cmd_locate(library: &str, arch: Option<&str>, os: Option<&str>, output: OutputFormat) -> Result<()> {
  let arch = match arch {
    Some(alias) => Arch::from_alias(alias)?,
    None => Arch::current().context("Failed to detect host architecture")?,
  };
  let os = match os {
    Some(alias) => Os::from_alias(alias)?,
    None => Os::current().context("Failed to detect host operating system")?,
  };
  let platform = Platform::new(arch, os);
  let path = artifact_path(library, &platform)?;

  if output.is_json() {
    print_json(&LocateOutput {
      library: library.to_string(),
      platform,
      triple: platform.triple()?,
      path,
    })?;
  } else {
    println!("{}", path);
  }

  Ok(())
}
