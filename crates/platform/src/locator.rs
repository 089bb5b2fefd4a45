//! Resource path naming for bundled native libraries
//!
//! Every artifact lives at the package root as
//! `/<library>-<triple>.<extension>`, e.g. `/mylib-x86_64-unknown-linux-gnu.so`.

use crate::error::PlatformError;
use crate::platform::Platform;

/// Build the absolute resource path of an artifact.
///
/// No existence check happens here.
pub fn resource_path(library_name: &str, triple: &str, extension: &str) -> String {
  format!("/{library_name}-{triple}.{extension}")
}

/// Resource path of `library_name` built for `platform`
pub fn artifact_path(library_name: &str, platform: &Platform) -> Result<String, PlatformError> {
  let triple = platform.triple()?;
  Ok(resource_path(library_name, &triple, platform.lib_extension()))
}

/// Resource path of `library_name` built for the running host
pub fn host_artifact_path(library_name: &str) -> Result<String, PlatformError> {
  let platform = Platform::current()?;
  artifact_path(library_name, &platform)
}
