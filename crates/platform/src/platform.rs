//! Combined architecture + operating system identifier and triple rendering

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arch::Arch;
use crate::error::PlatformError;
use crate::os::Os;

/// Render the Rust target triple for an architecture/OS pair.
///
/// Pure and deterministic. Fails only for architectures without a Rust target.
pub fn triple(arch: Arch, os: Os) -> Result<String, PlatformError> {
  Ok(format!("{}-{}", arch.triple_part()?, os.triple_part(arch)))
}

/// Platform identifier combining architecture and OS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Platform {
  pub arch: Arch,
  pub os: Os,
}

impl Platform {
  /// Create a new platform identifier
  pub const fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  /// Detect the host platform, reusing the per-process detection results
  pub fn current() -> Result<Self, PlatformError> {
    Ok(Self {
      arch: Arch::current()?,
      os: Os::current()?,
    })
  }

  /// Returns the Rust target triple (e.g. "x86_64-unknown-linux-gnu")
  pub fn triple(&self) -> Result<String, PlatformError> {
    triple(self.arch, self.os)
  }

  /// File extension of a dynamic library on this platform
  pub fn lib_extension(&self) -> &'static str {
    self.os.lib_extension()
  }

  /// Every architecture/OS pair that has a target triple.
  ///
  /// A package that wants to run everywhere embeds one artifact per entry.
  pub fn all_supported() -> Vec<Platform> {
    Os::ALL
      .iter()
      .flat_map(|os| Arch::ALL.iter().map(move |arch| Platform::new(*arch, *os)))
      .filter(|platform| platform.triple().is_ok())
      .collect()
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.arch, self.os)
  }
}
