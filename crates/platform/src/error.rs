//! Error types for natpack-platform

use thiserror::Error;

use crate::arch::Arch;

/// Errors that can occur while identifying the host platform
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
  /// The host reported an architecture string that matches no known alias.
  #[error("Unknown architecture: {0}")]
  UnknownArch(String),

  /// The host reported an operating system string that matches no known alias.
  #[error("Unknown operating system: {0}")]
  UnknownOs(String),

  /// The architecture was recognized but has no target triple.
  #[error("{0} is not supported by the Rust toolchain")]
  UnsupportedArch(Arch),
}

impl PlatformError {
  /// True for failures caused by an unrecognized host string.
  pub fn is_unknown_platform(&self) -> bool {
    matches!(self, Self::UnknownArch(_) | Self::UnknownOs(_))
  }

  /// True for a recognized platform that can never have an artifact.
  pub fn is_unsupported_platform(&self) -> bool {
    matches!(self, Self::UnsupportedArch(_))
  }
}
