//! Error types for natpack-lib

use std::io;
use std::path::PathBuf;

use natpack_platform::PlatformError;
use serde::Serialize;
use thiserror::Error;

/// Error returned by the native linker
pub type LinkError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while extracting and loading a native library
#[derive(Debug, Error)]
pub enum LoadError {
  /// The host platform is unknown or has no artifact naming.
  #[error(transparent)]
  Platform(#[from] PlatformError),

  #[error("Invalid resource path {path:?}: {reason}")]
  InvalidResourcePath { path: String, reason: &'static str },

  /// The package has no entry at this path.
  #[error("File {path} was not found inside {package}")]
  ResourceNotFound { path: String, package: String },

  #[error("Failed to create temp directory {path}: {source}")]
  DirectoryCreationFailed {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Reading the resource or writing the extracted file failed.
  #[error("Failed to extract {resource} to {path}: {source}")]
  CopyFailed {
    resource: String,
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("Failed to load native library {path}: {source}")]
  NativeLoadFailed {
    path: PathBuf,
    #[source]
    source: LinkError,
  },
}

/// Coarse classification of a failed load attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
  Platform,
  BadArgument,
  ResourceNotFound,
  DirectoryCreation,
  CopyIo,
  NativeLoad,
}

impl LoadError {
  pub fn reason(&self) -> FailureReason {
    match self {
      Self::Platform(_) => FailureReason::Platform,
      Self::InvalidResourcePath { .. } => FailureReason::BadArgument,
      Self::ResourceNotFound { .. } => FailureReason::ResourceNotFound,
      Self::DirectoryCreationFailed { .. } => FailureReason::DirectoryCreation,
      Self::CopyFailed { .. } => FailureReason::CopyIo,
      Self::NativeLoadFailed { .. } => FailureReason::NativeLoad,
    }
  }

  /// True when the host platform could not be recognized
  pub fn is_unknown_platform(&self) -> bool {
    matches!(self, Self::Platform(e) if e.is_unknown_platform())
  }

  /// True when the host platform is recognized but can never have an artifact
  pub fn is_unsupported_platform(&self) -> bool {
    matches!(self, Self::Platform(e) if e.is_unsupported_platform())
  }

  /// True for failures detected before any I/O happened
  pub fn is_deterministic(&self) -> bool {
    matches!(self, Self::Platform(_) | Self::InvalidResourcePath { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use natpack_platform::Arch;
  use std::error::Error as _;

  #[test]
  fn platform_errors_keep_their_kind() {
    let unknown = LoadError::from(PlatformError::UnknownOs("beos".into()));
    assert!(unknown.is_unknown_platform());
    assert!(!unknown.is_unsupported_platform());
    assert_eq!(unknown.reason(), FailureReason::Platform);

    let unsupported = LoadError::from(PlatformError::UnsupportedArch(Arch::PpcLe32));
    assert!(unsupported.is_unsupported_platform());
    assert!(!unsupported.is_unknown_platform());
  }

  #[test]
  fn not_found_and_copy_failures_are_distinct() {
    let missing = LoadError::ResourceNotFound {
      path: "/foo-x86_64-unknown-linux-gnu.so".into(),
      package: "package dir /opt/app".into(),
    };
    let copy = LoadError::CopyFailed {
      resource: "/foo-x86_64-unknown-linux-gnu.so".into(),
      path: PathBuf::from("/tmp/natpack1/foo-x86_64-unknown-linux-gnu.so"),
      source: io::Error::other("disk full"),
    };

    assert_ne!(missing.reason(), copy.reason());
    assert!(missing.to_string().contains("was not found inside"));
    assert!(copy.source().unwrap().to_string().contains("disk full"));
  }

  #[test]
  fn only_argument_and_platform_errors_are_deterministic() {
    let bad = LoadError::InvalidResourcePath {
      path: "foo.so".into(),
      reason: "the path has to be absolute",
    };
    assert!(bad.is_deterministic());

    let dir = LoadError::DirectoryCreationFailed {
      path: PathBuf::from("/nope/natpack1"),
      source: io::Error::from(io::ErrorKind::NotFound),
    };
    assert!(!dir.is_deterministic());
    assert_eq!(dir.reason(), FailureReason::DirectoryCreation);
  }
}
