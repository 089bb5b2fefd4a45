//! Loader configuration.
//!
//! Defaults come from the environment (`NATPACK_TMPDIR`, `NATPACK_CLEANUP`)
//! when built with [`LoaderConfig::from_env`]; tests and embedders can set
//! every field directly.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::consts::{CLEANUP_ENV, EXTRACT_DIR_PREFIX, TMPDIR_ENV};

/// What happens to an extracted library file once it has been loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupMode {
  /// Delete immediately when the temp filesystem allows unlinking open files,
  /// otherwise defer to process exit.
  #[default]
  Auto,
  /// Always try to delete right after loading.
  Immediate,
  /// Always defer deletion to process exit.
  Deferred,
}

impl CleanupMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Auto => "auto",
      Self::Immediate => "immediate",
      Self::Deferred => "deferred",
    }
  }
}

impl fmt::Display for CleanupMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for CleanupMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "auto" => Ok(Self::Auto),
      "immediate" => Ok(Self::Immediate),
      "deferred" => Ok(Self::Deferred),
      other => Err(format!("unknown cleanup mode: {other}")),
    }
  }
}

/// Settings for a [`NativeLoader`](crate::extract::NativeLoader)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
  /// Directory the extraction directory is created in. `None` means the
  /// system temp directory.
  pub temp_dir: Option<PathBuf>,

  /// Name prefix of the extraction directory.
  pub dir_prefix: String,

  /// Cleanup policy for extracted files.
  pub cleanup: CleanupMode,
}

impl Default for LoaderConfig {
  fn default() -> Self {
    Self {
      temp_dir: None,
      dir_prefix: EXTRACT_DIR_PREFIX.to_string(),
      cleanup: CleanupMode::Auto,
    }
  }
}

impl LoaderConfig {
  /// Build a config from the environment.
  ///
  /// An unparseable `NATPACK_CLEANUP` is logged and ignored.
  pub fn from_env() -> Self {
    let mut config = Self::default();

    if let Ok(dir) = std::env::var(TMPDIR_ENV)
      && !dir.is_empty()
    {
      config.temp_dir = Some(PathBuf::from(dir));
    }

    if let Ok(value) = std::env::var(CLEANUP_ENV) {
      match value.parse() {
        Ok(mode) => config.cleanup = mode,
        Err(e) => warn!(var = CLEANUP_ENV, error = %e, "ignoring invalid cleanup mode"),
      }
    }

    config
  }

  /// Set the base directory for extraction.
  pub fn temp_dir<T>(mut self, val: T) -> Self
  where
    T: Into<PathBuf>,
  {
    self.temp_dir = Some(val.into());
    self
  }

  /// Set the extraction directory prefix.
  pub fn dir_prefix<T>(mut self, val: T) -> Self
  where
    T: AsRef<str>,
  {
    self.dir_prefix = val.as_ref().to_string();
    self
  }

  /// Set the cleanup policy.
  pub fn cleanup(mut self, mode: CleanupMode) -> Self {
    self.cleanup = mode;
    self
  }

  /// The base directory extraction happens under
  pub fn resolved_temp_dir(&self) -> PathBuf {
    self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
  }
}
