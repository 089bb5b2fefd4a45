//! The per-process directory extracted libraries are written to.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use super::cleanup;
use crate::config::LoaderConfig;
use crate::error::LoadError;

/// A lazily created extraction directory.
///
/// The first [`ensure_dir`](ExtractionArea::ensure_dir) call creates
/// `<base>/<prefix><nanos>`; every later call, from any thread, returns that
/// same directory.
#[derive(Debug)]
pub struct ExtractionArea {
  base: PathBuf,
  prefix: String,
  dir: Mutex<Option<PathBuf>>,
}

impl ExtractionArea {
  pub fn new(base: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
    Self {
      base: base.into(),
      prefix: prefix.into(),
      dir: Mutex::new(None),
    }
  }

  pub fn from_config(config: &LoaderConfig) -> Self {
    Self::new(config.resolved_temp_dir(), config.dir_prefix.clone())
  }

  /// The process-wide area, configured from the environment on first use
  pub fn global() -> Arc<ExtractionArea> {
    static GLOBAL: OnceLock<Arc<ExtractionArea>> = OnceLock::new();
    GLOBAL
      .get_or_init(|| Arc::new(Self::from_config(&LoaderConfig::from_env())))
      .clone()
  }

  /// Directory the extraction directory is created in
  pub fn base(&self) -> &Path {
    &self.base
  }

  /// The extraction directory, if it has been created
  pub fn dir(&self) -> Option<PathBuf> {
    self.dir.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Return the extraction directory, creating it on first use.
  ///
  /// The new directory is scheduled for removal at process exit. A failed
  /// creation is not cached; the next call tries again.
  pub fn ensure_dir(&self) -> Result<PathBuf, LoadError> {
    let mut dir = self.dir.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = dir.as_ref() {
      return Ok(existing.clone());
    }

    let created = self.create()?;
    *dir = Some(created.clone());
    Ok(created)
  }

  fn create(&self) -> Result<PathBuf, LoadError> {
    let nanos = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .unwrap_or_default()
      .as_nanos();
    let path = self.base.join(format!("{}{}", self.prefix, nanos));

    std::fs::create_dir(&path).map_err(|source| LoadError::DirectoryCreationFailed {
      path: path.clone(),
      source,
    })?;
    cleanup::register(&path);

    debug!(path = ?path, "created extraction directory");
    Ok(path)
  }
}
