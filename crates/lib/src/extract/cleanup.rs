//! Best-effort deletion of extracted files at process exit.
//!
//! Paths are removed in reverse registration order from a `libc::atexit`
//! handler, so files go before the extraction directory holding them. Nothing
//! runs if the process is killed or aborts.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once, PoisonError};

use tracing::{debug, warn};

static PENDING: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());
static INSTALL_HOOK: Once = Once::new();

/// Schedule `path` for deletion when the process exits normally.
pub fn register(path: &Path) {
  INSTALL_HOOK.call_once(install_hook);

  let mut pending = PENDING.lock().unwrap_or_else(PoisonError::into_inner);
  if !pending.iter().any(|p| p == path) {
    debug!(path = ?path, "scheduled for deletion at exit");
    pending.push(path.to_path_buf());
  }
}

/// Whether `path` is scheduled for deletion at exit
pub fn is_registered(path: &Path) -> bool {
  let pending = PENDING.lock().unwrap_or_else(PoisonError::into_inner);
  pending.iter().any(|p| p == path)
}

fn install_hook() {
  // SAFETY: `run_pending` is a plain `extern "C" fn()` that never unwinds.
  let rc = unsafe { libc::atexit(run_pending) };
  if rc != 0 {
    warn!("could not install exit hook, extracted libraries will be left behind");
  }
}

extern "C" fn run_pending() {
  let paths = match PENDING.lock() {
    Ok(mut pending) => std::mem::take(&mut *pending),
    Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
  };

  for path in paths.iter().rev() {
    remove_path(path);
  }
}

fn remove_path(path: &Path) {
  let _ = if path.is_dir() {
    std::fs::remove_dir_all(path)
  } else {
    std::fs::remove_file(path)
  };
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn register_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("libdemo.so");

    register(&path);
    register(&path);

    let pending = PENDING.lock().unwrap();
    assert_eq!(pending.iter().filter(|p| **p == path).count(), 1);
  }

  #[test]
  fn unregistered_paths_are_reported() {
    let temp = TempDir::new().unwrap();
    assert!(!is_registered(&temp.path().join("never-registered.so")));
  }

  #[test]
  fn remove_path_handles_files_and_directories() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("natpack123");
    std::fs::create_dir(&dir).unwrap();
    let file = dir.join("libdemo.so");
    std::fs::write(&file, b"x").unwrap();
    let other = temp.path().join("libother.so");
    std::fs::write(&other, b"y").unwrap();

    remove_path(&other);
    remove_path(&dir);

    assert!(!other.exists());
    assert!(!dir.exists());
    // Already gone: no panic
    remove_path(&other);
  }
}
