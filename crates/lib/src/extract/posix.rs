//! Whether a filesystem lets us unlink a library that is still mapped.
//!
//! POSIX filesystems keep an unlinked file alive until its last mapping goes
//! away, so an extracted library can be deleted right after loading. Anything
//! else gets deferred deletion.
//!
//! Any failure to query the filesystem (unsupported call, missing path,
//! permission error) counts as non-POSIX.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

/// Answers cached by [`is_posix_cached`]
static CHECKED: Mutex<BTreeMap<PathBuf, bool>> = Mutex::new(BTreeMap::new());

/// Like [`is_posix_compliant`], but each directory is queried at most once
/// per process.
pub fn is_posix_cached(dir: &Path) -> bool {
  let mut checked = CHECKED.lock().unwrap_or_else(PoisonError::into_inner);
  if let Some(posix) = checked.get(dir) {
    return *posix;
  }
  let posix = is_posix_compliant(dir);
  checked.insert(dir.to_path_buf(), posix);
  posix
}

/// Query the filesystem backing `dir`.
pub fn is_posix_compliant(dir: &Path) -> bool {
  match query(dir) {
    Ok(posix) => {
      debug!(path = ?dir, posix, "checked temp filesystem");
      posix
    }
    Err(e) => {
      warn!(path = ?dir, error = %e, "filesystem query failed, assuming non-POSIX");
      false
    }
  }
}

#[cfg(target_os = "linux")]
fn query(dir: &Path) -> io::Result<bool> {
  let stat = rustix::fs::statfs(dir).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))?;
  Ok(!is_foreign_fs(stat.f_type as u32))
}

#[cfg(all(unix, not(target_os = "linux")))]
fn query(dir: &Path) -> io::Result<bool> {
  rustix::fs::statvfs(dir).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))?;
  Ok(true)
}

#[cfg(not(unix))]
fn query(_dir: &Path) -> io::Result<bool> {
  Ok(false)
}

/// Linux filesystems mounted from non-POSIX formats or network shares
#[cfg(target_os = "linux")]
fn is_foreign_fs(magic: u32) -> bool {
  const MSDOS_SUPER_MAGIC: u32 = 0x4d44;
  const EXFAT_SUPER_MAGIC: u32 = 0x2011_bab0;
  const NTFS_SB_MAGIC: u32 = 0x5346_544e;
  const NTFS3_SUPER_MAGIC: u32 = 0x7366_746e;
  const SMB_SUPER_MAGIC: u32 = 0x517b;
  const CIFS_SUPER_MAGIC: u32 = 0xff53_4d42;
  const SMB2_SUPER_MAGIC: u32 = 0xfe53_4d42;

  matches!(
    magic,
    MSDOS_SUPER_MAGIC
      | EXFAT_SUPER_MAGIC
      | NTFS_SB_MAGIC
      | NTFS3_SUPER_MAGIC
      | SMB_SUPER_MAGIC
      | CIFS_SUPER_MAGIC
      | SMB2_SUPER_MAGIC
  )
}
