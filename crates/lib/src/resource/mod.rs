//! Packages that native libraries are extracted from.
//!
//! A package addresses its entries by absolute logical path
//! (`/mylib-x86_64-unknown-linux-gnu.so`). Three layouts are supported:
//! - [`EmbeddedResources`]: byte slices compiled into the binary
//! - [`DirResources`]: an unpacked package directory
//! - [`ArchiveResources`]: a zip archive

mod archive;
mod dir;
mod embedded;

use std::io::{self, Read};
use std::path::Path;

pub use archive::ArchiveResources;
pub use dir::DirResources;
pub use embedded::EmbeddedResources;

/// A byte stream over one package entry
pub type ResourceReader<'a> = Box<dyn Read + Send + 'a>;

/// Something that can hand out the bytes of a packaged resource.
pub trait ResourceSource: Send + Sync {
  /// Open the resource at `path`.
  ///
  /// Returns `Ok(None)` when the package has no such entry; `Err` is reserved
  /// for entries that exist but could not be opened.
  fn open(&self, path: &str) -> io::Result<Option<ResourceReader<'_>>>;

  /// Human readable description used in errors and logs.
  fn describe(&self) -> String;

  /// Whether the package has an entry at `path`.
  fn contains(&self, path: &str) -> io::Result<bool> {
    Ok(self.open(path)?.is_some())
  }
}

impl<T: ResourceSource + ?Sized> ResourceSource for Box<T> {
  fn open(&self, path: &str) -> io::Result<Option<ResourceReader<'_>>> {
    (**self).open(path)
  }

  fn describe(&self) -> String {
    (**self).describe()
  }

  fn contains(&self, path: &str) -> io::Result<bool> {
    (**self).contains(path)
  }
}

/// Open a package on disk: directories are read as unpacked packages, any
/// other file as a zip archive.
pub fn open_package(path: &Path) -> io::Result<Box<dyn ResourceSource>> {
  if path.is_dir() {
    Ok(Box::new(DirResources::new(path)?))
  } else {
    Ok(Box::new(ArchiveResources::open(path)?))
  }
}

/// Package-relative entry name for an absolute resource path.
///
/// Rejects empty, `.` and `..` segments so a resource path can never leave
/// the package root.
pub(crate) fn entry_name(path: &str) -> Option<&str> {
  let relative = path.strip_prefix('/')?;
  let valid = !relative.is_empty()
    && relative
      .split('/')
      .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
  valid.then_some(relative)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn entry_name_strips_leading_slash() {
    assert_eq!(entry_name("/libfoo.so"), Some("libfoo.so"));
    assert_eq!(entry_name("/natives/libfoo.so"), Some("natives/libfoo.so"));
  }

  #[test]
  fn entry_name_rejects_escapes_and_relative_paths() {
    assert_eq!(entry_name("libfoo.so"), None);
    assert_eq!(entry_name("/"), None);
    assert_eq!(entry_name("/../etc/passwd"), None);
    assert_eq!(entry_name("/a//b"), None);
    assert_eq!(entry_name("/./a"), None);
  }

  #[test]
  fn open_package_picks_layout_from_path() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("libfoo.so"), b"elf").unwrap();

    let package = open_package(temp.path()).unwrap();
    assert!(package.describe().starts_with("package directory"));
    assert!(package.contains("/libfoo.so").unwrap());

    let not_a_zip = temp.path().join("libfoo.so");
    assert!(open_package(&not_a_zip).is_err());
  }
}
