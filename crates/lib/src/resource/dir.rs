use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use super::{ResourceReader, ResourceSource, entry_name};

/// An unpacked package: resource `/a/b.so` lives at `<root>/a/b.so`.
#[derive(Debug, Clone)]
pub struct DirResources {
  root: PathBuf,
}

impl DirResources {
  /// Use `root` as the package root. The directory must exist.
  pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
    let root = dunce::canonicalize(root.as_ref())?;
    if !root.is_dir() {
      return Err(io::Error::new(
        io::ErrorKind::NotADirectory,
        format!("{} is not a directory", root.display()),
      ));
    }
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn resolve(&self, path: &str) -> Option<PathBuf> {
    entry_name(path).map(|name| self.root.join(name))
  }
}

impl ResourceSource for DirResources {
  fn open(&self, path: &str) -> io::Result<Option<ResourceReader<'_>>> {
    let Some(file_path) = self.resolve(path) else {
      return Ok(None);
    };

    match std::fs::metadata(&file_path) {
      Ok(meta) if meta.is_file() => {}
      Ok(_) => return Ok(None),
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(e),
    }

    let file = File::open(&file_path)?;
    Ok(Some(Box::new(file)))
  }

  fn describe(&self) -> String {
    format!("package directory {}", self.root.display())
  }
}
