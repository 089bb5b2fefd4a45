use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use zip::ZipArchive;
use zip::result::ZipError;

use super::{ResourceReader, ResourceSource, entry_name};

/// Most we reserve up front from an entry's declared size
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// A packed package: a zip archive whose entry `a/b.so` is resource `/a/b.so`.
///
/// Entries are decompressed into memory when opened.
pub struct ArchiveResources {
  path: PathBuf,
  archive: Mutex<ZipArchive<BufReader<File>>>,
}

impl ArchiveResources {
  /// Open the zip archive at `path`.
  pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
    let path = path.as_ref().to_path_buf();
    let file = File::open(&path)?;
    let archive = ZipArchive::new(BufReader::new(file)).map_err(zip_to_io)?;
    Ok(Self {
      path,
      archive: Mutex::new(archive),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Resource paths of every file entry in the archive
  pub fn entries(&self) -> Vec<String> {
    let archive = self.archive.lock().unwrap_or_else(PoisonError::into_inner);
    archive
      .file_names()
      .filter(|name| !name.ends_with('/'))
      .map(|name| format!("/{name}"))
      .collect()
  }
}

impl ResourceSource for ArchiveResources {
  fn open(&self, path: &str) -> io::Result<Option<ResourceReader<'_>>> {
    let Some(name) = entry_name(path) else {
      return Ok(None);
    };

    let mut archive = self.archive.lock().unwrap_or_else(PoisonError::into_inner);
    let mut entry = match archive.by_name(name) {
      Ok(entry) => entry,
      Err(ZipError::FileNotFound) => return Ok(None),
      Err(e) => return Err(zip_to_io(e)),
    };
    if entry.is_dir() {
      return Ok(None);
    }

    let declared = entry.size();
    let contents = read_entry(&mut entry, declared)?;
    Ok(Some(Box::new(Cursor::new(contents))))
  }

  fn describe(&self) -> String {
    format!("package archive {}", self.path.display())
  }
}

impl std::fmt::Debug for ArchiveResources {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ArchiveResources").field("path", &self.path).finish()
  }
}

/// Read an entry whose header claims `declared` bytes. The header is not
/// trusted beyond a bounded reservation.
fn read_entry(reader: &mut impl Read, declared: u64) -> io::Result<Vec<u8>> {
  let capacity = usize::try_from(declared.min(MAX_PREALLOC)).unwrap_or(0);
  let mut contents = Vec::with_capacity(capacity);
  reader.read_to_end(&mut contents)?;
  Ok(contents)
}

fn zip_to_io(err: ZipError) -> io::Error {
  match err {
    ZipError::Io(e) => e,
    other => io::Error::new(io::ErrorKind::InvalidData, other),
  }
}
