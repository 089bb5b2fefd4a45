//! Test doubles for loaders.
//!
//! Linkers that never touch the platform loader and a package whose reads
//! always fail, so the extraction path can be exercised with fake libraries.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::access::NativeHandle;
use crate::error::LinkError;
use crate::extract::{Cleanup, LinkedLibrary, LoadedLibrary, NativeLinker};
use crate::resource::{ResourceReader, ResourceSource};

/// A linked library with no symbols.
pub struct FakeLibrary;

impl LinkedLibrary for FakeLibrary {
  fn symbol(&self, _name: &str) -> Option<NativeHandle> {
    None
  }
}

/// Records every path it links together with the file contents at that time.
#[derive(Clone, Default)]
pub struct RecordingLinker {
  linked: Arc<Mutex<Vec<(PathBuf, Vec<u8>)>>>,
}

impl RecordingLinker {
  pub fn linked(&self) -> Vec<(PathBuf, Vec<u8>)> {
    self.linked.lock().unwrap().clone()
  }
}

impl NativeLinker for RecordingLinker {
  fn link(&self, path: &Path) -> Result<Box<dyn LinkedLibrary>, LinkError> {
    let bytes = std::fs::read(path)?;
    self.linked.lock().unwrap().push((path.to_path_buf(), bytes));
    Ok(Box::new(FakeLibrary))
  }
}

/// Keeps every linked file open, like a mapping that pins the file's inode.
#[derive(Clone, Default)]
pub struct HoldingLinker {
  held: Arc<Mutex<Vec<File>>>,
}

impl HoldingLinker {
  /// Current contents of the `index`th linked file, read through the open handle.
  pub fn contents(&self, index: usize) -> Vec<u8> {
    let mut held = self.held.lock().unwrap();
    let file = &mut held[index];
    file.seek(SeekFrom::Start(0)).unwrap();
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).unwrap();
    bytes
  }
}

impl NativeLinker for HoldingLinker {
  fn link(&self, path: &Path) -> Result<Box<dyn LinkedLibrary>, LinkError> {
    let file = File::open(path)?;
    self.held.lock().unwrap().push(file);
    Ok(Box::new(FakeLibrary))
  }
}

/// Rejects everything it is asked to link.
pub struct FailingLinker;

impl NativeLinker for FailingLinker {
  fn link(&self, path: &Path) -> Result<Box<dyn LinkedLibrary>, LinkError> {
    Err(format!("{}: not a shared object", path.display()).into())
  }
}

/// A package whose entries exist but fail halfway through reading.
pub struct BrokenResources;

struct BrokenReader {
  served: bool,
}

impl Read for BrokenReader {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    if self.served {
      return Err(io::Error::other("device went away"));
    }
    self.served = true;
    let n = buf.len().min(4);
    buf[..n].copy_from_slice(&b"\x7fELF"[..n]);
    Ok(n)
  }
}

impl ResourceSource for BrokenResources {
  fn open(&self, _path: &str) -> io::Result<Option<ResourceReader<'_>>> {
    Ok(Some(Box::new(BrokenReader { served: false })))
  }

  fn describe(&self) -> String {
    "broken package".to_string()
  }
}

/// A loaded library that was never extracted, for exercising accessors.
pub fn stub_library(resource_path: &str) -> LoadedLibrary {
  LoadedLibrary::new(resource_path, resource_path, Cleanup::Deleted, Box::new(FakeLibrary))
}
