//! Extract a packaged native library to disk and link it into the process.

use std::collections::BTreeMap;
use std::ffi::c_void;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};

use natpack_platform::host_artifact_path;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::area::ExtractionArea;
use super::{cleanup, posix};
use crate::access::{NativeHandle, NativeTools};
use crate::config::{CleanupMode, LoaderConfig};
use crate::consts::MIN_FILENAME_LEN;
use crate::error::{FailureReason, LinkError, LoadError};
use crate::resource::ResourceSource;

type Slot = Arc<Mutex<Option<Arc<LoadedLibrary>>>>;

/// One slot per resource path, holding the library once it is loaded.
/// Entries are never removed.
static LOADED: Mutex<BTreeMap<String, Slot>> = Mutex::new(BTreeMap::new());

/// One lock per extracted file, held from writing it until cleanup.
static DESTINATIONS: Mutex<BTreeMap<PathBuf, Arc<Mutex<()>>>> = Mutex::new(BTreeMap::new());

/// The lock registered under `key`, created on first use. The map lock is
/// released before the caller takes the returned one.
fn lock_for<Q, T>(map: &Mutex<BTreeMap<Q::Owned, Arc<Mutex<T>>>>, key: &Q) -> Arc<Mutex<T>>
where
  Q: ToOwned + ?Sized,
  Q::Owned: Ord,
  T: Default,
{
  let mut map = map.lock().unwrap_or_else(PoisonError::into_inner);
  Arc::clone(map.entry(key.to_owned()).or_default())
}

/// Whether the library at `resource_path` has been loaded in this process.
///
/// A load still in progress counts as not loaded.
pub fn is_loaded(resource_path: &str) -> bool {
  let slot = match LOADED.lock().unwrap_or_else(PoisonError::into_inner).get(resource_path) {
    Some(slot) => Arc::clone(slot),
    None => return false,
  };
  match slot.try_lock() {
    Ok(library) => library.is_some(),
    Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().is_some(),
    Err(TryLockError::WouldBlock) => false,
  }
}

/// Progress of a single load attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStage {
  NotStarted,
  PathValidated,
  DirectoryReady,
  ResourceOpened,
  Copied,
  Loaded,
  CleanedUp,
  Failed(FailureReason),
}

impl LoadStage {
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::CleanedUp | Self::Failed(_))
  }
}

/// What happened to the extracted file after linking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cleanup {
  /// Removed right away.
  Deleted,
  /// Scheduled for removal at process exit.
  Deferred,
}

/// A library linked into the process
pub trait LinkedLibrary: Send + Sync {
  /// Address of the exported symbol `name`, if any.
  fn symbol(&self, name: &str) -> Option<NativeHandle>;
}

/// Links an extracted library file into the process.
pub trait NativeLinker: Send + Sync {
  fn link(&self, path: &Path) -> Result<Box<dyn LinkedLibrary>, LinkError>;
}

/// The platform dynamic loader, through `libloading`
#[derive(Debug, Default, Clone, Copy)]
pub struct LibloadingLinker;

impl NativeLinker for LibloadingLinker {
  fn link(&self, path: &Path) -> Result<Box<dyn LinkedLibrary>, LinkError> {
    // SAFETY: running the library's initializers is the point of loading it;
    // callers only load libraries shipped with their own package.
    let library = unsafe { libloading::Library::new(path) }?;
    Ok(Box::new(LibloadingLibrary(library)))
  }
}

struct LibloadingLibrary(libloading::Library);

impl LinkedLibrary for LibloadingLibrary {
  fn symbol(&self, name: &str) -> Option<NativeHandle> {
    // SAFETY: the symbol is only read as an address, never called here.
    let symbol = unsafe { self.0.get::<*mut c_void>(name.as_bytes()) }.ok()?;
    NativeHandle::from_ptr((*symbol).cast_const())
  }
}

/// Handle to a loaded native library.
///
/// The library stays loaded for the rest of the process.
pub struct LoadedLibrary {
  resource_path: String,
  extracted_path: PathBuf,
  cleanup: Cleanup,
  native: Box<dyn LinkedLibrary>,
}

impl LoadedLibrary {
  pub(crate) fn new(
    resource_path: impl Into<String>,
    extracted_path: impl Into<PathBuf>,
    cleanup: Cleanup,
    native: Box<dyn LinkedLibrary>,
  ) -> Self {
    Self {
      resource_path: resource_path.into(),
      extracted_path: extracted_path.into(),
      cleanup,
      native,
    }
  }

  pub fn resource_path(&self) -> &str {
    &self.resource_path
  }

  /// Where the library was extracted to. The file may already be gone.
  pub fn extracted_path(&self) -> &Path {
    &self.extracted_path
  }

  pub fn cleanup(&self) -> Cleanup {
    self.cleanup
  }

  pub fn symbol(&self, name: &str) -> Option<NativeHandle> {
    self.native.symbol(name)
  }

  /// Accessors for memory owned by this library.
  pub fn tools(&self) -> NativeTools<'_> {
    NativeTools::new(self)
  }
}

impl fmt::Debug for LoadedLibrary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LoadedLibrary")
      .field("resource_path", &self.resource_path)
      .field("extracted_path", &self.extracted_path)
      .field("cleanup", &self.cleanup)
      .finish_non_exhaustive()
  }
}

/// Extracts libraries from a package and links them.
pub struct NativeLoader {
  source: Box<dyn ResourceSource>,
  linker: Box<dyn NativeLinker>,
  area: Arc<ExtractionArea>,
  cleanup: CleanupMode,
}

impl NativeLoader {
  /// Loader over `source` using the process-wide extraction directory and the
  /// environment's cleanup mode.
  pub fn new(source: impl ResourceSource + 'static) -> Self {
    let config = LoaderConfig::from_env();
    Self {
      source: Box::new(source),
      linker: Box::new(LibloadingLinker),
      area: ExtractionArea::global(),
      cleanup: config.cleanup,
    }
  }

  /// Loader with its own extraction directory built from `config`.
  pub fn with_config(source: impl ResourceSource + 'static, config: &LoaderConfig) -> Self {
    Self {
      source: Box::new(source),
      linker: Box::new(LibloadingLinker),
      area: Arc::new(ExtractionArea::from_config(config)),
      cleanup: config.cleanup,
    }
  }

  pub fn with_linker(mut self, linker: impl NativeLinker + 'static) -> Self {
    self.linker = Box::new(linker);
    self
  }

  pub fn with_area(mut self, area: Arc<ExtractionArea>) -> Self {
    self.area = area;
    self
  }

  pub fn area(&self) -> &ExtractionArea {
    &self.area
  }

  pub fn source(&self) -> &dyn ResourceSource {
    self.source.as_ref()
  }

  pub fn cleanup_mode(&self) -> CleanupMode {
    self.cleanup
  }

  /// Whether the extraction filesystem allows deleting a loaded library.
  ///
  /// Checked once per process for each base directory.
  pub fn is_posix(&self) -> bool {
    posix::is_posix_cached(self.area.base())
  }

  /// Load `library_name` built for the host platform.
  pub fn load(&self, library_name: &str) -> Result<Arc<LoadedLibrary>, LoadError> {
    let path = host_artifact_path(library_name)?;
    self.load_library(&path)
  }

  /// Extract the resource at `resource_path` and link it.
  ///
  /// A resource path that has already been loaded returns the existing
  /// handle without touching the filesystem.
  ///
  /// The library's initializers run while this resource path is locked. They
  /// may load other libraries, but loading the same resource path from its
  /// own initializers deadlocks.
  pub fn load_library(&self, resource_path: &str) -> Result<Arc<LoadedLibrary>, LoadError> {
    let mut attempt = Attempt::new(resource_path);
    let result = self.run(&mut attempt);
    if let Err(e) = &result {
      attempt.fail(e);
    }
    result
  }

  fn run(&self, attempt: &mut Attempt<'_>) -> Result<Arc<LoadedLibrary>, LoadError> {
    let resource_path = attempt.resource;
    let filename = validate_resource_path(resource_path)?;
    attempt.advance(LoadStage::PathValidated);

    let slot = lock_for(&LOADED, resource_path);
    let mut loaded = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = loaded.as_ref() {
      debug!(resource = resource_path, "library already loaded");
      return Ok(Arc::clone(existing));
    }

    let dir = self.area.ensure_dir()?;
    attempt.advance(LoadStage::DirectoryReady);
    let dest = dir.join(filename);
    let dest_lock = lock_for(&DESTINATIONS, dest.as_path());
    let _extracting = dest_lock.lock().unwrap_or_else(PoisonError::into_inner);

    let mut reader = match self.source.open(resource_path) {
      Ok(Some(reader)) => reader,
      Ok(None) => {
        return Err(LoadError::ResourceNotFound {
          path: resource_path.to_string(),
          package: self.source.describe(),
        });
      }
      Err(source) => return Err(copy_failed(resource_path, &dest, source)),
    };
    attempt.advance(LoadStage::ResourceOpened);

    if let Err(source) = write_file(&mut reader, &dest) {
      let _ = std::fs::remove_file(&dest);
      return Err(copy_failed(resource_path, &dest, source));
    }
    drop(reader);
    attempt.advance(LoadStage::Copied);

    let linked = self.linker.link(&dest);
    if linked.is_ok() {
      attempt.advance(LoadStage::Loaded);
    }
    let cleanup = self.reclaim(&dest);

    let native = linked.map_err(|source| LoadError::NativeLoadFailed {
      path: dest.clone(),
      source,
    })?;
    attempt.advance(LoadStage::CleanedUp);

    let library = Arc::new(LoadedLibrary::new(resource_path, &dest, cleanup, native));
    *loaded = Some(Arc::clone(&library));

    info!(resource = resource_path, path = ?dest, cleanup = ?cleanup, "loaded native library");
    Ok(library)
  }

  fn reclaim(&self, path: &Path) -> Cleanup {
    let delete_now = match self.cleanup {
      CleanupMode::Immediate => true,
      CleanupMode::Deferred => false,
      CleanupMode::Auto => self.is_posix(),
    };

    if delete_now {
      match std::fs::remove_file(path) {
        Ok(()) => return Cleanup::Deleted,
        Err(e) => warn!(path = ?path, error = %e, "could not delete extracted library, deferring to exit"),
      }
    }

    cleanup::register(path);
    Cleanup::Deferred
  }
}

impl fmt::Debug for NativeLoader {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NativeLoader")
      .field("source", &self.source.describe())
      .field("area", &self.area)
      .field("cleanup", &self.cleanup)
      .finish_non_exhaustive()
  }
}

/// Check a resource path and return its filename.
pub fn validate_resource_path(path: &str) -> Result<&str, LoadError> {
  if !path.starts_with('/') {
    return Err(LoadError::InvalidResourcePath {
      path: path.to_string(),
      reason: "the path has to be absolute (start with '/')",
    });
  }

  let filename = path.rsplit('/').next().unwrap_or_default();
  if filename.chars().count() < MIN_FILENAME_LEN {
    return Err(LoadError::InvalidResourcePath {
      path: path.to_string(),
      reason: "the filename has to be at least 3 characters long",
    });
  }

  let mut components = Path::new(filename).components();
  let plain = matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none();
  if !plain || filename.contains('\\') {
    return Err(LoadError::InvalidResourcePath {
      path: path.to_string(),
      reason: "the filename has to be a plain file name",
    });
  }

  Ok(filename)
}

fn write_file(reader: &mut dyn io::Read, dest: &Path) -> io::Result<u64> {
  // An earlier extraction under the same name may still be mapped; the new
  // copy must get its own inode.
  match std::fs::remove_file(dest) {
    Ok(()) => {}
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(e) => return Err(e),
  }
  let mut file = File::create_new(dest)?;
  let written = io::copy(reader, &mut file)?;
  file.sync_all()?;
  Ok(written)
}

fn copy_failed(resource: &str, dest: &Path, source: io::Error) -> LoadError {
  LoadError::CopyFailed {
    resource: resource.to_string(),
    path: dest.to_path_buf(),
    source,
  }
}

struct Attempt<'a> {
  resource: &'a str,
  stage: LoadStage,
}

impl<'a> Attempt<'a> {
  fn new(resource: &'a str) -> Self {
    Self {
      resource,
      stage: LoadStage::NotStarted,
    }
  }

  fn advance(&mut self, stage: LoadStage) {
    debug!(resource = self.resource, from = ?self.stage, to = ?stage, "load stage");
    self.stage = stage;
  }

  fn fail(&mut self, error: &LoadError) {
    let stage = LoadStage::Failed(error.reason());
    warn!(resource = self.resource, stage = ?self.stage, error = %error, "load failed");
    self.stage = stage;
  }
}
