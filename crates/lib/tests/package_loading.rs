//! End-to-end loads from on-disk packages through the public API.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use natpack_lib::error::LinkError;
use natpack_lib::extract::{LinkedLibrary, NativeLinker, is_loaded};
use natpack_lib::resource::{ArchiveResources, DirResources, open_package};
use natpack_lib::{Cleanup, CleanupMode, LoadError, LoaderConfig, NativeHandle, NativeLoader};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

struct NoSymbols;

impl LinkedLibrary for NoSymbols {
  fn symbol(&self, _name: &str) -> Option<NativeHandle> {
    None
  }
}

#[derive(Clone, Default)]
struct ContentLinker {
  seen: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl NativeLinker for ContentLinker {
  fn link(&self, path: &Path) -> Result<Box<dyn LinkedLibrary>, LinkError> {
    self.seen.lock().unwrap().push(std::fs::read(path)?);
    Ok(Box::new(NoSymbols))
  }
}

fn write_zip(dir: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
  let path = dir.join("natives.zip");
  let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
  for (name, bytes) in entries {
    writer.start_file(*name, SimpleFileOptions::default()).unwrap();
    writer.write_all(bytes).unwrap();
  }
  writer.finish().unwrap();
  path
}

fn config(temp: &TempDir, cleanup: CleanupMode) -> LoaderConfig {
  let base = temp.path().join("extract");
  std::fs::create_dir_all(&base).unwrap();
  LoaderConfig::default().temp_dir(base).cleanup(cleanup)
}

#[test]
fn loads_from_a_package_directory() {
  let temp = TempDir::new().unwrap();
  let package = temp.path().join("package");
  std::fs::create_dir_all(package.join("natives")).unwrap();
  std::fs::write(package.join("natives/libdir-pkg.so"), b"from-dir").unwrap();

  let linker = ContentLinker::default();
  let loader = NativeLoader::with_config(DirResources::new(&package).unwrap(), &config(&temp, CleanupMode::Deferred))
    .with_linker(linker.clone());

  let library = loader.load_library("/natives/libdir-pkg.so").unwrap();

  assert_eq!(library.cleanup(), Cleanup::Deferred);
  assert!(library.extracted_path().starts_with(temp.path().join("extract")));
  assert_eq!(*linker.seen.lock().unwrap(), vec![b"from-dir".to_vec()]);
  assert!(is_loaded("/natives/libdir-pkg.so"));
}

#[test]
fn loads_from_a_zip_package() {
  let temp = TempDir::new().unwrap();
  let zip = write_zip(temp.path(), &[("libzip-pkg.so", b"from-zip")]);

  let linker = ContentLinker::default();
  let loader = NativeLoader::with_config(ArchiveResources::open(&zip).unwrap(), &config(&temp, CleanupMode::Immediate))
    .with_linker(linker.clone());

  let library = loader.load_library("/libzip-pkg.so").unwrap();

  assert_eq!(library.cleanup(), Cleanup::Deleted);
  assert!(!library.extracted_path().exists());
  assert_eq!(*linker.seen.lock().unwrap(), vec![b"from-zip".to_vec()]);
}

#[test]
fn escaping_resource_paths_are_not_found() {
  let temp = TempDir::new().unwrap();
  let package = temp.path().join("package");
  std::fs::create_dir_all(&package).unwrap();
  std::fs::write(temp.path().join("libsecret.so"), b"outside").unwrap();

  let loader = NativeLoader::with_config(open_package(&package).unwrap(), &config(&temp, CleanupMode::Deferred))
    .with_linker(ContentLinker::default());

  let err = loader.load_library("/../libsecret.so").unwrap_err();

  assert!(matches!(err, LoadError::ResourceNotFound { .. }), "{err:?}");
}

#[test]
fn unwritable_base_directory_fails_cleanly() {
  let temp = TempDir::new().unwrap();
  let zip = write_zip(temp.path(), &[("libno-base.so", b"x")]);
  let config = LoaderConfig::default().temp_dir(temp.path().join("missing"));

  let loader = NativeLoader::with_config(ArchiveResources::open(&zip).unwrap(), &config);

  let err = loader.load_library("/libno-base.so").unwrap_err();

  assert!(matches!(err, LoadError::DirectoryCreationFailed { .. }));
  assert!(!is_loaded("/libno-base.so"));
}
