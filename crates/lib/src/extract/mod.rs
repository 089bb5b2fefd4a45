//! Extraction of packaged libraries and their cleanup.

mod area;
pub mod cleanup;
mod loader;
pub mod posix;

pub use area::ExtractionArea;
pub use loader::{
  Cleanup, LibloadingLinker, LinkedLibrary, LoadStage, LoadedLibrary, NativeLinker, NativeLoader, is_loaded,
  validate_resource_path,
};
pub use posix::{is_posix_cached, is_posix_compliant};
