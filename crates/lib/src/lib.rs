//! natpack-lib: ship one package, load the right native library
//!
//! A package carries a native library built for several platforms, each
//! stored as `/<name>-<target triple>.<ext>`. At startup the loader picks the
//! entry for the host, copies it into a private temp directory and links it:
//! - [`resource`]: where package entries come from (embedded, directory, zip)
//! - [`extract`]: the extraction directory, the loader and exit cleanup
//! - [`access`]: typed reads from memory owned by a loaded library
//!
//! ```no_run
//! use natpack_lib::resource::EmbeddedResources;
//!
//! static NATIVES: &[(&str, &[u8])] = &[
//!   ("/demo-x86_64-unknown-linux-gnu.so", b"\x7fELF"),
//! ];
//!
//! let library = natpack_lib::load("demo", EmbeddedResources::from_static(NATIVES))?;
//! println!("loaded from {}", library.extracted_path().display());
//! # Ok::<(), natpack_lib::LoadError>(())
//! ```

pub mod access;
pub mod config;
pub mod consts;
pub mod error;
pub mod extract;
pub mod resource;
pub mod util;

use std::sync::Arc;

pub use access::{AccessError, NativeHandle, NativeTools, NativeType, StructuredValue, TypeDescriptor};
pub use config::{CleanupMode, LoaderConfig};
pub use error::{FailureReason, LoadError};
pub use extract::{Cleanup, LoadStage, LoadedLibrary, NativeLoader};
pub use natpack_platform::{Arch, Os, Platform, PlatformError};
pub use resource::ResourceSource;

/// Load `library_name` for the host platform from `source`.
///
/// Uses the process-wide extraction directory and `NATPACK_*` environment
/// settings. The library's initializers must not load the same library again;
/// see [`NativeLoader::load_library`].
pub fn load(library_name: &str, source: impl ResourceSource + 'static) -> Result<Arc<LoadedLibrary>, LoadError> {
  NativeLoader::new(source).load(library_name)
}

/// Load the library stored at `resource_path` in `source`.
pub fn load_library(resource_path: &str, source: impl ResourceSource + 'static) -> Result<Arc<LoadedLibrary>, LoadError> {
  NativeLoader::new(source).load_library(resource_path)
}
