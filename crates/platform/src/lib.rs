//! Platform detection and artifact naming for natpack
//!
//! This crate maps the running host to:
//! - an [`Arch`] and an [`Os`] (from host-reported strings and an alias table)
//! - a Rust target triple ([`triple`])
//! - the resource path a package stores the matching native library under
//!   ([`resource_path`])

mod arch;
mod error;
mod locator;
mod os;
mod platform;

pub use arch::{ARCH_OVERRIDE_VAR, Arch};
pub use error::PlatformError;
pub use locator::{artifact_path, host_artifact_path, resource_path};
pub use os::{OS_OVERRIDE_VAR, Os};
pub use platform::{Platform, triple};
