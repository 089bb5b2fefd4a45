use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::arch::Arch;
use crate::error::PlatformError;

/// Environment variable that replaces the host-reported operating system string
pub const OS_OVERRIDE_VAR: &str = "NATPACK_OS";

/// Operating system families a bundled library can be built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
  Windows,
  MacOs,
  Linux,
  Solaris,
  FreeBsd,
}

impl Os {
  /// Every known operating system family
  pub const ALL: [Os; 5] = [Self::Windows, Self::MacOs, Self::Linux, Self::Solaris, Self::FreeBsd];

  /// Match a host-reported OS name.
  ///
  /// Matching is case-insensitive and by substring, so `"Windows 10"` and
  /// `"win32"` both resolve to [`Os::Windows`]. The first hit wins.
  pub fn from_alias(name: &str) -> Result<Self, PlatformError> {
    let lower = name.to_lowercase();

    // "darwin" contains "win", so macOS is matched first
    if lower.contains("mac") || lower.contains("darwin") {
      return Ok(Self::MacOs);
    }
    if lower.contains("win") {
      return Ok(Self::Windows);
    }
    if lower.contains("linux") {
      return Ok(Self::Linux);
    }
    if lower.contains("sun") || lower.contains("solaris") {
      return Ok(Self::Solaris);
    }
    if lower.contains("free") {
      return Ok(Self::FreeBsd);
    }

    Err(PlatformError::UnknownOs(name.to_string()))
  }

  /// Detect the operating system of the running host.
  ///
  /// Reads `NATPACK_OS` when set, otherwise the OS the binary was compiled for.
  pub fn detect() -> Result<Self, PlatformError> {
    let name = match std::env::var(OS_OVERRIDE_VAR) {
      Ok(value) if !value.is_empty() => {
        debug!(var = OS_OVERRIDE_VAR, value = %value, "operating system overridden");
        value
      }
      _ => std::env::consts::OS.to_string(),
    };
    Self::from_alias(&name)
  }

  /// The host operating system, detected once per process
  pub fn current() -> Result<Self, PlatformError> {
    static CURRENT: OnceLock<Result<Os, PlatformError>> = OnceLock::new();
    CURRENT.get_or_init(Self::detect).clone()
  }

  /// The vendor/OS/ABI component of a Rust target triple.
  ///
  /// 32-bit ARM on Linux uses the hard-float ABI; every other architecture
  /// shares the generic suffix of its OS.
  pub fn triple_part(&self, arch: Arch) -> &'static str {
    match self {
      Self::MacOs => "apple-darwin",
      Self::Linux if arch == Arch::Arm32 => "unknown-linux-gnueabihf",
      Self::Linux => "unknown-linux-gnu",
      Self::Solaris => "sun-solaris",
      Self::Windows => "pc-windows-gnu",
      Self::FreeBsd => "unknown-freebsd",
    }
  }

  /// File extension of a dynamic library on this OS
  pub fn lib_extension(&self) -> &'static str {
    match self {
      Self::MacOs => "dylib",
      Self::Linux | Self::FreeBsd | Self::Solaris => "so",
      Self::Windows => "dll",
    }
  }

  /// Returns the lowercase string identifier for this OS
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Windows => "windows",
      Self::MacOs => "macos",
      Self::Linux => "linux",
      Self::Solaris => "solaris",
      Self::FreeBsd => "freebsd",
    }
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  fn windows_names_match_case_insensitively() {
    for name in ["win32", "windows10", "Windows 11", "WINDOWS SERVER 2022"] {
      assert_eq!(Os::from_alias(name).unwrap(), Os::Windows, "name {name}");
    }
  }

  #[test]
  fn mac_names_resolve() {
    for name in ["Mac OS X", "macos", "darwin"] {
      assert_eq!(Os::from_alias(name).unwrap(), Os::MacOs, "name {name}");
    }
  }

  #[test]
  fn remaining_families_resolve() {
    assert_eq!(Os::from_alias("Linux").unwrap(), Os::Linux);
    assert_eq!(Os::from_alias("SunOS").unwrap(), Os::Solaris);
    assert_eq!(Os::from_alias("solaris").unwrap(), Os::Solaris);
    assert_eq!(Os::from_alias("FreeBSD").unwrap(), Os::FreeBsd);
  }

  #[test]
  fn unknown_os_is_rejected() {
    let err = Os::from_alias("plan9").unwrap_err();
    assert_eq!(err, PlatformError::UnknownOs("plan9".to_string()));
    assert!(err.is_unknown_platform());
  }

  #[test]
  fn extension_depends_only_on_os() {
    assert_eq!(Os::MacOs.lib_extension(), "dylib");
    assert_eq!(Os::Linux.lib_extension(), "so");
    assert_eq!(Os::FreeBsd.lib_extension(), "so");
    assert_eq!(Os::Solaris.lib_extension(), "so");
    assert_eq!(Os::Windows.lib_extension(), "dll");
  }

  #[test]
  fn linux_arm32_uses_hard_float_suffix() {
    assert_eq!(Os::Linux.triple_part(Arch::Arm32), "unknown-linux-gnueabihf");
    assert_eq!(Os::Linux.triple_part(Arch::Arm64), "unknown-linux-gnu");
    // The ABI switch only applies on Linux
    assert_eq!(Os::FreeBsd.triple_part(Arch::Arm32), "unknown-freebsd");
  }

  #[test]
  #[serial]
  fn detect_honours_override() {
    temp_env::with_var(OS_OVERRIDE_VAR, Some("FreeBSD"), || {
      assert_eq!(Os::detect().unwrap(), Os::FreeBsd);
    });
  }

  #[test]
  #[serial]
  fn detect_without_override_matches_build_target() {
    temp_env::with_var_unset(OS_OVERRIDE_VAR, || {
      let detected = Os::detect();
      if cfg!(target_os = "linux") {
        assert_eq!(detected.unwrap(), Os::Linux);
      } else if cfg!(target_os = "macos") {
        assert_eq!(detected.unwrap(), Os::MacOs);
      } else if cfg!(target_os = "windows") {
        assert_eq!(detected.unwrap(), Os::Windows);
      }
    });
  }
}
