use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PlatformError;

/// Environment variable that replaces the host-reported architecture string
pub const ARCH_OVERRIDE_VAR: &str = "NATPACK_ARCH";

/// CPU architecture variants a bundled library can be built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
  X86_64,
  X86_32,
  Ppc32,
  Ppc64,
  #[serde(rename = "ppc32le")]
  PpcLe32,
  #[serde(rename = "ppc64le")]
  PpcLe64,
  Sparc64,
  Sparc32,
  Arm32,
  Arm64,
  RiscV32,
  RiscV64,
  Mips32,
  Mips64,
  #[serde(rename = "mips32el")]
  MipsEl32,
  #[serde(rename = "mips64el")]
  MipsEl64,
}

impl Arch {
  /// Every known architecture, in declaration order
  pub const ALL: [Arch; 16] = [
    Self::X86_64,
    Self::X86_32,
    Self::Ppc32,
    Self::Ppc64,
    Self::PpcLe32,
    Self::PpcLe64,
    Self::Sparc64,
    Self::Sparc32,
    Self::Arm32,
    Self::Arm64,
    Self::RiscV32,
    Self::RiscV64,
    Self::Mips32,
    Self::Mips64,
    Self::MipsEl32,
    Self::MipsEl64,
  ];

  /// Match a host-reported architecture string against the alias table.
  ///
  /// The string is lowercased and must match an alias exactly.
  pub fn from_alias(name: &str) -> Result<Self, PlatformError> {
    let arch = match name.to_lowercase().as_str() {
      "x86_64" | "amd64" | "ia64" | "x64" => Self::X86_64,
      "x86_32" | "x86" | "i386" | "i486" | "i586" | "i686" | "ia32" | "x32" => Self::X86_32,
      "sparc" | "sparc32" => Self::Sparc32,
      "sparcv9" | "sparc64" => Self::Sparc64,
      "arm" | "arm32" => Self::Arm32,
      "aarch64" | "arm64" => Self::Arm64,
      "mips" | "mips32" => Self::Mips32,
      "mips64" => Self::Mips64,
      "mipsel" | "mips32el" => Self::MipsEl32,
      "mips64el" => Self::MipsEl64,
      "ppc" | "ppc32" | "powerpc" => Self::Ppc32,
      "ppc64" | "powerpc64" => Self::Ppc64,
      "ppcle" | "ppc32le" => Self::PpcLe32,
      "ppc64le" | "powerpc64le" => Self::PpcLe64,
      "riscv" | "riscv32" => Self::RiscV32,
      "riscv64" => Self::RiscV64,
      _ => return Err(PlatformError::UnknownArch(name.to_string())),
    };
    Ok(arch)
  }

  /// Detect the architecture of the running host.
  ///
  /// Reads `NATPACK_ARCH` when set, otherwise the architecture the binary was
  /// compiled for. Not cached; see [`Arch::current`].
  pub fn detect() -> Result<Self, PlatformError> {
    Self::from_alias(&host_arch_string())
  }

  /// The host architecture, detected once per process
  pub fn current() -> Result<Self, PlatformError> {
    static CURRENT: OnceLock<Result<Arch, PlatformError>> = OnceLock::new();
    CURRENT.get_or_init(Self::detect).clone()
  }

  /// The architecture component of a Rust target triple.
  ///
  /// Little-endian 32-bit PowerPC has no Rust target and always fails.
  pub fn triple_part(&self) -> Result<&'static str, PlatformError> {
    let part = match self {
      Self::X86_64 => "x86_64",
      Self::X86_32 => "i686",
      Self::Ppc32 => "powerpc",
      Self::Ppc64 => "powerpc64",
      Self::PpcLe32 => return Err(PlatformError::UnsupportedArch(*self)),
      Self::PpcLe64 => "powerpc64le",
      Self::Sparc64 => "sparc64",
      Self::Sparc32 => "sparc",
      Self::Arm32 => "arm",
      Self::Arm64 => "aarch64",
      Self::RiscV32 => "riscv32gc",
      Self::RiscV64 => "riscv64gc",
      Self::Mips32 => "mips",
      Self::Mips64 => "mips64",
      Self::MipsEl32 => "mipsel",
      Self::MipsEl64 => "mips64el",
    };
    Ok(part)
  }

  /// Returns the canonical lowercase name for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86_64 => "x86_64",
      Self::X86_32 => "x86_32",
      Self::Ppc32 => "ppc32",
      Self::Ppc64 => "ppc64",
      Self::PpcLe32 => "ppc32le",
      Self::PpcLe64 => "ppc64le",
      Self::Sparc64 => "sparc64",
      Self::Sparc32 => "sparc32",
      Self::Arm32 => "arm32",
      Self::Arm64 => "arm64",
      Self::RiscV32 => "riscv32",
      Self::RiscV64 => "riscv64",
      Self::Mips32 => "mips32",
      Self::Mips64 => "mips64",
      Self::MipsEl32 => "mips32el",
      Self::MipsEl64 => "mips64el",
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// The architecture string reported by the host.
///
/// Rust reports big- and little-endian MIPS and PowerPC under one name, so the
/// compile-time endianness picks the matching alias.
fn host_arch_string() -> String {
  if let Ok(value) = std::env::var(ARCH_OVERRIDE_VAR)
    && !value.is_empty()
  {
    debug!(var = ARCH_OVERRIDE_VAR, value = %value, "architecture overridden");
    return value;
  }

  let arch = std::env::consts::ARCH;
  if cfg!(target_endian = "little") {
    match arch {
      "mips" => return "mipsel".to_string(),
      "mips64" => return "mips64el".to_string(),
      "powerpc" => return "ppcle".to_string(),
      "powerpc64" => return "ppc64le".to_string(),
      _ => {}
    }
  }
  arch.to_string()
}
