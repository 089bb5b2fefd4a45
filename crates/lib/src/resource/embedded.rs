use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io;

use super::{ResourceReader, ResourceSource};

/// Resources compiled into the running binary.
///
/// ```
/// use natpack_lib::resource::{EmbeddedResources, ResourceSource};
///
/// static NATIVES: &[(&str, &[u8])] = &[
///   ("/demo-x86_64-unknown-linux-gnu.so", b"\x7fELF"),
///   ("/demo-aarch64-apple-darwin.dylib", b"\xcf\xfa\xed\xfe"),
/// ];
///
/// let package = EmbeddedResources::from_static(NATIVES);
/// assert!(package.contains("/demo-aarch64-apple-darwin.dylib").unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct EmbeddedResources {
  entries: BTreeMap<String, Cow<'static, [u8]>>,
}

impl EmbeddedResources {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build from a static table, typically filled with `include_bytes!`.
  pub fn from_static(entries: &'static [(&'static str, &'static [u8])]) -> Self {
    let entries = entries
      .iter()
      .map(|(path, bytes)| (path.to_string(), Cow::Borrowed(*bytes)))
      .collect();
    Self { entries }
  }

  /// Add or replace an entry.
  pub fn insert<P, B>(&mut self, path: P, bytes: B)
  where
    P: Into<String>,
    B: Into<Cow<'static, [u8]>>,
  {
    self.entries.insert(path.into(), bytes.into());
  }

  /// Builder form of [`EmbeddedResources::insert`].
  pub fn with<P, B>(mut self, path: P, bytes: B) -> Self
  where
    P: Into<String>,
    B: Into<Cow<'static, [u8]>>,
  {
    self.insert(path, bytes);
    self
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl ResourceSource for EmbeddedResources {
  fn open(&self, path: &str) -> io::Result<Option<ResourceReader<'_>>> {
    Ok(
      self
        .entries
        .get(path)
        .map(|bytes| Box::new(&bytes[..]) as ResourceReader<'_>),
    )
  }

  fn describe(&self) -> String {
    format!("embedded resources ({} entries)", self.entries.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Read;

  #[test]
  fn open_returns_entry_bytes() {
    let package = EmbeddedResources::new().with("/libdemo.so", b"payload".to_vec());

    let mut reader = package.open("/libdemo.so").unwrap().unwrap();
    let mut contents = Vec::new();
    reader.read_to_end(&mut contents).unwrap();

    assert_eq!(contents, b"payload");
  }

  #[test]
  fn missing_entry_is_none() {
    let package = EmbeddedResources::new().with("/libdemo.so", &b"x"[..]);
    assert!(package.open("/libother.so").unwrap().is_none());
    assert!(!package.contains("libdemo.so").unwrap());
  }

  #[test]
  fn from_static_borrows_table() {
    static TABLE: &[(&str, &[u8])] = &[("/a.so", b"a"), ("/b.so", b"b")];
    let package = EmbeddedResources::from_static(TABLE);

    assert_eq!(package.len(), 2);
    assert!(package.describe().contains("2 entries"));
  }
}
