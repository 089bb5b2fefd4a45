//! Typed reads out of native memory for generated binding code.
//!
//! A [`NativeHandle`] is an opaque address handed across the binding
//! boundary. [`NativeTools`] turns it back into a value, either a primitive or
//! a structured type described by a [`TypeDescriptor`]. The tools are only
//! reachable through a [`LoadedLibrary`], so nothing can be read before the
//! library backing the memory has been loaded.

use std::ffi::{CStr, c_char, c_void};
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use thiserror::Error;

use crate::extract::LoadedLibrary;

/// A non-null address into native memory.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(NonNull<c_void>);

// SAFETY: a handle is only an address; every read through it is `unsafe` and
// the caller vouches for the memory at that point.
unsafe impl Send for NativeHandle {}
unsafe impl Sync for NativeHandle {}

impl NativeHandle {
  /// Wrap a raw address. Returns `None` for zero.
  pub fn from_addr(addr: usize) -> Option<Self> {
    NonNull::new(addr as *mut c_void).map(Self)
  }

  /// Wrap a pointer. Returns `None` for null.
  pub fn from_ptr<T>(ptr: *const T) -> Option<Self> {
    NonNull::new(ptr.cast::<c_void>().cast_mut()).map(Self)
  }

  pub fn addr(&self) -> usize {
    self.0.as_ptr() as usize
  }

  pub fn as_ptr(&self) -> *const c_void {
    self.0.as_ptr()
  }
}

impl fmt::Debug for NativeHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "NativeHandle({:#x})", self.addr())
  }
}

/// Name and layout of a structured native type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
  pub name: &'static str,
  pub size: usize,
  pub align: usize,
}

impl TypeDescriptor {
  /// Descriptor for the Rust type `T` under the binding name `name`.
  pub const fn of<T>(name: &'static str) -> Self {
    Self {
      name,
      size: std::mem::size_of::<T>(),
      align: std::mem::align_of::<T>(),
    }
  }
}

/// A plain-data type generated bindings can read out of native memory.
///
/// Implementors must be `#[repr(C)]` (or otherwise have a stable layout
/// shared with the native side).
pub trait NativeType: Copy + 'static {
  const DESCRIPTOR: TypeDescriptor;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
  #[error("type {name} is {expected} bytes but the descriptor says {actual}")]
  LayoutMismatch {
    name: &'static str,
    expected: usize,
    actual: usize,
  },
}

/// Bytes copied out of native memory together with their descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredValue {
  descriptor: TypeDescriptor,
  bytes: Vec<u8>,
}

impl StructuredValue {
  pub fn descriptor(&self) -> &TypeDescriptor {
    &self.descriptor
  }

  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  /// Reinterpret the bytes as `T`.
  ///
  /// # Safety
  ///
  /// The bytes must be a valid `T`.
  pub unsafe fn cast<T: NativeType>(&self) -> Result<T, AccessError> {
    check_layout::<T>(&self.descriptor)?;
    // SAFETY: length checked above; validity is the caller's contract.
    Ok(unsafe { std::ptr::read_unaligned(self.bytes.as_ptr().cast::<T>()) })
  }
}

fn check_layout<T>(descriptor: &TypeDescriptor) -> Result<(), AccessError> {
  let expected = std::mem::size_of::<T>();
  if descriptor.size != expected {
    return Err(AccessError::LayoutMismatch {
      name: descriptor.name,
      expected,
      actual: descriptor.size,
    });
  }
  Ok(())
}

/// Accessors over native memory belonging to a loaded library.
///
/// Every accessor is `unsafe`: the handle must point to live, readable memory
/// holding a value of the requested shape. Reads are unaligned.
#[derive(Debug, Clone, Copy)]
pub struct NativeTools<'lib> {
  _library: PhantomData<&'lib LoadedLibrary>,
}

macro_rules! primitive_accessor {
  ($(#[$doc:meta])* $name:ident -> $ty:ty) => {
    $(#[$doc])*
    ///
    /// # Safety
    ///
    #[doc = concat!("`handle` must point to a readable `", stringify!($ty), "`.")]
    pub unsafe fn $name(&self, handle: NativeHandle) -> $ty {
      // SAFETY: upheld by the caller.
      unsafe { std::ptr::read_unaligned(handle.as_ptr().cast::<$ty>()) }
    }
  };
}

impl<'lib> NativeTools<'lib> {
  pub(crate) fn new(_library: &'lib LoadedLibrary) -> Self {
    Self { _library: PhantomData }
  }

  primitive_accessor!(get_byte -> i8);
  primitive_accessor!(get_short -> i16);
  primitive_accessor!(get_int -> i32);
  primitive_accessor!(get_long -> i64);
  primitive_accessor!(get_float -> f32);
  primitive_accessor!(get_double -> f64);

  /// Read a one-byte boolean; any non-zero byte is `true`.
  ///
  /// # Safety
  ///
  /// `handle` must point to a readable byte.
  pub unsafe fn get_bool(&self, handle: NativeHandle) -> bool {
    // SAFETY: upheld by the caller.
    unsafe { std::ptr::read_unaligned(handle.as_ptr().cast::<u8>()) != 0 }
  }

  /// Read a 32-bit Unicode scalar. Returns `None` for invalid code points.
  ///
  /// # Safety
  ///
  /// `handle` must point to a readable `u32`.
  pub unsafe fn get_char(&self, handle: NativeHandle) -> Option<char> {
    // SAFETY: upheld by the caller.
    let raw = unsafe { std::ptr::read_unaligned(handle.as_ptr().cast::<u32>()) };
    char::from_u32(raw)
  }

  /// Read a NUL-terminated string, replacing invalid UTF-8.
  ///
  /// # Safety
  ///
  /// `handle` must point to a NUL-terminated byte string.
  pub unsafe fn get_string(&self, handle: NativeHandle) -> String {
    // SAFETY: upheld by the caller.
    let raw = unsafe { CStr::from_ptr(handle.as_ptr().cast::<c_char>()) };
    raw.to_string_lossy().into_owned()
  }

  /// Copy `descriptor.size` bytes starting at `handle`.
  ///
  /// # Safety
  ///
  /// `handle` must point to at least `descriptor.size` readable bytes.
  pub unsafe fn get_object_raw(&self, handle: NativeHandle, descriptor: &TypeDescriptor) -> StructuredValue {
    // SAFETY: upheld by the caller.
    let bytes = unsafe { std::slice::from_raw_parts(handle.as_ptr().cast::<u8>(), descriptor.size) };
    StructuredValue {
      descriptor: *descriptor,
      bytes: bytes.to_vec(),
    }
  }

  /// Read a structured value described by `T::DESCRIPTOR`.
  ///
  /// # Safety
  ///
  /// `handle` must point to a valid `T`.
  pub unsafe fn get_object<T: NativeType>(&self, handle: NativeHandle) -> Result<T, AccessError> {
    check_layout::<T>(&T::DESCRIPTOR)?;
    // SAFETY: upheld by the caller.
    Ok(unsafe { std::ptr::read_unaligned(handle.as_ptr().cast::<T>()) })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::stub_library;

  #[repr(C)]
  #[derive(Debug, Clone, Copy, PartialEq)]
  struct Point {
    x: i32,
    y: i32,
  }

  impl NativeType for Point {
    const DESCRIPTOR: TypeDescriptor = TypeDescriptor::of::<Point>("com.example.Point");
  }

  #[derive(Debug, Clone, Copy)]
  struct Mislabelled(u64);

  impl NativeType for Mislabelled {
    const DESCRIPTOR: TypeDescriptor = TypeDescriptor {
      name: "Mislabelled",
      size: 4,
      align: 4,
    };
  }

  fn handle<T>(value: &T) -> NativeHandle {
    NativeHandle::from_ptr(value as *const T).unwrap()
  }

  #[test]
  fn null_handles_are_rejected() {
    assert!(NativeHandle::from_addr(0).is_none());
    assert!(NativeHandle::from_ptr(std::ptr::null::<i32>()).is_none());
  }

  #[test]
  fn primitives_round_trip_through_handles() {
    let library = stub_library("/libaccess-prims.so");
    let tools = library.tools();

    let int = -7_i32;
    let long = 1_i64 << 40;
    let short = 300_i16;
    let byte = -3_i8;
    let double = 2.5_f64;
    let float = 0.25_f32;
    let truthy = 2_u8;

    unsafe {
      assert_eq!(tools.get_int(handle(&int)), -7);
      assert_eq!(tools.get_long(handle(&long)), 1 << 40);
      assert_eq!(tools.get_short(handle(&short)), 300);
      assert_eq!(tools.get_byte(handle(&byte)), -3);
      assert_eq!(tools.get_double(handle(&double)), 2.5);
      assert_eq!(tools.get_float(handle(&float)), 0.25);
      assert!(tools.get_bool(handle(&truthy)));
      assert!(!tools.get_bool(handle(&0_u8)));
    }
  }

  #[test]
  fn char_and_string_accessors() {
    let library = stub_library("/libaccess-text.so");
    let tools = library.tools();

    let ok = 'λ' as u32;
    let surrogate = 0xd800_u32;
    let text = c"hello";

    unsafe {
      assert_eq!(tools.get_char(handle(&ok)), Some('λ'));
      assert_eq!(tools.get_char(handle(&surrogate)), None);
      assert_eq!(tools.get_string(NativeHandle::from_ptr(text.as_ptr()).unwrap()), "hello");
    }
  }

  #[test]
  fn structured_values_use_descriptors() {
    let library = stub_library("/libaccess-struct.so");
    let tools = library.tools();
    let point = Point { x: 3, y: -4 };

    let value = unsafe { tools.get_object::<Point>(handle(&point)) }.unwrap();
    assert_eq!(value, point);

    let raw = unsafe { tools.get_object_raw(handle(&point), &Point::DESCRIPTOR) };
    assert_eq!(raw.descriptor().name, "com.example.Point");
    assert_eq!(raw.bytes().len(), 8);
    assert_eq!(unsafe { raw.cast::<Point>() }.unwrap(), point);
  }

  #[test]
  fn descriptor_size_mismatch_is_an_error() {
    let library = stub_library("/libaccess-mismatch.so");
    let tools = library.tools();
    let value = Mislabelled(9);

    let err = unsafe { tools.get_object::<Mislabelled>(handle(&value)) }.unwrap_err();
    assert_eq!(
      err,
      AccessError::LayoutMismatch {
        name: "Mislabelled",
        expected: 8,
        actual: 4,
      }
    );
  }
}
