//! Little-endian primitive reads over byte slices.
//!
//! Every multi-byte field of a PE image is stored little-endian. This module provides the
//! [`crate::file::io::PeIO`] trait, implemented for the primitive integer types that appear in
//! the on-disk structures, and two free functions that decode a value from a slice without
//! ever indexing past its end.
//!
//! # Key Components
//!
//! - [`crate::file::io::PeIO`] - Conversion from a fixed-size byte array to a primitive
//! - [`crate::file::io::read_le`] - Read a value from the start of a slice
//! - [`crate::file::io::read_le_at`] - Read a value at an offset and advance the offset
//!
//! # Error Handling
//!
//! The functions here have no knowledge of which PE structure a slice belongs to, so they
//! report a short read as `None`. Callers that do know ([`crate::file::parser::Parser`] and
//! [`crate::file::image::RawImage`]) turn that into an [`crate::Error::OutOfBounds`] tagged with the
//! structure being decoded.
//!
//! # Examples
//!
//! ```rust
//! use readpe::file::io::{read_le, read_le_at};
//!
//! let data = [0x4D, 0x5A, 0x90, 0x00, 0x03, 0x00, 0x00, 0x00];
//! assert_eq!(read_le::<u16>(&data), Some(0x5A4D));
//!
//! let mut offset = 2;
//! assert_eq!(read_le_at::<u16>(&data, &mut offset), Some(0x0090));
//! assert_eq!(read_le_at::<u32>(&data, &mut offset), Some(3));
//! assert_eq!(offset, 8);
//! assert_eq!(read_le_at::<u8>(&data, &mut offset), None);
//! ```

/// Trait for type-specific little-endian decoding.
///
/// Each implementation names the fixed-size byte array it is decoded from, e.g. `[u8; 4]`
/// for `u32`. The conversion itself is infallible; the length check happens before the
/// array is formed.
pub trait PeIO: Sized {
    /// Byte array type this numeric type is decoded from
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_pe_io {
    ($($ty:ty),*) => {
        $(
            impl PeIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_pe_io!(u8, u16, u32, u64, i32);

/// Reads a value of type `T` from the start of `data`.
///
/// Returns `None` if `data` is shorter than `T`.
#[must_use]
pub fn read_le<T: PeIO>(data: &[u8]) -> Option<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Reads a value of type `T` at `offset` and advances `offset` past it.
///
/// The offset is left untouched if the read does not fit, including when `offset` itself is
/// so large that adding the width of `T` would overflow.
#[must_use]
pub fn read_le_at<T: PeIO>(data: &[u8], offset: &mut usize) -> Option<T> {
    let type_len = std::mem::size_of::<T>();
    let end = offset.checked_add(type_len)?;
    if end > data.len() {
        return None;
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return None;
    };

    *offset = end;
    Some(T::from_le_bytes(read))
}
