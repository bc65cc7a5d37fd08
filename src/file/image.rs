//! The flat, RVA-addressable image buffer.
//!
//! [`crate::file::image::RawImage`] models the executable as the loader would lay it out in memory:
//! a zero-filled buffer of `size_of_image` bytes whose first `size_of_headers` bytes are a
//! copy of the file's header prefix, with every section's raw data copied to its virtual
//! address. Every read goes through an accessor that checks `offset + len` in `u64` before a
//! slice is formed, so no consumer can build an out-of-bounds reference from file-controlled
//! values.

use std::borrow::Cow;

use crate::{
    file::io::{read_le, PeIO},
    Result, Structure,
};

/// Owned image buffer plus the length of its header-only prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    data: Vec<u8>,
    header_length: usize,
}

impl RawImage {
    pub(crate) fn new(data: Vec<u8>, header_length: usize) -> RawImage {
        RawImage {
            data,
            header_length,
        }
    }

    /// Declared image size (`size_of_image`)
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer is empty, which a loaded image never is
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Declared header size (`size_of_headers`), never larger than [`RawImage::len`]
    #[must_use]
    pub fn header_len(&self) -> usize {
        self.header_length
    }

    /// The whole image
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Borrow `len` bytes at `rva`, bounded by the full image.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] tagged with `structure` and `index` if
    /// `rva + len` exceeds the image.
    pub fn slice(
        &self,
        rva: u64,
        len: u64,
        structure: Structure,
        index: Option<usize>,
    ) -> Result<&[u8]> {
        let range = checked_range(rva, len, self.data.len()).ok_or_else(|| {
            out_of_bounds_error!(
                structure,
                index,
                "0x{:X} bytes at 0x{:X} exceed the 0x{:X} byte image",
                len,
                rva,
                self.data.len()
            )
        })?;

        Ok(&self.data[range])
    }

    /// Borrow `len` bytes at `offset`, bounded by the header prefix.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] tagged with `structure` and `index` if
    /// `offset + len` exceeds the header region.
    pub fn header_slice(
        &self,
        offset: u64,
        len: u64,
        structure: Structure,
        index: Option<usize>,
    ) -> Result<&[u8]> {
        let range = checked_range(offset, len, self.header_length).ok_or_else(|| {
            out_of_bounds_error!(
                structure,
                index,
                "0x{:X} bytes at 0x{:X} exceed the 0x{:X} byte header region",
                len,
                offset,
                self.header_length
            )
        })?;

        Ok(&self.data[range])
    }

    /// Read a little-endian value at `rva`, bounded by the full image.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit in the image
    pub fn read<T: PeIO>(&self, rva: u64, structure: Structure, index: Option<usize>) -> Result<T> {
        let bytes = self.slice(rva, std::mem::size_of::<T>() as u64, structure, index)?;
        read_le::<T>(bytes).ok_or_else(|| out_of_bounds_error!(structure, index, "short read"))
    }

    /// Decide whether a NUL-terminated string starts at `rva` and ends inside the image.
    ///
    /// A string whose terminator is the very last byte of the image is accepted; a run of
    /// non-NUL bytes that reaches the end of the image is not.
    #[must_use]
    pub fn is_valid_string(&self, rva: u64) -> bool {
        self.c_str(rva).is_some()
    }

    /// The bytes of the NUL-terminated string at `rva`, without the terminator.
    #[must_use]
    pub fn c_str(&self, rva: u64) -> Option<&[u8]> {
        let start = usize::try_from(rva).ok()?;
        let tail = self.data.get(start..)?;
        let end = tail.iter().position(|b| *b == 0)?;
        Some(&tail[..end])
    }

    /// The NUL-terminated string at `rva`, decoded lossily as UTF-8.
    #[must_use]
    pub fn string(&self, rva: u64) -> Option<Cow<'_, str>> {
        self.c_str(rva).map(String::from_utf8_lossy)
    }

    /// Mutable window used while materializing sections.
    pub(crate) fn window_mut(
        &mut self,
        rva: u64,
        len: u64,
        structure: Structure,
        index: Option<usize>,
    ) -> Result<&mut [u8]> {
        let image_len = self.data.len();
        let range = checked_range(rva, len, image_len).ok_or_else(|| {
            out_of_bounds_error!(
                structure,
                index,
                "0x{:X} bytes at 0x{:X} exceed the 0x{:X} byte image",
                len,
                rva,
                image_len
            )
        })?;

        Ok(&mut self.data[range])
    }
}

/// `offset..offset + len` if it lies within `limit`, computed without wrapping.
pub(crate) fn checked_range(offset: u64, len: u64, limit: usize) -> Option<std::ops::Range<usize>> {
    let end = offset.checked_add(len)?;
    if end > limit as u64 {
        return None;
    }

    Some(usize::try_from(offset).ok()?..usize::try_from(end).ok()?)
}
