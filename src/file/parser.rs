//! Cursor over a fixed header record.
//!
//! [`crate::file::parser::Parser`] walks a byte slice that holds one on-disk record (a DOS
//! header, a file header, an export directory, ...) and decodes its fields in order. The
//! parser is created with the [`crate::Structure`] the record belongs to, so a short read is
//! reported as an [`crate::Error::OutOfBounds`] that names the right structure.
//!
//! # Examples
//!
//! ```rust
//! use readpe::{file::parser::Parser, Structure};
//!
//! let data = [0x4C, 0x01, 0x03, 0x00];
//! let mut parser = Parser::new(&data, Structure::NtHeader);
//!
//! assert_eq!(parser.read_le::<u16>()?, 0x014C);
//! assert_eq!(parser.read_le::<u16>()?, 3);
//! assert!(parser.read_le::<u8>().is_err());
//! # Ok::<(), readpe::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, PeIO},
    Result, Structure,
};

/// A sequential little-endian reader over a borrowed record.
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
    structure: Structure,
    index: Option<usize>,
}

impl<'a> Parser<'a> {
    /// Create a new parser positioned at the start of `data`
    ///
    /// ## Arguments
    /// * `data` - The record to decode
    /// * `structure` - Structure reported on a short read
    #[must_use]
    pub fn new(data: &'a [u8], structure: Structure) -> Self {
        Parser {
            data,
            position: 0,
            structure,
            index: None,
        }
    }

    /// Tag errors from this parser with the index of the element being decoded
    #[must_use]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Total length of the underlying record
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the underlying record is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current read position
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Move the cursor to `pos`, which may equal the record length
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` lies past the end of the record
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!(
                self.structure,
                self.index,
                "seek to {} past the end of a {} byte record",
                pos,
                self.data.len()
            ));
        }

        self.position = pos;
        Ok(())
    }

    /// Skip `step` bytes
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the skip leaves the record
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        let target = self.position.checked_add(step).ok_or_else(|| {
            out_of_bounds_error!(self.structure, self.index, "cursor overflow")
        })?;
        self.seek(target)
    }

    /// Read a little-endian value and advance past it
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain
    pub fn read_le<T: PeIO>(&mut self) -> Result<T> {
        let at = self.position;
        read_le_at::<T>(self.data, &mut self.position).ok_or_else(|| {
            out_of_bounds_error!(
                self.structure,
                self.index,
                "{} byte field at offset {} exceeds the {} byte record",
                std::mem::size_of::<T>(),
                at,
                self.data.len()
            )
        })
    }

    /// Read a fixed-size byte array and advance past it
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `N` bytes remain
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0_u8; N];
        let end = self.position.checked_add(N).filter(|end| *end <= self.data.len());
        let Some(end) = end else {
            return Err(out_of_bounds_error!(
                self.structure,
                self.index,
                "{} byte array at offset {} exceeds the {} byte record",
                N,
                self.position,
                self.data.len()
            ));
        };

        out.copy_from_slice(&self.data[self.position..end]);
        self.position = end;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn sequential_reads() {
        let data = [0x01, 0x00, 0x02, 0x00, 0x00, 0x00, b'a', b'b'];
        let mut parser = Parser::new(&data, Structure::DosHeader);

        assert_eq!(parser.read_le::<u16>().unwrap(), 1);
        assert_eq!(parser.read_le::<u32>().unwrap(), 2);
        assert_eq!(parser.read_array::<2>().unwrap(), *b"ab");
        assert_eq!(parser.pos(), 8);
        assert_eq!(parser.len(), 8);
    }

    #[test]
    fn short_read_is_tagged() {
        let data = [0x00; 3];
        let mut parser = Parser::new(&data, Structure::SectionTable).with_index(4);

        match parser.read_le::<u32>() {
            Err(Error::OutOfBounds {
                structure, index, ..
            }) => {
                assert_eq!(structure, Structure::SectionTable);
                assert_eq!(index, Some(4));
            }
            other => panic!("Expected OutOfBounds, got {:?}", other),
        }
        assert_eq!(parser.pos(), 0);
    }

    #[test]
    fn seek_and_advance() {
        let data = [0x00, 0x00, 0x34, 0x12];
        let mut parser = Parser::new(&data, Structure::NtHeader);

        parser.advance_by(2).unwrap();
        assert_eq!(parser.read_le::<u16>().unwrap(), 0x1234);

        parser.seek(4).unwrap();
        assert!(parser.seek(5).is_err());
        assert!(parser.advance_by(usize::MAX).is_err());
        assert!(parser.read_array::<1>().is_err());
    }
}
