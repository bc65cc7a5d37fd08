//! Region resolver.
//!
//! Locates the DOS header, DOS stub, NT header, data directory and section table inside the
//! header prefix of a loaded [`RawImage`] and decodes them. Every check here is made against
//! `size_of_headers` rather than the full image: these structures only exist in the copied
//! header prefix, and the bytes past it belong to sections.
//!
//! Resolution is a pure function of the buffer and the architecture, so resolving the same
//! image twice yields identical [`Headers`].

use log::{debug, warn};

use crate::{
    file::{
        headers::{
            Architecture, DataDirectory, DosHeader, FileHeader, OptionalHeader, SectionHeader,
            DATA_DIRECTORY_ENTRY_SIZE, DOS_HEADER_SIZE, FILE_HEADER_SIZE, NT_SIGNATURE,
            NUMBER_OF_DIRECTORY_ENTRIES, SECTION_HEADER_SIZE, SIGNATURE_SIZE,
        },
        image::RawImage,
        io::read_le,
    },
    Result, Structure,
};

/// An `(offset, length)` pair into the image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    /// Start offset
    pub offset: usize,
    /// Length in bytes
    pub len: usize,
}

impl Span {
    fn new(offset: u64, len: u64) -> Span {
        // Both values were bounds-checked against the header length, which is a usize
        Span {
            offset: offset as usize,
            len: len as usize,
        }
    }

    /// One past the last byte
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Where each header structure lives, all within the header prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderView {
    /// Fixed 64 bytes at offset 0
    pub dos_header: Span,
    /// Between the DOS header and `e_lfanew`
    pub dos_stub: Span,
    /// Signature, file header and declared optional header
    pub nt_header: Span,
    /// The data directory array
    pub data_directory: Span,
    /// The section header array
    pub section_table: Span,
}

/// The decoded header records of an image together with their locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headers {
    /// Locations
    pub view: HeaderView,
    /// DOS header
    pub dos: DosHeader,
    /// NT signature, always `PE\0\0`
    pub signature: u32,
    /// COFF file header
    pub file: FileHeader,
    /// Optional header in the layout chosen at load time
    pub optional: OptionalHeader,
    /// All `number_of_rva_and_sizes` data directory entries
    pub data_directories: Vec<DataDirectory>,
    /// All `number_of_sections` section headers
    pub sections: Vec<SectionHeader>,
}

/// Resolve and decode the header structures of `image`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] tagged with the structure that does not fit in the
/// header region, or [`crate::Error::Malformed`] if the NT signature in the buffer is wrong.
pub fn resolve(image: &RawImage, arch: Architecture) -> Result<Headers> {
    let header_len = image.header_len() as u64;

    // DOS header
    if header_len < DOS_HEADER_SIZE as u64 {
        return Err(out_of_bounds_error!(
            Structure::DosHeader,
            None,
            "ends unexpectedly: header region is only 0x{:X} bytes",
            header_len
        ));
    }
    let dos = DosHeader::parse(image.header_slice(0, DOS_HEADER_SIZE as u64, Structure::DosHeader, None)?)?;

    // DOS stub
    let nt = i64::from(dos.e_lfanew);
    if nt < DOS_HEADER_SIZE as i64 || nt as u64 > header_len {
        return Err(out_of_bounds_error!(
            Structure::DosStub,
            None,
            "ends unexpectedly: e_lfanew 0x{:X} is outside 0x{:X}..=0x{:X}",
            dos.e_lfanew,
            DOS_HEADER_SIZE,
            header_len
        ));
    }
    let nt = nt as u64;
    let dos_stub = Span::new(DOS_HEADER_SIZE as u64, nt - DOS_HEADER_SIZE as u64);

    // NT header
    let file_start = nt + SIGNATURE_SIZE as u64;
    let optional_start = file_start + FILE_HEADER_SIZE as u64;
    if file_start > header_len {
        return Err(out_of_bounds_error!(
            Structure::NtHeader,
            None,
            "image signature ends unexpectedly"
        ));
    }
    if optional_start > header_len {
        return Err(out_of_bounds_error!(
            Structure::NtHeader,
            None,
            "image file header ends unexpectedly"
        ));
    }

    let signature_bytes = image.header_slice(nt, SIGNATURE_SIZE as u64, Structure::NtHeader, None)?;
    let signature = read_le::<u32>(signature_bytes).unwrap_or_default();
    if signature != NT_SIGNATURE {
        return Err(malformed_error!(
            "image signature in nt header is 0x{:08X}, but expected 0x{:08X}",
            signature,
            NT_SIGNATURE
        ));
    }

    let file = FileHeader::parse(image.header_slice(
        file_start,
        FILE_HEADER_SIZE as u64,
        Structure::NtHeader,
        None,
    )?)?;

    // The optional header is decoded up to and including number_of_rva_and_sizes
    let directory_start = optional_start + arch.data_directory_offset() as u64;
    if directory_start > header_len {
        return Err(out_of_bounds_error!(
            Structure::NtHeader,
            None,
            "image optional header ends unexpectedly"
        ));
    }
    let optional = OptionalHeader::parse(
        arch,
        image.header_slice(
            optional_start,
            arch.data_directory_offset() as u64,
            Structure::NtHeader,
            None,
        )?,
    )?;

    // Data directory
    let directory_count = u64::from(optional.number_of_rva_and_sizes());
    let directory_len = directory_count * DATA_DIRECTORY_ENTRY_SIZE as u64;
    let directory_bytes = image
        .header_slice(directory_start, directory_len, Structure::DataDirectory, None)
        .map_err(|_| {
            out_of_bounds_error!(
                Structure::DataDirectory,
                None,
                "{} entries at 0x{:X} end past the 0x{:X} byte header region",
                directory_count,
                directory_start,
                header_len
            )
        })?;
    if directory_count > NUMBER_OF_DIRECTORY_ENTRIES as u64 {
        warn!(
            "number_of_rva_and_sizes is {}, only the first {} entries have a defined meaning",
            directory_count, NUMBER_OF_DIRECTORY_ENTRIES
        );
    }
    let data_directories = directory_bytes
        .chunks_exact(DATA_DIRECTORY_ENTRY_SIZE)
        .map(DataDirectory::parse)
        .collect::<Result<Vec<_>>>()?;

    // Section table
    let table_start = optional_start + u64::from(file.size_of_optional_header);
    let section_count = u64::from(file.number_of_sections);
    let table_len = section_count * SECTION_HEADER_SIZE as u64;
    let table_bytes = image
        .header_slice(table_start, table_len, Structure::SectionTable, None)
        .map_err(|_| {
            out_of_bounds_error!(
                Structure::SectionTable,
                None,
                "{} sections at 0x{:X} end past the 0x{:X} byte header region",
                section_count,
                table_start,
                header_len
            )
        })?;
    let sections = table_bytes
        .chunks_exact(SECTION_HEADER_SIZE)
        .enumerate()
        .map(|(index, bytes)| SectionHeader::parse(bytes, index))
        .collect::<Result<Vec<_>>>()?;

    let view = HeaderView {
        dos_header: Span::new(0, DOS_HEADER_SIZE as u64),
        dos_stub,
        nt_header: Span::new(nt, table_start - nt),
        data_directory: Span::new(directory_start, directory_len),
        section_table: Span::new(table_start, table_len),
    };

    debug!(
        "resolved headers: nt header at 0x{:X}, {} data directories, {} sections",
        nt,
        data_directories.len(),
        sections.len()
    );

    Ok(Headers {
        view,
        dos,
        signature,
        file,
        optional,
        data_directories,
        sections,
    })
}
