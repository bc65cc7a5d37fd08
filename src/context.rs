//! The loaded and validated image.
//!
//! [`Context`] owns the image buffer and every view resolved from it. Construction runs the
//! whole pipeline in a fixed order and either yields a complete `Context` or an error; a
//! partially resolved `Context` is never returned.
//!
//! 1. Header loader: architecture, declared sizes, buffer allocation, header prefix copy
//! 2. Region resolver: DOS header, DOS stub, NT header, data directory, section table
//! 3. Section materializer: raw section data copied to virtual addresses
//! 4. Export, import and relocation resolvers, each skipped when its directory is empty
//!
//! After construction the `Context` is immutable, so shared references may be handed to as
//! many threads as needed.

use std::{
    fs::File,
    io::{Cursor, Read, Seek},
    path::Path,
};

use log::debug;

use crate::{
    config::LoadConfig,
    directories::{
        exports::ExportTable, imports::ImportTable, lookup, relocations::RelocationTable,
        DataDirectoryKind,
    },
    file::{
        headers::{
            Architecture, DataDirectory, DosHeader, FileHeader, OptionalHeader, SectionHeader,
        },
        image::RawImage,
        loader::load,
        regions::{resolve, HeaderView, Headers},
        sections::materialize,
    },
    Result,
};

/// A fully validated PE image.
///
/// Every offset reachable through the accessors has been checked against the region it
/// lives in: header structures against `size_of_headers`, everything else against
/// `size_of_image`. Every string handed out is NUL-terminated inside the image.
///
/// # Examples
///
/// ```rust,no_run
/// use readpe::Context;
///
/// let context = Context::from_file("sample.dll")?;
/// println!("{} with {} sections", context.architecture(), context.sections().len());
///
/// if let Some(exports) = context.exports() {
///     for function in exports.functions() {
///         println!("{:>5} {:08X} {}", function.ordinal, function.rva, function.name.unwrap_or("-"));
///     }
/// }
/// # Ok::<(), readpe::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    image: RawImage,
    architecture: Architecture,
    headers: Headers,
    exports: Option<ExportTable>,
    imports: Option<ImportTable>,
    relocations: Option<RelocationTable>,
}

impl Context {
    /// Load and validate the image at `path` with every resolver enabled.
    ///
    /// The file is closed before this returns, whether loading succeeds or not.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or read, and the
    /// errors of [`Context::from_reader`] otherwise.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Context> {
        Self::from_file_with(path, &LoadConfig::default())
    }

    /// Load and validate the image at `path` using `config`.
    ///
    /// # Errors
    /// See [`Context::from_file`].
    pub fn from_file_with(path: impl AsRef<Path>, config: &LoadConfig) -> Result<Context> {
        let mut file = File::open(path.as_ref())?;
        debug!("loading {}", path.as_ref().display());
        Self::from_reader(&mut file, config)
    }

    /// Load and validate an in-memory image with every resolver enabled.
    ///
    /// # Errors
    /// See [`Context::from_reader`].
    pub fn from_mem(data: Vec<u8>) -> Result<Context> {
        Self::from_mem_with(data, &LoadConfig::default())
    }

    /// Load and validate an in-memory image using `config`.
    ///
    /// # Errors
    /// See [`Context::from_reader`].
    pub fn from_mem_with(data: Vec<u8>, config: &LoadConfig) -> Result<Context> {
        Self::from_reader(&mut Cursor::new(data), config)
    }

    /// Run the loading pipeline over `reader`.
    ///
    /// # Errors
    /// - [`crate::Error::FileError`] if the input ends before a structure it declares
    /// - [`crate::Error::Malformed`] for a bad DOS magic or NT signature, a negative
    ///   `e_lfanew`, an unknown machine, or inconsistent declared sizes
    /// - [`crate::Error::OutOfBounds`] for any structure outside the region it must live in
    pub fn from_reader<R: Read + Seek>(reader: &mut R, config: &LoadConfig) -> Result<Context> {
        let loaded = load(reader, config)?;
        let architecture = loaded.architecture;
        let mut image = loaded.image;

        let headers = resolve(&image, architecture)?;
        materialize(reader, &mut image, &headers.sections)?;

        let directories = &headers.data_directories;

        let exports = match lookup(directories, DataDirectoryKind::Export) {
            Some(entry) if config.resolve_exports => Some(ExportTable::resolve(&image, entry)?),
            _ => None,
        };
        let imports = match lookup(directories, DataDirectoryKind::Import) {
            Some(entry) if config.resolve_imports => {
                Some(ImportTable::resolve(&image, entry, architecture)?)
            }
            _ => None,
        };
        let relocations = match lookup(directories, DataDirectoryKind::BaseReloc) {
            Some(entry) if config.resolve_relocations => {
                Some(RelocationTable::resolve(&image, entry)?)
            }
            _ => None,
        };

        debug!(
            "loaded {} image: 0x{:X} bytes, {} sections",
            architecture,
            image.len(),
            headers.sections.len()
        );

        Ok(Context {
            image,
            architecture,
            headers,
            exports,
            imports,
            relocations,
        })
    }

    /// The image buffer
    #[must_use]
    pub fn image(&self) -> &RawImage {
        &self.image
    }

    /// Width chosen from the machine field at load time
    #[must_use]
    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    /// All decoded header records
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Locations of the header structures
    #[must_use]
    pub fn header_view(&self) -> &HeaderView {
        &self.headers.view
    }

    /// DOS header
    #[must_use]
    pub fn dos_header(&self) -> &DosHeader {
        &self.headers.dos
    }

    /// Bytes between the DOS header and the NT header
    #[must_use]
    pub fn dos_stub(&self) -> &[u8] {
        let span = self.headers.view.dos_stub;
        &self.image.data()[span.offset..span.end()]
    }

    /// COFF file header
    #[must_use]
    pub fn file_header(&self) -> &FileHeader {
        &self.headers.file
    }

    /// Optional header, PE32 or PE32+
    #[must_use]
    pub fn optional_header(&self) -> &OptionalHeader {
        &self.headers.optional
    }

    /// Every entry of the data directory, including empty ones
    #[must_use]
    pub fn data_directories(&self) -> &[DataDirectory] {
        &self.headers.data_directories
    }

    /// The entry for `kind` if present and non-empty
    #[must_use]
    pub fn data_directory(&self, kind: DataDirectoryKind) -> Option<DataDirectory> {
        lookup(&self.headers.data_directories, kind)
    }

    /// Section headers in table order
    #[must_use]
    pub fn sections(&self) -> &[SectionHeader] {
        &self.headers.sections
    }

    /// The section whose virtual range contains `rva`
    #[must_use]
    pub fn section_for_rva(&self, rva: u32) -> Option<&SectionHeader> {
        self.headers.sections.iter().find(|section| {
            let size = section.virtual_size.max(section.size_of_raw_data);
            let start = u64::from(section.virtual_address);
            (start..start + u64::from(size)).contains(&u64::from(rva))
        })
    }

    /// Resolved export table, `None` if the image has none or it was not requested
    #[must_use]
    pub fn exports(&self) -> Option<&ExportTable> {
        self.exports.as_ref()
    }

    /// Resolved import table, `None` if the image has none or it was not requested
    #[must_use]
    pub fn imports(&self) -> Option<&ImportTable> {
        self.imports.as_ref()
    }

    /// Resolved relocation table, `None` if the image has none or it was not requested
    #[must_use]
    pub fn relocations(&self) -> Option<&RelocationTable> {
        self.relocations.as_ref()
    }
}
