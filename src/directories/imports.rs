//! Import table resolver.
//!
//! The import directory is a run of 20-byte descriptors ended by one whose first field is
//! zero. Each descriptor names a module and points to two parallel thunk arrays: the import
//! name table (INT, `original_first_thunk`), which says what is imported, and the import
//! address table (IAT, `first_thunk`), which the loader overwrites with resolved addresses.
//!
//! Thunks are 4 or 8 bytes wide depending on the [`Architecture`]. A thunk with the ordinal
//! flag set imports by ordinal; otherwise it is the RVA of a hint/name record (a 16-bit hint
//! followed by a NUL-terminated name).
//!
//! The descriptor scan is bounded by the image, not by the directory size: the declared size
//! is commonly wrong in real files, while the terminating descriptor is what the loader
//! relies on.
//!
//! Resolution validates every INT entry but keeps only its length; [`ImportDescriptor::thunks`]
//! decodes the entries on demand from the image. Descriptors often share a name table, or
//! point into the middle of one, so each thunk run is walked once and its length reused for
//! every descriptor starting inside it.

use std::collections::BTreeMap;

use log::debug;

use crate::{
    file::{
        headers::{Architecture, DataDirectory},
        image::RawImage,
        parser::Parser,
    },
    Result, Structure,
};

/// Size of one import descriptor
pub const IMPORT_DESCRIPTOR_SIZE: usize = 20;

/// What one INT entry imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportThunk {
    /// Import by ordinal
    Ordinal(u16),
    /// Import by name through a hint/name record
    ByName {
        /// RVA of the hint/name record
        rva: u64,
        /// Index into the exporting module's name table to try first
        hint: u16,
        /// Imported function name
        name: String,
    },
}

/// One resolved import descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDescriptor {
    /// RVA of the import name table; doubles as the non-zero sentinel field
    pub original_first_thunk: u32,
    /// Zero unless the import is bound
    pub time_date_stamp: u32,
    /// Index of the first forwarder reference
    pub forwarder_chain: u32,
    /// RVA of the module name
    pub name: u32,
    /// RVA of the import address table
    pub first_thunk: u32,
    /// Name of the imported module
    pub module_name: String,
    /// Number of INT entries, without the terminator
    pub thunk_count: usize,
    architecture: Architecture,
}

impl ImportDescriptor {
    /// Decode the fixed fields of a descriptor; the name and INT length are filled in later
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than 20 bytes
    fn parse(data: &[u8], index: usize, architecture: Architecture) -> Result<ImportDescriptor> {
        let mut parser = Parser::new(data, Structure::ImportTable).with_index(index);

        Ok(ImportDescriptor {
            original_first_thunk: parser.read_le::<u32>()?,
            time_date_stamp: parser.read_le::<u32>()?,
            forwarder_chain: parser.read_le::<u32>()?,
            name: parser.read_le::<u32>()?,
            first_thunk: parser.read_le::<u32>()?,
            module_name: String::new(),
            thunk_count: 0,
            architecture,
        })
    }

    /// Decode the INT entries from `image`, the image this descriptor was resolved against.
    ///
    /// Every entry was validated during resolution, so against that image the iterator yields
    /// exactly [`ImportDescriptor::thunk_count`] items. Against any other buffer it stops at
    /// the first entry that no longer decodes.
    pub fn thunks<'a>(&'a self, image: &'a RawImage) -> impl Iterator<Item = ImportThunk> + 'a {
        let start = u64::from(self.original_first_thunk);
        let thunk_size = self.architecture.thunk_size() as u64;

        (0..self.thunk_count as u64).map_while(move |entry| {
            let value = read_thunk(image, start + entry * thunk_size, self.architecture, 0).ok()?;
            decode_thunk(image, value, self.architecture).ok()
        })
    }
}

/// A resolved import table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTable {
    /// RVA of the first descriptor
    pub rva: u32,
    /// Size as declared in the data directory
    pub size: u32,
    /// Descriptors up to, but not including, the terminator
    pub descriptors: Vec<ImportDescriptor>,
}

impl ImportTable {
    /// Resolve the import table described by `entry`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] tagged with [`Structure::ImportTable`] and the
    /// descriptor index if the descriptor list runs off the image without a terminator, a
    /// thunk table RVA is outside the image, a module or function name is not terminated
    /// inside the image, or the IAT is shorter than the INT.
    pub fn resolve(image: &RawImage, entry: DataDirectory, arch: Architecture) -> Result<ImportTable> {
        let image_len = image.len() as u64;
        let mut descriptors = Vec::new();
        let mut name_tables = ThunkRuns::default();
        let mut address_tables = ThunkRuns::default();
        let mut offset = u64::from(entry.virtual_address);

        for index in 0.. {
            if offset + 4 > image_len {
                return Err(out_of_bounds_error!(
                    Structure::ImportTable,
                    Some(index),
                    "unterminated import table: descriptor at 0x{:08X} runs past the 0x{:X} byte image",
                    offset,
                    image_len
                ));
            }

            let characteristics = image.read::<u32>(offset, Structure::ImportTable, Some(index))?;
            if characteristics == 0 {
                break;
            }

            let bytes = image
                .slice(
                    offset,
                    IMPORT_DESCRIPTOR_SIZE as u64,
                    Structure::ImportTable,
                    Some(index),
                )
                .map_err(|_| {
                    out_of_bounds_error!(
                        Structure::ImportTable,
                        Some(index),
                        "truncated import descriptor at 0x{:08X}",
                        offset
                    )
                })?;

            let mut descriptor = ImportDescriptor::parse(bytes, index, arch)?;
            resolve_descriptor(
                image,
                &mut descriptor,
                index,
                &mut name_tables,
                &mut address_tables,
            )?;
            descriptors.push(descriptor);

            offset += IMPORT_DESCRIPTOR_SIZE as u64;
        }

        debug!(
            "resolved import table: {} modules, {} distinct name table runs",
            descriptors.len(),
            name_tables.len()
        );

        Ok(ImportTable {
            rva: entry.virtual_address,
            size: entry.size,
            descriptors,
        })
    }

    /// Number of imported modules
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true if no module is imported
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Find a descriptor by module name, ignoring ASCII case
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&ImportDescriptor> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.module_name.eq_ignore_ascii_case(name))
    }
}

/// A walked run of non-zero thunks.
#[derive(Debug, Clone, Copy)]
struct ThunkRun {
    len: u64,
    /// False if the run reached the end of the image instead of a zero thunk
    terminated: bool,
}

/// Thunk runs already walked, keyed by start RVA within each alignment class.
///
/// Two runs of the same alignment that overlap end at the same place, so a later start
/// inside a known run is that run's tail.
#[derive(Debug, Default)]
struct ThunkRuns {
    known: BTreeMap<(u64, u64), ThunkRun>,
}

impl ThunkRuns {
    fn find(&self, rva: u64, thunk_size: u64) -> Option<ThunkRun> {
        let class = rva % thunk_size;
        let (&(_, start), run) = self.known.range((class, 0)..=(class, rva)).next_back()?;
        let skipped = (rva - start) / thunk_size;

        (skipped <= run.len).then(|| ThunkRun {
            len: run.len - skipped,
            terminated: run.terminated,
        })
    }

    fn insert(&mut self, rva: u64, thunk_size: u64, run: ThunkRun) {
        self.known.insert((rva % thunk_size, rva), run);
    }

    fn len(&self) -> usize {
        self.known.len()
    }
}

/// Validate one descriptor's references and measure its INT.
fn resolve_descriptor(
    image: &RawImage,
    descriptor: &mut ImportDescriptor,
    index: usize,
    name_tables: &mut ThunkRuns,
    address_tables: &mut ThunkRuns,
) -> Result<()> {
    let image_len = image.len() as u64;
    let arch = descriptor.architecture;

    for (field, value) in [
        ("original_first_thunk", descriptor.original_first_thunk),
        ("first_thunk", descriptor.first_thunk),
    ] {
        if u64::from(value) >= image_len {
            return Err(out_of_bounds_error!(
                Structure::ImportTable,
                Some(index),
                "{} 0x{:08X} is outside the 0x{:X} byte image",
                field,
                value,
                image_len
            ));
        }
    }

    descriptor.module_name = image
        .string(u64::from(descriptor.name))
        .ok_or_else(|| {
            out_of_bounds_error!(
                Structure::ImportTable,
                Some(index),
                "module name at 0x{:08X} is not terminated inside the image",
                descriptor.name
            )
        })?
        .into_owned();

    let thunk_size = arch.thunk_size() as u64;

    // INT
    let int_start = u64::from(descriptor.original_first_thunk);
    let count = match name_tables.find(int_start, thunk_size) {
        Some(run) => run.len,
        None => {
            let mut thunk_rva = int_start;
            loop {
                let value = read_thunk(image, thunk_rva, arch, index).map_err(|_| {
                    out_of_bounds_error!(
                        Structure::ImportTable,
                        Some(index),
                        "import name table of '{}' runs past the image at 0x{:08X}",
                        descriptor.module_name,
                        thunk_rva
                    )
                })?;
                if value == 0 {
                    break;
                }
                validate_thunk(image, value, arch, index)?;
                thunk_rva += thunk_size;
            }

            let len = (thunk_rva - int_start) / thunk_size;
            name_tables.insert(
                int_start,
                thunk_size,
                ThunkRun {
                    len,
                    terminated: true,
                },
            );
            len
        }
    };
    descriptor.thunk_count = count as usize;

    // IAT
    let iat_start = u64::from(descriptor.first_thunk);
    let run = match address_tables.find(iat_start, thunk_size) {
        Some(run) => run,
        None => {
            let mut thunk_rva = iat_start;
            let terminated = loop {
                match read_thunk(image, thunk_rva, arch, index) {
                    Ok(0) => break true,
                    Ok(_) => thunk_rva += thunk_size,
                    Err(_) => break false,
                }
            };

            let run = ThunkRun {
                len: (thunk_rva - iat_start) / thunk_size,
                terminated,
            };
            address_tables.insert(iat_start, thunk_size, run);
            run
        }
    };

    if run.len < count {
        return Err(if run.terminated {
            out_of_bounds_error!(
                Structure::ImportTable,
                Some(index),
                "truncated import address table of '{}': entry {} of {} is zero",
                descriptor.module_name,
                run.len,
                count
            )
        } else {
            out_of_bounds_error!(
                Structure::ImportTable,
                Some(index),
                "import address table of '{}' runs past the image after {} of {} entries",
                descriptor.module_name,
                run.len,
                count
            )
        });
    }

    Ok(())
}

/// Check the hint/name record a by-name thunk points at.
fn validate_thunk(image: &RawImage, value: u64, arch: Architecture, index: usize) -> Result<()> {
    let ordinal_flag = arch.ordinal_flag();
    if value & ordinal_flag != 0 {
        return Ok(());
    }

    let rva = value & !ordinal_flag;
    image.read::<u16>(rva, Structure::ImportTable, Some(index))?;
    if !image.is_valid_string(rva + 2) {
        return Err(out_of_bounds_error!(
            Structure::ImportTable,
            Some(index),
            "imported name at 0x{:08X} is not terminated inside the image",
            rva + 2
        ));
    }

    Ok(())
}

fn decode_thunk(image: &RawImage, value: u64, arch: Architecture) -> Result<ImportThunk> {
    let ordinal_flag = arch.ordinal_flag();
    if value & ordinal_flag != 0 {
        return Ok(ImportThunk::Ordinal((value & 0xFFFF) as u16));
    }

    let rva = value & !ordinal_flag;
    let hint = image.read::<u16>(rva, Structure::ImportTable, None)?;
    let name = image.string(rva + 2).ok_or_else(|| {
        out_of_bounds_error!(
            Structure::ImportTable,
            None,
            "imported name at 0x{:08X} is not terminated inside the image",
            rva + 2
        )
    })?;

    Ok(ImportThunk::ByName {
        rva,
        hint,
        name: name.into_owned(),
    })
}

fn read_thunk(image: &RawImage, rva: u64, arch: Architecture, index: usize) -> Result<u64> {
    match arch {
        Architecture::Pe32 => {
            Ok(u64::from(image.read::<u32>(rva, Structure::ImportTable, Some(index))?))
        }
        Architecture::Pe64 => image.read::<u64>(rva, Structure::ImportTable, Some(index)),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::{
        config::LoadConfig,
        file::{loader::load, regions::resolve, sections::materialize},
        test::PeBuilder,
        Error,
    };

    fn image_of(builder: &PeBuilder) -> (RawImage, Architecture) {
        let mut cursor = Cursor::new(builder.build());
        let loaded = load(&mut cursor, &LoadConfig::default()).unwrap();
        let mut image = loaded.image;
        let headers = resolve(&image, loaded.architecture).unwrap();
        materialize(&mut cursor, &mut image, &headers.sections).unwrap();
        (image, loaded.architecture)
    }

    fn entry(virtual_address: u32, size: u32) -> DataDirectory {
        DataDirectory {
            virtual_address,
            size,
        }
    }

    fn expect_error(result: Result<ImportTable>, expected_index: usize, needle: &str) {
        match result {
            Err(Error::OutOfBounds {
                structure,
                index,
                message,
            }) => {
                assert_eq!(structure, Structure::ImportTable);
                assert_eq!(index, Some(expected_index));
                assert!(message.contains(needle), "unexpected message: {message}");
            }
            other => panic!("Expected OutOfBounds, got {:?}", other),
        }
    }

    fn check_sample(builder: PeBuilder) {
        let (image, arch) = image_of(&builder);
        let table = ImportTable::resolve(&image, entry(0x2200, 0x3C), arch).unwrap();

        assert_eq!(table.len(), 2);

        let kernel32 = table.module("kernel32.dll").unwrap();
        assert_eq!(kernel32.original_first_thunk, 0x2300);
        assert_eq!(kernel32.first_thunk, 0x2340);
        assert_eq!(kernel32.thunk_count, 2);
        assert_eq!(
            kernel32.thunks(&image).collect::<Vec<_>>(),
            vec![
                ImportThunk::ByName {
                    rva: 0x2420,
                    hint: 0x11,
                    name: "ExitProcess".to_string()
                },
                ImportThunk::Ordinal(5),
            ]
        );

        let user32 = &table.descriptors[1];
        assert_eq!(user32.module_name, "USER32.dll");
        assert_eq!(user32.thunk_count, 1);
        assert_eq!(user32.thunks(&image).count(), 1);
    }

    #[test]
    fn resolve_sample32() {
        check_sample(PeBuilder::sample32());
    }

    #[test]
    fn resolve_sample64() {
        check_sample(PeBuilder::sample64());
    }

    #[test]
    fn thunk_width_follows_architecture() {
        // 64-bit ordinal flag is bit 63; bit 31 alone is a (bogus) RVA
        let (image, arch) = image_of(&PeBuilder::sample64().put(0x2308, &0x8000_0005_u64.to_le_bytes()));
        expect_error(
            ImportTable::resolve(&image, entry(0x2200, 0x3C), arch),
            0,
            "exceed",
        );
    }

    #[test]
    fn unterminated_descriptor_list() {
        let mut builder =
            PeBuilder::new32().section(".idata", 0x3000, 0x1000, 0x400, 0x1000, 0xC000_0040);
        builder = builder.put(0x3010, b"a.dll\0").directory(1, 0x3F10, 0xF0);
        for i in 0..12 {
            builder = builder.import_descriptor(0x3F10 + i * 20, 0x3000, 0x3010, 0x3000);
        }
        let (image, arch) = image_of(&builder);

        expect_error(
            ImportTable::resolve(&image, entry(0x3F10, 0xF0), arch),
            12,
            "unterminated import table",
        );
    }

    #[test]
    fn truncated_descriptor() {
        let builder = PeBuilder::new32()
            .section(".idata", 0x3000, 0x1000, 0x400, 0x1000, 0xC000_0040)
            .put_u32(0x3FF8, 0x3000);
        let (image, arch) = image_of(&builder);

        expect_error(
            ImportTable::resolve(&image, entry(0x3FF8, 0x8), arch),
            0,
            "truncated import descriptor",
        );
    }

    #[test]
    fn thunk_tables_outside_image() {
        let (image, arch) = image_of(&PeBuilder::sample32().put_u32(0x2214 + 16, 0x4000));
        expect_error(
            ImportTable::resolve(&image, entry(0x2200, 0x3C), arch),
            1,
            "first_thunk 0x00004000",
        );

        let (image, arch) = image_of(&PeBuilder::sample32().put_u32(0x2200, 0x7000_0000));
        expect_error(
            ImportTable::resolve(&image, entry(0x2200, 0x3C), arch),
            0,
            "original_first_thunk",
        );
    }

    #[test]
    fn unterminated_module_name() {
        let (image, arch) = image_of(&PeBuilder::sample32().put_u32(0x2214 + 12, 0x4000));
        expect_error(
            ImportTable::resolve(&image, entry(0x2200, 0x3C), arch),
            1,
            "module name",
        );
    }

    #[test]
    fn unterminated_function_name() {
        let builder = PeBuilder::sample32()
            .section(".tail", 0x3800, 0x800, 0xE00, 0x800, 0x4000_0040)
            .put_thunk(0x2320, 0x3FF0)
            .put(0x3FF2, &[b'A'; 14]);
        let (image, arch) = image_of(&builder);

        expect_error(
            ImportTable::resolve(&image, entry(0x2200, 0x3C), arch),
            1,
            "imported name at 0x00003FF2",
        );
    }

    #[test]
    fn truncated_iat() {
        let (image, arch) = image_of(&PeBuilder::sample32().put_u32(0x2344, 0));
        expect_error(
            ImportTable::resolve(&image, entry(0x2200, 0x3C), arch),
            0,
            "entry 1 of 2 is zero",
        );
    }

    #[test]
    fn int_running_off_image() {
        let builder = PeBuilder::new32()
            .section(".idata", 0x3000, 0x1000, 0x400, 0x1000, 0xC000_0040)
            .import_descriptor(0x3000, 0x3FFC, 0x3020, 0x3040)
            .put(0x3020, b"b.dll\0")
            .put_u32(0x3FFC, 0x8000_0001);
        let (image, arch) = image_of(&builder);

        expect_error(
            ImportTable::resolve(&image, entry(0x3000, 0x28), arch),
            0,
            "import name table of 'b.dll'",
        );
    }

    /// 100 descriptors over one 1000-entry INT and IAT, each starting up to 9 entries in
    fn shared_tables(builder: PeBuilder) -> PeBuilder {
        let mut builder = builder
            .section(".idata", 0x3000, 0x5000, 0x400, 0x5000, 0xC000_0040)
            .directory(1, 0x3000, 0x7E4)
            .put(0x3800, b"m.dll\0");
        builder.size_of_image = 0x8000;

        let thunk_size = if builder.is_64bit() { 8 } else { 4 };
        let flag = builder.ordinal_flag();
        for i in 0..1000 {
            builder = builder
                .put_thunk(0x4000 + i * thunk_size, flag | u64::from(i + 1))
                .put_thunk(0x6000 + i * thunk_size, flag | u64::from(i + 1));
        }
        for i in 0..100 {
            let skip = (i % 10) * thunk_size;
            builder =
                builder.import_descriptor(0x3000 + i * 20, 0x4000 + skip, 0x3800, 0x6000 + skip);
        }
        builder
    }

    #[test]
    fn shared_name_tables() {
        for builder in [PeBuilder::new32(), PeBuilder::new64()] {
            let (image, arch) = image_of(&shared_tables(builder));
            let table = ImportTable::resolve(&image, entry(0x3000, 0x7E4), arch).unwrap();

            assert_eq!(table.len(), 100);
            for (i, descriptor) in table.descriptors.iter().enumerate() {
                assert_eq!(descriptor.thunk_count, 1000 - i % 10);
            }

            let mut thunks = table.descriptors[3].thunks(&image);
            assert_eq!(thunks.next(), Some(ImportThunk::Ordinal(4)));
            assert_eq!(thunks.count(), 996);
        }
    }

    #[test]
    fn shared_address_table_too_short() {
        // cut the shared IAT after 500 entries; the first descriptor reports it
        let builder = shared_tables(PeBuilder::new32()).put_u32(0x6000 + 500 * 4, 0);
        let (image, arch) = image_of(&builder);

        expect_error(
            ImportTable::resolve(&image, entry(0x3000, 0x7E4), arch),
            0,
            "entry 500 of 1000 is zero",
        );
    }

    #[test]
    fn thunk_runs_reuse_tails() {
        let mut runs = ThunkRuns::default();
        runs.insert(
            0x1000,
            4,
            ThunkRun {
                len: 10,
                terminated: true,
            },
        );

        assert_eq!(runs.find(0x1000, 4).map(|run| run.len), Some(10));
        assert_eq!(runs.find(0x1008, 4).map(|run| run.len), Some(8));
        assert_eq!(runs.find(0x1028, 4).map(|run| run.len), Some(0));
        assert!(runs.find(0x102C, 4).is_none());
        assert!(runs.find(0x1002, 4).is_none());
        assert!(runs.find(0x0FFC, 4).is_none());
        assert_eq!(runs.len(), 1);
    }
}
