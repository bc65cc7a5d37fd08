//! Export table resolver.
//!
//! The export directory names the module and points to three parallel arrays: the function
//! address table (one RVA per exported function), the name pointer table and the name
//! ordinal table (one entry per exported name). Resolution checks that the directory and all
//! three arrays lie inside the image, that every function RVA does, and that every name, and
//! every forwarder string, is NUL-terminated inside the image.
//!
//! A function RVA that falls inside the export directory's own `[rva, rva + size)` range is a
//! forwarder: it points to a `module.function` string rather than to code.
//!
//! The mapping from a function to its name is not precomputed. [`ExportTable::name_of`]
//! scans the ordinal table for the function's index on every call; export tables are small
//! and most consumers only list them once.

use log::{debug, warn};

use crate::{
    file::{headers::DataDirectory, image::RawImage, parser::Parser},
    Result, Structure,
};

/// Size of the export directory record
pub const EXPORT_DIRECTORY_SIZE: usize = 40;

/// The fixed 40-byte export directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDirectory {
    /// Reserved, zero
    pub characteristics: u32,
    /// Creation time of the export data
    pub time_date_stamp: u32,
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    /// RVA of the module name
    pub name: u32,
    /// Ordinal of the first entry in the function address table
    pub base: u32,
    /// Entries in the function address table
    pub number_of_functions: u32,
    /// Entries in the name pointer and name ordinal tables
    pub number_of_names: u32,
    /// RVA of the function address table
    pub address_of_functions: u32,
    /// RVA of the name pointer table
    pub address_of_names: u32,
    /// RVA of the name ordinal table
    pub address_of_name_ordinals: u32,
}

impl ExportDirectory {
    /// Decode the export directory record
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than 40 bytes
    pub fn parse(data: &[u8]) -> Result<ExportDirectory> {
        let mut parser = Parser::new(data, Structure::ExportTable);

        Ok(ExportDirectory {
            characteristics: parser.read_le::<u32>()?,
            time_date_stamp: parser.read_le::<u32>()?,
            major_version: parser.read_le::<u16>()?,
            minor_version: parser.read_le::<u16>()?,
            name: parser.read_le::<u32>()?,
            base: parser.read_le::<u32>()?,
            number_of_functions: parser.read_le::<u32>()?,
            number_of_names: parser.read_le::<u32>()?,
            address_of_functions: parser.read_le::<u32>()?,
            address_of_names: parser.read_le::<u32>()?,
            address_of_name_ordinals: parser.read_le::<u32>()?,
        })
    }
}

/// One validated slot of the function address table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExportAddress {
    rva: u32,
    forwarder: Option<String>,
}

/// An exported function as seen by a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportedFunction<'a> {
    /// Index into the function address table
    pub index: usize,
    /// Biased ordinal (`base + index`)
    pub ordinal: u64,
    /// Exported name, if any name maps to this index
    pub name: Option<&'a str>,
    /// The function's RVA, or the RVA of its forwarder string
    pub rva: u32,
    /// `module.function` this export is forwarded to
    pub forwarder: Option<&'a str>,
}

/// A resolved export table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    /// RVA of the export directory
    pub rva: u32,
    /// Size of the export directory as declared in the data directory
    pub size: u32,
    /// The directory record
    pub directory: ExportDirectory,
    /// Name of the module
    pub module_name: String,
    functions: Vec<ExportAddress>,
    names: Vec<String>,
    name_ordinals: Vec<u16>,
}

impl ExportTable {
    /// Resolve the export table described by `entry`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] tagged with [`Structure::ExportTable`] if the
    /// directory is too small or leaves the image, an array leaves the image, a function RVA
    /// is outside the image, or a name or forwarder string is not terminated inside it. The
    /// index is the function or name entry at fault.
    pub fn resolve(image: &RawImage, entry: DataDirectory) -> Result<ExportTable> {
        let rva = u64::from(entry.virtual_address);
        let size = u64::from(entry.size);
        let image_len = image.len() as u64;

        if size < EXPORT_DIRECTORY_SIZE as u64 {
            return Err(out_of_bounds_error!(
                Structure::ExportTable,
                None,
                "directory size 0x{:X} is smaller than the {} byte export directory",
                size,
                EXPORT_DIRECTORY_SIZE
            ));
        }

        let directory_bytes = image.slice(rva, size, Structure::ExportTable, None)?;
        let directory = ExportDirectory::parse(directory_bytes)?;

        let module_name = image
            .string(u64::from(directory.name))
            .ok_or_else(|| {
                out_of_bounds_error!(
                    Structure::ExportTable,
                    None,
                    "module name at 0x{:08X} is not terminated inside the image",
                    directory.name
                )
            })?
            .into_owned();

        let function_bytes = array(
            image,
            directory.address_of_functions,
            directory.number_of_functions,
            4,
            "address_of_functions",
        )?;
        let name_bytes = array(
            image,
            directory.address_of_names,
            directory.number_of_names,
            4,
            "address_of_names",
        )?;
        let ordinal_bytes = array(
            image,
            directory.address_of_name_ordinals,
            directory.number_of_names,
            2,
            "address_of_name_ordinals",
        )?;

        let mut functions = Vec::with_capacity(directory.number_of_functions as usize);
        let mut parser = Parser::new(function_bytes, Structure::ExportTable);
        for index in 0..directory.number_of_functions as usize {
            let function = parser.read_le::<u32>()?;
            let function_rva = u64::from(function);

            if function_rva >= image_len {
                return Err(out_of_bounds_error!(
                    Structure::ExportTable,
                    Some(index),
                    "function address 0x{:08X} is outside the 0x{:X} byte image",
                    function,
                    image_len
                ));
            }

            let forwarder = if function_rva >= rva && function_rva < rva + size {
                let forwarder = image.string(function_rva).ok_or_else(|| {
                    out_of_bounds_error!(
                        Structure::ExportTable,
                        Some(index),
                        "forwarder string at 0x{:08X} is not terminated inside the image",
                        function
                    )
                })?;
                Some(forwarder.into_owned())
            } else {
                None
            };

            functions.push(ExportAddress {
                rva: function,
                forwarder,
            });
        }

        let mut names = Vec::with_capacity(directory.number_of_names as usize);
        let mut parser = Parser::new(name_bytes, Structure::ExportTable);
        for index in 0..directory.number_of_names as usize {
            let name_rva = parser.read_le::<u32>()?;
            let name = image.string(u64::from(name_rva)).ok_or_else(|| {
                out_of_bounds_error!(
                    Structure::ExportTable,
                    Some(index),
                    "export name at 0x{:08X} is not terminated inside the image",
                    name_rva
                )
            })?;
            names.push(name.into_owned());
        }

        let mut name_ordinals = Vec::with_capacity(directory.number_of_names as usize);
        let mut parser = Parser::new(ordinal_bytes, Structure::ExportTable);
        for index in 0..directory.number_of_names as usize {
            let ordinal = parser.read_le::<u16>()?;
            if u32::from(ordinal) >= directory.number_of_functions {
                warn!(
                    "export name '{}' maps to function {} of {}",
                    names[index], ordinal, directory.number_of_functions
                );
            }
            name_ordinals.push(ordinal);
        }

        debug!(
            "resolved export table of '{}': {} functions, {} names",
            module_name,
            functions.len(),
            names.len()
        );

        Ok(ExportTable {
            rva: entry.virtual_address,
            size: entry.size,
            directory,
            module_name,
            functions,
            names,
            name_ordinals,
        })
    }

    /// Number of entries in the function address table
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns true if the table exports no functions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// All exported names, in name-table order
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Name of the function at `index`, found by scanning the name ordinal table
    #[must_use]
    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.name_ordinals
            .iter()
            .position(|ordinal| usize::from(*ordinal) == index)
            .map(|position| self.names[position].as_str())
    }

    /// The function at `index` of the function address table
    #[must_use]
    pub fn function(&self, index: usize) -> Option<ExportedFunction<'_>> {
        let address = self.functions.get(index)?;

        Some(ExportedFunction {
            index,
            ordinal: u64::from(self.directory.base) + index as u64,
            name: self.name_of(index),
            rva: address.rva,
            forwarder: address.forwarder.as_deref(),
        })
    }

    /// Iterate over the function address table
    pub fn functions(&self) -> impl Iterator<Item = ExportedFunction<'_>> + '_ {
        (0..self.functions.len()).filter_map(move |index| self.function(index))
    }

    /// Look up an export by name
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<ExportedFunction<'_>> {
        let position = self.names.iter().position(|candidate| candidate == name)?;
        self.function(usize::from(self.name_ordinals[position]))
    }
}

/// Borrow one of the export arrays after checking it fits in the image.
fn array<'a>(
    image: &'a RawImage,
    rva: u32,
    count: u32,
    entry_size: u64,
    field: &str,
) -> Result<&'a [u8]> {
    image
        .slice(
            u64::from(rva),
            u64::from(count) * entry_size,
            Structure::ExportTable,
            None,
        )
        .map_err(|_| {
            out_of_bounds_error!(
                Structure::ExportTable,
                None,
                "{} entries at {} 0x{:08X} end past the 0x{:X} byte image",
                count,
                field,
                rva,
                image.len()
            )
        })
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

    fn image_of(builder: &PeBuilder) -> RawImage {
        let mut cursor = Cursor::new(builder.build());
        let loaded = load(&mut cursor, &LoadConfig::default()).unwrap();
        let mut image = loaded.image;
        let headers = resolve(&image, loaded.architecture).unwrap();
        materialize(&mut cursor, &mut image, &headers.sections).unwrap();
        image
    }

    fn entry(virtual_address: u32, size: u32) -> DataDirectory {
        DataDirectory {
            virtual_address,
            size,
        }
    }

    fn expect_error(result: Result<ExportTable>, expected_index: Option<usize>, needle: &str) {
        match result {
            Err(Error::OutOfBounds {
                structure,
                index,
                message,
            }) => {
                assert_eq!(structure, Structure::ExportTable);
                assert_eq!(index, expected_index);
                assert!(message.contains(needle), "unexpected message: {message}");
            }
            other => panic!("Expected OutOfBounds, got {:?}", other),
        }
    }

    #[test]
    fn resolve_sample() {
        let image = image_of(&PeBuilder::sample32());
        let table = ExportTable::resolve(&image, entry(0x2000, 0x100)).unwrap();

        assert_eq!(table.module_name, "sample.dll");
        assert_eq!(table.len(), 3);
        assert_eq!(table.names(), &["alpha".to_string(), "beta".to_string()]);

        let functions: Vec<_> = table.functions().collect();
        assert_eq!(functions[0].name, Some("alpha"));
        assert_eq!(functions[0].ordinal, 1);
        assert_eq!(functions[0].rva, 0x1000);
        assert_eq!(functions[0].forwarder, None);

        assert_eq!(functions[1].name, None);
        assert_eq!(functions[1].ordinal, 2);

        assert_eq!(functions[2].name, Some("beta"));
        assert_eq!(functions[2].forwarder, Some("other.Func"));
    }

    #[test]
    fn lookup_by_name() {
        let image = image_of(&PeBuilder::sample32());
        let table = ExportTable::resolve(&image, entry(0x2000, 0x100)).unwrap();

        assert_eq!(table.by_name("alpha").unwrap().rva, 0x1000);
        assert_eq!(table.by_name("beta").unwrap().index, 2);
        assert!(table.by_name("gamma").is_none());
        assert_eq!(table.name_of(1), None);
    }

    #[test]
    fn rva_outside_directory_is_not_a_forwarder() {
        // With a 0x40 byte directory the string at 0x2060 is an ordinary RVA
        let image = image_of(&PeBuilder::sample32());
        let table = ExportTable::resolve(&image, entry(0x2000, 0x40)).unwrap();

        assert_eq!(table.function(2).unwrap().forwarder, None);
        assert_eq!(table.function(2).unwrap().rva, 0x2060);
    }

    #[test]
    fn function_outside_image() {
        let image = image_of(&PeBuilder::sample32().put_u32(0x202C, 0x50000));
        expect_error(
            ExportTable::resolve(&image, entry(0x2000, 0x40)),
            Some(1),
            "function address 0x00050000",
        );
    }

    #[test]
    fn directory_too_small() {
        let image = image_of(&PeBuilder::sample32());
        expect_error(
            ExportTable::resolve(&image, entry(0x2000, 0x20)),
            None,
            "smaller than the 40 byte",
        );
    }

    #[test]
    fn directory_past_image_end() {
        let image = image_of(&PeBuilder::sample32());
        expect_error(
            ExportTable::resolve(&image, entry(0x3FF0, 0x40)),
            None,
            "exceed",
        );
        expect_error(
            ExportTable::resolve(&image, entry(0xFFFF_FFF0, 0x40)),
            None,
            "exceed",
        );
    }

    #[test]
    fn arrays_past_image_end() {
        let image = image_of(&PeBuilder::sample32().put_u32(0x2014, 0x1000_0000));
        expect_error(
            ExportTable::resolve(&image, entry(0x2000, 0x100)),
            None,
            "address_of_functions",
        );

        let image = image_of(&PeBuilder::sample32().put_u32(0x2024, 0x3FFF));
        expect_error(
            ExportTable::resolve(&image, entry(0x2000, 0x100)),
            None,
            "address_of_name_ordinals",
        );
    }

    #[test]
    fn unterminated_name() {
        let builder = PeBuilder::new32()
            .section(".edata", 0x3000, 0x1000, 0x400, 0x1000, 0x4000_0040)
            .put(0x3000, &{
                let mut directory = [0_u8; 40];
                directory[12..16].copy_from_slice(&0x3100_u32.to_le_bytes());
                directory[24..28].copy_from_slice(&1_u32.to_le_bytes());
                directory[32..36].copy_from_slice(&0x3040_u32.to_le_bytes());
                directory[36..40].copy_from_slice(&0x3044_u32.to_le_bytes());
                directory
            })
            .put(0x3100, b"mod.dll\0")
            .put_u32(0x3040, 0x3FF8)
            .put(0x3FF8, b"12345678");
        let image = image_of(&builder);

        expect_error(
            ExportTable::resolve(&image, entry(0x3000, 0x40)),
            Some(0),
            "export name at 0x00003FF8",
        );
    }

    #[test]
    fn unterminated_forwarder() {
        let builder = PeBuilder::new32()
            .section(".edata", 0x3000, 0x1000, 0x400, 0x1000, 0x4000_0040)
            .put(0x3000, &{
                let mut directory = [0_u8; 40];
                directory[12..16].copy_from_slice(&0x3100_u32.to_le_bytes());
                directory[20..24].copy_from_slice(&2_u32.to_le_bytes());
                directory[28..32].copy_from_slice(&0x3040_u32.to_le_bytes());
                directory
            })
            .put(0x3100, b"mod.dll\0")
            .put_u32(0x3040, 0x3200)
            .put_u32(0x3044, 0x3FF0)
            .put(0x3FF0, &[b'x'; 16]);
        let image = image_of(&builder);

        expect_error(
            ExportTable::resolve(&image, entry(0x3000, 0x1000)),
            Some(1),
            "forwarder string at 0x00003FF0",
        );

        // Outside the directory range the same bytes are not treated as a string
        let table = ExportTable::resolve(&image, entry(0x3000, 0x200)).unwrap();
        assert_eq!(table.function(1).unwrap().forwarder, None);
        assert_eq!(table.function(1).unwrap().rva, 0x3FF0);
    }

    #[test]
    fn forwarder_terminated_at_last_byte() {
        let builder = PeBuilder::new32()
            .section(".edata", 0x3000, 0x1000, 0x400, 0x1000, 0x4000_0040)
            .put(0x3000, &{
                let mut directory = [0_u8; 40];
                directory[12..16].copy_from_slice(&0x3100_u32.to_le_bytes());
                directory[20..24].copy_from_slice(&1_u32.to_le_bytes());
                directory[28..32].copy_from_slice(&0x3040_u32.to_le_bytes());
                directory
            })
            .put(0x3100, b"mod.dll\0")
            .put_u32(0x3040, 0x3FF0)
            .put(0x3FF0, b"other.Function1\0");
        let image = image_of(&builder);

        let table = ExportTable::resolve(&image, entry(0x3000, 0x1000)).unwrap();
        assert_eq!(table.function(0).unwrap().forwarder, Some("other.Function1"));
    }

    #[test]
    fn unterminated_module_name() {
        let image = image_of(&PeBuilder::sample32().put_u32(0x200C, 0x4000));
        expect_error(
            ExportTable::resolve(&image, entry(0x2000, 0x100)),
            None,
            "module name",
        );
    }
}
