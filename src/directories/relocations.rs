//! Base relocation table resolver.
//!
//! The relocation directory is a sequence of variable-length blocks. Each block starts with an
//! 8-byte header (the page RVA and the total block size) followed by 16-bit entries whose top
//! 4 bits are the relocation type and whose low 12 bits are the offset into the page.
//!
//! Type 0 entries are padding and patch nothing. Every other entry patches at most 8 bytes at
//! `page + offset`; the resolver requires at least the 4 bytes every type touches to be inside
//! the image.

use log::debug;
use strum::{Display, FromRepr};

use crate::{
    file::{headers::DataDirectory, image::RawImage, parser::Parser},
    Result, Structure,
};

/// Size of a relocation block header
pub const RELOCATION_BLOCK_HEADER_SIZE: u64 = 8;
/// Size of one relocation entry
pub const RELOCATION_ENTRY_SIZE: u64 = 2;

/// Base relocation types.
///
/// Values 5, 7 and 9 are reused by several machines; the name given is the most common one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum RelocationType {
    #[strum(to_string = "ABSOLUTE")]
    Absolute = 0,
    #[strum(to_string = "HIGH")]
    High = 1,
    #[strum(to_string = "LOW")]
    Low = 2,
    #[strum(to_string = "HIGHLOW")]
    HighLow = 3,
    #[strum(to_string = "HIGHADJ")]
    HighAdj = 4,
    #[strum(to_string = "ARM_MOV32")]
    ArmMov32 = 5,
    #[strum(to_string = "RESERVED")]
    Reserved = 6,
    #[strum(to_string = "THUMB_MOV32")]
    ThumbMov32 = 7,
    #[strum(to_string = "RISCV_LOW12S")]
    RiscVLow12S = 8,
    #[strum(to_string = "MIPS_JMPADDR16")]
    MipsJmpAddr16 = 9,
    #[strum(to_string = "DIR64")]
    Dir64 = 10,
}

/// One 16-bit relocation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationEntry {
    /// Raw type nibble
    pub kind: u8,
    /// Offset into the block's page
    pub offset: u16,
}

impl RelocationEntry {
    /// Split a raw entry into type and offset
    #[must_use]
    pub fn from_raw(raw: u16) -> RelocationEntry {
        RelocationEntry {
            kind: (raw >> 12) as u8,
            offset: raw & 0x0FFF,
        }
    }

    /// The type as a known enum value
    #[must_use]
    pub fn relocation_type(&self) -> Option<RelocationType> {
        RelocationType::from_repr(self.kind)
    }

    /// Padding entries patch nothing
    #[must_use]
    pub fn is_padding(&self) -> bool {
        self.kind == RelocationType::Absolute as u8
    }
}

/// One block of relocations sharing a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationBlock {
    /// RVA of the page
    pub virtual_address: u32,
    /// Declared size of the block including its header
    pub size_of_block: u32,
    /// Entries of the block
    pub entries: Vec<RelocationEntry>,
}

impl RelocationBlock {
    /// RVA patched by `entry`
    #[must_use]
    pub fn target(&self, entry: &RelocationEntry) -> u64 {
        u64::from(self.virtual_address) + u64::from(entry.offset)
    }
}

/// A resolved base relocation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationTable {
    /// RVA of the first block
    pub rva: u32,
    /// Size of the directory in bytes
    pub size: u32,
    /// Blocks in directory order
    pub blocks: Vec<RelocationBlock>,
}

impl RelocationTable {
    /// Resolve the relocation blocks described by `entry`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] tagged with [`Structure::RelocationTable`] if the
    /// directory leaves the image, or with the block index if a block is degenerate, runs
    /// past the directory, or contains an entry patching memory outside the image.
    pub fn resolve(image: &RawImage, entry: DataDirectory) -> Result<RelocationTable> {
        let image_len = image.len() as u64;
        let directory = image.slice(
            u64::from(entry.virtual_address),
            u64::from(entry.size),
            Structure::RelocationTable,
            None,
        )?;
        let directory_len = directory.len() as u64;

        let mut blocks = Vec::new();
        let mut offset = 0_u64;
        while offset < directory_len {
            let index = blocks.len();

            if offset + RELOCATION_BLOCK_HEADER_SIZE > directory_len {
                return Err(out_of_bounds_error!(
                    Structure::RelocationTable,
                    Some(index),
                    "block header at +0x{:X} runs past the 0x{:X} byte directory",
                    offset,
                    directory_len
                ));
            }

            let mut parser = Parser::new(directory, Structure::RelocationTable).with_index(index);
            parser.seek(offset as usize)?;
            let virtual_address = parser.read_le::<u32>()?;
            let size_of_block = parser.read_le::<u32>()?;

            if u64::from(size_of_block) < RELOCATION_BLOCK_HEADER_SIZE {
                return Err(out_of_bounds_error!(
                    Structure::RelocationTable,
                    Some(index),
                    "degenerate relocation block: size_of_block {} is smaller than the {} byte header",
                    size_of_block,
                    RELOCATION_BLOCK_HEADER_SIZE
                ));
            }

            let count = (u64::from(size_of_block) - RELOCATION_BLOCK_HEADER_SIZE) / RELOCATION_ENTRY_SIZE;
            let block_end = offset + RELOCATION_BLOCK_HEADER_SIZE + count * RELOCATION_ENTRY_SIZE;
            if block_end > directory_len {
                return Err(out_of_bounds_error!(
                    Structure::RelocationTable,
                    Some(index),
                    "block of 0x{:X} bytes at +0x{:X} runs past the 0x{:X} byte directory",
                    size_of_block,
                    offset,
                    directory_len
                ));
            }

            let mut entries = Vec::with_capacity(count as usize);
            for position in 0..count {
                let entry = RelocationEntry::from_raw(parser.read_le::<u16>()?);
                let target = u64::from(virtual_address) + u64::from(entry.offset);

                if !entry.is_padding() && target + 4 > image_len {
                    return Err(out_of_bounds_error!(
                        Structure::RelocationTable,
                        Some(index),
                        "entry {} (type {}) patches 0x{:08X}, outside the 0x{:X} byte image",
                        position,
                        entry.kind,
                        target,
                        image_len
                    ));
                }
                entries.push(entry);
            }

            blocks.push(RelocationBlock {
                virtual_address,
                size_of_block,
                entries,
            });
            offset = block_end;
        }

        debug!("resolved relocation table: {} blocks", blocks.len());

        Ok(RelocationTable {
            rva: entry.virtual_address,
            size: entry.size,
            blocks,
        })
    }

    /// Total number of entries, padding included
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.blocks.iter().map(|block| block.entries.len()).sum()
    }

    /// Number of addresses that will actually be patched
    #[must_use]
    pub fn address_count(&self) -> usize {
        self.blocks
            .iter()
            .flat_map(|block| block.entries.iter())
            .filter(|entry| !entry.is_padding())
            .count()
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

    fn expect_error(result: Result<RelocationTable>, expected_index: Option<usize>, needle: &str) {
        match result {
            Err(Error::OutOfBounds {
                structure,
                index,
                message,
            }) => {
                assert_eq!(structure, Structure::RelocationTable);
                assert_eq!(index, expected_index);
                assert!(message.contains(needle), "unexpected message: {message}");
            }
            other => panic!("Expected OutOfBounds, got {:?}", other),
        }
    }

    #[test]
    fn entry_from_raw() {
        let entry = RelocationEntry::from_raw(0xA123);
        assert_eq!(entry.kind, 10);
        assert_eq!(entry.offset, 0x123);
        assert_eq!(entry.relocation_type(), Some(RelocationType::Dir64));
        assert!(!entry.is_padding());

        assert!(RelocationEntry::from_raw(0x0FFF).is_padding());
        assert_eq!(RelocationEntry::from_raw(0xF000).relocation_type(), None);
    }

    #[test]
    fn resolve_sample() {
        let image = image_of(&PeBuilder::sample32());
        let table = RelocationTable::resolve(&image, entry(0x3000, 0x14)).unwrap();

        assert_eq!(table.blocks.len(), 2);
        assert_eq!(table.blocks[0].virtual_address, 0x1000);
        assert_eq!(table.blocks[0].size_of_block, 12);
        assert_eq!(table.blocks[0].entries.len(), 2);
        assert_eq!(
            table.blocks[0].entries[0].relocation_type(),
            Some(RelocationType::HighLow)
        );
        assert_eq!(table.blocks[0].target(&table.blocks[0].entries[0]), 0x1004);
        assert!(table.blocks[1].entries.is_empty());
        assert_eq!(table.entry_count(), 2);
        assert_eq!(table.address_count(), 1);
    }

    #[test]
    fn odd_block_size_advances_by_whole_entries() {
        // size 11 holds one entry; the odd trailing byte is not skipped, so the next block
        // header follows at +0xA rather than +0xB
        let mut blocks = Vec::new();
        blocks.extend_from_slice(&0x1000_u32.to_le_bytes());
        blocks.extend_from_slice(&11_u32.to_le_bytes());
        blocks.extend_from_slice(&0x3004_u16.to_le_bytes());
        blocks.extend_from_slice(&0x2000_u32.to_le_bytes());
        blocks.extend_from_slice(&10_u32.to_le_bytes());
        blocks.extend_from_slice(&0x3008_u16.to_le_bytes());

        let image = image_of(&PeBuilder::sample32().put(0x3000, &blocks));
        let table = RelocationTable::resolve(&image, entry(0x3000, 0x14)).unwrap();

        assert_eq!(table.blocks.len(), 2);
        assert_eq!(table.blocks[0].size_of_block, 11);
        assert_eq!(table.blocks[0].entries.len(), 1);
        assert_eq!(table.blocks[1].virtual_address, 0x2000);
        assert_eq!(table.blocks[1].size_of_block, 10);
        assert_eq!(table.blocks[1].target(&table.blocks[1].entries[0]), 0x2008);
        assert_eq!(table.address_count(), 2);
    }

    #[test]
    fn degenerate_block() {
        let image = image_of(&PeBuilder::sample32().put_u32(0x3010, 4));
        expect_error(
            RelocationTable::resolve(&image, entry(0x3000, 0x14)),
            Some(1),
            "degenerate relocation block",
        );

        let image = image_of(&PeBuilder::sample32().put_u32(0x3004, 0));
        expect_error(
            RelocationTable::resolve(&image, entry(0x3000, 0x14)),
            Some(0),
            "degenerate relocation block",
        );
    }

    #[test]
    fn block_past_directory() {
        let image = image_of(&PeBuilder::sample32().put_u32(0x3010, 0x20));
        expect_error(
            RelocationTable::resolve(&image, entry(0x3000, 0x14)),
            Some(1),
            "runs past the 0x14 byte directory",
        );
    }

    #[test]
    fn header_past_directory() {
        let image = image_of(&PeBuilder::sample32());
        expect_error(
            RelocationTable::resolve(&image, entry(0x3000, 0x10)),
            Some(1),
            "block header",
        );
    }

    #[test]
    fn entry_outside_image() {
        let image = image_of(
            &PeBuilder::sample32()
                .put_u32(0x3000, 0x3000)
                .put_u16(0x3008, 0x3FFD),
        );
        expect_error(
            RelocationTable::resolve(&image, entry(0x3000, 0x14)),
            Some(0),
            "entry 0 (type 3) patches 0x00003FFD",
        );
    }

    #[test]
    fn entry_ending_at_image_end() {
        let image = image_of(
            &PeBuilder::sample32()
                .put_u32(0x3000, 0x3000)
                .put_u16(0x3008, 0x3FFC),
        );
        assert!(RelocationTable::resolve(&image, entry(0x3000, 0x14)).is_ok());
    }

    #[test]
    fn padding_is_not_checked() {
        let image = image_of(
            &PeBuilder::sample32()
                .put_u32(0x3000, 0xFFFF_F000)
                .put_u16(0x3008, 0x0FFF),
        );
        let table = RelocationTable::resolve(&image, entry(0x3000, 0x14)).unwrap();
        assert_eq!(table.address_count(), 0);
    }

    #[test]
    fn directory_outside_image() {
        let image = image_of(&PeBuilder::sample32());
        expect_error(
            RelocationTable::resolve(&image, entry(0x3FF0, 0x20)),
            None,
            "exceed",
        );
    }
}
