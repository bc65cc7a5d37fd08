//! Data directory resolvers.
//!
//! Each resolver locates its table through the data directory, walks the table's arrays and
//! validates every cross-reference against the full image before anything is decoded for
//! consumers. A resolver whose directory slot is missing (fewer entries than its index) or
//! empty (zero address or size) succeeds without producing a table.
//!
//! # Key Components
//!
//! - [`DataDirectoryKind`] - The 16 well-known data directory slots
//! - [`exports::ExportTable`] - Export directory, function/name/ordinal arrays
//! - [`imports::ImportTable`] - Import descriptors with their INT and IAT
//! - [`relocations::RelocationTable`] - Base relocation blocks
//!
//! Failures are reported as [`crate::Error::OutOfBounds`] tagged with the directory's
//! [`crate::Structure`] and the index of the offending descriptor, block or entry.

pub mod exports;
pub mod imports;
pub mod relocations;

use strum::{Display, EnumIter, FromRepr};

use crate::file::headers::DataDirectory;

/// The well-known slots of the data directory, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, FromRepr)]
#[repr(usize)]
pub enum DataDirectoryKind {
    /// Export directory
    #[strum(to_string = "export table")]
    Export = 0,
    /// Import descriptors
    #[strum(to_string = "import table")]
    Import = 1,
    /// Resource tree
    #[strum(to_string = "resource table")]
    Resource = 2,
    /// Exception handling data
    #[strum(to_string = "exception table")]
    Exception = 3,
    /// Attribute certificates (a file offset, not an RVA)
    #[strum(to_string = "certificate table")]
    Security = 4,
    /// Base relocation blocks
    #[strum(to_string = "base relocation table")]
    BaseReloc = 5,
    /// Debug directory
    #[strum(to_string = "debug")]
    Debug = 6,
    /// Reserved
    #[strum(to_string = "architecture data")]
    Architecture = 7,
    /// Global pointer register value
    #[strum(to_string = "global pointer")]
    GlobalPtr = 8,
    /// Thread local storage
    #[strum(to_string = "TLS table")]
    Tls = 9,
    /// Load configuration
    #[strum(to_string = "load config table")]
    LoadConfig = 10,
    /// Bound imports
    #[strum(to_string = "bound import")]
    BoundImport = 11,
    /// Import address table
    #[strum(to_string = "import address table")]
    Iat = 12,
    /// Delay-load import descriptors
    #[strum(to_string = "delay import descriptor")]
    DelayImport = 13,
    /// CLR runtime header
    #[strum(to_string = "CLR runtime header")]
    ComDescriptor = 14,
    /// Reserved
    #[strum(to_string = "reserved")]
    Reserved = 15,
}

impl DataDirectoryKind {
    /// Index of this slot in the data directory
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// The entry for `kind`, if the directory has that many entries and the entry is non-empty.
#[must_use]
pub fn lookup(directories: &[DataDirectory], kind: DataDirectoryKind) -> Option<DataDirectory> {
    directories
        .get(kind.index())
        .copied()
        .filter(|entry| !entry.is_empty())
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn kinds_are_in_slot_order() {
        for (index, kind) in DataDirectoryKind::iter().enumerate() {
            assert_eq!(kind.index(), index);
            assert_eq!(DataDirectoryKind::from_repr(index), Some(kind));
        }
        assert_eq!(DataDirectoryKind::iter().count(), 16);
        assert_eq!(DataDirectoryKind::BaseReloc.to_string(), "base relocation table");
    }

    #[test]
    fn lookup_skips_missing_and_empty() {
        let directories = [
            DataDirectory {
                virtual_address: 0x2000,
                size: 0x40,
            },
            DataDirectory {
                virtual_address: 0x2200,
                size: 0,
            },
        ];

        assert_eq!(
            lookup(&directories, DataDirectoryKind::Export),
            Some(directories[0])
        );
        assert_eq!(lookup(&directories, DataDirectoryKind::Import), None);
        assert_eq!(lookup(&directories, DataDirectoryKind::BaseReloc), None);
        assert_eq!(lookup(&[], DataDirectoryKind::Export), None);
    }
}
