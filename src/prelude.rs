//! # readpe Prelude
//!
//! The types most programs need to load an image and walk its tables. Import this module to
//! get them all at once.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all readpe operations
pub use crate::Error;

/// The result type used throughout readpe
pub use crate::Result;

/// The structure an out-of-bounds error refers to
pub use crate::Structure;

/// Loading options
pub use crate::LoadConfig;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// A loaded and validated image
pub use crate::Context;

/// The image buffer and its bounded string access
pub use crate::RawImage;

// ================================================================================================
// Header Records
// ================================================================================================

/// Header records and their flag sets
pub use crate::file::headers::{
    Architecture, DataDirectory, DllCharacteristics, DosHeader, FileCharacteristics, FileHeader,
    Machine, OptionalHeader, SectionCharacteristics, SectionHeader, Subsystem,
};

/// Header locations
pub use crate::file::regions::{HeaderView, Headers, Span};

// ================================================================================================
// Data Directories
// ================================================================================================

/// The 16 data directory slots
pub use crate::directories::DataDirectoryKind;

/// Export table
pub use crate::directories::exports::{ExportTable, ExportedFunction};

/// Import table
pub use crate::directories::imports::{ImportDescriptor, ImportTable, ImportThunk};

/// Base relocation table
pub use crate::directories::relocations::{
    RelocationBlock, RelocationEntry, RelocationTable, RelocationType,
};

// ================================================================================================
// Output
// ================================================================================================

/// Report writer
pub use crate::output::Printer;
