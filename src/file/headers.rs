//! On-disk PE header records.
//!
//! This module defines the fixed layouts a PE image starts with (the DOS header, the COFF
//! file header, both optional header variants, data directory entries and section headers),
//! the flag sets and enumerations carried by their fields, and a `parse` function per record
//! that decodes it from a little-endian byte slice through [`crate::file::parser::Parser`].
//!
//! The optional header is a tagged [`OptionalHeader`] rather than a layout-punned union. Which
//! variant is decoded is decided once from the machine field ([`Architecture`]) and is never
//! re-inspected from raw bytes afterwards.
//!
//! # Layout constants
//!
//! | Record                  | Size  |
//! |-------------------------|-------|
//! | DOS header              | 64    |
//! | NT signature            | 4     |
//! | File header             | 20    |
//! | Optional header (PE32)  | 224   |
//! | Optional header (PE32+) | 240   |
//! | Data directory entry    | 8     |
//! | Section header          | 40    |

use bitflags::bitflags;
use strum::{Display, FromRepr};

use crate::{file::parser::Parser, Result, Structure};

/// `MZ`
pub const DOS_MAGIC: u16 = 0x5A4D;
/// `PE\0\0`
pub const NT_SIGNATURE: u32 = 0x0000_4550;
/// Size of the DOS header
pub const DOS_HEADER_SIZE: usize = 64;
/// Offset of `e_lfanew` inside the DOS header
pub const E_LFANEW_OFFSET: usize = 0x3C;
/// Size of the NT signature
pub const SIGNATURE_SIZE: usize = 4;
/// Size of the COFF file header
pub const FILE_HEADER_SIZE: usize = 20;
/// Size of the PE32 optional header including 16 data directory entries
pub const OPTIONAL_HEADER32_SIZE: usize = 224;
/// Size of the PE32+ optional header including 16 data directory entries
pub const OPTIONAL_HEADER64_SIZE: usize = 240;
/// Size of one data directory entry
pub const DATA_DIRECTORY_ENTRY_SIZE: usize = 8;
/// Number of data directory slots defined by the format
pub const NUMBER_OF_DIRECTORY_ENTRIES: usize = 16;
/// Size of one section header
pub const SECTION_HEADER_SIZE: usize = 40;
/// Size of a section name
pub const SECTION_NAME_SIZE: usize = 8;
/// Bits of the section characteristics holding the object-file alignment
pub const SECTION_ALIGN_MASK: u32 = 0x00F0_0000;

/// The width a PE image is built for.
///
/// Decided from the file header's machine field at load time. It selects the optional header
/// layout, the thunk width of the import tables and the ordinal flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Architecture {
    /// 32-bit image with a PE32 optional header
    #[strum(to_string = "PE32")]
    Pe32,
    /// 64-bit image with a PE32+ optional header
    #[strum(to_string = "PE32+")]
    Pe64,
}

impl Architecture {
    /// Map a machine code to the optional header layout it uses.
    ///
    /// Only the three machine codes the loader supports are recognized; everything else is
    /// `None`.
    #[must_use]
    pub fn from_machine(machine: u16) -> Option<Architecture> {
        match Machine::from_repr(machine)? {
            Machine::I386 => Some(Architecture::Pe32),
            Machine::Amd64 | Machine::Ia64 => Some(Architecture::Pe64),
            _ => None,
        }
    }

    /// Size of the optional header layout, including a full data directory
    #[must_use]
    pub fn optional_header_size(self) -> usize {
        match self {
            Architecture::Pe32 => OPTIONAL_HEADER32_SIZE,
            Architecture::Pe64 => OPTIONAL_HEADER64_SIZE,
        }
    }

    /// Offset of the data directory inside the optional header
    #[must_use]
    pub fn data_directory_offset(self) -> usize {
        match self {
            Architecture::Pe32 => 96,
            Architecture::Pe64 => 112,
        }
    }

    /// Width in bytes of an import thunk
    #[must_use]
    pub fn thunk_size(self) -> usize {
        match self {
            Architecture::Pe32 => 4,
            Architecture::Pe64 => 8,
        }
    }

    /// Bit marking an import thunk as an ordinal
    #[must_use]
    pub fn ordinal_flag(self) -> u64 {
        match self {
            Architecture::Pe32 => 0x8000_0000,
            Architecture::Pe64 => 0x8000_0000_0000_0000,
        }
    }
}

/// Known machine codes of the file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum Machine {
    #[strum(to_string = "unknown")]
    Unknown = 0x0000,
    #[strum(to_string = "x86")]
    I386 = 0x014C,
    #[strum(to_string = "MIPS R4000")]
    R4000 = 0x0166,
    #[strum(to_string = "Alpha")]
    Alpha = 0x0184,
    #[strum(to_string = "ARM")]
    Arm = 0x01C0,
    #[strum(to_string = "Thumb")]
    Thumb = 0x01C2,
    #[strum(to_string = "ARMv7 Thumb-2")]
    ArmNt = 0x01C4,
    #[strum(to_string = "PowerPC")]
    PowerPc = 0x01F0,
    #[strum(to_string = "Intel Itanium")]
    Ia64 = 0x0200,
    #[strum(to_string = "EFI byte code")]
    Ebc = 0x0EBC,
    #[strum(to_string = "RISC-V 64")]
    RiscV64 = 0x5064,
    #[strum(to_string = "x64")]
    Amd64 = 0x8664,
    #[strum(to_string = "ARM64")]
    Arm64 = 0xAA64,
}

/// Magic value at the start of the optional header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[repr(u16)]
pub enum OptionalMagic {
    /// PE32
    #[strum(to_string = "32-bit executable")]
    Pe32 = 0x010B,
    /// PE32+
    #[strum(to_string = "64-bit executable")]
    Pe64 = 0x020B,
    /// ROM image
    #[strum(to_string = "rom")]
    Rom = 0x0107,
}

/// Subsystem required to run the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum Subsystem {
    #[strum(to_string = "unknown")]
    Unknown = 0,
    #[strum(to_string = "native")]
    Native = 1,
    #[strum(to_string = "Windows GUI")]
    WindowsGui = 2,
    #[strum(to_string = "Windows CUI")]
    WindowsCui = 3,
    #[strum(to_string = "OS2 CUI")]
    Os2Cui = 5,
    #[strum(to_string = "POSIX CUI")]
    PosixCui = 7,
    #[strum(to_string = "native Windows 9x driver")]
    NativeWindows = 8,
    #[strum(to_string = "Windows CE GUI")]
    WindowsCeGui = 9,
    #[strum(to_string = "EFI application")]
    EfiApplication = 10,
    #[strum(to_string = "EFI boot service driver")]
    EfiBootServiceDriver = 11,
    #[strum(to_string = "EFI runtime driver")]
    EfiRuntimeDriver = 12,
    #[strum(to_string = "EFI ROM")]
    EfiRom = 13,
    #[strum(to_string = "Xbox")]
    Xbox = 14,
    #[strum(to_string = "Windows boot application")]
    WindowsBootApplication = 16,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Characteristics of the file header
    pub struct FileCharacteristics: u16 {
        /// Relocation info was stripped
        const RELOCS_STRIPPED = 0x0001;
        /// The image is executable (no unresolved references)
        const EXECUTABLE_IMAGE = 0x0002;
        /// COFF line numbers were stripped
        const LINE_NUMS_STRIPPED = 0x0004;
        /// COFF symbol table entries were stripped
        const LOCAL_SYMS_STRIPPED = 0x0008;
        /// Obsolete: aggressively trim working set
        const AGGRESSIVE_WS_TRIM = 0x0010;
        /// The image can handle addresses larger than 2GB
        const LARGE_ADDRESS_AWARE = 0x0020;
        /// Obsolete: little endian
        const BYTES_REVERSED_LO = 0x0080;
        /// The machine supports 32-bit words
        const MACHINE_32BIT = 0x0100;
        /// Debugging info was stripped
        const DEBUG_STRIPPED = 0x0200;
        /// If the image is on removable media, run it from swap
        const REMOVABLE_RUN_FROM_SWAP = 0x0400;
        /// If the image is on the network, run it from swap
        const NET_RUN_FROM_SWAP = 0x0800;
        /// The image is a system file
        const SYSTEM = 0x1000;
        /// The image is a DLL
        const DLL = 0x2000;
        /// The image should only run on a uniprocessor machine
        const UP_SYSTEM_ONLY = 0x4000;
        /// Obsolete: big endian
        const BYTES_REVERSED_HI = 0x8000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// DLL characteristics of the optional header
    pub struct DllCharacteristics: u16 {
        /// The image can handle a high entropy 64-bit address space
        const HIGH_ENTROPY_VA = 0x0020;
        /// The image can be relocated at load time
        const DYNAMIC_BASE = 0x0040;
        /// Code integrity checks are enforced
        const FORCE_INTEGRITY = 0x0080;
        /// The image is NX compatible
        const NX_COMPAT = 0x0100;
        /// The image is isolation aware but should not be isolated
        const NO_ISOLATION = 0x0200;
        /// The image does not use structured exception handling
        const NO_SEH = 0x0400;
        /// Do not bind the image
        const NO_BIND = 0x0800;
        /// The image must run in an AppContainer
        const APPCONTAINER = 0x1000;
        /// A WDM driver
        const WDM_DRIVER = 0x2000;
        /// The image supports Control Flow Guard
        const GUARD_CF = 0x4000;
        /// The image is terminal server aware
        const TERMINAL_SERVER_AWARE = 0x8000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Characteristics of a section header
    ///
    /// The alignment field (bits 20..24) is not a flag; see [`SectionHeader::alignment`].
    pub struct SectionCharacteristics: u32 {
        /// Do not pad the section (object files only)
        const TYPE_NO_PAD = 0x0000_0008;
        /// The section contains executable code
        const CNT_CODE = 0x0000_0020;
        /// The section contains initialized data
        const CNT_INITIALIZED_DATA = 0x0000_0040;
        /// The section contains uninitialized data
        const CNT_UNINITIALIZED_DATA = 0x0000_0080;
        /// Reserved
        const LNK_OTHER = 0x0000_0100;
        /// The section contains comments or other information (object files only)
        const LNK_INFO = 0x0000_0200;
        /// The section will not become part of the image (object files only)
        const LNK_REMOVE = 0x0000_0800;
        /// The section contains COMDAT data (object files only)
        const LNK_COMDAT = 0x0000_1000;
        /// Reset speculative exception handling bits in the TLB entries
        const NO_DEFER_SPEC_EXC = 0x0000_4000;
        /// The section contains data referenced through the global pointer
        const GPREL = 0x0000_8000;
        /// Reserved
        const MEM_PURGEABLE = 0x0002_0000;
        /// Reserved
        const MEM_LOCKED = 0x0004_0000;
        /// Reserved
        const MEM_PRELOAD = 0x0008_0000;
        /// The section contains extended relocations
        const LNK_NRELOC_OVFL = 0x0100_0000;
        /// The section can be discarded as needed
        const MEM_DISCARDABLE = 0x0200_0000;
        /// The section cannot be cached
        const MEM_NOT_CACHED = 0x0400_0000;
        /// The section cannot be paged
        const MEM_NOT_PAGED = 0x0800_0000;
        /// The section can be shared in memory
        const MEM_SHARED = 0x1000_0000;
        /// The section can be executed as code
        const MEM_EXECUTE = 0x2000_0000;
        /// The section can be read
        const MEM_READ = 0x4000_0000;
        /// The section can be written to
        const MEM_WRITE = 0x8000_0000;
    }
}

/// The 64-byte MS-DOS header every PE image starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct DosHeader {
    pub e_magic: u16,
    pub e_cblp: u16,
    pub e_cp: u16,
    pub e_crlc: u16,
    pub e_cparhdr: u16,
    pub e_minalloc: u16,
    pub e_maxalloc: u16,
    pub e_ss: u16,
    pub e_sp: u16,
    pub e_csum: u16,
    pub e_ip: u16,
    pub e_cs: u16,
    pub e_lfarlc: u16,
    pub e_ovno: u16,
    pub e_res: [u16; 4],
    pub e_oemid: u16,
    pub e_oeminfo: u16,
    pub e_res2: [u16; 10],
    /// File offset of the NT header
    pub e_lfanew: i32,
}

impl DosHeader {
    /// Decode a DOS header from the first 64 bytes of `data`.
    ///
    /// The magic is not checked here; see the loader.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than 64 bytes
    pub fn parse(data: &[u8]) -> Result<DosHeader> {
        let mut parser = Parser::new(data, Structure::DosHeader);

        let e_magic = parser.read_le::<u16>()?;
        let e_cblp = parser.read_le::<u16>()?;
        let e_cp = parser.read_le::<u16>()?;
        let e_crlc = parser.read_le::<u16>()?;
        let e_cparhdr = parser.read_le::<u16>()?;
        let e_minalloc = parser.read_le::<u16>()?;
        let e_maxalloc = parser.read_le::<u16>()?;
        let e_ss = parser.read_le::<u16>()?;
        let e_sp = parser.read_le::<u16>()?;
        let e_csum = parser.read_le::<u16>()?;
        let e_ip = parser.read_le::<u16>()?;
        let e_cs = parser.read_le::<u16>()?;
        let e_lfarlc = parser.read_le::<u16>()?;
        let e_ovno = parser.read_le::<u16>()?;

        let mut e_res = [0_u16; 4];
        for value in &mut e_res {
            *value = parser.read_le::<u16>()?;
        }

        let e_oemid = parser.read_le::<u16>()?;
        let e_oeminfo = parser.read_le::<u16>()?;

        let mut e_res2 = [0_u16; 10];
        for value in &mut e_res2 {
            *value = parser.read_le::<u16>()?;
        }

        let e_lfanew = parser.read_le::<i32>()?;

        Ok(DosHeader {
            e_magic,
            e_cblp,
            e_cp,
            e_crlc,
            e_cparhdr,
            e_minalloc,
            e_maxalloc,
            e_ss,
            e_sp,
            e_csum,
            e_ip,
            e_cs,
            e_lfarlc,
            e_ovno,
            e_res,
            e_oemid,
            e_oeminfo,
            e_res2,
            e_lfanew,
        })
    }
}

/// The COFF file header following the NT signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Target machine, see [`Machine`]
    pub machine: u16,
    /// Number of entries in the section table
    pub number_of_sections: u16,
    /// Link time, seconds since the Unix epoch
    pub time_date_stamp: u32,
    /// File offset of the COFF symbol table
    pub pointer_to_symbol_table: u32,
    /// Number of COFF symbols
    pub number_of_symbols: u32,
    /// Declared size of the optional header, which places the section table
    pub size_of_optional_header: u16,
    /// Image characteristics
    pub characteristics: FileCharacteristics,
}

impl FileHeader {
    /// Decode a file header from the first 20 bytes of `data`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than 20 bytes
    pub fn parse(data: &[u8]) -> Result<FileHeader> {
        let mut parser = Parser::new(data, Structure::NtHeader);

        Ok(FileHeader {
            machine: parser.read_le::<u16>()?,
            number_of_sections: parser.read_le::<u16>()?,
            time_date_stamp: parser.read_le::<u32>()?,
            pointer_to_symbol_table: parser.read_le::<u32>()?,
            number_of_symbols: parser.read_le::<u32>()?,
            size_of_optional_header: parser.read_le::<u16>()?,
            characteristics: FileCharacteristics::from_bits_retain(parser.read_le::<u16>()?),
        })
    }

    /// The machine as a known enum value, if it is one
    #[must_use]
    pub fn machine_kind(&self) -> Option<Machine> {
        Machine::from_repr(self.machine)
    }
}

/// The fixed part of a PE32 optional header (everything before the data directory).
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct OptionalHeader32 {
    pub magic: u16,
    pub major_linker_version: u8,
    pub minor_linker_version: u8,
    pub size_of_code: u32,
    pub size_of_initialized_data: u32,
    pub size_of_uninitialized_data: u32,
    pub address_of_entry_point: u32,
    pub base_of_code: u32,
    pub base_of_data: u32,
    pub image_base: u32,
    pub section_alignment: u32,
    pub file_alignment: u32,
    pub major_operating_system_version: u16,
    pub minor_operating_system_version: u16,
    pub major_image_version: u16,
    pub minor_image_version: u16,
    pub major_subsystem_version: u16,
    pub minor_subsystem_version: u16,
    pub win32_version_value: u32,
    pub size_of_image: u32,
    pub size_of_headers: u32,
    pub check_sum: u32,
    pub subsystem: u16,
    pub dll_characteristics: DllCharacteristics,
    pub size_of_stack_reserve: u32,
    pub size_of_stack_commit: u32,
    pub size_of_heap_reserve: u32,
    pub size_of_heap_commit: u32,
    pub loader_flags: u32,
    pub number_of_rva_and_sizes: u32,
}

impl OptionalHeader32 {
    /// Decode the first 96 bytes of a PE32 optional header
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than 96 bytes
    pub fn parse(data: &[u8]) -> Result<OptionalHeader32> {
        let mut parser = Parser::new(data, Structure::NtHeader);

        Ok(OptionalHeader32 {
            magic: parser.read_le::<u16>()?,
            major_linker_version: parser.read_le::<u8>()?,
            minor_linker_version: parser.read_le::<u8>()?,
            size_of_code: parser.read_le::<u32>()?,
            size_of_initialized_data: parser.read_le::<u32>()?,
            size_of_uninitialized_data: parser.read_le::<u32>()?,
            address_of_entry_point: parser.read_le::<u32>()?,
            base_of_code: parser.read_le::<u32>()?,
            base_of_data: parser.read_le::<u32>()?,
            image_base: parser.read_le::<u32>()?,
            section_alignment: parser.read_le::<u32>()?,
            file_alignment: parser.read_le::<u32>()?,
            major_operating_system_version: parser.read_le::<u16>()?,
            minor_operating_system_version: parser.read_le::<u16>()?,
            major_image_version: parser.read_le::<u16>()?,
            minor_image_version: parser.read_le::<u16>()?,
            major_subsystem_version: parser.read_le::<u16>()?,
            minor_subsystem_version: parser.read_le::<u16>()?,
            win32_version_value: parser.read_le::<u32>()?,
            size_of_image: parser.read_le::<u32>()?,
            size_of_headers: parser.read_le::<u32>()?,
            check_sum: parser.read_le::<u32>()?,
            subsystem: parser.read_le::<u16>()?,
            dll_characteristics: DllCharacteristics::from_bits_retain(parser.read_le::<u16>()?),
            size_of_stack_reserve: parser.read_le::<u32>()?,
            size_of_stack_commit: parser.read_le::<u32>()?,
            size_of_heap_reserve: parser.read_le::<u32>()?,
            size_of_heap_commit: parser.read_le::<u32>()?,
            loader_flags: parser.read_le::<u32>()?,
            number_of_rva_and_sizes: parser.read_le::<u32>()?,
        })
    }
}

/// The fixed part of a PE32+ optional header (everything before the data directory).
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct OptionalHeader64 {
    pub magic: u16,
    pub major_linker_version: u8,
    pub minor_linker_version: u8,
    pub size_of_code: u32,
    pub size_of_initialized_data: u32,
    pub size_of_uninitialized_data: u32,
    pub address_of_entry_point: u32,
    pub base_of_code: u32,
    pub image_base: u64,
    pub section_alignment: u32,
    pub file_alignment: u32,
    pub major_operating_system_version: u16,
    pub minor_operating_system_version: u16,
    pub major_image_version: u16,
    pub minor_image_version: u16,
    pub major_subsystem_version: u16,
    pub minor_subsystem_version: u16,
    pub win32_version_value: u32,
    pub size_of_image: u32,
    pub size_of_headers: u32,
    pub check_sum: u32,
    pub subsystem: u16,
    pub dll_characteristics: DllCharacteristics,
    pub size_of_stack_reserve: u64,
    pub size_of_stack_commit: u64,
    pub size_of_heap_reserve: u64,
    pub size_of_heap_commit: u64,
    pub loader_flags: u32,
    pub number_of_rva_and_sizes: u32,
}

impl OptionalHeader64 {
    /// Decode the first 112 bytes of a PE32+ optional header
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than 112 bytes
    pub fn parse(data: &[u8]) -> Result<OptionalHeader64> {
        let mut parser = Parser::new(data, Structure::NtHeader);

        Ok(OptionalHeader64 {
            magic: parser.read_le::<u16>()?,
            major_linker_version: parser.read_le::<u8>()?,
            minor_linker_version: parser.read_le::<u8>()?,
            size_of_code: parser.read_le::<u32>()?,
            size_of_initialized_data: parser.read_le::<u32>()?,
            size_of_uninitialized_data: parser.read_le::<u32>()?,
            address_of_entry_point: parser.read_le::<u32>()?,
            base_of_code: parser.read_le::<u32>()?,
            image_base: parser.read_le::<u64>()?,
            section_alignment: parser.read_le::<u32>()?,
            file_alignment: parser.read_le::<u32>()?,
            major_operating_system_version: parser.read_le::<u16>()?,
            minor_operating_system_version: parser.read_le::<u16>()?,
            major_image_version: parser.read_le::<u16>()?,
            minor_image_version: parser.read_le::<u16>()?,
            major_subsystem_version: parser.read_le::<u16>()?,
            minor_subsystem_version: parser.read_le::<u16>()?,
            win32_version_value: parser.read_le::<u32>()?,
            size_of_image: parser.read_le::<u32>()?,
            size_of_headers: parser.read_le::<u32>()?,
            check_sum: parser.read_le::<u32>()?,
            subsystem: parser.read_le::<u16>()?,
            dll_characteristics: DllCharacteristics::from_bits_retain(parser.read_le::<u16>()?),
            size_of_stack_reserve: parser.read_le::<u64>()?,
            size_of_stack_commit: parser.read_le::<u64>()?,
            size_of_heap_reserve: parser.read_le::<u64>()?,
            size_of_heap_commit: parser.read_le::<u64>()?,
            loader_flags: parser.read_le::<u32>()?,
            number_of_rva_and_sizes: parser.read_le::<u32>()?,
        })
    }
}

/// The optional header, tagged by the architecture chosen at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionalHeader {
    /// 32-bit layout
    Pe32(OptionalHeader32),
    /// 64-bit layout
    Pe64(OptionalHeader64),
}

macro_rules! optional_field {
    ($self:ident, $field:ident) => {
        match $self {
            OptionalHeader::Pe32(header) => header.$field,
            OptionalHeader::Pe64(header) => header.$field,
        }
    };
}

impl OptionalHeader {
    /// Decode the fixed part of the optional header selected by `arch`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than the fixed part
    pub fn parse(arch: Architecture, data: &[u8]) -> Result<OptionalHeader> {
        match arch {
            Architecture::Pe32 => Ok(OptionalHeader::Pe32(OptionalHeader32::parse(data)?)),
            Architecture::Pe64 => Ok(OptionalHeader::Pe64(OptionalHeader64::parse(data)?)),
        }
    }

    /// The architecture this header was decoded for
    #[must_use]
    pub fn architecture(&self) -> Architecture {
        match self {
            OptionalHeader::Pe32(_) => Architecture::Pe32,
            OptionalHeader::Pe64(_) => Architecture::Pe64,
        }
    }

    /// Raw magic value
    #[must_use]
    pub fn magic(&self) -> u16 {
        optional_field!(self, magic)
    }

    /// Declared size of the loaded image
    #[must_use]
    pub fn size_of_image(&self) -> u32 {
        optional_field!(self, size_of_image)
    }

    /// Declared size of the header prefix
    #[must_use]
    pub fn size_of_headers(&self) -> u32 {
        optional_field!(self, size_of_headers)
    }

    /// Declared number of data directory entries
    #[must_use]
    pub fn number_of_rva_and_sizes(&self) -> u32 {
        optional_field!(self, number_of_rva_and_sizes)
    }

    /// Entry point RVA
    #[must_use]
    pub fn address_of_entry_point(&self) -> u32 {
        optional_field!(self, address_of_entry_point)
    }

    /// Preferred load address, widened to 64 bits
    #[must_use]
    pub fn image_base(&self) -> u64 {
        match self {
            OptionalHeader::Pe32(header) => u64::from(header.image_base),
            OptionalHeader::Pe64(header) => header.image_base,
        }
    }

    /// Raw subsystem value
    #[must_use]
    pub fn subsystem(&self) -> u16 {
        optional_field!(self, subsystem)
    }

    /// DLL characteristics
    #[must_use]
    pub fn dll_characteristics(&self) -> DllCharacteristics {
        optional_field!(self, dll_characteristics)
    }
}

/// One (RVA, size) slot of the data directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataDirectory {
    /// RVA of the table
    pub virtual_address: u32,
    /// Size of the table in bytes
    pub size: u32,
}

impl DataDirectory {
    /// Decode one 8-byte entry
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than 8 bytes
    pub fn parse(data: &[u8]) -> Result<DataDirectory> {
        let mut parser = Parser::new(data, Structure::DataDirectory);

        Ok(DataDirectory {
            virtual_address: parser.read_le::<u32>()?,
            size: parser.read_le::<u32>()?,
        })
    }

    /// An entry is absent if either its address or its size is zero
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.virtual_address == 0 || self.size == 0
    }
}

/// One 40-byte entry of the section table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    /// Section name, NUL padded, not necessarily NUL terminated
    pub name: [u8; SECTION_NAME_SIZE],
    /// Size of the section once loaded
    pub virtual_size: u32,
    /// RVA the section is loaded at
    pub virtual_address: u32,
    /// Size of the initialized data on disk
    pub size_of_raw_data: u32,
    /// File offset of the initialized data
    pub pointer_to_raw_data: u32,
    /// File offset of the COFF relocations
    pub pointer_to_relocations: u32,
    /// File offset of the COFF line numbers
    pub pointer_to_linenumbers: u32,
    /// Number of COFF relocations
    pub number_of_relocations: u16,
    /// Number of COFF line numbers
    pub number_of_linenumbers: u16,
    /// Section flags
    pub characteristics: SectionCharacteristics,
}

impl SectionHeader {
    /// Decode one section header
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] tagged with `index` if `data` is shorter than 40 bytes
    pub fn parse(data: &[u8], index: usize) -> Result<SectionHeader> {
        let mut parser = Parser::new(data, Structure::SectionTable).with_index(index);

        Ok(SectionHeader {
            name: parser.read_array::<SECTION_NAME_SIZE>()?,
            virtual_size: parser.read_le::<u32>()?,
            virtual_address: parser.read_le::<u32>()?,
            size_of_raw_data: parser.read_le::<u32>()?,
            pointer_to_raw_data: parser.read_le::<u32>()?,
            pointer_to_relocations: parser.read_le::<u32>()?,
            pointer_to_linenumbers: parser.read_le::<u32>()?,
            number_of_relocations: parser.read_le::<u16>()?,
            number_of_linenumbers: parser.read_le::<u16>()?,
            characteristics: SectionCharacteristics::from_bits_retain(parser.read_le::<u32>()?),
        })
    }

    /// The section name up to the first NUL, decoded lossily
    #[must_use]
    pub fn name_str(&self) -> std::borrow::Cow<'_, str> {
        let end = self
            .name
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(SECTION_NAME_SIZE);
        String::from_utf8_lossy(&self.name[..end])
    }

    /// Object-file alignment encoded in the characteristics, in bytes
    #[must_use]
    pub fn alignment(&self) -> Option<u32> {
        let field = (self.characteristics.bits() & SECTION_ALIGN_MASK) >> 20;
        match field {
            1..=14 => Some(1 << (field - 1)),
            _ => None,
        }
    }
}
