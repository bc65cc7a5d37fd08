//! Human-readable report of a loaded [`Context`].
//!
//! [`Printer`] wraps any [`std::io::Write`] and carries its own indentation, so several
//! printers can run side by side. Each structure is rendered as a group:
//!
//! ```text
//!
//! ---- DOS HEADER
//!   e_magic : 0x5A4D
//!   e_lfanew: 0x00000080
//! ```
//!
//! The printer only reads from an already validated `Context`; it never touches bytes that
//! were not checked by a resolver.
//!
//! # Examples
//!
//! ```rust,no_run
//! use readpe::{output::Printer, Context};
//!
//! let context = Context::from_file("sample.dll")?;
//! let mut printer = Printer::new(std::io::stdout().lock());
//! printer.section_table(context.sections())?;
//! printer.export_table(context.exports())?;
//! # Ok::<(), readpe::Error>(())
//! ```

use std::{fmt, io::Write};

use crate::{
    directories::{
        exports::ExportTable, imports::ImportTable, imports::ImportThunk,
        relocations::RelocationTable, DataDirectoryKind,
    },
    file::headers::{
        DataDirectory, DllCharacteristics, DosHeader, FileCharacteristics, FileHeader,
        OptionalHeader, OptionalHeader32, OptionalHeader64, SectionCharacteristics,
        SectionHeader, Subsystem, OptionalMagic, NT_SIGNATURE,
    },
    Context, RawImage, Result,
};

const FILE_FLAGS: &[(FileCharacteristics, &str, &str)] = &[
    (FileCharacteristics::RELOCS_STRIPPED, "IMAGE_FILE_RELOCS_STRIPPED", "relocation info was stripped"),
    (FileCharacteristics::EXECUTABLE_IMAGE, "IMAGE_FILE_EXECUTABLE_IMAGE", "the image is executable (no unresolved reference)"),
    (FileCharacteristics::LINE_NUMS_STRIPPED, "IMAGE_FILE_LINE_NUMS_STRIPPED", "COFF line numbers were stripped"),
    (FileCharacteristics::LOCAL_SYMS_STRIPPED, "IMAGE_FILE_LOCAL_SYMS_STRIPPED", "COFF symbol table entries were stripped"),
    (FileCharacteristics::LARGE_ADDRESS_AWARE, "IMAGE_FILE_LARGE_ADDRESS_AWARE", "the image can handle addresses larger than 2GB"),
    (FileCharacteristics::MACHINE_32BIT, "IMAGE_FILE_32BIT_MACHINE", "computer supports 32-bit words"),
    (FileCharacteristics::DEBUG_STRIPPED, "IMAGE_FILE_DEBUG_STRIPPED", "debugging info was stripped"),
    (FileCharacteristics::REMOVABLE_RUN_FROM_SWAP, "IMAGE_FILE_REMOVABLE_RUN_FROM_SWAP", "if the image is on removable media, run it from swap file"),
    (FileCharacteristics::NET_RUN_FROM_SWAP, "IMAGE_FILE_NET_RUN_FROM_SWAP", "if the image is on the network, run it from swap file"),
    (FileCharacteristics::SYSTEM, "IMAGE_FILE_SYSTEM", "the image is a system file"),
    (FileCharacteristics::DLL, "IMAGE_FILE_DLL", "the image is a DLL file (cannot run directly)"),
    (FileCharacteristics::UP_SYSTEM_ONLY, "IMAGE_FILE_UP_SYSTEM_ONLY", "the image should be run only on a uniprocessor computer"),
];

const DLL_FLAGS: &[(DllCharacteristics, &str, &str)] = &[
    (DllCharacteristics::HIGH_ENTROPY_VA, "IMAGE_DLLCHARACTERISTICS_HIGH_ENTROPY_VA", "the image can handle a high entropy 64-bit address space"),
    (DllCharacteristics::DYNAMIC_BASE, "IMAGE_DLLCHARACTERISTICS_DYNAMIC_BASE", "the dll can be relocated at load time"),
    (DllCharacteristics::FORCE_INTEGRITY, "IMAGE_DLLCHARACTERISTICS_FORCE_INTEGRITY", "integrity checks are forced"),
    (DllCharacteristics::NX_COMPAT, "IMAGE_DLLCHARACTERISTICS_NX_COMPAT", "the image is compatible with data execution prevention"),
    (DllCharacteristics::NO_ISOLATION, "IMAGE_DLLCHARACTERISTICS_NO_ISOLATION", "the image is isolation aware"),
    (DllCharacteristics::NO_SEH, "IMAGE_DLLCHARACTERISTICS_NO_SEH", "the image does not use structured exception handling"),
    (DllCharacteristics::NO_BIND, "IMAGE_DLLCHARACTERISTICS_NO_BIND", "don't bind the image"),
    (DllCharacteristics::APPCONTAINER, "IMAGE_DLLCHARACTERISTICS_APPCONTAINER", "the image must execute in an AppContainer"),
    (DllCharacteristics::WDM_DRIVER, "IMAGE_DLLCHARACTERISTICS_WDM_DRIVER", "A WDM driver"),
    (DllCharacteristics::GUARD_CF, "IMAGE_DLLCHARACTERISTICS_GUARD_CF", "the image supports Control Flow Guard"),
    (DllCharacteristics::TERMINAL_SERVER_AWARE, "IMAGE_DLLCHARACTERISTICS_TERMINAL_SERVER_AWARE", "the image is terminal server aware"),
];

const SECTION_FLAGS: &[(SectionCharacteristics, &str, &str)] = &[
    (SectionCharacteristics::CNT_CODE, "IMAGE_SCN_CNT_CODE", "the section contains executable code"),
    (SectionCharacteristics::CNT_INITIALIZED_DATA, "IMAGE_SCN_CNT_INITIALIZED_DATA", "the section contains initialized data"),
    (SectionCharacteristics::CNT_UNINITIALIZED_DATA, "IMAGE_SCN_CNT_UNINITIALIZED_DATA", "the section contains uninitialized data"),
    (SectionCharacteristics::LNK_INFO, "IMAGE_SCN_LNK_INFO", "the section contains comments or other information (only for object file)"),
    (SectionCharacteristics::LNK_REMOVE, "IMAGE_SCN_LNK_REMOVE", "the section will not become part of the image (only for object file)"),
    (SectionCharacteristics::LNK_COMDAT, "IMAGE_SCN_LNK_COMDAT", "the section contains COMDAT data (only for object file)"),
    (SectionCharacteristics::NO_DEFER_SPEC_EXC, "IMAGE_SCN_NO_DEFER_SPEC_EXC", "reset speculative exceptions handling bits in the TLB entries for this section"),
    (SectionCharacteristics::GPREL, "IMAGE_SCN_GPREL", "the section contains data referenced through the global pointer"),
    (SectionCharacteristics::LNK_NRELOC_OVFL, "IMAGE_SCN_LNK_NRELOC_OVFL", "the section contains extended relocations (number of relocations must be 0xFFFF)"),
    (SectionCharacteristics::MEM_DISCARDABLE, "IMAGE_SCN_MEM_DISCARDABLE", "the section can be discarded as needed"),
    (SectionCharacteristics::MEM_NOT_CACHED, "IMAGE_SCN_MEM_NOT_CACHED", "the section cannot be cached"),
    (SectionCharacteristics::MEM_NOT_PAGED, "IMAGE_SCN_MEM_NOT_PAGED", "the section cannot be paged"),
    (SectionCharacteristics::MEM_SHARED, "IMAGE_SCN_MEM_SHARED", "the section can be shared in memory"),
    (SectionCharacteristics::MEM_EXECUTE, "IMAGE_SCN_MEM_EXECUTE", "the section can be executed as code"),
    (SectionCharacteristics::MEM_READ, "IMAGE_SCN_MEM_READ", "the section can be read"),
    (SectionCharacteristics::MEM_WRITE, "IMAGE_SCN_MEM_WRITE", "the section can be written to"),
];

const ANONYMOUS: &str = "[anonymous function]";

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Render a COFF timestamp as `YYYY/MM/DD Weekday HH:MM:SS` in UTC.
#[must_use]
pub fn format_timestamp(timestamp: u32) -> String {
    let seconds = i64::from(timestamp);
    let days = seconds.div_euclid(86_400);
    let time = seconds.rem_euclid(86_400);

    // Civil date from days since 1970-01-01 (proleptic Gregorian)
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);

    // 1970-01-01 was a Thursday
    let weekday = WEEKDAYS[(days + 4).rem_euclid(7) as usize];

    format!(
        "{:04}/{:02}/{:02} {} {:02}:{:02}:{:02}",
        year,
        month,
        day,
        weekday,
        time / 3600,
        time % 3600 / 60,
        time % 60
    )
}

fn signature_name(signature: u32) -> &'static str {
    if signature == NT_SIGNATURE {
        return "PE";
    }
    match signature & 0xFFFF {
        0x5A4D => "DOS",
        0x454E => "OS2",
        0x454C => "OS2 LE",
        _ => "unknown",
    }
}

/// Writes indented report groups to `W`.
pub struct Printer<W: Write> {
    out: W,
    indent: usize,
}

macro_rules! out {
    ($printer:expr, $($arg:tt)*) => {
        $printer.line(format_args!($($arg)*))?
    };
}

impl<W: Write> Printer<W> {
    /// Create a printer at indentation level zero
    pub fn new(out: W) -> Self {
        Printer { out, indent: 0 }
    }

    /// Give back the underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, args: fmt::Arguments<'_>) -> Result<()> {
        write!(self.out, "{:width$}", "", width = self.indent * 2)?;
        self.out.write_fmt(args)?;
        writeln!(self.out)?;
        Ok(())
    }

    fn begin_group(&mut self, name: &str) -> Result<()> {
        writeln!(self.out)?;
        out!(self, "---- {}", name);
        self.indent += 1;
        Ok(())
    }

    fn end_group(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    fn group<F>(&mut self, name: &str, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.begin_group(name)?;
        let result = body(self);
        self.end_group();
        result
    }

    /// Print every group in the order the CLI uses for `--all`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if writing fails.
    pub fn all(&mut self, context: &Context) -> Result<()> {
        self.dos_header(context.dos_header())?;
        self.dos_stub(context.dos_stub())?;
        self.nt_header(
            context.headers().signature,
            context.file_header(),
            context.optional_header(),
            context.data_directories(),
        )?;
        self.section_table(context.sections())?;
        self.export_table(context.exports())?;
        self.import_table(context.imports(), context.image())?;
        self.relocation_table(context.relocations())
    }

    /// # Errors
    /// Returns [`crate::Error::FileError`] if writing fails.
    pub fn dos_header(&mut self, header: &DosHeader) -> Result<()> {
        self.group("DOS HEADER", |p| {
            out!(p, "e_magic : 0x{:04X}", header.e_magic);
            out!(p, "e_lfanew: 0x{:08X}", header.e_lfanew);
            Ok(())
        })
    }

    /// Hex dump of the DOS stub, 16 bytes per row.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if writing fails.
    pub fn dos_stub(&mut self, stub: &[u8]) -> Result<()> {
        self.group("DOS STUB", |p| p.hexdump(stub))
    }

    fn hexdump(&mut self, data: &[u8]) -> Result<()> {
        for (row, chunk) in data.chunks(16).enumerate() {
            let mut hex = String::with_capacity(40);
            let mut text = String::with_capacity(16);
            for (column, byte) in chunk.iter().enumerate() {
                if column % 2 == 0 {
                    hex.push(' ');
                }
                hex.push_str(&format!("{:02X}", byte));
                text.push(if byte.is_ascii_graphic() || *byte == b' ' {
                    char::from(*byte)
                } else {
                    '.'
                });
            }
            out!(self, "{:06X}:{}    {}", row * 16, hex, text);
        }
        Ok(())
    }

    /// Signature, file header and the optional header of the loaded layout.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if writing fails.
    pub fn nt_header(
        &mut self,
        signature: u32,
        file: &FileHeader,
        optional: &OptionalHeader,
        directories: &[DataDirectory],
    ) -> Result<()> {
        self.group("NT HEADER", |p| {
            out!(p, "signature: {} (0x{:04X})", signature_name(signature), signature);
            p.file_header(file)?;
            match optional {
                OptionalHeader::Pe32(header) => p.optional_header32(header, directories),
                OptionalHeader::Pe64(header) => p.optional_header64(header, directories),
            }
        })
    }

    fn file_header(&mut self, header: &FileHeader) -> Result<()> {
        self.group("IMAGE FILE HEADER", |p| {
            let machine = header
                .machine_kind()
                .map_or_else(|| "unknown".to_string(), |machine| machine.to_string());
            out!(p, "machine                : {} (0x{:04X})", machine, header.machine);
            out!(p, "number of sections     : {}", header.number_of_sections);
            out!(p, "time date stamp        : {}", format_timestamp(header.time_date_stamp));
            out!(p, "pointer to symbol table: 0x{:08X}", header.pointer_to_symbol_table);
            out!(p, "number of symbols      : {}", header.number_of_symbols);
            out!(p, "size of optional header: 0x{:04X}", header.size_of_optional_header);
            out!(p, "characteristics        : 0x{:04X}", header.characteristics.bits());
            for (flag, name, description) in FILE_FLAGS {
                if header.characteristics.contains(*flag) {
                    out!(p, "  - {} (0x{:04X})", name, flag.bits());
                    out!(p, "      {}", description);
                }
            }
            Ok(())
        })
    }

    fn optional_magic(&mut self, magic: u16) -> Result<()> {
        let name = OptionalMagic::from_repr(magic)
            .map_or_else(|| "unknown".to_string(), |magic| magic.to_string());
        out!(self, "magic                     : {} (0x{:04X})", name, magic);
        Ok(())
    }

    fn optional_subsystem(&mut self, subsystem: u16, dll: DllCharacteristics) -> Result<()> {
        let name = Subsystem::from_repr(subsystem)
            .map_or_else(|| "unknown".to_string(), |subsystem| subsystem.to_string());
        out!(self, "subsystem                 : {} (0x{:04X})", name, subsystem);
        out!(self, "dll characteristics       : 0x{:04X}", dll.bits());
        for (flag, name, description) in DLL_FLAGS {
            if dll.contains(*flag) {
                out!(self, "  - {} (0x{:04X})", name, flag.bits());
                out!(self, "      {}", description);
            }
        }
        Ok(())
    }

    fn optional_header32(&mut self, h: &OptionalHeader32, directories: &[DataDirectory]) -> Result<()> {
        self.group("OPTIONAL HEADER 32-bit", |p| {
            p.optional_magic(h.magic)?;
            out!(p, "linker version            : {}.{}", h.major_linker_version, h.minor_linker_version);
            out!(p, "size of code              : 0x{:08X} = {}", h.size_of_code, h.size_of_code);
            out!(p, "size of initialized data  : 0x{:08X} = {}", h.size_of_initialized_data, h.size_of_initialized_data);
            out!(p, "size of uninitialized data: 0x{:08X} = {}", h.size_of_uninitialized_data, h.size_of_uninitialized_data);
            out!(p, "address of entrypoint     : 0x{:08X} RVA", h.address_of_entry_point);
            out!(p, "base of code              : 0x{:08X} RVA", h.base_of_code);
            out!(p, "base of data              : 0x{:08X} RVA", h.base_of_data);
            out!(p, "image base                : 0x{:08X}", h.image_base);
            out!(p, "section alignment         : 0x{:08X} = {}", h.section_alignment, h.section_alignment);
            out!(p, "file alignment            : 0x{:08X} = {}", h.file_alignment, h.file_alignment);
            out!(p, "OS version                : {}.{}", h.major_operating_system_version, h.minor_operating_system_version);
            out!(p, "image version             : {}.{}", h.major_image_version, h.minor_image_version);
            out!(p, "subsystem version         : {}.{}", h.major_subsystem_version, h.minor_subsystem_version);
            out!(p, "size of image             : 0x{:08X} = {}", h.size_of_image, h.size_of_image);
            out!(p, "size of headers           : 0x{:08X} = {}", h.size_of_headers, h.size_of_headers);
            out!(p, "checksum                  : 0x{:08X} = {}", h.check_sum, h.check_sum);
            p.optional_subsystem(h.subsystem, h.dll_characteristics)?;
            out!(p, "size of stack reserve     : 0x{:08X} = {}", h.size_of_stack_reserve, h.size_of_stack_reserve);
            out!(p, "size of stack commit      : 0x{:08X} = {}", h.size_of_stack_commit, h.size_of_stack_commit);
            out!(p, "size of heap reserve      : 0x{:08X} = {}", h.size_of_heap_reserve, h.size_of_heap_reserve);
            out!(p, "size of heap commit       : 0x{:08X} = {}", h.size_of_heap_commit, h.size_of_heap_commit);
            out!(p, "number of RVA and sizes   : {}", h.number_of_rva_and_sizes);
            p.data_directories(directories)
        })
    }

    fn optional_header64(&mut self, h: &OptionalHeader64, directories: &[DataDirectory]) -> Result<()> {
        self.group("OPTIONAL HEADER 64-bit", |p| {
            p.optional_magic(h.magic)?;
            out!(p, "linker version            : {}.{}", h.major_linker_version, h.minor_linker_version);
            out!(p, "size of code              : 0x{:08X} = {}", h.size_of_code, h.size_of_code);
            out!(p, "size of initialized data  : 0x{:08X} = {}", h.size_of_initialized_data, h.size_of_initialized_data);
            out!(p, "size of uninitialized data: 0x{:08X} = {}", h.size_of_uninitialized_data, h.size_of_uninitialized_data);
            out!(p, "address of entrypoint     : 0x{:08X} RVA", h.address_of_entry_point);
            out!(p, "base of code              : 0x{:08X} RVA", h.base_of_code);
            out!(p, "image base                : 0x{:016X}", h.image_base);
            out!(p, "section alignment         : 0x{:08X} = {}", h.section_alignment, h.section_alignment);
            out!(p, "file alignment            : 0x{:08X} = {}", h.file_alignment, h.file_alignment);
            out!(p, "OS version                : {}.{}", h.major_operating_system_version, h.minor_operating_system_version);
            out!(p, "image version             : {}.{}", h.major_image_version, h.minor_image_version);
            out!(p, "subsystem version         : {}.{}", h.major_subsystem_version, h.minor_subsystem_version);
            out!(p, "size of image             : 0x{:08X} = {}", h.size_of_image, h.size_of_image);
            out!(p, "size of headers           : 0x{:08X} = {}", h.size_of_headers, h.size_of_headers);
            out!(p, "checksum                  : 0x{:08X} = {}", h.check_sum, h.check_sum);
            p.optional_subsystem(h.subsystem, h.dll_characteristics)?;
            out!(p, "size of stack reserve     : 0x{:016X} = {}", h.size_of_stack_reserve, h.size_of_stack_reserve);
            out!(p, "size of stack commit      : 0x{:016X} = {}", h.size_of_stack_commit, h.size_of_stack_commit);
            out!(p, "size of heap reserve      : 0x{:016X} = {}", h.size_of_heap_reserve, h.size_of_heap_reserve);
            out!(p, "size of heap commit       : 0x{:016X} = {}", h.size_of_heap_commit, h.size_of_heap_commit);
            out!(p, "number of RVA and sizes   : {}", h.number_of_rva_and_sizes);
            p.data_directories(directories)
        })
    }

    fn data_directories(&mut self, directories: &[DataDirectory]) -> Result<()> {
        out!(self, "data directories:");
        for (index, entry) in directories.iter().enumerate() {
            let name = DataDirectoryKind::from_repr(index)
                .map_or_else(|| "unknown".to_string(), |kind| kind.to_string());
            out!(self, "  {:02}: {}", index, name);
            out!(self, "    virtual address: 0x{:08X} RVA", entry.virtual_address);
            out!(self, "    size           : 0x{:08X} = {}", entry.size, entry.size);
        }
        Ok(())
    }

    /// # Errors
    /// Returns [`crate::Error::FileError`] if writing fails.
    pub fn section_table(&mut self, sections: &[SectionHeader]) -> Result<()> {
        self.group("section table", |p| {
            for (index, s) in sections.iter().enumerate() {
                out!(p, "{}:", index);
                out!(p, "  name                  : {}", s.name_str());
                out!(p, "  virtual size          : 0x{:08X} = {}", s.virtual_size, s.virtual_size);
                out!(p, "  virtual address       : 0x{:08X} RVA", s.virtual_address);
                out!(p, "  size of raw data      : 0x{:08X} = {}", s.size_of_raw_data, s.size_of_raw_data);
                out!(p, "  pointer to raw data   : 0x{:08X}", s.pointer_to_raw_data);
                out!(p, "  pointer to relocations: 0x{:08X}", s.pointer_to_relocations);
                out!(p, "  pointer to linenumbers: 0x{:08X}", s.pointer_to_linenumbers);
                out!(p, "  number of relocations : {}", s.number_of_relocations);
                if s.number_of_relocations == u16::MAX {
                    out!(p, "    check if IMAGE_SCN_LNK_NRELOC_OVFL is set at characteristics property");
                }
                out!(p, "  number of linenumbers : {}", s.number_of_linenumbers);
                out!(p, "  characteristics: 0x{:08X}", s.characteristics.bits());
                for (flag, name, description) in SECTION_FLAGS {
                    if s.characteristics.contains(*flag) {
                        out!(p, "   - {} (0x{:08X})", name, flag.bits());
                        out!(p, "       {}", description);
                    }
                }
                if let Some(alignment) = s.alignment() {
                    out!(p, "   - IMAGE_SCN_ALIGN_{}BYTES", alignment);
                    out!(p, "       align data on a {}-byte boundary (only for object file)", alignment);
                }
            }
            Ok(())
        })
    }

    /// One line per exported function: name, ordinal, RVA and forwarder if any.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if writing fails.
    pub fn export_table(&mut self, exports: Option<&ExportTable>) -> Result<()> {
        self.group("export table", |p| {
            let Some(exports) = exports else {
                out!(p, "no export table found");
                return Ok(());
            };

            out!(p, "name: {}", exports.module_name);
            let width = exports.names().iter().map(String::len).max().unwrap_or(0);
            for function in exports.functions() {
                let name = function.name.unwrap_or(ANONYMOUS);
                match function.forwarder {
                    Some(target) => out!(
                        p,
                        "{:<width$}@{:<10} 0x{:08X} (forwarded to '{}')",
                        name,
                        function.ordinal,
                        function.rva,
                        target
                    ),
                    None => out!(
                        p,
                        "{:<width$}@{:<10} 0x{:08X}",
                        name,
                        function.ordinal,
                        function.rva
                    ),
                }
            }
            Ok(())
        })
    }

    /// Every import descriptor with its name table, decoded from `image`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if writing fails.
    pub fn import_table(&mut self, imports: Option<&ImportTable>, image: &RawImage) -> Result<()> {
        self.group("import table", |p| {
            let Some(imports) = imports else {
                out!(p, "no import table found");
                return Ok(());
            };

            for (index, d) in imports.descriptors.iter().enumerate() {
                out!(p, "{}:", index);
                out!(p, "  name                : {}", d.module_name);
                out!(p, "  original first thunk: 0x{:08X}", d.original_first_thunk);
                out!(p, "  first thunk         : 0x{:08X}", d.first_thunk);
                out!(p, "  forwarder chain     : 0x{:08X}", d.forwarder_chain);
                if d.time_date_stamp == 0 {
                    out!(p, "  time date stamp     : 0");
                } else {
                    out!(p, "  time date stamp     : {}", format_timestamp(d.time_date_stamp));
                }
                out!(p, "  INT                 :");
                for thunk in d.thunks(image) {
                    match thunk {
                        ImportThunk::Ordinal(ordinal) => out!(p, "    @{:>7}: {}", ordinal, ANONYMOUS),
                        ImportThunk::ByName { hint, name, .. } => out!(p, "    {:>8}: {}", hint, name),
                    }
                }
            }
            Ok(())
        })
    }

    /// Every relocation block with its entries and the number of patched addresses.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if writing fails.
    pub fn relocation_table(&mut self, relocations: Option<&RelocationTable>) -> Result<()> {
        self.group("relocation table", |p| {
            let Some(relocations) = relocations else {
                out!(p, "no relocation table found");
                return Ok(());
            };

            for (index, block) in relocations.blocks.iter().enumerate() {
                out!(p, "block {}:", index);
                out!(p, "  virtual address: 0x{:08X}", block.virtual_address);
                out!(p, "  block size     : 0x{:08X} = {}", block.size_of_block, block.size_of_block);
                out!(p, "  entries        : {} found", block.entries.len());
                for entry in &block.entries {
                    out!(p, "    0x{:08X}: type={:>2}", block.target(entry), entry.kind);
                }
            }
            out!(p, "total {} addresses to be relocated found", relocations.address_count());
            Ok(())
        })
    }
}
