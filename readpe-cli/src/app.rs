use std::path::PathBuf;

use clap::Parser;

/// readpe - inspect the headers and tables of a PE32 / PE32+ image
#[derive(Debug, Parser)]
#[command(name = "readpe", version, about, long_about = None)]
pub struct Cli {
    /// Path to the PE image.
    #[arg(value_name = "FILE")]
    pub path: PathBuf,

    /// Print every group below.
    #[arg(long)]
    pub all: bool,

    /// Print the DOS header.
    #[arg(long)]
    pub dos_header: bool,

    /// Hex dump the DOS stub.
    #[arg(long)]
    pub dos_stub: bool,

    /// Print the NT header: signature, file header, optional header and data directories.
    #[arg(long)]
    pub nt_header: bool,

    /// Print the section table.
    #[arg(long)]
    pub section_table: bool,

    /// Print the export table.
    #[arg(long)]
    pub export_table: bool,

    /// Print the import table.
    #[arg(long)]
    pub import_table: bool,

    /// Print the base relocation table.
    #[arg(long)]
    pub relocation_table: bool,

    /// Reject images whose declared size exceeds this many bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_image_size: Option<u64>,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// The groups to print, with `--all` folded in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub dos_header: bool,
    pub dos_stub: bool,
    pub nt_header: bool,
    pub section_table: bool,
    pub export_table: bool,
    pub import_table: bool,
    pub relocation_table: bool,
}

impl Cli {
    pub fn selection(&self) -> Selection {
        Selection {
            dos_header: self.dos_header || self.all,
            dos_stub: self.dos_stub || self.all,
            nt_header: self.nt_header || self.all,
            section_table: self.section_table || self.all,
            export_table: self.export_table || self.all,
            import_table: self.import_table || self.all,
            relocation_table: self.relocation_table || self.all,
        }
    }
}
