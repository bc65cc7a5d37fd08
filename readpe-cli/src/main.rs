mod app;

use std::io::{self, Write};

use anyhow::Context as _;
use clap::Parser;
use readpe::{output::Printer, Context, LoadConfig};

use crate::app::{Cli, Selection};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Show readpe warnings on stderr; --verbose enables debug; RUST_LOG overrides
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_module("readpe", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    let mut config = LoadConfig::default();
    if let Some(limit) = cli.max_image_size {
        config = config.with_max_image_size(limit);
    }

    let context = Context::from_file_with(&cli.path, &config)
        .with_context(|| format!("failed to load {}", cli.path.display()))?;

    let stdout = io::stdout();
    let mut printer = Printer::new(stdout.lock());
    print(&mut printer, &context, cli.selection())?;
    printer.into_inner().flush()?;

    Ok(())
}

fn print<W: Write>(
    printer: &mut Printer<W>,
    context: &Context,
    selection: Selection,
) -> readpe::Result<()> {
    if selection.dos_header {
        printer.dos_header(context.dos_header())?;
    }
    if selection.dos_stub {
        printer.dos_stub(context.dos_stub())?;
    }
    if selection.nt_header {
        printer.nt_header(
            context.headers().signature,
            context.file_header(),
            context.optional_header(),
            context.data_directories(),
        )?;
    }
    if selection.section_table {
        printer.section_table(context.sections())?;
    }
    if selection.export_table {
        printer.export_table(context.exports())?;
    }
    if selection.import_table {
        printer.import_table(context.imports(), context.image())?;
    }
    if selection.relocation_table {
        printer.relocation_table(context.relocations())?;
    }
    Ok(())
}
