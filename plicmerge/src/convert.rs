use crate::cli::Switch;
use anyhow::{Context, anyhow};
use clap::value_parser;
use log::info;
use plicmerge_lib::TableFormat;
use plicmerge_lib::io;
use std::path::PathBuf;

/// Command line arguments for the `convert` subcommand
#[derive(Clone, Debug, clap::Parser)]
pub(crate) struct ConvertSubcommandArgs {
    /// Path to the input table file to read (supported formats: PTAB, JSON)
    #[arg(short = 'i', value_parser = value_parser!(PathBuf))]
    pub input_file: PathBuf,
    /// Path to the output file (supported formats: PTAB, JSON)
    #[arg(short = 'o', value_parser = value_parser!(PathBuf))]
    pub output_file: PathBuf,
    /// Whether to overwrite existing files without asking
    #[arg(long)]
    pub overwrite: bool,
    /// Enable gzip compression of the output file (only supported by the PTAB format)
    #[arg(
        long,
        default_value = "off",
        value_name = "off|on",
        ignore_case = true,
        require_equals = true
    )]
    pub compress: Switch,
}

/// Executes the `convert` subcommand
pub(crate) fn convert_subcommand(cmd_args: &ConvertSubcommandArgs) -> Result<(), anyhow::Error> {
    let input_file = &cmd_args.input_file;
    let output_file = &cmd_args.output_file;

    // Check if file already exists
    if !cmd_args.overwrite && output_file.exists() {
        return Err(anyhow!(
            "Output file \"{}\" already exists. Use overwrite flag to ignore this.",
            output_file.display()
        ));
    }

    let output_format = TableFormat::from_path(output_file)?;

    let table = io::read_table(input_file).with_context(|| {
        format!(
            "Failed to load table from file \"{}\"",
            input_file.display()
        )
    })?;

    io::write_table(
        &table,
        output_file,
        output_format,
        cmd_args.compress.into_bool(),
    )?;

    info!(
        "Wrote {} table with {} rows to \"{}\".",
        table.dimension(),
        table.num_rows(),
        output_file.display()
    );

    Ok(())
}
