//! Convenience functions for reading and writing iteration tables in the supported file formats

use crate::table::IterationTable;
use anyhow::{Context, anyhow};
use log::{debug, info};
use std::path::Path;

pub mod json_format;
pub mod ptab_format;

/// File format used to store iteration tables
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TableFormat {
    /// Binary PTAB format, see [`ptab_format`]
    #[default]
    Ptab,
    /// JSON format, see [`json_format`]
    Json,
}

impl TableFormat {
    /// Returns the file extension (without leading dot) used for this format
    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Ptab => "ptab",
            TableFormat::Json => "json",
        }
    }

    /// Detects the format from the extension of the given file path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .ok_or_else(|| {
                anyhow!(
                    "Unable to detect file format of \"{}\" (file name has to end with supported extension)",
                    path.display()
                )
            })?
            .to_str()
            .ok_or(anyhow!("Invalid extension of file \"{}\"", path.display()))?;

        match extension.to_lowercase().as_str() {
            "ptab" => Ok(TableFormat::Ptab),
            "json" => Ok(TableFormat::Json),
            _ => Err(anyhow!(
                "Unsupported file format extension \"{}\" for iteration tables",
                extension
            )),
        }
    }
}

/// Loads an iteration table from the given file path, automatically detects the file format
pub fn read_table<P: AsRef<Path>>(input_file: P) -> Result<IterationTable, anyhow::Error> {
    let input_file = input_file.as_ref();
    info!("Reading table from \"{}\"...", input_file.display());

    let table = match TableFormat::from_path(input_file)? {
        TableFormat::Ptab => ptab_format::table_from_ptab(input_file),
        TableFormat::Json => json_format::table_from_json(input_file),
    }
    .with_context(|| format!("Failed to read table from file \"{}\"", input_file.display()))?;

    info!(
        "Successfully read {} table with {} rows.",
        table.dimension(),
        table.num_rows()
    );

    Ok(table)
}

/// Writes an iteration table to the given file path in the given format, replacing any existing file atomically
///
/// Compression is only supported by the binary format and ignored otherwise.
pub fn write_table<P: AsRef<Path>>(
    table: &IterationTable,
    output_file: P,
    format: TableFormat,
    enable_compression: bool,
) -> Result<(), anyhow::Error> {
    let output_file = output_file.as_ref();
    debug!(
        "Writing {} table with {} rows to \"{}\"...",
        table.dimension(),
        table.num_rows(),
        output_file.display()
    );

    match format {
        TableFormat::Ptab => ptab_format::table_to_ptab(table, output_file, enable_compression),
        TableFormat::Json => json_format::table_to_json(table, output_file),
    }
    .with_context(|| {
        format!(
            "Failed to write table to output file \"{}\"",
            output_file.display()
        )
    })
}
