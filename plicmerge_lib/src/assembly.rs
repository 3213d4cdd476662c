use crate::discovery::shard_files_in_dir;
use crate::io;
use crate::naming;
use crate::shard::{self, ShardRows};
use crate::table::IterationTable;
use crate::Parameters;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Summary of the assembly of one iteration table
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AssemblyReport {
    /// The assembled iteration
    pub iteration: usize,
    /// Number of shard files that were merged
    pub num_shards: usize,
    /// Number of rows of the resulting table
    pub num_rows: usize,
    /// Number of rows that were dropped because of missing or malformed values
    pub num_dropped_rows: usize,
}

/// Returns the paths of all shard files of the given iteration in the source directory, sorted by file name
///
/// The file names are sorted in natural order, which is the order of ascending process numbers.
/// A missing source directory results in an empty list.
pub fn enumerate_shard_files<P: AsRef<Path>>(
    source_dir: P,
    iteration: usize,
) -> Vec<PathBuf> {
    let mut shard_files: Vec<(String, PathBuf)> = shard_files_in_dir(source_dir.as_ref())
        .into_iter()
        .filter(|(shard_id, _)| shard_id.iteration == iteration)
        .filter_map(|(_, path)| {
            let file_name = path.file_name()?.to_str()?.to_string();
            Some((file_name, path))
        })
        .collect();

    shard_files.sort_by(|(a, _), (b, _)| lexical_sort::natural_cmp(a, b));
    shard_files.into_iter().map(|(_, path)| path).collect()
}

/// Assembles the table of the given iteration from all of its shard files in the source directory
///
/// The shards are concatenated in the order returned by [`enumerate_shard_files`], keeping the row order
/// of each shard. Rows with missing values are dropped afterwards. If the source directory does not
/// exist or contains no shards of the iteration, the result is an empty table.
pub fn assemble_iteration<P: AsRef<Path>>(
    source_dir: P,
    iteration: usize,
    parameters: &Parameters,
) -> Result<(IterationTable, AssemblyReport), anyhow::Error> {
    let source_dir = source_dir.as_ref();
    let shard_files = enumerate_shard_files(source_dir, iteration);
    debug!(
        "Found {} shard files for iteration {}",
        shard_files.len(),
        iteration
    );

    let read_shard = |path: &PathBuf| {
        shard::read_shard_file(path, parameters.dimension, parameters.malformed_rows)
    };

    let shards: Vec<ShardRows> = if parameters.enable_multi_threading {
        shard_files.par_iter().map(read_shard).collect::<Result<_, _>>()?
    } else {
        shard_files.iter().map(read_shard).collect::<Result<_, _>>()?
    };

    let mut rows = ShardRows::new(parameters.dimension);
    for shard in shards {
        rows.append(shard);
    }

    let (table, num_dropped_rows) = rows.drop_incomplete_rows();
    if num_dropped_rows > 0 {
        warn!(
            "Dropped {} rows with missing or malformed values from the shards of iteration {}",
            num_dropped_rows, iteration
        );
    }

    let report = AssemblyReport {
        iteration,
        num_shards: shard_files.len(),
        num_rows: table.num_rows(),
        num_dropped_rows,
    };

    Ok((table, report))
}

/// Assembles the table of the given iteration and writes it to the target directory
///
/// The table is written to `<target_dir>/plic_<iteration:06>.<ext>`, an existing file is replaced.
/// An empty table is written as well. The target directory has to exist.
pub fn merge_iteration<P: AsRef<Path>, Q: AsRef<Path>>(
    source_dir: P,
    target_dir: Q,
    iteration: usize,
    parameters: &Parameters,
) -> Result<AssemblyReport, anyhow::Error> {
    let start = Instant::now();

    let (table, report) = assemble_iteration(source_dir, iteration, parameters)?;

    let output_file = target_dir
        .as_ref()
        .join(naming::output_file_name(iteration, parameters.output_format));
    io::write_table(
        &table,
        &output_file,
        parameters.output_format,
        parameters.enable_compression,
    )?;

    info!(
        "Merged iteration {} ({} shards, {} rows) into \"{}\" in {:.2}ms",
        iteration,
        report.num_shards,
        report.num_rows,
        output_file.display(),
        start.elapsed().as_secs_f64() * 1e3
    );

    Ok(report)
}
