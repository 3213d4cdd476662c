//! File naming convention of the simulation's shard files and of the written iteration tables
//!
//! Shard files are named `points_<iteration>_n<process>.txt` where the iteration number is
//! zero-padded to six digits and the process number is zero-padded to three digits, e.g.
//! `points_000120_n003.txt`. Merged tables are written as `plic_<iteration>.<ext>`.

use crate::io::TableFormat;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

/// Prefix of all shard file names
pub const SHARD_FILE_PREFIX: &str = "points_";
/// Extension of all shard files
pub const SHARD_FILE_EXTENSION: &str = "txt";
/// Prefix of all written iteration tables
pub const OUTPUT_FILE_PREFIX: &str = "plic_";
/// Process number of the shard that marks the existence of an iteration
pub const FIRST_PROCESS: usize = 0;

/// Matches shard file names, the padding widths are minimum widths
static SHARD_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^points_(\d{6,})_n(\d{3,})\.txt$").expect("expected a valid regex")
});

/// Iteration and process number of a shard file
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardId {
    pub iteration: usize,
    pub process: usize,
}

/// Returns the file name of the shard written by `process` for `iteration`
pub fn shard_file_name(iteration: usize, process: usize) -> String {
    format!(
        "{}{:03}.{}",
        iteration_prefix(iteration),
        process,
        SHARD_FILE_EXTENSION
    )
}

/// Returns the common file name prefix of all shards of the given iteration, e.g. `points_000120_n`
pub fn iteration_prefix(iteration: usize) -> String {
    format!("{}{:06}_n", SHARD_FILE_PREFIX, iteration)
}

/// Tries to extract iteration and process number from a shard file name, returns `None` if the name does not follow the convention
pub fn parse_shard_file_name(file_name: &str) -> Option<ShardId> {
    let captures = SHARD_FILE_RE.captures(file_name)?;
    let (iteration, process) = (&captures[1], &captures[2]);

    // Numbers wider than their padding must not have leading zeros, otherwise two names would map to one shard
    if (iteration.len() > 6 && iteration.starts_with('0'))
        || (process.len() > 3 && process.starts_with('0'))
    {
        return None;
    }

    Some(ShardId {
        iteration: usize::from_str(iteration).ok()?,
        process: usize::from_str(process).ok()?,
    })
}

/// Returns the file name of the merged table of `iteration` in the given format
pub fn output_file_name(iteration: usize, format: TableFormat) -> String {
    format!(
        "{}{:06}.{}",
        OUTPUT_FILE_PREFIX,
        iteration,
        format.extension()
    )
}
