use crate::naming::{self, FIRST_PROCESS, ShardId};
use anyhow::anyhow;
use itertools::Itertools;
use log::{info, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Strategy used to decide which iterations exist in a directory
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// An iteration exists if the shard of the first process (`n000`) exists.
    ///
    /// This relies on the simulation writing a shard for process 0 for every iteration that has any data.
    #[default]
    FirstProcess,
    /// An iteration exists if the shard of any process exists
    AllProcesses,
}

/// Inclusive range of iteration numbers, unbounded on a side if the bound is `None`
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IterationRange {
    start: Option<usize>,
    end: Option<usize>,
}

impl IterationRange {
    /// Range that includes every iteration
    pub fn all() -> Self {
        Self::default()
    }

    /// Constructs a range from optional bounds, returns an error if `start > end`
    pub fn try_new(start: Option<usize>, end: Option<usize>) -> Result<Self, anyhow::Error> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(anyhow!(
                    "Invalid iteration range: \"{} to {}\"",
                    start,
                    end
                ));
            }
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, iteration: usize) -> bool {
        self.start.is_none_or(|start| iteration >= start)
            && self.end.is_none_or(|end| iteration <= end)
    }
}

impl std::fmt::Display for IterationRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bound = |b: Option<usize>| b.map(|i| i.to_string()).unwrap_or_else(|| "*".to_string());
        write!(f, "{} to {}", bound(self.start), bound(self.end))
    }
}

/// Returns the parsed names of all shard files that are direct children of the given directory, unsorted
///
/// Entries that are not regular files or whose names do not follow the shard naming convention are skipped.
/// Returns an empty list if the directory does not exist.
pub(crate) fn shard_files_in_dir(source_dir: &Path) -> Vec<(ShardId, PathBuf)> {
    if !source_dir.is_dir() {
        warn!(
            "Source directory \"{}\" does not exist or is not a directory, no shard files found",
            source_dir.display()
        );
        return Vec::new();
    }

    WalkDir::new(source_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| {
            entry
                .inspect_err(|err| warn!("Skipping unreadable directory entry: {}", err))
                .ok()
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let shard_id = naming::parse_shard_file_name(entry.file_name().to_str()?)?;
            Some((shard_id, entry.into_path()))
        })
        .collect()
}

/// Returns the sorted, de-duplicated iteration numbers of all shard files in the given directory
///
/// Only direct children of the directory are considered. Files not following the naming convention
/// `points_<iteration:06>_n<process:03>.txt` are ignored. A missing directory or a directory
/// without any shard files results in an empty list.
pub fn discover_iterations<P: AsRef<Path>>(
    source_dir: P,
    mode: DiscoveryMode,
    range: IterationRange,
) -> Vec<usize> {
    let source_dir = source_dir.as_ref();
    info!(
        "Looking for shard files in \"{}\"",
        source_dir.display()
    );

    let iterations: Vec<usize> = shard_files_in_dir(source_dir)
        .into_iter()
        .map(|(shard_id, _)| shard_id)
        .filter(|shard_id| match mode {
            DiscoveryMode::FirstProcess => shard_id.process == FIRST_PROCESS,
            DiscoveryMode::AllProcesses => true,
        })
        .map(|shard_id| shard_id.iteration)
        .filter(|&iteration| range.contains(iteration))
        .sorted_unstable()
        .dedup()
        .collect();

    info!(
        "Found {} iterations in range {} (first: {}, last: {})",
        iterations.len(),
        range,
        iterations
            .first()
            .map(|i| i.to_string())
            .unwrap_or_else(|| "-".to_string()),
        iterations
            .last()
            .map(|i| i.to_string())
            .unwrap_or_else(|| "-".to_string()),
    );

    iterations
}
