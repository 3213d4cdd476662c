//!
//! Library for merging per-process PLIC facet point dumps of a simulation into one table per iteration.
//! Entry points are [discover_iterations] to find the iterations of a dump directory and [merge_iteration]
//! to assemble and write the table of a single iteration.
//!

/// Enumeration of shard files and assembly of iteration tables
pub mod assembly;
/// Discovery of the iterations present in a directory of shard files
pub mod discovery;
/// Reading and writing of iteration tables in the supported file formats
pub mod io;
/// Naming convention of shard files and output artifacts
pub mod naming;
/// Parsing of individual shard files
pub mod shard;
/// Column oriented point table type
pub mod table;
mod utils;

pub use assembly::{AssemblyReport, assemble_iteration, enumerate_shard_files, merge_iteration};
pub use discovery::{DiscoveryMode, IterationRange, discover_iterations};
pub use io::TableFormat;
pub use shard::{MalformedRowPolicy, ShardParseError};
pub use table::{Dimension, IterationTable};

/// Parameters for assembling and writing iteration tables
#[derive(Clone, Debug)]
pub struct Parameters {
    /// Column schema used to parse the shard files (`px, py` or `px, py, pz`)
    pub dimension: Dimension,
    /// How rows with missing or non-numeric fields are treated
    pub malformed_rows: MalformedRowPolicy,
    /// File format of the written iteration tables
    pub output_format: TableFormat,
    /// Whether to gzip compress the written tables (only supported by the binary table format)
    pub enable_compression: bool,
    /// Whether to parse the shard files of a single iteration in parallel
    pub enable_multi_threading: bool,
}

impl Parameters {
    /// Default parameters for the given dimension
    pub fn new(dimension: Dimension) -> Self {
        Self {
            dimension,
            malformed_rows: MalformedRowPolicy::Drop,
            output_format: TableFormat::Ptab,
            enable_compression: false,
            enable_multi_threading: false,
        }
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::new(Dimension::Three)
    }
}

/// Initializes the global thread pool used by this library with the given parameters.
///
/// Initialization of the global thread pool happens exactly once.
/// Therefore, if you call `initialize_thread_pool` a second time, it will return an error.
/// An `Ok` result indicates that this is the first initialization of the thread pool.
pub fn initialize_thread_pool(num_threads: usize) -> Result<(), anyhow::Error> {
    rayon::ThreadPoolBuilder::new().num_threads(num_threads).build_global()?;
    Ok(())
}
