//! Implementation of the `merge` subcommand of the plicmerge CLI.

use crate::cli::Switch;
use crate::logging;
use crate::merge::arguments::*;
use anyhow::{Context, anyhow};
use clap::value_parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use plicmerge_lib::{AssemblyReport, Dimension, DiscoveryMode, TableFormat};
use rayon::prelude::*;
use std::convert::TryFrom;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

static ARGS_IO: &str = "Input/output";
static ARGS_DISCOVERY: &str = "Iteration discovery";
static ARGS_PARSING: &str = "Shard parsing";
static ARGS_OUTPUT: &str = "Output format";
static ARGS_ADV: &str = "Parallelization";
static ARGS_OTHER: &str = "Remaining options";

/// Command line arguments for the `merge` subcommand
#[derive(Clone, Debug, clap::Parser)]
#[command(next_help_heading = ARGS_OTHER)]
pub(crate) struct MergeSubcommandArgs {
    /// Path to the directory containing the shard files ("points_<iteration>_n<process>.txt")
    #[arg(help_heading = ARGS_IO, value_parser = value_parser!(PathBuf))]
    pub source_dir: PathBuf,
    /// Path to the directory for the merged tables ("plic_<iteration>.<ext>"), created if it does not exist
    #[arg(help_heading = ARGS_IO, short = 'o', long, value_parser = value_parser!(PathBuf))]
    pub output_dir: PathBuf,
    #[command(flatten)]
    pub discovery: DiscoveryArgs,

    /// Number of coordinate columns of the point records (2d: px, py; 3d: px, py, pz)
    #[arg(
        help_heading = ARGS_PARSING,
        long,
        default_value = "3d",
        value_name = "2d|3d",
        ignore_case = true,
        require_equals = true
    )]
    pub dim: DimensionArg,
    /// Abort with an error on rows with missing or non-numeric fields instead of dropping them
    #[arg(
        help_heading = ARGS_PARSING,
        long,
        default_value = "off",
        value_name = "off|on",
        ignore_case = true,
        require_equals = true
    )]
    pub strict: Switch,

    /// File format of the merged tables
    #[arg(
        help_heading = ARGS_OUTPUT,
        long,
        default_value = "ptab",
        value_name = "ptab|json",
        ignore_case = true,
        require_equals = true
    )]
    pub format: FormatArg,
    /// Enable gzip compression of the merged tables (only supported by the PTAB format)
    #[arg(
        help_heading = ARGS_OUTPUT,
        long,
        default_value = "off",
        value_name = "off|on",
        ignore_case = true,
        require_equals = true
    )]
    pub compress: Switch,

    /// Flag to enable multi-threading to merge several iterations in parallel
    #[arg(
        help_heading = ARGS_ADV,
        long,
        default_value = "on",
        value_name = "off|on",
        ignore_case = true,
        require_equals = true
    )]
    pub mt_iterations: Switch,
    /// Flag to enable multi-threading to parse the shards of a single iteration in parallel
    #[arg(
        help_heading = ARGS_ADV,
        long,
        default_value = "off",
        value_name = "off|on",
        ignore_case = true,
        require_equals = true
    )]
    pub mt_shards: Switch,
    /// Set the number of threads for the worker thread pool
    #[arg(help_heading = ARGS_ADV, long, short = 'n')]
    pub num_threads: Option<usize>,
}

/// Arguments selecting the iterations to process, shared by the `merge` and `list` subcommands
#[derive(Clone, Debug, clap::Args)]
pub(crate) struct DiscoveryArgs {
    /// Number of the first iteration to process (default: lowest iteration found)
    #[arg(help_heading = ARGS_DISCOVERY, short = 's', long)]
    pub start_index: Option<usize>,
    /// Number of the last iteration to process (default: highest iteration found)
    #[arg(help_heading = ARGS_DISCOVERY, short = 'e', long)]
    pub end_index: Option<usize>,
    /// Which shards mark an iteration as present: only the shard of process 0 or the shard of any process
    #[arg(
        help_heading = ARGS_DISCOVERY,
        long,
        default_value = "first-process",
        value_name = "first-process|all-processes",
        ignore_case = true,
        require_equals = true
    )]
    pub discovery: DiscoveryArg,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum DimensionArg {
    #[value(name = "2d")]
    TwoD,
    #[value(name = "3d")]
    ThreeD,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum DiscoveryArg {
    FirstProcess,
    AllProcesses,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum FormatArg {
    Ptab,
    Json,
}

impl From<DimensionArg> for Dimension {
    fn from(value: DimensionArg) -> Self {
        match value {
            DimensionArg::TwoD => Dimension::Two,
            DimensionArg::ThreeD => Dimension::Three,
        }
    }
}

impl From<DiscoveryArg> for DiscoveryMode {
    fn from(value: DiscoveryArg) -> Self {
        match value {
            DiscoveryArg::FirstProcess => DiscoveryMode::FirstProcess,
            DiscoveryArg::AllProcesses => DiscoveryMode::AllProcesses,
        }
    }
}

impl From<FormatArg> for TableFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Ptab => TableFormat::Ptab,
            FormatArg::Json => TableFormat::Json,
        }
    }
}

/// Executes the `merge` subcommand
pub(crate) fn merge_subcommand(cmd_args: &MergeSubcommandArgs) -> Result<(), anyhow::Error> {
    let args = MergeRunnerArgs::try_from(cmd_args)
        .context("Failed processing parameters from command line")?;

    let output_dir = &cmd_args.output_dir;
    if !output_dir.is_dir() {
        info!("Creating output directory \"{}\"", output_dir.display());
        fs::create_dir_all(output_dir).with_context(|| {
            format!(
                "Unable to create output directory \"{}\"",
                output_dir.display()
            )
        })?;
    }

    let iterations = plicmerge_lib::discover_iterations(
        &cmd_args.source_dir,
        args.discovery.mode,
        args.discovery.range,
    );
    if iterations.is_empty() {
        warn!(
            "No iterations found in \"{}\", nothing to merge.",
            cmd_args.source_dir.display()
        );
        return Ok(());
    }

    let start = Instant::now();

    let _pb = if iterations.len() > 1 {
        let pb = ProgressBar::new(iterations.len() as u64);
        pb.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) - remaining: [{eta_precise}]")
            .context("Invalid progress bar template")?
            .progress_chars("=> "));
        logging::set_progress_bar(Some(pb.downgrade()));
        Some(pb)
    } else {
        None
    };

    let merge = |iteration: usize| {
        let result = plicmerge_lib::merge_iteration(
            &cmd_args.source_dir,
            output_dir,
            iteration,
            &args.parameters,
        )
        .with_context(|| format!("Error while merging iteration {}", iteration));
        if let Some(pb) = logging::get_progress_bar() {
            pb.inc(1)
        }
        result
    };

    // Every iteration is attempted, a failure only affects the output of its own iteration
    let results: Vec<Result<AssemblyReport, anyhow::Error>> = if args.parallelize_over_iterations
    {
        iterations
            .par_iter()
            .map(|&iteration| merge(iteration).inspect_err(logging::log_error))
            .collect()
    } else {
        iterations
            .iter()
            .map(|&iteration| merge(iteration).inspect_err(logging::log_error))
            .collect()
    };

    if iterations.len() > 1 {
        if let Some(pb) = logging::get_progress_bar() {
            pb.finish()
        }
        logging::set_progress_bar(None);
    }

    let mut reports = Vec::with_capacity(results.len());
    let mut num_failed = 0;
    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(_) => num_failed += 1,
        }
    }

    info!(
        "Merged {} of {} iterations ({} shards, {} rows, {} dropped rows) in {:.2}s.",
        reports.len(),
        iterations.len(),
        reports.iter().map(|r| r.num_shards).sum::<usize>(),
        reports.iter().map(|r| r.num_rows).sum::<usize>(),
        reports.iter().map(|r| r.num_dropped_rows).sum::<usize>(),
        start.elapsed().as_secs_f64()
    );

    if num_failed > 0 {
        return Err(anyhow!(
            "Failed to merge {} of {} iterations, see the errors above",
            num_failed,
            iterations.len()
        ));
    }

    Ok(())
}

pub(crate) mod arguments {
    use super::{DiscoveryArgs, MergeSubcommandArgs};
    use anyhow::Context;
    use log::info;
    use plicmerge_lib::{DiscoveryMode, IterationRange, MalformedRowPolicy, Parameters};
    use std::convert::TryFrom;

    /// Iteration selection converted from the command line
    pub struct DiscoveryRunnerArgs {
        pub mode: DiscoveryMode,
        pub range: IterationRange,
    }

    /// All arguments that can be supplied to the `merge` subcommand converted to useful types
    pub struct MergeRunnerArgs {
        /// Parameters passed directly to the assembly of each iteration
        pub parameters: Parameters,
        pub discovery: DiscoveryRunnerArgs,
        pub parallelize_over_iterations: bool,
    }

    impl TryFrom<&DiscoveryArgs> for DiscoveryRunnerArgs {
        type Error = anyhow::Error;

        fn try_from(args: &DiscoveryArgs) -> Result<Self, Self::Error> {
            let range = IterationRange::try_new(args.start_index, args.end_index)
                .context("Start index has to be less than or equal to the end index")?;
            Ok(Self {
                mode: args.discovery.into(),
                range,
            })
        }
    }

    // Convert raw command line arguments to more useful types
    impl TryFrom<&MergeSubcommandArgs> for MergeRunnerArgs {
        type Error = anyhow::Error;

        fn try_from(args: &MergeSubcommandArgs) -> Result<Self, Self::Error> {
            let discovery = DiscoveryRunnerArgs::try_from(&args.discovery)?;

            let malformed_rows = if args.strict.into_bool() {
                MalformedRowPolicy::Fail
            } else {
                MalformedRowPolicy::Drop
            };

            let parameters = Parameters {
                dimension: args.dim.into(),
                malformed_rows,
                output_format: args.format.into(),
                enable_compression: args.compress.into_bool(),
                enable_multi_threading: args.mt_shards.into_bool(),
            };

            // Optionally initialize thread pool
            if let Some(num_threads) = args.num_threads {
                plicmerge_lib::initialize_thread_pool(num_threads)?;
            }

            info!(
                "Merging {} shards, malformed rows: {:?}, output format: {:?}",
                parameters.dimension, parameters.malformed_rows, parameters.output_format
            );

            Ok(Self {
                parameters,
                discovery,
                parallelize_over_iterations: args.mt_iterations.into_bool(),
            })
        }
    }
}
