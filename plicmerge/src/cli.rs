//! The `plicmerge` command line tool.
//!
//! Merges the per-process PLIC point dumps of a simulation into one table per iteration.
//! Discovery, parsing and serialization are provided by the [`plicmerge_lib`] crate.

use crate::{convert, list, logging, merge};
use anyhow::Context;
use clap::Parser;
use log::info;

static HELP_TEMPLATE: &str = "{before-help}{name} (v{version}) - {author-with-newline}{about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}";

#[derive(Clone, Debug, clap::Parser)]
#[command(
    name = "plicmerge",
    author,
    about = "Merges per-process PLIC facet point dumps into one table per simulation iteration",
    version,
    propagate_version = true,
    help_template = HELP_TEMPLATE,
)]
struct CommandlineArgs {
    /// Enable quiet mode (no output except for severe panic messages), overrides verbosity level
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
    /// Print more verbose output, use multiple "v"s for even more verbose output (-v, -vv)
    #[arg(short, action = clap::ArgAction::Count, global = true)]
    verbosity: u8,
    /// Subcommands
    #[command(subcommand)]
    subcommand: Subcommand,
}

#[derive(Clone, Debug, clap::Parser)]
enum Subcommand {
    /// Merge the shard files of all discovered iterations into one table per iteration
    #[command(help_template = HELP_TEMPLATE)]
    Merge(merge::MergeSubcommandArgs),
    /// Print the iterations found in a directory of shard files, one per line
    #[command(help_template = HELP_TEMPLATE)]
    List(list::ListSubcommandArgs),
    /// Convert iteration tables between the PTAB and JSON formats
    #[command(help_template = HELP_TEMPLATE)]
    Convert(convert::ConvertSubcommandArgs),
}

/// A simple on/off switch for command line arguments.
///
/// For example an argument defined as:
/// ```rust ignore
/// /// Enable gzip compression of the written tables
/// #[arg(
///     long,
///     default_value = "off",
///     value_name = "off|on",
///     ignore_case = true,
///     require_equals = true
/// )]
/// pub compress: Switch,
/// ```
/// can be used in the CLI as `--compress=on` or `--compress=off`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Switch {
    Off,
    On,
}

impl Switch {
    pub(crate) fn into_bool(self) -> bool {
        match self {
            Switch::Off => false,
            Switch::On => true,
        }
    }
}

/// Runs the plicmerge CLI with the provided command line arguments.
///
/// This function behaves like the binary `plicmerge` command line tool including output to stdout
/// and stderr. It will also exit the process depending on the command line arguments, so it should
/// not be used in typical library contexts.
/// Note that the first argument is always ignored - this is typically the binary name when called using
/// `std::env::args()` from the terminal:
/// ```
/// plicmerge::cli::run_plicmerge(["plicmerge", "--version"]);
/// ```
/// If no placeholder for the binary name is provided it will return an error (and print a help message):
/// ```should_panic
/// plicmerge::cli::run_plicmerge(["--version"]);
/// ```
pub fn run_plicmerge<I, T>(args: I) -> Result<(), anyhow::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    run_plicmerge_impl(args).inspect_err(logging::log_error)
}

fn run_plicmerge_impl<I, T>(args: I) -> Result<(), anyhow::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cmd_args = CommandlineArgs::parse_from(args);

    let verbosity = VerbosityLevel::from(cmd_args.verbosity);
    let is_quiet = cmd_args.quiet;

    logging::initialize_logging(verbosity, is_quiet).context("Failed to initialize logging")?;
    logging::log_program_info();

    let result = match &cmd_args.subcommand {
        Subcommand::Merge(cmd_args) => merge::merge_subcommand(cmd_args),
        Subcommand::List(cmd_args) => list::list_subcommand(cmd_args),
        Subcommand::Convert(cmd_args) => convert::convert_subcommand(cmd_args),
    };

    info!(
        "Finished at {}.",
        chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, false)
    );

    result
}

#[derive(Copy, Clone, Debug)]
pub(crate) enum VerbosityLevel {
    None,
    Verbose,
    VeryVerbose,
    VeryVeryVerbose,
}

impl From<u8> for VerbosityLevel {
    fn from(value: u8) -> Self {
        match value {
            0 => VerbosityLevel::None,
            1 => VerbosityLevel::Verbose,
            2 => VerbosityLevel::VeryVerbose,
            _ => VerbosityLevel::VeryVeryVerbose,
        }
    }
}

impl VerbosityLevel {
    /// Maps this verbosity level to a log filter
    pub fn into_filter(self) -> Option<log::LevelFilter> {
        match self {
            VerbosityLevel::None => None,
            VerbosityLevel::Verbose => Some(log::LevelFilter::Info),
            VerbosityLevel::VeryVerbose => Some(log::LevelFilter::Debug),
            VerbosityLevel::VeryVeryVerbose => Some(log::LevelFilter::Trace),
        }
    }
}

#[cfg(test)]
mod cli_args_tests {
    use super::*;
    use crate::merge::{DimensionArg, DiscoveryArg, FormatArg};
    use std::path::PathBuf;

    #[test]
    fn verify_main_cli() {
        use clap::CommandFactory;
        CommandlineArgs::command().debug_assert()
    }

    #[test]
    fn verify_merge_cli() {
        use clap::CommandFactory;
        crate::merge::MergeSubcommandArgs::command().debug_assert()
    }

    #[test]
    fn verify_list_cli() {
        use clap::CommandFactory;
        crate::list::ListSubcommandArgs::command().debug_assert()
    }

    #[test]
    fn verify_convert_cli() {
        use clap::CommandFactory;
        crate::convert::ConvertSubcommandArgs::command().debug_assert()
    }

    #[test]
    fn test_help() {
        for args in [
            vec!["plicmerge", "--help"],
            vec!["plicmerge", "merge", "--help"],
            vec!["plicmerge", "list", "--help"],
            vec!["plicmerge", "convert", "--help"],
        ] {
            assert_eq!(
                CommandlineArgs::try_parse_from(args)
                    .expect_err("this command is supposed to fail")
                    .kind(),
                clap::error::ErrorKind::DisplayHelp
            );
        }
    }

    #[test]
    fn test_merge_cli() {
        // Minimum arguments: source and output directory, everything else uses the defaults
        if let Subcommand::Merge(merge_args) =
            CommandlineArgs::try_parse_from(["plicmerge", "merge", "dumps", "--output-dir", "out"])
                .expect("this command is supposed to work")
                .subcommand
        {
            assert_eq!(merge_args.source_dir, PathBuf::from("dumps"));
            assert_eq!(merge_args.output_dir, PathBuf::from("out"));
            assert_eq!(merge_args.dim, DimensionArg::ThreeD);
            assert_eq!(merge_args.discovery.discovery, DiscoveryArg::FirstProcess);
            assert_eq!(merge_args.discovery.start_index, None);
            assert_eq!(merge_args.strict, Switch::Off);
            assert_eq!(merge_args.format, FormatArg::Ptab);
            assert_eq!(merge_args.compress, Switch::Off);
            assert_eq!(merge_args.mt_iterations, Switch::On);
            assert_eq!(merge_args.mt_shards, Switch::Off);
            assert_eq!(merge_args.num_threads, None);
        } else {
            panic!("expected the merge subcommand");
        }

        if let Subcommand::Merge(merge_args) = CommandlineArgs::try_parse_from([
            "plicmerge",
            "-vv",
            "merge",
            "dumps",
            "-o",
            "out",
            "--dim=2D",
            "-s",
            "10",
            "-e",
            "20",
            "--discovery=all-processes",
            "--strict=on",
            "--format=json",
            "--mt-iterations=off",
            "--mt-shards=on",
            "-n",
            "4",
        ])
        .expect("this command is supposed to work")
        .subcommand
        {
            assert_eq!(merge_args.dim, DimensionArg::TwoD);
            assert_eq!(merge_args.discovery.start_index, Some(10));
            assert_eq!(merge_args.discovery.end_index, Some(20));
            assert_eq!(merge_args.discovery.discovery, DiscoveryArg::AllProcesses);
            assert_eq!(merge_args.strict, Switch::On);
            assert_eq!(merge_args.format, FormatArg::Json);
            assert_eq!(merge_args.mt_iterations, Switch::Off);
            assert_eq!(merge_args.mt_shards, Switch::On);
            assert_eq!(merge_args.num_threads, Some(4));
        } else {
            panic!("expected the merge subcommand");
        }

        // Output directory is required
        assert_eq!(
            CommandlineArgs::try_parse_from(["plicmerge", "merge", "dumps"])
                .expect_err("this command is supposed to fail")
                .kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );

        // Switches require an equals sign
        assert!(
            CommandlineArgs::try_parse_from([
                "plicmerge",
                "merge",
                "dumps",
                "-o",
                "out",
                "--strict",
                "on",
            ])
            .is_err()
        );

        assert_eq!(
            CommandlineArgs::try_parse_from(["plicmerge", "merge", "dumps", "-o", "out", "--dim=4d"])
                .expect_err("this command is supposed to fail")
                .kind(),
            clap::error::ErrorKind::InvalidValue
        );
    }

    #[test]
    fn test_list_and_convert_cli() {
        if let Subcommand::List(list_args) =
            CommandlineArgs::try_parse_from(["plicmerge", "list", "dumps", "-e", "100"])
                .expect("this command is supposed to work")
                .subcommand
        {
            assert_eq!(list_args.source_dir, PathBuf::from("dumps"));
            assert_eq!(list_args.discovery.end_index, Some(100));
        } else {
            panic!("expected the list subcommand");
        }

        if let Subcommand::Convert(convert_args) = CommandlineArgs::try_parse_from([
            "plicmerge",
            "convert",
            "-i",
            "plic_000001.ptab",
            "-o",
            "plic_000001.json",
            "--overwrite",
        ])
        .expect("this command is supposed to work")
        .subcommand
        {
            assert_eq!(convert_args.input_file, PathBuf::from("plic_000001.ptab"));
            assert_eq!(convert_args.output_file, PathBuf::from("plic_000001.json"));
            assert!(convert_args.overwrite);
            assert_eq!(convert_args.compress, Switch::Off);
        } else {
            panic!("expected the convert subcommand");
        }
    }
}
