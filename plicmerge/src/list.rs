//! Implementation of the `list` subcommand of the plicmerge CLI.

use crate::merge::DiscoveryArgs;
use crate::merge::arguments::DiscoveryRunnerArgs;
use anyhow::Context;
use clap::value_parser;
use std::io::Write;
use std::path::PathBuf;

/// Command line arguments for the `list` subcommand
#[derive(Clone, Debug, clap::Parser)]
pub(crate) struct ListSubcommandArgs {
    /// Path to the directory containing the shard files ("points_<iteration>_n<process>.txt")
    #[arg(value_parser = value_parser!(PathBuf))]
    pub source_dir: PathBuf,
    #[command(flatten)]
    pub discovery: DiscoveryArgs,
}

/// Executes the `list` subcommand
pub(crate) fn list_subcommand(cmd_args: &ListSubcommandArgs) -> Result<(), anyhow::Error> {
    let discovery = DiscoveryRunnerArgs::try_from(&cmd_args.discovery)
        .context("Failed processing parameters from command line")?;

    let iterations =
        plicmerge_lib::discover_iterations(&cmd_args.source_dir, discovery.mode, discovery.range);

    let mut stdout = std::io::stdout().lock();
    for iteration in iterations {
        writeln!(stdout, "{}", iteration).context("Failed to write to stdout")?;
    }
    stdout.flush().context("Failed to write to stdout")?;

    Ok(())
}
