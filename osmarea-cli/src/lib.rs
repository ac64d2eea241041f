//! Command-line interface for assembling areas from OpenStreetMap extracts.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use std::io::Write;

mod areas;
mod error;
mod fs;
mod summary;

use areas::{AreasArgs, run_areas_with};
pub use error::CliError;
use summary::{SummaryArgs, run_summary_with};

const ARG_AREAS_INPUT: &str = "input";
const ARG_AREAS_INDEX: &str = "index";
const ARG_AREAS_INDEX_PATH: &str = "index-path";
const ARG_AREAS_DENSE_CAPACITY: &str = "dense-capacity";
const ARG_AREAS_MIN_RING_POINTS: &str = "min-ring-points";
const ARG_AREAS_MAX_MEMBERS: &str = "max-members";
const ARG_AREAS_MAX_RELATION_DEPTH: &str = "max-relation-depth";
const ARG_AREAS_ORIENTATION: &str = "orientation";
const ARG_AREAS_INCOMPLETE: &str = "incomplete";
const ARG_AREAS_WAY_POLYGONS: &str = "way-polygons";
const ARG_AREAS_EMPTY_AREAS: &str = "empty-areas";
const ARG_AREAS_KEEP_TYPE_TAG: &str = "keep-type-tag";
const ARG_AREAS_FAIL_FAST: &str = "fail-fast";
const ARG_SUMMARY_INPUT: &str = "input";
const ENV_AREAS_INPUT: &str = "OSMAREA_CMDS_AREAS_INPUT";
const ENV_AREAS_DENSE_CAPACITY: &str = "OSMAREA_CMDS_AREAS_DENSE_CAPACITY";
const ENV_SUMMARY_INPUT: &str = "OSMAREA_CMDS_SUMMARY_INPUT";

/// Run the `osmarea` CLI with the current process arguments and environment,
/// writing command output to standard output.
///
/// # Errors
/// Returns a [`CliError`] when arguments or configuration are invalid, the
/// input cannot be read, or output cannot be written.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    run_with(cli.command, &mut stdout)
}

fn run_with(command: Command, writer: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Areas(args) => run_areas_with(args, writer),
        Command::Summary(args) => run_summary_with(args, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "osmarea",
    about = "Assemble polygon areas from OpenStreetMap PBF extracts",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Assemble areas and print one JSON record per area.
    Areas(AreasArgs),
    /// Count entities and measure the bounding box of an extract.
    Summary(SummaryArgs),
}

#[cfg(test)]
mod tests;
