//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use osmarea_cli::CliError;

fn main() -> eyre::Result<()> {
    match osmarea_cli::run() {
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        outcome => outcome.map_err(eyre::Report::from),
    }
}
