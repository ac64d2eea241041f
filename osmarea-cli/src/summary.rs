//! `summary` command: entity counts and bounding box of an extract.

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use osmarea_data::{OsmSummary, PbfSource, summarise};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::{ARG_SUMMARY_INPUT, CliError, ENV_SUMMARY_INPUT, fs::require_existing};

/// CLI arguments for the `summary` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Read a PBF extract once without resolving locations and \
                 print the number of nodes, ways, relations and data blocks \
                 together with the bounding box of all valid node locations.",
    about = "Measure an OSM extract"
)]
#[ortho_config(prefix = "OSMAREA")]
pub(crate) struct SummaryArgs {
    /// Path to the OpenStreetMap PBF file.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
}

impl SummaryArgs {
    pub(crate) fn into_config(self) -> Result<SummaryConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SummaryConfig::try_from(merged)
    }
}

/// Resolved `summary` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SummaryConfig {
    pub(crate) input: Utf8PathBuf,
}

impl TryFrom<SummaryArgs> for SummaryConfig {
    type Error = CliError;

    fn try_from(args: SummaryArgs) -> Result<Self, Self::Error> {
        let input = args.input.ok_or(CliError::MissingArgument {
            field: ARG_SUMMARY_INPUT,
            env: ENV_SUMMARY_INPUT,
        })?;
        Ok(Self { input })
    }
}

pub(crate) fn run_summary_with(args: SummaryArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    require_existing(&config.input, ARG_SUMMARY_INPUT)?;
    let summary = summarise(&PbfSource::new(config.input.as_std_path()))?;
    info!(
        "{}: {} nodes, {} ways, {} relations in {} blocks",
        config.input, summary.nodes, summary.ways, summary.relations, summary.blocks
    );
    write_summary(writer, &summary)
}

fn write_summary(writer: &mut dyn Write, summary: &OsmSummary) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(summary).map_err(CliError::Serialise)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<SummaryConfig, CliError> {
    let merged = SummaryArgs::merge_from_layers(layers).map_err(CliError::from)?;
    SummaryConfig::try_from(merged)
}
