//! `areas` command: assemble polygons and print them as JSON lines.

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use log::{Level, log};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use osmarea_core::{
    Area, AreaStatus, AssemblerConfig, BoxError, DenseLocationIndex, HandlerTable,
    IncompletePolicy, LocationIndex, Mode, Orientation, PassReport, Pipeline, PipelineConfig,
    ResolvePolicy, Ring, SparseLocationIndex, Tags,
};
use osmarea_data::PbfSource;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::{
    ARG_AREAS_DENSE_CAPACITY, ARG_AREAS_EMPTY_AREAS, ARG_AREAS_FAIL_FAST, ARG_AREAS_INCOMPLETE,
    ARG_AREAS_INDEX, ARG_AREAS_INDEX_PATH, ARG_AREAS_INPUT, ARG_AREAS_KEEP_TYPE_TAG,
    ARG_AREAS_MAX_MEMBERS, ARG_AREAS_MAX_RELATION_DEPTH, ARG_AREAS_MIN_RING_POINTS,
    ARG_AREAS_ORIENTATION, ARG_AREAS_WAY_POLYGONS, CliError, ENV_AREAS_DENSE_CAPACITY,
    ENV_AREAS_INPUT, fs::require_existing,
};

/// Location index backend selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum IndexKind {
    /// Hash map keyed by node id.
    #[default]
    Sparse,
    /// Flat array addressed by node id; needs `--dense-capacity`.
    Dense,
    /// SQLite database on disk.
    Sqlite,
}

/// Winding of outer rings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum OuterWinding {
    /// Outer rings counter-clockwise, holes clockwise.
    #[default]
    CounterClockwise,
    /// Outer rings clockwise, holes counter-clockwise.
    Clockwise,
}

impl From<OuterWinding> for Orientation {
    fn from(value: OuterWinding) -> Self {
        match value {
            OuterWinding::CounterClockwise => Self::CounterClockwiseOuter,
            OuterWinding::Clockwise => Self::ClockwiseOuter,
        }
    }
}

/// What to do with relations whose rings cannot all be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum Incomplete {
    /// Emit the closable rings as a partial area.
    #[default]
    Partial,
    /// Emit nothing.
    Drop,
}

impl From<Incomplete> for IncompletePolicy {
    fn from(value: Incomplete) -> Self {
        match value {
            Incomplete::Partial => Self::EmitPartial,
            Incomplete::Drop => Self::Drop,
        }
    }
}

/// CLI arguments for the `areas` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Read a PBF extract twice, resolving way node locations and \
                 assembling multipolygon relations and closed ways into \
                 areas. Each area is printed as one JSON object per line with \
                 its id, status, tags and lon/lat multipolygon coordinates.",
    about = "Assemble areas from an OSM extract"
)]
#[ortho_config(prefix = "OSMAREA")]
pub(crate) struct AreasArgs {
    /// Path to the OpenStreetMap PBF file.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
    /// Node location index backend.
    #[arg(long = ARG_AREAS_INDEX, value_enum, value_name = "kind")]
    #[serde(default)]
    pub(crate) index: Option<IndexKind>,
    /// Database path for the `sqlite` index; a temporary file when omitted.
    #[arg(long = ARG_AREAS_INDEX_PATH, value_name = "path")]
    #[serde(default)]
    pub(crate) index_path: Option<Utf8PathBuf>,
    /// One more than the largest node id, for the `dense` index.
    #[arg(long = ARG_AREAS_DENSE_CAPACITY, value_name = "count")]
    #[serde(default)]
    pub(crate) dense_capacity: Option<usize>,
    /// Minimum locations in a ring, counting the closing location.
    #[arg(long = ARG_AREAS_MIN_RING_POINTS, value_name = "count")]
    #[serde(default)]
    pub(crate) min_ring_points: Option<usize>,
    /// Skip relations with more member ways than this.
    #[arg(long = ARG_AREAS_MAX_MEMBERS, value_name = "count")]
    #[serde(default)]
    pub(crate) max_members: Option<usize>,
    /// Deepest sub-relation nesting to expand.
    #[arg(long = ARG_AREAS_MAX_RELATION_DEPTH, value_name = "depth")]
    #[serde(default)]
    pub(crate) max_relation_depth: Option<usize>,
    /// Winding of outer rings.
    #[arg(long = ARG_AREAS_ORIENTATION, value_enum, value_name = "winding")]
    #[serde(default)]
    pub(crate) orientation: Option<OuterWinding>,
    /// Handling of relations with open rings or missing members.
    #[arg(long = ARG_AREAS_INCOMPLETE, value_enum, value_name = "policy")]
    #[serde(default)]
    pub(crate) incomplete: Option<Incomplete>,
    /// Promote closed ways to areas.
    #[arg(
        long = ARG_AREAS_WAY_POLYGONS,
        value_name = "bool",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    #[serde(default)]
    pub(crate) way_polygons: Option<bool>,
    /// Emit invalid areas for relations that produce no ring.
    #[arg(
        long = ARG_AREAS_EMPTY_AREAS,
        value_name = "bool",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    #[serde(default)]
    pub(crate) empty_areas: Option<bool>,
    /// Keep the relation `type` tag on relation areas.
    #[arg(
        long = ARG_AREAS_KEEP_TYPE_TAG,
        value_name = "bool",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    #[serde(default)]
    pub(crate) keep_type_tag: Option<bool>,
    /// Abort on the first way node without a location.
    #[arg(
        long = ARG_AREAS_FAIL_FAST,
        value_name = "bool",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    #[serde(default)]
    pub(crate) fail_fast: Option<bool>,
}

impl AreasArgs {
    pub(crate) fn into_config(self) -> Result<AreasConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        AreasConfig::try_from(merged)
    }
}

/// Resolved index backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum IndexConfig {
    Sparse,
    Dense { capacity: usize },
    Sqlite { path: Option<Utf8PathBuf> },
}

/// Resolved `areas` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AreasConfig {
    pub(crate) input: Utf8PathBuf,
    pub(crate) index: IndexConfig,
    pub(crate) pipeline: PipelineConfig,
}

impl TryFrom<AreasArgs> for AreasConfig {
    type Error = CliError;

    fn try_from(args: AreasArgs) -> Result<Self, Self::Error> {
        let input = args.input.ok_or(CliError::MissingArgument {
            field: ARG_AREAS_INPUT,
            env: ENV_AREAS_INPUT,
        })?;
        let index = index_config(
            args.index.unwrap_or_default(),
            args.index_path,
            args.dense_capacity,
        )?;

        let defaults = AssemblerConfig::default();
        let assembler = AssemblerConfig {
            min_ring_points: args.min_ring_points.unwrap_or(defaults.min_ring_points),
            max_members: args.max_members.unwrap_or(defaults.max_members),
            max_relation_depth: args
                .max_relation_depth
                .unwrap_or(defaults.max_relation_depth),
            orientation: args.orientation.unwrap_or_default().into(),
            incomplete: args.incomplete.unwrap_or_default().into(),
            create_way_polygons: args.way_polygons.unwrap_or(defaults.create_way_polygons),
            create_empty_areas: args.empty_areas.unwrap_or(defaults.create_empty_areas),
            keep_type_tag: args.keep_type_tag.unwrap_or(defaults.keep_type_tag),
            ..defaults
        };
        let resolve = if args.fail_fast.unwrap_or(false) {
            ResolvePolicy::FailFast
        } else {
            ResolvePolicy::IgnoreMissing
        };

        Ok(Self {
            input,
            index,
            pipeline: PipelineConfig {
                resolve,
                assembler,
                ..PipelineConfig::default()
            },
        })
    }
}

fn index_config(
    kind: IndexKind,
    index_path: Option<Utf8PathBuf>,
    dense_capacity: Option<usize>,
) -> Result<IndexConfig, CliError> {
    if kind != IndexKind::Sqlite && index_path.is_some() {
        return Err(CliError::UnusedOption {
            field: ARG_AREAS_INDEX_PATH,
            index: "sqlite",
        });
    }
    if kind != IndexKind::Dense && dense_capacity.is_some() {
        return Err(CliError::UnusedOption {
            field: ARG_AREAS_DENSE_CAPACITY,
            index: "dense",
        });
    }
    match kind {
        IndexKind::Sparse => Ok(IndexConfig::Sparse),
        IndexKind::Dense => {
            let capacity = dense_capacity.ok_or(CliError::MissingArgument {
                field: ARG_AREAS_DENSE_CAPACITY,
                env: ENV_AREAS_DENSE_CAPACITY,
            })?;
            Ok(IndexConfig::Dense { capacity })
        }
        IndexKind::Sqlite => Ok(IndexConfig::Sqlite { path: index_path }),
    }
}

/// One line of `areas` output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AreaRecord {
    pub(crate) id: i64,
    pub(crate) original_id: i64,
    pub(crate) from_way: bool,
    pub(crate) status: AreaStatus,
    pub(crate) tags: Tags,
    /// GeoJSON-style multipolygon: polygons of rings of `[lon, lat]`.
    pub(crate) coordinates: Vec<Vec<Vec<[f64; 2]>>>,
}

impl From<&Area> for AreaRecord {
    fn from(area: &Area) -> Self {
        let ring_coordinates = |ring: &Ring| -> Vec<[f64; 2]> {
            ring.to_line_string()
                .coords()
                .map(|coord| [coord.x, coord.y])
                .collect()
        };
        let coordinates = area
            .outer_rings()
            .map(|outer| {
                std::iter::once(ring_coordinates(outer))
                    .chain(area.inner_rings(outer).map(ring_coordinates))
                    .collect()
            })
            .collect();
        Self {
            id: area.id().get(),
            original_id: area.original_id(),
            from_way: area.is_from_way(),
            status: area.status(),
            tags: area.tags().clone(),
            coordinates,
        }
    }
}

fn write_area(writer: &mut dyn Write, area: &Area) -> Result<(), BoxError> {
    serde_json::to_writer(&mut *writer, &AreaRecord::from(area))?;
    writer.write_all(b"\n")?;
    Ok(())
}

fn assemble<I: LocationIndex>(
    pipeline: &Pipeline,
    source: &PbfSource,
    index: I,
    writer: &mut dyn Write,
) -> Result<PassReport, CliError> {
    let mut table = HandlerTable::new().on_area(|area| write_area(&mut *writer, area));
    Ok(pipeline.run_with_index(source, index, &mut table)?)
}

#[cfg(feature = "store-sqlite")]
fn assemble_sqlite(
    pipeline: &Pipeline,
    source: &PbfSource,
    path: Option<&camino::Utf8Path>,
    writer: &mut dyn Write,
) -> Result<PassReport, CliError> {
    let index = match path {
        Some(database) => osmarea_data::SqliteLocationIndex::open(database)?,
        None => osmarea_data::SqliteLocationIndex::temporary()?,
    };
    log::info!("spilling node locations to {}", index.path());
    assemble(pipeline, source, index, writer)
}

#[cfg(not(feature = "store-sqlite"))]
fn assemble_sqlite(
    _pipeline: &Pipeline,
    _source: &PbfSource,
    _path: Option<&camino::Utf8Path>,
    _writer: &mut dyn Write,
) -> Result<PassReport, CliError> {
    Err(CliError::MissingFeature {
        feature: "store-sqlite",
        action: "the sqlite location index",
    })
}

pub(crate) fn run_areas_with(args: AreasArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    require_existing(&config.input, ARG_AREAS_INPUT)?;
    let source = PbfSource::new(config.input.as_std_path());
    let pipeline = Pipeline::new(Mode::WithAreas, config.pipeline);
    let report = match config.index {
        IndexConfig::Sparse => assemble(&pipeline, &source, SparseLocationIndex::default(), writer)?,
        IndexConfig::Dense { capacity } => assemble(
            &pipeline,
            &source,
            DenseLocationIndex::with_capacity(capacity),
            writer,
        )?,
        IndexConfig::Sqlite { path } => assemble_sqlite(&pipeline, &source, path.as_deref(), writer)?,
    };
    writer.flush().map_err(CliError::WriteOutput)?;
    log_report(&config.input, &report);
    Ok(())
}

/// Summary lines for a finished pass.
///
/// Individual diagnostics are logged by the stage that records them.
pub(crate) fn report_messages(input: &camino::Utf8Path, report: &PassReport) -> Vec<(Level, String)> {
    let mut messages = vec![(
        Level::Info,
        format!(
            "{input}: {} areas ({} from ways, {} from relations, {} partial), {} relations dropped, {} diagnostics",
            report.areas,
            report.assembler.way_areas,
            report.assembler.relation_areas,
            report.assembler.partial_areas,
            report.assembler.dropped_relations,
            report.diagnostics.len()
        ),
    )];
    if report.resolver.ways_degraded > 0 {
        messages.push((
            Level::Warn,
            format!(
                "{input}: {} ways had {} node references without a location",
                report.resolver.ways_degraded, report.resolver.refs_unresolved
            ),
        ));
    }
    messages
}

fn log_report(input: &camino::Utf8Path, report: &PassReport) {
    for (level, message) in report_messages(input, report) {
        log!(level, "{message}");
    }
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<AreasConfig, CliError> {
    let merged = AreasArgs::merge_from_layers(layers).map_err(CliError::from)?;
    AreasConfig::try_from(merged)
}
