//! Behavioural tests for reading PBF files through the pipeline.

use osmarea_core::{
    Area, HandlerTable, Mode, Pipeline, PipelineConfig, PipelineError, SourceError, Stage,
};
use osmarea_data::{OsmSummary, PbfSource, summarise};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::{cell::RefCell, fs, path::PathBuf};
use tempfile::TempPath;

mod support;

use support::{assert_close, fixture_source};

/// The file under test; a decoded fixture stays alive with its source.
enum Target {
    Fixture(TempPath, PbfSource),
    Missing(PbfSource),
}

impl Target {
    const fn source(&self) -> &PbfSource {
        match self {
            Self::Fixture(_, source) | Self::Missing(source) => source,
        }
    }
}

type SummaryOutcome = Result<OsmSummary, PipelineError>;
type AreasOutcome = Result<Vec<Area>, PipelineError>;

#[fixture]
fn target() -> RefCell<Option<Target>> {
    RefCell::new(None)
}

#[fixture]
fn summary() -> RefCell<Option<SummaryOutcome>> {
    RefCell::new(None)
}

#[fixture]
fn areas() -> RefCell<Option<AreasOutcome>> {
    RefCell::new(None)
}

fn expect_summary(summary: &RefCell<Option<SummaryOutcome>>) -> OsmSummary {
    summary
        .borrow()
        .as_ref()
        .expect("summary was attempted")
        .as_ref()
        .expect("expected a successful summary")
        .clone()
}

fn expect_areas(areas: &RefCell<Option<AreasOutcome>>) -> Vec<Area> {
    areas
        .borrow()
        .as_ref()
        .expect("assembly was attempted")
        .as_ref()
        .expect("expected successful assembly")
        .clone()
}

fn source_error(summary: &RefCell<Option<SummaryOutcome>>) -> SourceError {
    let outcome = summary
        .borrow_mut()
        .take()
        .expect("summary was attempted");
    match outcome {
        Ok(found) => panic!("expected a source error, got {found:?}"),
        Err(PipelineError::Source { stage, source }) => {
            assert_eq!(stage, Stage::Dispatch);
            source
        }
        Err(other) => panic!("expected a source error, got {other:?}"),
    }
}

#[given("a PBF file with a lake, an island and a kiosk")]
fn given_lake(#[from(target)] target: &RefCell<Option<Target>>) {
    let (path, source) = fixture_source("lake");
    *target.borrow_mut() = Some(Target::Fixture(path, source));
}

#[given("a path to a missing PBF file")]
fn given_missing(#[from(target)] target: &RefCell<Option<Target>>) {
    let missing = support::fixtures_dir().join("missing.osm.pbf");
    *target.borrow_mut() = Some(Target::Missing(PbfSource::new(missing)));
}

#[given("a path to a file containing invalid PBF data")]
fn given_invalid(#[from(target)] target: &RefCell<Option<Target>>) {
    let (path, source) = fixture_source("invalid");
    *target.borrow_mut() = Some(Target::Fixture(path, source));
}

#[when("I summarise the file")]
fn when_summarise(
    #[from(target)] target: &RefCell<Option<Target>>,
    #[from(summary)] summary: &RefCell<Option<SummaryOutcome>>,
) {
    let outcome = {
        let guard = target.borrow();
        summarise(guard.as_ref().expect("target prepared").source())
    };
    *summary.borrow_mut() = Some(outcome);
}

#[when("I assemble areas from the file")]
fn when_assemble(
    #[from(target)] target: &RefCell<Option<Target>>,
    #[from(areas)] areas: &RefCell<Option<AreasOutcome>>,
) {
    let collected = RefCell::new(Vec::new());
    let outcome = {
        let guard = target.borrow();
        let source = guard.as_ref().expect("target prepared").source();
        let mut table = HandlerTable::new().on_area(|area| {
            collected.borrow_mut().push(area.clone());
            Ok(())
        });
        Pipeline::new(Mode::WithAreas, PipelineConfig::default()).run(source, &mut table)
    };
    *areas.borrow_mut() = Some(outcome.map(|_| collected.into_inner()));
}

#[then("the summary includes 11 nodes, 3 ways and 1 relation")]
fn then_counts(#[from(summary)] summary: &RefCell<Option<SummaryOutcome>>) {
    let found = expect_summary(summary);
    assert_eq!(found.nodes, 11, "expected eleven nodes");
    assert_eq!(found.ways, 3, "expected three ways");
    assert_eq!(found.relations, 1, "expected one relation");
    assert_eq!(found.blocks, 2, "expected two data blocks");
}

#[then("the summary bounding box spans the lake and the kiosk")]
fn then_bounds(#[from(summary)] summary: &RefCell<Option<SummaryOutcome>>) {
    let found = expect_summary(summary);
    let bounds = found.bounds.expect("sample data should produce a bounding box");
    assert_close(bounds.min().x, 13.40);
    assert_close(bounds.max().x, 13.43);
    assert_close(bounds.min().y, 52.50);
    assert_close(bounds.max().y, 52.53);
}

#[then("the lake and the kiosk building become areas")]
fn then_areas(#[from(areas)] areas: &RefCell<Option<AreasOutcome>>) {
    let found = expect_areas(areas);
    let ids: Vec<(i64, bool)> = found
        .iter()
        .map(|area| (area.original_id(), area.is_from_way()))
        .collect();
    assert_eq!(ids, vec![(1, false), (12, true)]);
    let building = found.get(1).expect("building area");
    assert_eq!(
        building.tags().get("building").map(String::as_str),
        Some("yes")
    );
}

#[then("the lake has one hole")]
fn then_hole(#[from(areas)] areas: &RefCell<Option<AreasOutcome>>) {
    let found = expect_areas(areas);
    let lake = found.first().expect("lake area");
    assert_eq!(lake.num_rings(), (1, 1));
    assert_eq!(lake.tags().get("name").map(String::as_str), Some("Testsee"));
    assert!(!lake.tags().contains_key("type"));
}

#[then("an open error is returned")]
fn then_open_error(#[from(summary)] summary: &RefCell<Option<SummaryOutcome>>) {
    match source_error(summary) {
        SourceError::Open { location, .. } => assert!(
            location.ends_with("missing.osm.pbf"),
            "unexpected location in error: {location}"
        ),
        other => panic!("expected an open error, got {other:?}"),
    }
}

#[then("a decode error is returned")]
fn then_decode_error(#[from(summary)] summary: &RefCell<Option<SummaryOutcome>>) {
    match source_error(summary) {
        SourceError::Decode {
            location, source, ..
        } => {
            assert!(location.contains(".osm.pbf"), "unexpected location: {location}");
            assert!(
                !source.to_string().is_empty(),
                "decode error should preserve the source message"
            );
        }
        other => panic!("expected a decode error, got {other:?}"),
    }
}

#[scenario(path = "tests/features/pbf_source.feature", index = 0)]
fn scenario_summary(
    target: RefCell<Option<Target>>,
    summary: RefCell<Option<SummaryOutcome>>,
    areas: RefCell<Option<AreasOutcome>>,
) {
    let _ = (target, summary, areas);
}

#[scenario(path = "tests/features/pbf_source.feature", index = 1)]
fn scenario_areas(
    target: RefCell<Option<Target>>,
    summary: RefCell<Option<SummaryOutcome>>,
    areas: RefCell<Option<AreasOutcome>>,
) {
    let _ = (target, summary, areas);
}

#[scenario(path = "tests/features/pbf_source.feature", index = 2)]
fn scenario_missing(
    target: RefCell<Option<Target>>,
    summary: RefCell<Option<SummaryOutcome>>,
    areas: RefCell<Option<AreasOutcome>>,
) {
    let _ = (target, summary, areas);
}

#[scenario(path = "tests/features/pbf_source.feature", index = 3)]
fn scenario_invalid(
    target: RefCell<Option<Target>>,
    summary: RefCell<Option<SummaryOutcome>>,
    areas: RefCell<Option<AreasOutcome>>,
) {
    let _ = (target, summary, areas);
}

#[test]
fn scenario_indices_follow_feature_order() {
    let feature = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/features/pbf_source.feature");
    let contents = fs::read_to_string(&feature)
        .unwrap_or_else(|err| panic!("failed to read feature file {feature:?}: {err}"));
    let titles: Vec<&str> = contents
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Scenario: "))
        .collect();
    assert_eq!(
        titles,
        [
            "summarising a known dataset",
            "assembling areas from a known dataset",
            "reporting a missing file",
            "rejecting a corrupted dataset",
        ]
    );
}
