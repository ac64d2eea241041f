//! Unit tests for pass dispatch.

use super::*;
use crate::test_support::{Event, Recorder, canonical, multipolygon, square};
use crate::{Area, AreaStatus, DenseLocationIndex, EntityKind, Location, MemorySource, Node, Way};
use rstest::{fixture, rstest};

#[fixture]
fn lake() -> Vec<Entity> {
    let outer = square(10, 1, 0, 100);
    let inner = square(11, 5, 20, 80);
    let nodes = outer.nodes.into_iter().chain(inner.nodes).collect();
    canonical(
        nodes,
        vec![outer.way, inner.way],
        vec![multipolygon(1, &[10], &[11])],
    )
}

fn pipeline(mode: Mode) -> Pipeline {
    Pipeline::new(mode, PipelineConfig::default())
}

#[rstest]
fn plain_mode_leaves_ways_unresolved(lake: Vec<Entity>) -> Result<(), PipelineError> {
    let source = MemorySource::new(lake);
    let recorder = Recorder::default();
    let mut table = recorder.table();
    let report = pipeline(Mode::Plain).run(&source, &mut table)?;
    drop(table);

    assert_eq!(source.opens(), 1);
    assert_eq!((report.nodes, report.ways, report.relations), (8, 2, 1));
    assert_eq!(report.areas, 0);
    assert!(recorder.ways().iter().all(Way::is_degraded));
    Ok(())
}

#[rstest]
fn location_mode_resolves_without_assembling(lake: Vec<Entity>) -> Result<(), PipelineError> {
    let source = MemorySource::new(lake);
    let recorder = Recorder::default();
    let mut table = recorder.table();
    let report = pipeline(Mode::WithLocations).run(&source, &mut table)?;
    drop(table);

    assert_eq!(source.opens(), 1);
    assert_eq!(report.areas, 0);
    assert_eq!(report.resolver.nodes_indexed, 8);
    assert!(recorder.ways().iter().all(|way| !way.is_degraded()));
    Ok(())
}

#[rstest]
fn dispatches_areas_right_after_the_completing_way(
    lake: Vec<Entity>,
) -> Result<(), PipelineError> {
    let source = MemorySource::new(lake);
    let recorder = Recorder::default();
    let mut table = recorder.table();
    let report = pipeline(Mode::WithAreas).run(&source, &mut table)?;
    drop(table);

    assert_eq!(source.opens(), 2);
    let tail: Vec<_> = recorder
        .events_without_tags()
        .into_iter()
        .skip_while(|event| matches!(event, Event::Node(_)))
        .collect();
    assert_eq!(
        tail,
        vec![
            Event::Way {
                id: 10,
                resolved: 5
            },
            Event::Way {
                id: 11,
                resolved: 5
            },
            Event::Area(3),
            Event::OuterRing { area: 3, index: 0 },
            Event::InnerRing { area: 3, index: 1 },
            Event::Relation(1),
            Event::Flush,
            Event::Flush,
        ]
    );
    assert_eq!(report.areas, 1);
    assert_eq!(report.checkpoints, 2);
    Ok(())
}

#[rstest]
fn tag_lists_follow_their_entity(lake: Vec<Entity>) -> Result<(), PipelineError> {
    let source = MemorySource::new(lake);
    let recorder = Recorder::default();
    let mut table = recorder.table();
    pipeline(Mode::WithAreas).run(&source, &mut table)?;
    drop(table);

    let events = recorder.events();
    let area_at = events
        .iter()
        .position(|event| *event == Event::Area(3))
        .expect("area dispatched");
    assert_eq!(
        events.get(area_at + 1),
        Some(&Event::TagList(EntityRef::new(EntityKind::Area, 3)))
    );
    Ok(())
}

#[rstest]
fn area_mode_requires_an_area_slot(lake: Vec<Entity>) {
    let source = MemorySource::new(lake);
    let mut table = HandlerTable::new().on_node(|_| Ok(()));
    let err = pipeline(Mode::WithAreas)
        .run(&source, &mut table)
        .expect_err("area slot is required");
    assert!(matches!(err, PipelineError::UnboundSlot { slot: Slot::Area }));
    assert_eq!(source.opens(), 0);
}

#[rstest]
fn required_slots_are_checked_before_reading(lake: Vec<Entity>) {
    let source = MemorySource::new(lake);
    let config = PipelineConfig {
        required_slots: SlotSet::from_iter([Slot::Node, Slot::Flush]),
        ..PipelineConfig::default()
    };
    let mut table = HandlerTable::new().on_node(|_| Ok(()));
    let err = Pipeline::new(Mode::Plain, config)
        .run(&source, &mut table)
        .expect_err("flush slot is required");
    assert!(matches!(err, PipelineError::UnboundSlot { slot: Slot::Flush }));
}

#[rstest]
fn flushes_after_every_block_and_at_the_end(lake: Vec<Entity>) -> Result<(), PipelineError> {
    let source = MemorySource::with_block_size(lake, 4);
    let recorder = Recorder::default();
    let mut table = recorder.table();
    let report = pipeline(Mode::WithLocations).run(&source, &mut table)?;
    drop(table);

    let flushes = recorder
        .events()
        .iter()
        .filter(|event| **event == Event::Flush)
        .count();
    assert_eq!(flushes, 4);
    assert_eq!(report.checkpoints, 4);
    Ok(())
}

#[rstest]
fn decode_failures_abort_the_scan(lake: Vec<Entity>) {
    let source = MemorySource::new(lake).then_fail(None, "corrupt blob");
    let recorder = Recorder::default();
    let mut table = recorder.table();
    let err = pipeline(Mode::WithAreas)
        .run(&source, &mut table)
        .expect_err("decode failure is fatal");
    assert!(matches!(
        err,
        PipelineError::Source {
            stage: Stage::RelationScan,
            ..
        }
    ));
}

#[rstest]
fn decode_failures_abort_the_dispatch_pass(lake: Vec<Entity>) {
    let way = EntityRef::new(EntityKind::Way, 77);
    let source = MemorySource::new(lake).then_fail(Some(way), "truncated way");
    let recorder = Recorder::default();
    let mut table = recorder.table();
    let err = pipeline(Mode::WithLocations)
        .run(&source, &mut table)
        .expect_err("decode failure is fatal");
    match err {
        PipelineError::Source { stage, source } => {
            assert_eq!(stage, Stage::Dispatch);
            assert!(matches!(
                source,
                SourceError::Decode {
                    entity: Some(entity),
                    ..
                } if entity == way
            ));
        }
        other => panic!("expected a source error, got {other:?}"),
    }
}

#[rstest]
fn fail_fast_resolution_aborts_the_pass() {
    let source = MemorySource::new([Way::new(1, [404, 405]).into()]);
    let config = PipelineConfig {
        resolve: ResolvePolicy::FailFast,
        ..PipelineConfig::default()
    };
    let mut table = HandlerTable::new();
    let err = Pipeline::new(Mode::WithLocations, config)
        .run(&source, &mut table)
        .expect_err("missing node is fatal");
    assert!(matches!(
        err,
        PipelineError::Resolve(ResolveError::UnresolvedReference {
            way_id: 1,
            node_id: 404
        })
    ));
}

#[rstest]
fn nodes_beyond_a_dense_index_only_degrade_their_ways(
    lake: Vec<Entity>,
) -> Result<(), PipelineError> {
    let source = MemorySource::new(lake);
    let recorder = Recorder::default();
    let mut table = recorder.table();
    let report = pipeline(Mode::WithAreas).run_with_index(
        &source,
        DenseLocationIndex::with_capacity(5),
        &mut table,
    )?;
    drop(table);

    assert_eq!(report.resolver.nodes_skipped, 4);
    assert_eq!(report.resolver.ways_degraded, 1);
    let areas = recorder.areas();
    let statuses: Vec<_> = areas.iter().map(Area::status).collect();
    assert_eq!(statuses, vec![AreaStatus::Partial]);
    Ok(())
}

#[rstest]
fn handler_failures_abort_the_pass() {
    let source = MemorySource::new([Node::new(1, Location::new(0, 0)).into()]);
    let mut table = HandlerTable::new().on_node(|_| Err("sink closed".into()));
    let err = pipeline(Mode::Plain)
        .run(&source, &mut table)
        .expect_err("handler failure is fatal");
    assert!(matches!(err, PipelineError::Handler(HandlerError { slot: Slot::Node, .. })));
}

#[rstest]
fn cancelling_discards_pending_relations(lake: Vec<Entity>) -> Result<(), PipelineError> {
    let source = MemorySource::new(lake);
    let recorder = Recorder::default();
    let mut table = recorder.table();
    let mut pass = pipeline(Mode::WithAreas).start(
        &source,
        SparseLocationIndex::default(),
        &mut table,
    )?;
    while let Some(step) = pass.step()? {
        if matches!(step, Step::Entity { entity, .. } if entity.kind == EntityKind::Way) {
            break;
        }
    }
    let report = pass.cancel();
    drop(table);

    assert_eq!(report.ways, 1);
    assert_eq!(report.areas, 0);
    assert!(recorder.areas().is_empty());
    assert!(!recorder.events().contains(&Event::Flush));
    Ok(())
}

#[rstest]
fn finish_assembles_relations_missing_members() -> Result<(), PipelineError> {
    let outer = square(10, 1, 0, 100);
    let entities = canonical(
        outer.nodes,
        vec![outer.way],
        vec![multipolygon(1, &[10], &[11])],
    );
    let source = MemorySource::new(entities);
    let recorder = Recorder::default();
    let mut table = recorder.table();
    let report = pipeline(Mode::WithAreas).run(&source, &mut table)?;
    drop(table);

    let events = recorder.events_without_tags();
    let tail: Vec<_> = events.iter().rev().take(4).rev().cloned().collect();
    assert_eq!(
        tail,
        vec![
            Event::Flush,
            Event::Area(3),
            Event::OuterRing { area: 3, index: 0 },
            Event::Flush,
        ]
    );
    assert_eq!(report.assembler.partial_areas, 1);
    assert!(matches!(
        report.diagnostics.as_slice(),
        [Diagnostic::Incomplete {
            relation: 1,
            missing_members: 1,
            ..
        }]
    ));
    Ok(())
}

#[rstest]
fn replays_produce_identical_areas(lake: Vec<Entity>) -> Result<(), PipelineError> {
    let source = MemorySource::with_block_size(lake, 3);
    let mut runs = Vec::new();
    for _ in 0..2 {
        let recorder = Recorder::default();
        let mut table = recorder.table();
        pipeline(Mode::WithAreas).run(&source, &mut table)?;
        drop(table);
        runs.push((recorder.events(), recorder.areas()));
    }
    let (first, second) = (runs.first(), runs.get(1));
    assert!(first.is_some());
    assert_eq!(first, second);
    Ok(())
}

#[rstest]
fn accepts_a_scan_built_on_another_thread(lake: Vec<Entity>) -> Result<(), PipelineError> {
    let scan_source = MemorySource::new(lake.clone());
    let config = PipelineConfig::default();
    let assembler = config.assembler.clone();
    let scan = std::thread::spawn(move || crate::scan_relations(&scan_source, &assembler))
        .join()
        .expect("scan thread completes")
        .expect("scan succeeds");

    let source = MemorySource::new(lake);
    let recorder = Recorder::default();
    let mut table = recorder.table();
    let report = Pipeline::new(Mode::WithAreas, config)
        .start_with_scan(&source, SparseLocationIndex::default(), &mut table, scan)?
        .finish()?;
    drop(table);

    assert_eq!(source.opens(), 1);
    assert_eq!(report.areas, 1);
    Ok(())
}
