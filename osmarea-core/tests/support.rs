//! Entity builders shared by the integration tests.

use std::cell::RefCell;

use osmarea_core::{
    Area, AssemblerConfig, Entity, HandlerTable, Location, Member, Mode, Node, PassReport,
    Pipeline, PipelineConfig, PipelineError, Relation, Way, collect_tags,
};

/// Node at a `(lat, lon)` pair given in raw fixed-point units.
pub fn node_at(id: i64, lat: i32, lon: i32) -> Entity {
    Node::new(id, Location::new(lon, lat)).into()
}

/// Nodes for a list of `(id, lat, lon)` triples.
pub fn nodes(points: &[(i64, i32, i32)]) -> Vec<Entity> {
    points
        .iter()
        .map(|(id, lat, lon)| node_at(*id, *lat, *lon))
        .collect()
}

/// Untagged way over `refs`.
pub fn way(id: i64, refs: &[i64]) -> Entity {
    Way::new(id, refs.iter().copied()).into()
}

/// Way carrying the given tags.
pub fn tagged_way(id: i64, refs: &[i64], tags: &[(&str, &str)]) -> Entity {
    Way::new(id, refs.iter().copied())
        .with_tags(collect_tags(tags.iter().copied()))
        .into()
}

/// Multipolygon relation over `(way id, role)` members.
pub fn multipolygon(id: i64, members: &[(i64, &str)]) -> Entity {
    let members = members
        .iter()
        .map(|(way, role)| Member::way(*way, *role))
        .collect();
    Relation::new(id, members)
        .with_tags(collect_tags([("type", "multipolygon"), ("natural", "water")]))
        .into()
}

/// Run an area pass over `entities` and collect what reaches the `area` slot.
pub fn collect_areas(
    entities: Vec<Entity>,
    config: AssemblerConfig,
) -> Result<(Vec<Area>, PassReport), PipelineError> {
    let source = osmarea_core::MemorySource::new(entities);
    let areas = RefCell::new(Vec::new());
    let mut table = HandlerTable::new().on_area(|area| {
        areas.borrow_mut().push(area.clone());
        Ok(())
    });
    let pipeline = Pipeline::new(
        Mode::WithAreas,
        PipelineConfig {
            assembler: config,
            ..PipelineConfig::default()
        },
    );
    let report = pipeline.run(&source, &mut table)?;
    drop(table);
    Ok((areas.into_inner(), report))
}
