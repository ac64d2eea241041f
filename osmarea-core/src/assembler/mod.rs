//! Multipolygon and closed-way area assembly.
//!
//! Assembly is a two-pass process. [`scan_relations`] reads the relations of
//! a source and produces a [`RelationScan`]. [`AreaAssembler`] then consumes
//! the resolved ways of a second pass, buffering only the ways the scan
//! asked for, and emits an [`Area`] as soon as every member of a relation
//! has arrived. Relations still pending when the stream ends are assembled
//! from whatever arrived by [`AreaAssembler::finish`].

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};

use crate::ids::encode_area_id;
use crate::{Area, AreaId, AreaStatus, EntityKind, Location, Tags, Way};

mod config;
mod diagnostics;
mod rings;
mod scan;

pub use config::{
    AreaFilter, AssemblerConfig, DEFAULT_MAX_MEMBERS, DEFAULT_MAX_RELATION_DEPTH,
    DEFAULT_MIN_RING_POINTS, IncompletePolicy, Orientation,
};
pub use diagnostics::Diagnostic;
pub use scan::{RelationScan, ScannedRelation, scan_relations};

use rings::assemble_rings;

/// Counters accumulated by an [`AreaAssembler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssemblerStats {
    /// Areas built from closed ways.
    pub way_areas: usize,
    /// Areas built from relations.
    pub relation_areas: usize,
    /// Areas emitted with [`AreaStatus::Partial`].
    pub partial_areas: usize,
    /// Areas emitted with [`AreaStatus::Invalid`].
    pub invalid_areas: usize,
    /// Relations that produced no area.
    pub dropped_relations: usize,
    /// Largest number of ways buffered at once.
    pub peak_buffered_ways: usize,
}

#[derive(Debug)]
struct PendingRelation {
    id: i64,
    tags: Tags,
    ways: Vec<i64>,
    missing_relations: usize,
    remaining: usize,
    done: bool,
}

#[derive(Debug)]
struct BufferedWay {
    locations: Vec<Location>,
    degraded: bool,
    users: usize,
}

/// Builds areas from resolved ways and a completed [`RelationScan`].
///
/// Call [`way`](Self::way) for every way of the main pass, in stream order,
/// after node locations were resolved. Dropping the assembler without
/// calling [`finish`](Self::finish) discards pending relations.
#[derive(Debug)]
pub struct AreaAssembler {
    config: AssemblerConfig,
    relations: Vec<PendingRelation>,
    way_users: HashMap<i64, Vec<usize>>,
    wanted: HashSet<i64>,
    buffered: HashMap<i64, BufferedWay>,
    pending: usize,
    diagnostics: Vec<Diagnostic>,
    stats: AssemblerStats,
}

impl AreaAssembler {
    /// Prepare the second pass.
    ///
    /// Diagnostics raised by the scan are carried over.
    #[must_use]
    pub fn new(scan: RelationScan, config: AssemblerConfig) -> Self {
        let (scanned, wanted, diagnostics) = scan.into_parts();
        let mut relations = Vec::with_capacity(scanned.len());
        let mut way_users: HashMap<i64, Vec<usize>> = HashMap::new();
        for (slot, relation) in scanned.into_values().enumerate() {
            for way in relation.ways() {
                way_users.entry(*way).or_default().push(slot);
            }
            relations.push(PendingRelation {
                id: relation.id(),
                remaining: relation.ways().len(),
                missing_relations: relation.missing_relations(),
                ways: relation.ways().to_vec(),
                tags: relation.tags().clone(),
                done: false,
            });
        }
        Self {
            pending: relations.len(),
            config,
            relations,
            way_users,
            wanted,
            buffered: HashMap::new(),
            diagnostics,
            stats: AssemblerStats::default(),
        }
    }

    /// Feed one resolved way.
    ///
    /// Returns the area built from the way itself, if any, followed by the
    /// areas of relations this way completed, in relation id order.
    pub fn way(&mut self, way: &Way) -> Vec<Area> {
        let mut areas = Vec::new();
        if let Some(area) = self.promote_way(way) {
            areas.push(area);
        }

        let Some(users) = self.way_users.remove(&way.id) else {
            return areas;
        };
        self.buffered.insert(
            way.id,
            BufferedWay {
                locations: way.locations().collect(),
                degraded: way.is_degraded(),
                users: users.len(),
            },
        );
        self.stats.peak_buffered_ways = self.stats.peak_buffered_ways.max(self.buffered.len());

        for slot in users {
            let ready = self.relations.get_mut(slot).is_some_and(|relation| {
                relation.remaining = relation.remaining.saturating_sub(1);
                relation.remaining == 0 && !relation.done
            });
            if ready {
                areas.extend(self.complete(slot));
            }
        }
        areas
    }

    /// Assemble every relation still pending, using the members that
    /// arrived. Releases all buffered ways.
    pub fn finish(&mut self) -> Vec<Area> {
        if self.pending > 0 {
            info!("assembling {} incomplete relation(s) at end of stream", self.pending);
        }
        let mut areas = Vec::new();
        for slot in 0..self.relations.len() {
            let open = self.relations.get(slot).is_some_and(|relation| !relation.done);
            if open {
                areas.extend(self.complete(slot));
            }
        }
        self.way_users.clear();
        self.buffered.clear();
        areas
    }

    /// Problems recorded so far, including those of the relation scan.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Take the recorded diagnostics, leaving the list empty.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Counters accumulated so far.
    #[must_use]
    pub const fn stats(&self) -> AssemblerStats {
        self.stats
    }

    /// Relations still waiting for members.
    #[must_use]
    pub const fn pending_relations(&self) -> usize {
        self.pending
    }

    /// Ways currently held in the buffer.
    #[must_use]
    pub fn buffered_ways(&self) -> usize {
        self.buffered.len()
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    fn promote_way(&mut self, way: &Way) -> Option<Area> {
        let eligible = self.config.create_way_polygons
            && way.is_closed()
            && way.nodes.len() >= self.config.min_ring_points
            && !self.config.area_filter.denies(&way.tags)
            && !(way.tags.is_empty() && self.wanted.contains(&way.id));
        if !eligible {
            return None;
        }
        let id = encode_area_id(EntityKind::Way, way.id)?;

        let locations: Vec<Location> = way.locations().collect();
        let set = if way.ends_have_same_location() {
            assemble_rings(
                [locations.as_slice()],
                self.config.min_ring_points,
                self.config.orientation,
            )
        } else {
            rings::RingSet::default()
        };

        if set.rings.is_empty() {
            self.record(Diagnostic::InvalidWayRing { way: way.id });
            return self.empty_area(id, way.tags.clone());
        }
        let status = if way.is_degraded() {
            AreaStatus::Partial
        } else {
            AreaStatus::Complete
        };
        self.stats.way_areas += 1;
        Some(self.count(Area::new(id, way.tags.clone(), set.rings, status)))
    }

    fn complete(&mut self, slot: usize) -> Option<Area> {
        let relation = self.relations.get_mut(slot)?;
        relation.done = true;
        let id = relation.id;
        let ways = std::mem::take(&mut relation.ways);
        let mut tags = std::mem::take(&mut relation.tags);
        let missing_relations = relation.missing_relations;
        self.pending = self.pending.saturating_sub(1);

        if !self.config.keep_type_tag {
            tags.remove("type");
        }

        let mut missing = missing_relations;
        let mut degraded = 0;
        let mut segments: Vec<&[Location]> = Vec::with_capacity(ways.len());
        for way in &ways {
            match self.buffered.get(way) {
                Some(buffered) => {
                    degraded += usize::from(buffered.degraded);
                    segments.push(&buffered.locations);
                }
                None => missing += 1,
            }
        }
        let set = assemble_rings(
            segments,
            self.config.min_ring_points,
            self.config.orientation,
        );
        debug!(
            "relation {id}: {} ring(s), {} open chain(s)",
            set.rings.len(),
            set.open_chains
        );
        self.release(&ways);

        let area = self.relation_area(id, tags, set, missing, degraded);
        if area.is_none() {
            self.stats.dropped_relations += 1;
        }
        area
    }

    fn relation_area(
        &mut self,
        relation: i64,
        tags: Tags,
        set: rings::RingSet,
        missing_members: usize,
        degraded_members: usize,
    ) -> Option<Area> {
        let id = encode_area_id(EntityKind::Relation, relation)?;
        let incomplete = set.open_chains > 0 || missing_members > 0 || degraded_members > 0;
        if incomplete {
            self.record(Diagnostic::Incomplete {
                relation,
                open_chains: set.open_chains,
                missing_members,
                degraded_members,
            });
        }
        if set.rings.is_empty() {
            self.record(Diagnostic::NoClosedRings { relation });
            return self.empty_area(id, tags);
        }
        let status = if incomplete {
            if self.config.incomplete == IncompletePolicy::Drop {
                return self.empty_area(id, tags);
            }
            AreaStatus::Partial
        } else {
            AreaStatus::Complete
        };
        self.stats.relation_areas += 1;
        Some(self.count(Area::new(id, tags, set.rings, status)))
    }

    fn empty_area(&mut self, id: AreaId, tags: Tags) -> Option<Area> {
        if !self.config.create_empty_areas {
            return None;
        }
        Some(self.count(Area::new(id, tags, Vec::new(), AreaStatus::Invalid)))
    }

    fn count(&mut self, area: Area) -> Area {
        match area.status() {
            AreaStatus::Complete => {}
            AreaStatus::Partial => self.stats.partial_areas += 1,
            AreaStatus::Invalid => self.stats.invalid_areas += 1,
        }
        area
    }

    fn release(&mut self, ways: &[i64]) {
        for way in ways {
            let drained = self.buffered.get_mut(way).is_some_and(|buffered| {
                buffered.users = buffered.users.saturating_sub(1);
                buffered.users == 0
            });
            if drained {
                self.buffered.remove(way);
            }
        }
    }

    fn record(&mut self, diagnostic: Diagnostic) {
        warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }
}
