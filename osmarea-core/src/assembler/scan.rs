//! Relation membership scan (the first of two passes).
//!
//! The scan reads every relation of a source, keeps the area-eligible ones
//! and works out which ways the second pass must buffer. Sub-relations are
//! expanded into their ways so a relation is assembled from a flat list of
//! way ids.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{info, warn};

use super::{AssemblerConfig, Diagnostic};
use crate::{Entity, EntitySource, MemberKind, Relation, SourceError, SourceEvent, Tags};

/// An area-eligible relation with its expanded way membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedRelation {
    id: i64,
    tags: Tags,
    ways: Vec<i64>,
    missing_relations: usize,
}

impl ScannedRelation {
    /// Relation id.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    /// Relation tags.
    #[must_use]
    pub const fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Distinct member way ids in first-seen order, including the ways of
    /// expanded sub-relations.
    #[must_use]
    pub fn ways(&self) -> &[i64] {
        &self.ways
    }

    /// Sub-relations referenced but not present in the source.
    #[must_use]
    pub const fn missing_relations(&self) -> usize {
        self.missing_relations
    }
}

/// Result of the relation scan.
///
/// Owned and `Send`, so it can be built on another thread and handed to the
/// main pass once complete.
#[derive(Debug, Clone, Default)]
pub struct RelationScan {
    relations: BTreeMap<i64, ScannedRelation>,
    wanted: HashSet<i64>,
    diagnostics: Vec<Diagnostic>,
}

impl RelationScan {
    /// Build a scan from already decoded relations.
    ///
    /// # Examples
    /// ```
    /// use osmarea_core::{AssemblerConfig, Member, Relation, RelationScan, collect_tags};
    ///
    /// let relation = Relation::new(1, vec![Member::way(10, "outer")])
    ///     .with_tags(collect_tags([("type", "multipolygon")]));
    /// let scan = RelationScan::from_relations([relation], &AssemblerConfig::default());
    /// assert!(scan.is_wanted(10));
    /// assert_eq!(scan.len(), 1);
    /// ```
    pub fn from_relations<I>(relations: I, config: &AssemblerConfig) -> Self
    where
        I: IntoIterator<Item = Relation>,
    {
        let mut builder = ScanBuilder::default();
        for relation in relations {
            builder.add(relation, config);
        }
        builder.build(config)
    }

    /// Eligible relations in id order.
    pub fn relations(&self) -> impl Iterator<Item = &ScannedRelation> + '_ {
        self.relations.values()
    }

    /// Look up an eligible relation.
    #[must_use]
    pub fn relation(&self, id: i64) -> Option<&ScannedRelation> {
        self.relations.get(&id)
    }

    /// Ids of every way an eligible relation needs.
    #[must_use]
    pub const fn wanted(&self) -> &HashSet<i64> {
        &self.wanted
    }

    /// Does any eligible relation need this way?
    #[must_use]
    pub fn is_wanted(&self, way_id: i64) -> bool {
        self.wanted.contains(&way_id)
    }

    /// Problems found while scanning.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Number of eligible relations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Were no eligible relations found?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub(crate) fn into_parts(
        self,
    ) -> (BTreeMap<i64, ScannedRelation>, HashSet<i64>, Vec<Diagnostic>) {
        (self.relations, self.wanted, self.diagnostics)
    }
}

/// Run the relation scan over a fresh opening of `source`.
///
/// Nodes and ways are skipped; only relations are read.
///
/// # Errors
/// Propagates any [`SourceError`] raised while reading.
pub fn scan_relations<S>(source: &S, config: &AssemblerConfig) -> Result<RelationScan, SourceError>
where
    S: EntitySource + ?Sized,
{
    let mut builder = ScanBuilder::default();
    for event in source.open()? {
        if let SourceEvent::Entity(Entity::Relation(relation)) = event? {
            builder.add(relation, config);
        }
    }
    let scan = builder.build(config);
    info!(
        "relation scan found {} area relation(s) needing {} way(s)",
        scan.len(),
        scan.wanted.len()
    );
    Ok(scan)
}

#[derive(Debug, Default)]
struct Members {
    ways: Vec<i64>,
    relations: Vec<i64>,
}

/// Collects membership for every relation and tags for eligible ones.
///
/// Membership of ineligible relations is kept because they may be
/// sub-relations of eligible ones.
#[derive(Debug, Default)]
struct ScanBuilder {
    members: HashMap<i64, Members>,
    eligible: BTreeMap<i64, Tags>,
}

/// Working state for one relation's expansion.
struct Expansion {
    ways: Vec<i64>,
    seen_ways: HashSet<i64>,
    visited: HashSet<i64>,
    missing_relations: usize,
}

impl ScanBuilder {
    fn add(&mut self, relation: Relation, config: &AssemblerConfig) {
        let members = Members {
            ways: relation.member_ids(MemberKind::Way).collect(),
            relations: relation.member_ids(MemberKind::Relation).collect(),
        };
        if config.area_filter.accepts_relation(&relation.tags) {
            self.eligible.insert(relation.id, relation.tags);
        }
        self.members.insert(relation.id, members);
    }

    fn build(self, config: &AssemblerConfig) -> RelationScan {
        let mut scan = RelationScan::default();
        for (id, tags) in &self.eligible {
            let mut expansion = Expansion {
                ways: Vec::new(),
                seen_ways: HashSet::new(),
                visited: HashSet::new(),
                missing_relations: 0,
            };
            if !self.expand(*id, 0, config.max_relation_depth, &mut expansion) {
                record(
                    &mut scan.diagnostics,
                    Diagnostic::DepthExceeded {
                        relation: *id,
                        limit: config.max_relation_depth,
                    },
                );
                continue;
            }
            if expansion.ways.len() > config.max_members {
                record(
                    &mut scan.diagnostics,
                    Diagnostic::TooManyMembers {
                        relation: *id,
                        members: expansion.ways.len(),
                        limit: config.max_members,
                    },
                );
                continue;
            }
            if expansion.ways.is_empty() {
                record(
                    &mut scan.diagnostics,
                    Diagnostic::NoClosedRings { relation: *id },
                );
                continue;
            }
            scan.wanted.extend(expansion.ways.iter().copied());
            scan.relations.insert(
                *id,
                ScannedRelation {
                    id: *id,
                    tags: tags.clone(),
                    ways: expansion.ways,
                    missing_relations: expansion.missing_relations,
                },
            );
        }
        scan
    }

    /// Depth-first expansion. Returns `false` when the depth bound is hit.
    fn expand(&self, id: i64, depth: usize, limit: usize, expansion: &mut Expansion) -> bool {
        if !expansion.visited.insert(id) {
            return true;
        }
        let Some(members) = self.members.get(&id) else {
            expansion.missing_relations += 1;
            return true;
        };
        for way in &members.ways {
            if expansion.seen_ways.insert(*way) {
                expansion.ways.push(*way);
            }
        }
        for child in &members.relations {
            if expansion.visited.contains(child) {
                continue;
            }
            if !self.members.contains_key(child) {
                expansion.visited.insert(*child);
                expansion.missing_relations += 1;
                continue;
            }
            if depth >= limit {
                return false;
            }
            if !self.expand(*child, depth + 1, limit, expansion) {
                return false;
            }
        }
        true
    }
}

fn record(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    warn!("{diagnostic}");
    diagnostics.push(diagnostic);
}
