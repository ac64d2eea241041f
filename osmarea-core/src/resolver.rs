//! Single-pass backfill of way node locations.
//!
//! The resolver feeds every node it sees into a [`LocationIndex`] and looks
//! up each node reference of every way that follows. It never looks ahead:
//! a reference is resolved only when its node appeared earlier in the same
//! pass.

use log::{debug, warn};
use thiserror::Error;

use crate::{LocationIndex, LocationIndexError, Node, Way};

/// What to do when a way references a node the index does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ResolvePolicy {
    /// Leave the reference unresolved, mark the way degraded and continue.
    #[default]
    IgnoreMissing,
    /// Abort the pass on the first unresolved reference.
    FailFast,
}

/// Errors raised while resolving node locations.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A way referenced a node absent from the index under
    /// [`ResolvePolicy::FailFast`].
    #[error("way {way_id} references node {node_id} with no known location")]
    UnresolvedReference {
        /// Way holding the reference.
        way_id: i64,
        /// Missing node.
        node_id: i64,
    },
    /// The location index failed.
    #[error(transparent)]
    Index(#[from] LocationIndexError),
}

/// Outcome of resolving one way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resolution {
    /// Number of references left without a location.
    pub unresolved: usize,
}

impl Resolution {
    /// Were all references resolved?
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.unresolved == 0
    }
}

/// Counters accumulated over one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResolverStats {
    /// Nodes written to the index.
    pub nodes_indexed: usize,
    /// Nodes skipped because they were tombstones or out of range.
    pub nodes_skipped: usize,
    /// Ways whose references were looked up.
    pub ways_resolved: usize,
    /// Ways left with at least one unresolved reference.
    pub ways_degraded: usize,
    /// Total unresolved references.
    pub refs_unresolved: usize,
}

/// Populates a location index from nodes and resolves way references.
///
/// # Examples
/// ```
/// use osmarea_core::{Location, Node, NodeLocationResolver, SparseLocationIndex, Way};
///
/// # fn main() -> Result<(), osmarea_core::ResolveError> {
/// let mut resolver = NodeLocationResolver::new(SparseLocationIndex::default());
/// resolver.node(&Node::new(1, Location::new(10, 20)))?;
///
/// let mut way = Way::new(7, [1, 2]);
/// let resolution = resolver.way(&mut way)?;
/// assert_eq!(resolution.unresolved, 1);
/// assert!(way.is_degraded());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct NodeLocationResolver<I> {
    index: I,
    policy: ResolvePolicy,
    stats: ResolverStats,
}

impl<I: LocationIndex> NodeLocationResolver<I> {
    /// Create a resolver that ignores missing references.
    pub fn new(index: I) -> Self {
        Self::with_policy(index, ResolvePolicy::default())
    }

    /// Create a resolver with an explicit policy.
    pub fn with_policy(index: I, policy: ResolvePolicy) -> Self {
        Self {
            index,
            policy,
            stats: ResolverStats::default(),
        }
    }

    /// Record a node's location.
    ///
    /// Tombstones, locations outside the valid coordinate range and ids a
    /// bounded index cannot hold are not indexed, so later references to
    /// them stay unresolved.
    ///
    /// # Errors
    /// Returns [`ResolveError::Index`] when the index backend fails.
    pub fn node(&mut self, node: &Node) -> Result<(), ResolveError> {
        if node.is_deleted() || !node.location.is_valid() {
            debug!("not indexing node {}", node.id);
            self.stats.nodes_skipped += 1;
            return Ok(());
        }
        match self.index.put(node.id, node.location) {
            Ok(()) => {
                self.stats.nodes_indexed += 1;
                Ok(())
            }
            Err(err @ LocationIndexError::IdOutOfRange { .. }) => {
                warn!("not indexing node {}: {err}", node.id);
                self.stats.nodes_skipped += 1;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Fill in every node reference of `way` that the index knows.
    ///
    /// References already carrying a location are looked up again; the
    /// index is the single source of truth.
    ///
    /// # Errors
    /// Returns [`ResolveError::UnresolvedReference`] under
    /// [`ResolvePolicy::FailFast`] and [`ResolveError::Index`] on backend
    /// failure.
    pub fn way(&mut self, way: &mut Way) -> Result<Resolution, ResolveError> {
        let mut resolution = Resolution::default();
        for node in &mut way.nodes {
            node.location = self.index.get(node.id)?;
            if node.location.is_some() {
                continue;
            }
            if self.policy == ResolvePolicy::FailFast {
                return Err(ResolveError::UnresolvedReference {
                    way_id: way.id,
                    node_id: node.id,
                });
            }
            resolution.unresolved += 1;
        }

        self.stats.ways_resolved += 1;
        if !resolution.is_complete() {
            warn!(
                "way {} has {} unresolved node reference(s)",
                way.id, resolution.unresolved
            );
            self.stats.ways_degraded += 1;
            self.stats.refs_unresolved += resolution.unresolved;
        }
        Ok(resolution)
    }

    /// Make buffered index writes durable.
    ///
    /// # Errors
    /// Returns [`ResolveError::Index`] when the backend fails.
    pub fn checkpoint(&mut self) -> Result<(), ResolveError> {
        self.index.checkpoint().map_err(ResolveError::from)
    }

    /// Counters accumulated so far.
    #[must_use]
    pub const fn stats(&self) -> ResolverStats {
        self.stats
    }

    /// Active policy.
    #[must_use]
    pub const fn policy(&self) -> ResolvePolicy {
        self.policy
    }

    /// Borrow the underlying index.
    #[must_use]
    pub const fn index(&self) -> &I {
        &self.index
    }

    /// Release the underlying index.
    #[must_use]
    pub fn into_index(self) -> I {
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DenseLocationIndex, EntityInfo, Location, SparseLocationIndex};
    use rstest::{fixture, rstest};

    #[fixture]
    fn resolver() -> NodeLocationResolver<SparseLocationIndex> {
        let mut resolver = NodeLocationResolver::new(SparseLocationIndex::default());
        for (id, x) in [(1, 0), (2, 10), (3, 20)] {
            resolver
                .node(&Node::new(id, Location::new(x, 0)))
                .expect("sparse index accepts writes");
        }
        resolver
    }

    #[rstest]
    fn resolves_known_references(mut resolver: NodeLocationResolver<SparseLocationIndex>) {
        let mut way = Way::new(100, [1, 2, 3]);
        let resolution = resolver.way(&mut way).expect("resolution succeeds");
        assert!(resolution.is_complete());
        let xs: Vec<_> = way.locations().map(|loc| loc.x).collect();
        assert_eq!(xs, vec![0, 10, 20]);
        assert_eq!(resolver.stats().ways_degraded, 0);
    }

    #[rstest]
    fn ignores_missing_references_by_default(
        mut resolver: NodeLocationResolver<SparseLocationIndex>,
    ) {
        let mut way = Way::new(100, [1, 99, 3]);
        let resolution = resolver.way(&mut way).expect("ignore policy continues");
        assert_eq!(resolution.unresolved, 1);
        assert!(way.is_degraded());
        let stats = resolver.stats();
        assert_eq!((stats.ways_degraded, stats.refs_unresolved), (1, 1));
    }

    #[rstest]
    fn fail_fast_reports_the_missing_node() {
        let mut resolver =
            NodeLocationResolver::with_policy(SparseLocationIndex::default(), ResolvePolicy::FailFast);
        let mut way = Way::new(5, [42]);
        let err = resolver.way(&mut way).expect_err("missing node should fail");
        assert!(matches!(
            err,
            ResolveError::UnresolvedReference {
                way_id: 5,
                node_id: 42
            }
        ));
    }

    #[rstest]
    fn skips_tombstones(mut resolver: NodeLocationResolver<SparseLocationIndex>) {
        let mut deleted = Node::new(9, Location::new(5, 5));
        deleted.info = EntityInfo {
            visible: false,
            ..EntityInfo::default()
        };
        resolver.node(&deleted).expect("tombstone is skipped");
        assert_eq!(resolver.index().len(), 3);
        assert_eq!(resolver.stats().nodes_skipped, 1);
    }

    #[rstest]
    fn ids_beyond_a_bounded_index_degrade_their_ways() {
        let mut resolver = NodeLocationResolver::new(DenseLocationIndex::with_capacity(2));
        resolver
            .node(&Node::new(1, Location::new(1, 1)))
            .expect("id fits the index");
        resolver
            .node(&Node::new(7, Location::new(2, 2)))
            .expect("out-of-range id is skipped");
        let mut way = Way::new(3, [1, 7]);
        let resolution = resolver.way(&mut way).expect("ignore policy continues");
        assert_eq!(resolution.unresolved, 1);
        let stats = resolver.stats();
        assert_eq!((stats.nodes_indexed, stats.nodes_skipped), (1, 1));
    }

    #[rstest]
    fn later_nodes_do_not_resolve_earlier_ways() {
        let mut resolver = NodeLocationResolver::new(SparseLocationIndex::default());
        let mut way = Way::new(1, [7]);
        resolver.way(&mut way).expect("ignore policy continues");
        resolver
            .node(&Node::new(7, Location::new(1, 1)))
            .expect("index accepts writes");
        assert!(way.is_degraded());
    }
}
