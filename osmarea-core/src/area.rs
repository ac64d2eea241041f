//! Synthetic area entities and their rings.
//!
//! An "area" is not an object stored in OpenStreetMap data. It is built by
//! the [`AreaAssembler`](crate::AreaAssembler) either from a single closed
//! way or from a multipolygon/boundary relation and its member ways.
//!
//! Rings are stored by value in an arena owned by the area. An inner ring
//! refers to its outer ring by arena index, never by reference, so an
//! [`Area`] is a plain value that can be cloned, compared and sent across
//! threads.

use geo::algorithm::winding_order::{Winding, WindingOrder};
use geo::{Area as _, LineString, Polygon};

use crate::{AreaId, Location, Tags};

/// Polarity of a ring inside an area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RingKind {
    /// A shell of the polygon.
    Outer,
    /// A hole cut out of the outer ring at arena index `outer`.
    Inner {
        /// Arena index of the owning outer ring.
        outer: usize,
    },
}

/// A closed loop of locations (first == last).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ring {
    index: usize,
    kind: RingKind,
    locations: Vec<Location>,
}

impl Ring {
    pub(crate) const fn new(index: usize, kind: RingKind, locations: Vec<Location>) -> Self {
        Self {
            index,
            kind,
            locations,
        }
    }

    /// Position of this ring in its area's arena.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Outer or inner polarity.
    #[must_use]
    pub const fn kind(&self) -> RingKind {
        self.kind
    }

    /// Is this an outer ring?
    #[must_use]
    pub const fn is_outer(&self) -> bool {
        matches!(self.kind, RingKind::Outer)
    }

    /// The closed coordinate sequence.
    #[must_use]
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Number of locations, counting the closing location.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Rings are never empty once built; provided for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// The ring as a `geo` line string in degrees.
    #[must_use]
    pub fn to_line_string(&self) -> LineString<f64> {
        self.locations.iter().map(|loc| loc.to_degrees()).collect()
    }

    /// Winding order of the ring, `None` for degenerate rings.
    #[must_use]
    pub fn winding_order(&self) -> Option<WindingOrder> {
        self.to_line_string().winding_order()
    }

    /// Shoelace area in square degrees.
    ///
    /// Positive for counter-clockwise rings and negative for clockwise ones.
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        Polygon::new(self.to_line_string(), Vec::new()).signed_area()
    }
}

/// Whether an area carries every ring its source described.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AreaStatus {
    /// All members were present and chained into closed rings.
    Complete,
    /// Some members were missing, unresolved or unchainable; only the
    /// closable rings are present.
    Partial,
    /// No ring could be built. Only emitted when empty areas are requested.
    Invalid,
}

/// A polygon or multipolygon assembled from a way or relation.
///
/// # Examples
/// ```
/// use osmarea_core::{AreaAssembler, AssemblerConfig, Location, RelationScan, Way};
///
/// let corners = [(0, 0), (0, 10), (10, 10), (10, 0), (0, 0)];
/// let mut way = Way::new(5, [1, 2, 3, 4, 1]);
/// for (node, (x, y)) in way.nodes.iter_mut().zip(corners) {
///     node.location = Some(Location::new(x, y));
/// }
///
/// let mut assembler = AreaAssembler::new(RelationScan::default(), AssemblerConfig::default());
/// let areas = assembler.way(&way);
/// let area = areas.first().expect("closed way becomes an area");
/// assert!(area.id().is_from_way());
/// assert_eq!(area.num_rings(), (1, 0));
/// assert!(area.signed_area() > 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Area {
    id: AreaId,
    tags: Tags,
    rings: Vec<Ring>,
    status: AreaStatus,
}

impl Area {
    pub(crate) const fn new(id: AreaId, tags: Tags, rings: Vec<Ring>, status: AreaStatus) -> Self {
        Self {
            id,
            tags,
            rings,
            status,
        }
    }

    /// Area identifier.
    #[must_use]
    pub const fn id(&self) -> AreaId {
        self.id
    }

    /// Id of the way or relation this area was built from.
    #[must_use]
    pub const fn original_id(&self) -> i64 {
        self.id.original_id()
    }

    /// Was this area built from a single closed way?
    #[must_use]
    pub const fn is_from_way(&self) -> bool {
        self.id.is_from_way()
    }

    /// Tags inherited from the source way or relation.
    #[must_use]
    pub const fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Completeness of the ring structure.
    #[must_use]
    pub const fn status(&self) -> AreaStatus {
        self.status
    }

    /// All rings in arena order: each outer ring followed by its holes.
    #[must_use]
    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    /// Iterate the outer rings. Each call starts a fresh iteration.
    pub fn outer_rings(&self) -> impl Iterator<Item = &Ring> + '_ {
        self.rings.iter().filter(|ring| ring.is_outer())
    }

    /// Iterate the inner rings owned by `outer`.
    ///
    /// Yields nothing when `outer` is an inner ring or belongs to a different
    /// area.
    pub fn inner_rings<'a>(&'a self, outer: &'a Ring) -> impl Iterator<Item = &'a Ring> + 'a {
        let owner = outer.index();
        let owned = self
            .rings
            .get(owner)
            .is_some_and(|candidate| candidate == outer && candidate.is_outer());
        self.rings
            .iter()
            .filter(move |ring| owned && ring.kind() == RingKind::Inner { outer: owner })
    }

    /// The outer ring that owns an inner ring.
    #[must_use]
    pub fn outer_of(&self, ring: &Ring) -> Option<&Ring> {
        match ring.kind() {
            RingKind::Outer => None,
            RingKind::Inner { outer } => self.rings.get(outer),
        }
    }

    /// Count the outer and inner rings.
    #[must_use]
    pub fn num_rings(&self) -> (usize, usize) {
        let outer = self.outer_rings().count();
        (outer, self.rings.len().saturating_sub(outer))
    }

    /// Does the area have more than one outer ring?
    #[must_use]
    pub fn is_multipolygon(&self) -> bool {
        self.num_rings().0 > 1
    }

    /// Sum of the signed ring areas in square degrees.
    ///
    /// With the default orientation (outer rings counter-clockwise, inner
    /// rings clockwise) land contributes positively and holes negatively.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "summing ring areas")]
    pub fn signed_area(&self) -> f64 {
        self.rings.iter().map(Ring::signed_area).sum()
    }
}
