//! Assembler configuration.

use crate::Tags;

/// Default minimum number of locations in a ring, counting the closing one.
pub const DEFAULT_MIN_RING_POINTS: usize = 4;
/// Default ceiling on the number of member ways of one relation.
pub const DEFAULT_MAX_MEMBERS: usize = 10_000;
/// Default bound on sub-relation nesting.
pub const DEFAULT_MAX_RELATION_DEPTH: usize = 8;

/// Winding convention applied to assembled rings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Orientation {
    /// Outer rings counter-clockwise, inner rings clockwise. Signed areas are
    /// positive for land and negative for holes.
    #[default]
    CounterClockwiseOuter,
    /// Outer rings clockwise, inner rings counter-clockwise.
    ClockwiseOuter,
}

impl Orientation {
    /// Should an outer ring wind counter-clockwise?
    #[must_use]
    pub const fn outer_is_counter_clockwise(self) -> bool {
        matches!(self, Self::CounterClockwiseOuter)
    }
}

/// What to do with a relation whose members cannot all be chained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum IncompletePolicy {
    /// Emit a [`Partial`](crate::AreaStatus::Partial) area holding the rings
    /// that could be closed.
    #[default]
    EmitPartial,
    /// Emit nothing for the relation.
    Drop,
}

/// Decides which relations and closed ways describe areas.
///
/// # Examples
/// ```
/// use osmarea_core::{AreaFilter, collect_tags};
///
/// let filter = AreaFilter::default();
/// assert!(filter.accepts_relation(&collect_tags([("type", "multipolygon")])));
/// assert!(!filter.accepts_relation(&collect_tags([("type", "route")])));
/// assert!(filter.denies(&collect_tags([("area", "no")])));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AreaFilter {
    /// Accepted values of the relation `type` tag.
    pub relation_types: Vec<String>,
    /// Tag pairs that disqualify a relation or way.
    pub deny: Vec<(String, String)>,
}

impl Default for AreaFilter {
    fn default() -> Self {
        Self {
            relation_types: vec!["multipolygon".to_owned(), "boundary".to_owned()],
            deny: vec![("area".to_owned(), "no".to_owned())],
        }
    }
}

impl AreaFilter {
    /// Does any denied pair match `tags`?
    #[must_use]
    pub fn denies(&self, tags: &Tags) -> bool {
        self.deny
            .iter()
            .any(|(key, value)| tags.get(key).is_some_and(|found| found == value))
    }

    /// Is a relation with these tags area-eligible?
    #[must_use]
    pub fn accepts_relation(&self, tags: &Tags) -> bool {
        let typed = tags
            .get("type")
            .is_some_and(|kind| self.relation_types.iter().any(|wanted| wanted == kind));
        typed && !self.denies(tags)
    }
}

/// Options for the relation scan and ring assembly.
///
/// # Examples
/// ```
/// use osmarea_core::{AssemblerConfig, IncompletePolicy};
///
/// let config = AssemblerConfig {
///     incomplete: IncompletePolicy::Drop,
///     ..AssemblerConfig::default()
/// };
/// assert_eq!(config.min_ring_points, 4);
/// assert!(config.create_way_polygons);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AssemblerConfig {
    /// Minimum locations in an emitted ring, counting the closing location.
    pub min_ring_points: usize,
    /// Relations with more member ways than this are skipped.
    pub max_members: usize,
    /// Deepest sub-relation nesting that is expanded.
    pub max_relation_depth: usize,
    /// Relation and way eligibility rules.
    pub area_filter: AreaFilter,
    /// Ring winding convention.
    pub orientation: Orientation,
    /// Handling of relations with open chains or missing members.
    pub incomplete: IncompletePolicy,
    /// Promote self-closed ways to areas.
    pub create_way_polygons: bool,
    /// Emit an [`Invalid`](crate::AreaStatus::Invalid) area instead of
    /// nothing when assembly fails.
    pub create_empty_areas: bool,
    /// Keep the relation `type` tag on relation areas.
    pub keep_type_tag: bool,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            min_ring_points: DEFAULT_MIN_RING_POINTS,
            max_members: DEFAULT_MAX_MEMBERS,
            max_relation_depth: DEFAULT_MAX_RELATION_DEPTH,
            area_filter: AreaFilter::default(),
            orientation: Orientation::default(),
            incomplete: IncompletePolicy::default(),
            create_way_polygons: true,
            create_empty_areas: false,
            keep_type_tag: false,
        }
    }
}
