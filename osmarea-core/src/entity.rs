//! Decoded OpenStreetMap entities.
//!
//! Nodes, ways and relations are owned values produced by an
//! [`EntitySource`](crate::EntitySource). Ways are the only mutable entity:
//! the [`NodeLocationResolver`](crate::NodeLocationResolver) fills in their
//! node locations once, after which they are treated as read-only.

use std::collections::BTreeMap;
use std::fmt;

use crate::Location;

/// OpenStreetMap-style key/value tags.
///
/// An ordered map keeps dispatch and serialisation deterministic across
/// replays of the same source.
pub type Tags = BTreeMap<String, String>;

/// Collect borrowed key/value pairs into owned [`Tags`].
pub fn collect_tags<'a, T>(tags: T) -> Tags
where
    T: IntoIterator<Item = (&'a str, &'a str)>,
{
    tags.into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

/// Optional authoring metadata attached to an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityInfo {
    /// Entity version, when the source carries it.
    pub version: Option<u32>,
    /// `false` for deleted entities in history files.
    pub visible: bool,
    /// Author user id.
    pub uid: Option<u32>,
    /// Author display name.
    pub user: Option<String>,
    /// Seconds since the Unix epoch of the last change.
    pub timestamp: Option<i64>,
    /// Changeset the entity was last modified in.
    pub changeset: Option<i64>,
}

impl Default for EntityInfo {
    fn default() -> Self {
        Self {
            version: None,
            visible: true,
            uid: None,
            user: None,
            timestamp: None,
            changeset: None,
        }
    }
}

/// The kind of an entity or relation member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EntityKind {
    /// A point.
    Node,
    /// A polyline over node references.
    Way,
    /// A grouping of other entities.
    Relation,
    /// A synthetic polygon built by the assembler.
    Area,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
            Self::Area => "area",
        };
        f.write_str(name)
    }
}

/// A typed entity identifier, used in errors and tag-list notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityRef {
    /// Kind of the referenced entity.
    pub kind: EntityKind,
    /// Identifier within that kind.
    pub id: i64,
}

impl EntityRef {
    /// Construct a reference.
    #[must_use]
    pub const fn new(kind: EntityKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// A point entity.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    /// Node identifier.
    pub id: i64,
    /// Node position.
    pub location: Location,
    /// Node tags.
    pub tags: Tags,
    /// Authoring metadata.
    pub info: EntityInfo,
}

impl Node {
    /// Construct an untagged node with default metadata.
    #[must_use]
    pub fn new(id: i64, location: Location) -> Self {
        Self {
            id,
            location,
            tags: Tags::new(),
            info: EntityInfo::default(),
        }
    }

    /// Attach tags, replacing any existing ones.
    #[must_use]
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Is this node a tombstone from a history file?
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        !self.info.visible
    }
}

/// A reference from a way to a node.
///
/// `location` is `None` until the resolver fills it in, and stays `None` if
/// the node was never seen earlier in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeRef {
    /// Referenced node id.
    pub id: i64,
    /// Resolved location, if known.
    pub location: Option<Location>,
}

impl NodeRef {
    /// An unresolved reference.
    #[must_use]
    pub const fn unresolved(id: i64) -> Self {
        Self { id, location: None }
    }
}

/// A polyline entity.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Way {
    /// Way identifier.
    pub id: i64,
    /// Ordered node references.
    pub nodes: Vec<NodeRef>,
    /// Way tags.
    pub tags: Tags,
    /// Authoring metadata.
    pub info: EntityInfo,
}

impl Way {
    /// Construct an untagged way over unresolved node references.
    pub fn new<I>(id: i64, refs: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        Self {
            id,
            nodes: refs.into_iter().map(NodeRef::unresolved).collect(),
            tags: Tags::new(),
            info: EntityInfo::default(),
        }
    }

    /// Attach tags, replacing any existing ones.
    #[must_use]
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Does the way start and end at the same node id?
    #[must_use]
    pub fn is_closed(&self) -> bool {
        match (self.nodes.first(), self.nodes.last()) {
            (Some(first), Some(last)) => self.nodes.len() > 1 && first.id == last.id,
            _ => false,
        }
    }

    /// Are both end locations resolved and equal?
    #[must_use]
    pub fn ends_have_same_location(&self) -> bool {
        match (
            self.nodes.first().and_then(|node| node.location),
            self.nodes.last().and_then(|node| node.location),
        ) {
            (Some(first), Some(last)) => self.nodes.len() > 1 && first == last,
            _ => false,
        }
    }

    /// Does any node reference lack a location?
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.nodes.iter().any(|node| node.location.is_none())
    }

    /// Resolved locations in order, skipping unresolved references.
    pub fn locations(&self) -> impl Iterator<Item = Location> + '_ {
        self.nodes.iter().filter_map(|node| node.location)
    }
}

/// The kind of a relation member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MemberKind {
    /// Member is a node.
    Node,
    /// Member is a way.
    Way,
    /// Member is another relation.
    Relation,
}

/// One typed member of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Member {
    /// Member kind.
    pub kind: MemberKind,
    /// Member identifier.
    pub id: i64,
    /// Free-form role string, e.g. `outer` or `inner`.
    pub role: String,
}

impl Member {
    /// Construct a member.
    pub fn new(kind: MemberKind, id: i64, role: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            role: role.into(),
        }
    }

    /// A way member.
    pub fn way(id: i64, role: impl Into<String>) -> Self {
        Self::new(MemberKind::Way, id, role)
    }

    /// A relation member.
    pub fn relation(id: i64, role: impl Into<String>) -> Self {
        Self::new(MemberKind::Relation, id, role)
    }
}

/// A grouping entity.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Relation {
    /// Relation identifier.
    pub id: i64,
    /// Ordered members.
    pub members: Vec<Member>,
    /// Relation tags.
    pub tags: Tags,
    /// Authoring metadata.
    pub info: EntityInfo,
}

impl Relation {
    /// Construct an untagged relation.
    #[must_use]
    pub fn new(id: i64, members: Vec<Member>) -> Self {
        Self {
            id,
            members,
            tags: Tags::new(),
            info: EntityInfo::default(),
        }
    }

    /// Attach tags, replacing any existing ones.
    #[must_use]
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Member ids of the given kind, in member order.
    pub fn member_ids(&self, kind: MemberKind) -> impl Iterator<Item = i64> + '_ {
        self.members
            .iter()
            .filter(move |member| member.kind == kind)
            .map(|member| member.id)
    }
}

/// One decoded entity from the source stream.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Entity {
    /// A point.
    Node(Node),
    /// A polyline.
    Way(Way),
    /// A grouping.
    Relation(Relation),
}

impl Entity {
    /// Kind and id of this entity.
    #[must_use]
    pub const fn entity_ref(&self) -> EntityRef {
        match self {
            Self::Node(node) => EntityRef::new(EntityKind::Node, node.id),
            Self::Way(way) => EntityRef::new(EntityKind::Way, way.id),
            Self::Relation(relation) => EntityRef::new(EntityKind::Relation, relation.id),
        }
    }

    /// Tags of this entity.
    #[must_use]
    pub const fn tags(&self) -> &Tags {
        match self {
            Self::Node(node) => &node.tags,
            Self::Way(way) => &way.tags,
            Self::Relation(relation) => &relation.tags,
        }
    }
}

impl From<Node> for Entity {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<Way> for Entity {
    fn from(way: Way) -> Self {
        Self::Way(way)
    }
}

impl From<Relation> for Entity {
    fn from(relation: Relation) -> Self {
        Self::Relation(relation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn resolved(id: i64, x: i32, y: i32) -> NodeRef {
        NodeRef {
            id,
            location: Some(Location::new(x, y)),
        }
    }

    #[rstest]
    #[case(vec![1, 2, 3, 1], true)]
    #[case(vec![1, 2, 3], false)]
    #[case(vec![1], false)]
    #[case(vec![], false)]
    fn detects_closed_ways(#[case] refs: Vec<i64>, #[case] closed: bool) {
        assert_eq!(Way::new(1, refs).is_closed(), closed);
    }

    #[rstest]
    fn degraded_way_skips_unresolved_locations() {
        let mut way = Way::new(7, [1, 2, 3]);
        way.nodes = vec![resolved(1, 0, 0), NodeRef::unresolved(2), resolved(3, 5, 5)];
        assert!(way.is_degraded());
        let locations: Vec<_> = way.locations().collect();
        assert_eq!(locations, vec![Location::new(0, 0), Location::new(5, 5)]);
    }

    #[rstest]
    fn end_locations_require_resolution() {
        let mut way = Way::new(3, [1, 2, 1]);
        assert!(!way.ends_have_same_location());
        way.nodes = vec![resolved(1, 0, 0), resolved(2, 1, 1), resolved(1, 0, 0)];
        assert!(way.ends_have_same_location());
    }

    #[rstest]
    fn collects_tags_in_key_order() {
        let tags = collect_tags([("name", "Lake"), ("natural", "water")]);
        let keys: Vec<_> = tags.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "natural"]);
    }

    #[rstest]
    fn filters_relation_members_by_kind() {
        let relation = Relation::new(
            1,
            vec![
                Member::way(10, "outer"),
                Member::relation(20, ""),
                Member::way(11, "inner"),
                Member::new(MemberKind::Node, 30, "label"),
            ],
        );
        let ways: Vec<_> = relation.member_ids(MemberKind::Way).collect();
        assert_eq!(ways, vec![10, 11]);
    }
}
