//! Caller-owned callback table.
//!
//! A [`HandlerTable`] holds one optional callback per notification kind. The
//! pipeline borrows the table mutably for exactly one pass and calls only the
//! slots that are bound.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::{Area, EntityKind, EntityRef, Node, Relation, Ring, Tags, Way};

/// Boxed error returned by a failing handler.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Result type returned by every handler callback.
pub type HandlerResult = Result<(), BoxError>;

type EntityFn<'h, T> = Box<dyn FnMut(&T) -> HandlerResult + 'h>;
type RingFn<'h> = Box<dyn FnMut(&Area, &Ring) -> HandlerResult + 'h>;
type TagListFn<'h> = Box<dyn FnMut(EntityRef, &Tags) -> HandlerResult + 'h>;
type FlushFn<'h> = Box<dyn FnMut() -> HandlerResult + 'h>;

/// One callback slot of a [`HandlerTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Slot {
    /// Called for every node.
    Node,
    /// Called for every way, after location resolution.
    Way,
    /// Called for every relation.
    Relation,
    /// Called for every assembled area.
    Area,
    /// Called for each outer ring of an area.
    OuterRing,
    /// Called for each inner ring of an area, after its outer ring.
    InnerRing,
    /// Called with the tags of every entity and area.
    TagList,
    /// Called at every checkpoint.
    Flush,
}

impl Slot {
    /// Every slot in dispatch order.
    pub const ALL: [Self; 8] = [
        Self::Node,
        Self::Way,
        Self::Relation,
        Self::Area,
        Self::OuterRing,
        Self::InnerRing,
        Self::TagList,
        Self::Flush,
    ];

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// The snake-case slot name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
            Self::Area => "area",
            Self::OuterRing => "outer_ring",
            Self::InnerRing => "inner_ring",
            Self::TagList => "tag_list",
            Self::Flush => "flush",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A small set of [`Slot`]s.
///
/// # Examples
/// ```
/// use osmarea_core::{Slot, SlotSet};
///
/// let required = SlotSet::from_iter([Slot::Area, Slot::Flush]);
/// assert!(required.contains(Slot::Area));
/// assert_eq!(required.iter().collect::<Vec<_>>(), vec![Slot::Area, Slot::Flush]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotSet(u16);

impl SlotSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Add a slot.
    pub const fn insert(&mut self, slot: Slot) {
        self.0 |= slot.bit();
    }

    /// Return a copy with `slot` added.
    #[must_use]
    pub const fn with(mut self, slot: Slot) -> Self {
        self.insert(slot);
        self
    }

    /// Is `slot` in the set?
    #[must_use]
    pub const fn contains(self, slot: Slot) -> bool {
        self.0 & slot.bit() != 0
    }

    /// Slots in `self` but not in `other`.
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Is the set empty?
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the slots in dispatch order.
    pub fn iter(self) -> impl Iterator<Item = Slot> {
        Slot::ALL.into_iter().filter(move |slot| self.contains(*slot))
    }
}

impl FromIterator<Slot> for SlotSet {
    fn from_iter<T: IntoIterator<Item = Slot>>(iter: T) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SlotSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for SlotSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let slots = Vec::<Slot>::deserialize(deserializer)?;
        Ok(slots.into_iter().collect())
    }
}

/// A handler callback failed.
#[derive(Debug, Error)]
#[error("{slot} handler failed for {entity}")]
pub struct HandlerError {
    /// Slot whose callback failed.
    pub slot: Slot,
    /// Entity being dispatched; `flush` failures report the pass itself.
    pub entity: DispatchTarget,
    /// Error returned by the callback.
    #[source]
    pub source: BoxError,
}

/// What was being dispatched when a handler failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchTarget {
    /// An entity or area.
    Entity(EntityRef),
    /// A checkpoint.
    Checkpoint,
}

impl fmt::Display for DispatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(entity) => write!(f, "{entity}"),
            Self::Checkpoint => f.write_str("checkpoint"),
        }
    }
}

/// Callback slots for one pass.
///
/// # Examples
/// ```
/// use std::cell::Cell;
/// use osmarea_core::{HandlerTable, Slot};
///
/// let nodes = Cell::new(0);
/// let table = HandlerTable::new().on_node(|_| {
///     nodes.set(nodes.get() + 1);
///     Ok(())
/// });
/// assert!(table.bound().contains(Slot::Node));
/// assert!(!table.bound().contains(Slot::Area));
/// ```
#[derive(Default)]
pub struct HandlerTable<'h> {
    node: Option<EntityFn<'h, Node>>,
    way: Option<EntityFn<'h, Way>>,
    relation: Option<EntityFn<'h, Relation>>,
    area: Option<EntityFn<'h, Area>>,
    outer_ring: Option<RingFn<'h>>,
    inner_ring: Option<RingFn<'h>>,
    tag_list: Option<TagListFn<'h>>,
    flush: Option<FlushFn<'h>>,
}

impl fmt::Debug for HandlerTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("bound", &self.bound())
            .finish()
    }
}

impl<'h> HandlerTable<'h> {
    /// A table with no bound slots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the `node` slot.
    #[must_use]
    pub fn on_node(mut self, handler: impl FnMut(&Node) -> HandlerResult + 'h) -> Self {
        self.node = Some(Box::new(handler));
        self
    }

    /// Bind the `way` slot.
    #[must_use]
    pub fn on_way(mut self, handler: impl FnMut(&Way) -> HandlerResult + 'h) -> Self {
        self.way = Some(Box::new(handler));
        self
    }

    /// Bind the `relation` slot.
    #[must_use]
    pub fn on_relation(mut self, handler: impl FnMut(&Relation) -> HandlerResult + 'h) -> Self {
        self.relation = Some(Box::new(handler));
        self
    }

    /// Bind the `area` slot.
    #[must_use]
    pub fn on_area(mut self, handler: impl FnMut(&Area) -> HandlerResult + 'h) -> Self {
        self.area = Some(Box::new(handler));
        self
    }

    /// Bind the `outer_ring` slot.
    #[must_use]
    pub fn on_outer_ring(
        mut self,
        handler: impl FnMut(&Area, &Ring) -> HandlerResult + 'h,
    ) -> Self {
        self.outer_ring = Some(Box::new(handler));
        self
    }

    /// Bind the `inner_ring` slot.
    #[must_use]
    pub fn on_inner_ring(
        mut self,
        handler: impl FnMut(&Area, &Ring) -> HandlerResult + 'h,
    ) -> Self {
        self.inner_ring = Some(Box::new(handler));
        self
    }

    /// Bind the `tag_list` slot.
    #[must_use]
    pub fn on_tag_list(
        mut self,
        handler: impl FnMut(EntityRef, &Tags) -> HandlerResult + 'h,
    ) -> Self {
        self.tag_list = Some(Box::new(handler));
        self
    }

    /// Bind the `flush` slot.
    #[must_use]
    pub fn on_flush(mut self, handler: impl FnMut() -> HandlerResult + 'h) -> Self {
        self.flush = Some(Box::new(handler));
        self
    }

    /// The slots that have a callback.
    #[must_use]
    pub fn bound(&self) -> SlotSet {
        let pairs = [
            (Slot::Node, self.node.is_some()),
            (Slot::Way, self.way.is_some()),
            (Slot::Relation, self.relation.is_some()),
            (Slot::Area, self.area.is_some()),
            (Slot::OuterRing, self.outer_ring.is_some()),
            (Slot::InnerRing, self.inner_ring.is_some()),
            (Slot::TagList, self.tag_list.is_some()),
            (Slot::Flush, self.flush.is_some()),
        ];
        pairs
            .into_iter()
            .filter_map(|(slot, bound)| bound.then_some(slot))
            .collect()
    }

    pub(crate) fn node(&mut self, node: &Node) -> Result<(), HandlerError> {
        let target = EntityRef::new(EntityKind::Node, node.id);
        call(Slot::Node, target, self.node.as_mut().map(|f| f(node)))?;
        self.tag_list(target, &node.tags)
    }

    pub(crate) fn way(&mut self, way: &Way) -> Result<(), HandlerError> {
        let target = EntityRef::new(EntityKind::Way, way.id);
        call(Slot::Way, target, self.way.as_mut().map(|f| f(way)))?;
        self.tag_list(target, &way.tags)
    }

    pub(crate) fn relation(&mut self, relation: &Relation) -> Result<(), HandlerError> {
        let target = EntityRef::new(EntityKind::Relation, relation.id);
        call(
            Slot::Relation,
            target,
            self.relation.as_mut().map(|f| f(relation)),
        )?;
        self.tag_list(target, &relation.tags)
    }

    /// Dispatch an area, its tags and then its rings: each outer ring
    /// followed by its inner rings.
    pub(crate) fn area(&mut self, area: &Area) -> Result<(), HandlerError> {
        let target = EntityRef::new(EntityKind::Area, area.id().get());
        call(Slot::Area, target, self.area.as_mut().map(|f| f(area)))?;
        self.tag_list(target, area.tags())?;
        for outer in area.outer_rings() {
            call(
                Slot::OuterRing,
                target,
                self.outer_ring.as_mut().map(|f| f(area, outer)),
            )?;
            for inner in area.inner_rings(outer) {
                call(
                    Slot::InnerRing,
                    target,
                    self.inner_ring.as_mut().map(|f| f(area, inner)),
                )?;
            }
        }
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> Result<(), HandlerError> {
        match self.flush.as_mut().map(|f| f()) {
            Some(Err(source)) => Err(HandlerError {
                slot: Slot::Flush,
                entity: DispatchTarget::Checkpoint,
                source,
            }),
            _ => Ok(()),
        }
    }

    fn tag_list(&mut self, target: EntityRef, tags: &Tags) -> Result<(), HandlerError> {
        call(
            Slot::TagList,
            target,
            self.tag_list.as_mut().map(|f| f(target, tags)),
        )
    }
}

fn call(slot: Slot, target: EntityRef, outcome: Option<HandlerResult>) -> Result<(), HandlerError> {
    match outcome {
        Some(Err(source)) => Err(HandlerError {
            slot,
            entity: DispatchTarget::Entity(target),
            source,
        }),
        _ => Ok(()),
    }
}
