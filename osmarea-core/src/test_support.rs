//! Recording handlers and entity builders used by unit and behaviour tests.

use std::cell::RefCell;

use crate::{
    Area, Entity, EntityRef, HandlerTable, Location, Member, Node, Relation, Way, collect_tags,
};

/// One notification observed by a [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `node` slot.
    Node(i64),
    /// `way` slot, with the number of resolved locations.
    Way {
        /// Way id.
        id: i64,
        /// Locations present after resolution.
        resolved: usize,
    },
    /// `relation` slot.
    Relation(i64),
    /// `area` slot, keyed by area id.
    Area(i64),
    /// `outer_ring` slot.
    OuterRing {
        /// Area id.
        area: i64,
        /// Arena index of the ring.
        index: usize,
    },
    /// `inner_ring` slot.
    InnerRing {
        /// Area id.
        area: i64,
        /// Arena index of the ring.
        index: usize,
    },
    /// `tag_list` slot.
    TagList(EntityRef),
    /// `flush` slot.
    Flush,
}

/// Records every notification of a pass.
///
/// # Examples
/// ```
/// use osmarea_core::test_support::{Event, Recorder};
/// use osmarea_core::{Location, MemorySource, Mode, Node, Pipeline, PipelineConfig};
///
/// # fn main() -> Result<(), osmarea_core::PipelineError> {
/// let source = MemorySource::new([Node::new(1, Location::new(0, 0)).into()]);
/// let recorder = Recorder::default();
/// let mut table = recorder.table();
/// Pipeline::new(Mode::Plain, PipelineConfig::default()).run(&source, &mut table)?;
/// drop(table);
/// assert_eq!(recorder.events().first(), Some(&Event::Node(1)));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Recorder {
    events: RefCell<Vec<Event>>,
    areas: RefCell<Vec<Area>>,
    ways: RefCell<Vec<Way>>,
}

impl Recorder {
    /// A table with every slot bound to this recorder.
    pub fn table(&self) -> HandlerTable<'_> {
        HandlerTable::new()
            .on_node(|node| {
                self.push(Event::Node(node.id));
                Ok(())
            })
            .on_way(|way| {
                self.push(Event::Way {
                    id: way.id,
                    resolved: way.locations().count(),
                });
                self.ways.borrow_mut().push(way.clone());
                Ok(())
            })
            .on_relation(|relation| {
                self.push(Event::Relation(relation.id));
                Ok(())
            })
            .on_area(|area| {
                self.push(Event::Area(area.id().get()));
                self.areas.borrow_mut().push(area.clone());
                Ok(())
            })
            .on_outer_ring(|area, ring| {
                self.push(Event::OuterRing {
                    area: area.id().get(),
                    index: ring.index(),
                });
                Ok(())
            })
            .on_inner_ring(|area, ring| {
                self.push(Event::InnerRing {
                    area: area.id().get(),
                    index: ring.index(),
                });
                Ok(())
            })
            .on_tag_list(|entity, _| {
                self.push(Event::TagList(entity));
                Ok(())
            })
            .on_flush(|| {
                self.push(Event::Flush);
                Ok(())
            })
    }

    fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    /// Every notification so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Notifications other than `tag_list`, in order.
    #[must_use]
    pub fn events_without_tags(&self) -> Vec<Event> {
        self.events
            .borrow()
            .iter()
            .filter(|event| !matches!(event, Event::TagList(_)))
            .cloned()
            .collect()
    }

    /// Areas delivered to the `area` slot.
    #[must_use]
    pub fn areas(&self) -> Vec<Area> {
        self.areas.borrow().clone()
    }

    /// Ways delivered to the `way` slot, as resolved.
    #[must_use]
    pub fn ways(&self) -> Vec<Way> {
        self.ways.borrow().clone()
    }
}

/// Four nodes and the closed way around them.
#[derive(Debug, Clone)]
pub struct Square {
    /// Corner nodes, counter-clockwise from `(min, min)`.
    pub nodes: Vec<Node>,
    /// Closed way over the corners.
    pub way: Way,
}

/// Build an axis-aligned square way with ids `first_node..first_node + 4`.
#[must_use]
pub fn square(way_id: i64, first_node: i64, min: i32, max: i32) -> Square {
    let corners = [(min, min), (max, min), (max, max), (min, max)];
    let nodes: Vec<Node> = (first_node..)
        .zip(corners)
        .map(|(id, (x, y))| Node::new(id, Location::new(x, y)))
        .collect();
    let refs = nodes
        .iter()
        .map(|node| node.id)
        .chain(std::iter::once(first_node));
    let way = Way::new(way_id, refs);
    Square { nodes, way }
}

/// A relation tagged `type=multipolygon` over the given ways.
#[must_use]
pub fn multipolygon(id: i64, outer: &[i64], inner: &[i64]) -> Relation {
    let members = outer
        .iter()
        .map(|way| Member::way(*way, "outer"))
        .chain(inner.iter().map(|way| Member::way(*way, "inner")))
        .collect();
    Relation::new(id, members).with_tags(collect_tags([("type", "multipolygon")]))
}

/// Arrange entities in canonical order: nodes, then ways, then relations.
#[must_use]
pub fn canonical(nodes: Vec<Node>, ways: Vec<Way>, relations: Vec<Relation>) -> Vec<Entity> {
    nodes
        .into_iter()
        .map(Entity::from)
        .chain(ways.into_iter().map(Entity::from))
        .chain(relations.into_iter().map(Entity::from))
        .collect()
}
