//! The entity stream consumed by every pass.
//!
//! A source is opened once per pass. Area assembly needs two passes (the
//! relation scan and the main pass), so sources must support being opened
//! more than once; each opening yields the same events in the same order.

use std::cell::Cell;
use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::{Entity, EntityRef};

/// One item of an entity stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// A decoded entity.
    Entity(Entity),
    /// The end of a decoded block. Handlers may checkpoint here.
    BlockEnd,
}

impl From<Entity> for SourceEvent {
    fn from(entity: Entity) -> Self {
        Self::Entity(entity)
    }
}

/// Fatal errors raised by an entity source.
///
/// These are the only errors that abort a whole pass.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be opened.
    #[error("failed to open entity source {location}")]
    Open {
        /// Human-readable source location, usually a path.
        location: String,
        /// Underlying error.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    /// Decoding failed part way through the stream.
    #[error("failed to decode {} from {location}", DescribeEntity(*entity))]
    Decode {
        /// Human-readable source location, usually a path and block index.
        location: String,
        /// The entity being decoded, when known.
        entity: Option<EntityRef>,
        /// Underlying error.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

struct DescribeEntity(Option<EntityRef>);

impl fmt::Display for DescribeEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(entity) => write!(f, "{entity}"),
            None => f.write_str("block"),
        }
    }
}

/// A restartable, forward-only stream of entities.
///
/// Implementations are expected to present nodes before the ways that
/// reference them and ways before relations, which is the canonical order
/// of OpenStreetMap files. Out-of-order input degrades resolution rather than
/// failing.
pub trait EntitySource {
    /// Iterator over the events of one opening.
    type Events: Iterator<Item = Result<SourceEvent, SourceError>>;

    /// Open the source from the beginning.
    ///
    /// # Errors
    /// Returns [`SourceError::Open`] when the underlying data is unavailable.
    fn open(&self) -> Result<Self::Events, SourceError>;
}

impl<S: EntitySource + ?Sized> EntitySource for &S {
    type Events = S::Events;

    fn open(&self) -> Result<Self::Events, SourceError> {
        (**self).open()
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Event(SourceEvent),
    Fail {
        entity: Option<EntityRef>,
        message: String,
    },
}

/// An in-memory entity source.
///
/// Useful for tests and for callers that already hold decoded entities. A
/// [`SourceEvent::BlockEnd`] is inserted after every `block_size` entities
/// and once at the end.
///
/// # Examples
/// ```
/// use osmarea_core::{EntitySource, Location, MemorySource, Node, SourceEvent};
///
/// # fn main() -> Result<(), osmarea_core::SourceError> {
/// let source = MemorySource::new([Node::new(1, Location::new(0, 0)).into()]);
/// let events: Vec<_> = source.open()?.collect::<Result<_, _>>()?;
/// assert_eq!(events.len(), 2);
/// assert_eq!(events.last(), Some(&SourceEvent::BlockEnd));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemorySource {
    script: Vec<Scripted>,
    opens: Cell<usize>,
}

impl MemorySource {
    /// Build a source holding `entities` as a single block.
    pub fn new<I>(entities: I) -> Self
    where
        I: IntoIterator<Item = Entity>,
    {
        Self::with_block_size(entities, usize::MAX)
    }

    /// Build a source that ends a block after every `block_size` entities.
    pub fn with_block_size<I>(entities: I, block_size: usize) -> Self
    where
        I: IntoIterator<Item = Entity>,
    {
        let limit = block_size.max(1);
        let mut script = Vec::new();
        let mut in_block = 0_usize;
        for entity in entities {
            script.push(Scripted::Event(SourceEvent::Entity(entity)));
            in_block += 1;
            if in_block == limit {
                script.push(Scripted::Event(SourceEvent::BlockEnd));
                in_block = 0;
            }
        }
        if in_block > 0 {
            script.push(Scripted::Event(SourceEvent::BlockEnd));
        }
        Self {
            script,
            opens: Cell::new(0),
        }
    }

    /// Append a decode failure after the current events.
    #[must_use]
    pub fn then_fail(mut self, entity: Option<EntityRef>, message: impl Into<String>) -> Self {
        self.script.push(Scripted::Fail {
            entity,
            message: message.into(),
        });
        self
    }

    /// How many times the source has been opened.
    #[must_use]
    pub fn opens(&self) -> usize {
        self.opens.get()
    }
}

impl EntitySource for MemorySource {
    type Events = MemoryEvents;

    fn open(&self) -> Result<Self::Events, SourceError> {
        self.opens.set(self.opens.get() + 1);
        Ok(MemoryEvents {
            script: self.script.clone().into_iter(),
        })
    }
}

/// Events of one [`MemorySource`] opening.
#[derive(Debug)]
pub struct MemoryEvents {
    script: std::vec::IntoIter<Scripted>,
}

impl Iterator for MemoryEvents {
    type Item = Result<SourceEvent, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(match self.script.next()? {
            Scripted::Event(event) => Ok(event),
            Scripted::Fail { entity, message } => Err(SourceError::Decode {
                location: "memory".to_owned(),
                entity,
                source: message.into(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityKind, Location, Node};
    use rstest::rstest;

    fn nodes(count: i64) -> Vec<Entity> {
        (1..=count)
            .map(|id| Node::new(id, Location::new(0, 0)).into())
            .collect()
    }

    #[rstest]
    #[case(5, 2, 3)]
    #[case(4, 2, 2)]
    #[case(0, 2, 0)]
    fn inserts_block_boundaries(#[case] count: i64, #[case] block: usize, #[case] ends: usize) {
        let source = MemorySource::with_block_size(nodes(count), block);
        let events: Vec<_> = source
            .open()
            .expect("memory source opens")
            .collect::<Result<_, _>>()
            .expect("no failures scripted");
        let boundaries = events
            .iter()
            .filter(|event| matches!(event, SourceEvent::BlockEnd))
            .count();
        assert_eq!(boundaries, ends);
    }

    #[rstest]
    fn counts_openings() {
        let source = MemorySource::new(nodes(1));
        let _first = source.open().expect("opens");
        let _second = source.open().expect("opens");
        assert_eq!(source.opens(), 2);
    }

    #[rstest]
    fn surfaces_scripted_failures() {
        let entity = EntityRef::new(EntityKind::Way, 9);
        let source = MemorySource::new(nodes(1)).then_fail(Some(entity), "truncated block");
        let outcome: Result<Vec<_>, _> = source.open().expect("opens").collect();
        let err = outcome.expect_err("failure should surface");
        assert_eq!(err.to_string(), "failed to decode way 9 from memory");
    }
}
