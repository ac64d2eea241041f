//! File-backed collaborators for the `osmarea` pipeline.
//!
//! Responsibilities:
//! - Decode OpenStreetMap PBF files into core entities ([`PbfSource`]).
//! - Spill the node location table to disk when it does not fit in memory
//!   ([`SqliteLocationIndex`], feature `store-sqlite`).
//! - Measure a source without assembling anything ([`summarise`]).
//!
//! Boundaries:
//! - Do not encode assembly rules (live in `osmarea-core`).
//! - Wire decoding is delegated to `osmpbf`.
//!
//! Invariants:
//! - Every [`PbfSource::open`](osmarea_core::EntitySource::open) replays the
//!   file from the start in the same order.
//! - No global mutable state.

mod pbf;
#[cfg(feature = "store-sqlite")]
mod sqlite;
mod summary;

pub use pbf::{PbfEvents, PbfSource};
#[cfg(feature = "store-sqlite")]
pub use sqlite::{DEFAULT_BATCH_SIZE, SqliteIndexError, SqliteLocationIndex};
pub use summary::{OsmSummary, summarise};
