//! Core domain types and streaming stages for `osmarea`.
//!
//! The crate turns an ordered stream of OpenStreetMap entities into resolved
//! geometry:
//!
//! - [`NodeLocationResolver`] backfills way node locations from a
//!   [`LocationIndex`] in a single forward pass;
//! - [`scan_relations`] and [`AreaAssembler`] build polygon [`Area`]s from
//!   multipolygon relations and closed ways over two passes;
//! - [`Pipeline`] drives a pass and dispatches every entity, area and ring
//!   to a caller-owned [`HandlerTable`] in a fixed order.
//!
//! Decoding of real files lives in `osmarea-data`; this crate only depends on
//! the [`EntitySource`] contract.

mod area;
mod assembler;
mod entity;
mod handler;
mod ids;
mod index;
mod location;
mod pipeline;
mod resolver;
mod source;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use area::{Area, AreaStatus, Ring, RingKind};
pub use assembler::{
    AreaAssembler, AreaFilter, AssemblerConfig, AssemblerStats, DEFAULT_MAX_MEMBERS,
    DEFAULT_MAX_RELATION_DEPTH, DEFAULT_MIN_RING_POINTS, Diagnostic, IncompletePolicy,
    Orientation, RelationScan, ScannedRelation, scan_relations,
};
pub use entity::{
    Entity, EntityInfo, EntityKind, EntityRef, Member, MemberKind, Node, NodeRef, Relation, Tags,
    Way, collect_tags,
};
pub use handler::{
    BoxError, DispatchTarget, HandlerError, HandlerResult, HandlerTable, Slot, SlotSet,
};
pub use ids::AreaId;
pub use index::{DenseLocationIndex, LocationIndex, LocationIndexError, SparseLocationIndex};
pub use location::{Location, PRECISION};
pub use pipeline::{Mode, Pass, PassReport, Pipeline, PipelineConfig, PipelineError, Stage, Step};
pub use resolver::{NodeLocationResolver, Resolution, ResolveError, ResolvePolicy, ResolverStats};
pub use source::{EntitySource, MemoryEvents, MemorySource, SourceError, SourceEvent};
