//! Facade crate for `osmarea`.
//!
//! This crate re-exports the core streaming pipeline and, behind the `pbf`
//! feature, the PBF file source and extract summary. The SQLite-backed
//! location index is available with `store-sqlite`.

#![forbid(unsafe_code)]

pub use osmarea_core::{
    Area, AreaFilter, AreaId, AreaStatus, AssemblerConfig, Diagnostic, Entity, EntityInfo,
    EntityKind, EntityRef, EntitySource, HandlerTable, IncompletePolicy, Location, LocationIndex,
    Member, MemberKind, MemorySource, Mode, Node, NodeRef, Orientation, Pass, PassReport,
    Pipeline, PipelineConfig, PipelineError, Relation, ResolvePolicy, Ring, RingKind,
    SourceError, SourceEvent, Tags, Way,
};

/// Lower-level building blocks for callers driving stages by hand.
pub mod stages {
    pub use osmarea_core::{
        AreaAssembler, AssemblerStats, DenseLocationIndex, LocationIndexError,
        NodeLocationResolver, RelationScan, Resolution, ResolveError, ResolverStats,
        ScannedRelation, SparseLocationIndex, scan_relations,
    };
}

#[cfg(feature = "pbf")]
pub use osmarea_data::{OsmSummary, PbfEvents, PbfSource, summarise};

#[cfg(feature = "store-sqlite")]
pub use osmarea_data::{SqliteIndexError, SqliteLocationIndex};
