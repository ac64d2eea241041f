//! Non-fatal assembly problems.

use std::fmt;

/// A relation or way that could not be turned into a complete area.
///
/// Diagnostics never abort a pass. They are logged at `warn` level when
/// recorded and retained for the pass report.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Diagnostic {
    /// Sub-relation expansion went deeper than `max_relation_depth`.
    DepthExceeded {
        /// Relation that was skipped.
        relation: i64,
        /// The configured bound.
        limit: usize,
    },
    /// The relation needs more ways than `max_members`.
    TooManyMembers {
        /// Relation that was skipped.
        relation: i64,
        /// Distinct member ways after expansion.
        members: usize,
        /// The configured bound.
        limit: usize,
    },
    /// No ring could be closed from the members that arrived.
    NoClosedRings {
        /// Relation that produced no area.
        relation: i64,
    },
    /// Some members were missing, degraded or left in open chains.
    Incomplete {
        /// Relation concerned.
        relation: i64,
        /// Chains that did not close into a valid ring.
        open_chains: usize,
        /// Member ways or sub-relations that never arrived.
        missing_members: usize,
        /// Member ways with unresolved node references.
        degraded_members: usize,
    },
    /// A closed way could not form a valid ring.
    InvalidWayRing {
        /// Way that produced no area.
        way: i64,
    },
}

impl Diagnostic {
    /// Id of the relation or way the diagnostic concerns.
    #[must_use]
    pub const fn source_id(&self) -> i64 {
        match self {
            Self::DepthExceeded { relation, .. }
            | Self::TooManyMembers { relation, .. }
            | Self::NoClosedRings { relation }
            | Self::Incomplete { relation, .. } => *relation,
            Self::InvalidWayRing { way } => *way,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepthExceeded { relation, limit } => write!(
                f,
                "relation {relation} nests sub-relations deeper than {limit}; skipped"
            ),
            Self::TooManyMembers {
                relation,
                members,
                limit,
            } => write!(
                f,
                "relation {relation} has {members} member ways (limit {limit}); skipped"
            ),
            Self::NoClosedRings { relation } => {
                write!(f, "relation {relation} has no closed rings")
            }
            Self::Incomplete {
                relation,
                open_chains,
                missing_members,
                degraded_members,
            } => write!(
                f,
                "relation {relation} is incomplete: {open_chains} open chain(s), \
                 {missing_members} missing and {degraded_members} degraded member(s)"
            ),
            Self::InvalidWayRing { way } => write!(f, "closed way {way} has no valid ring"),
        }
    }
}
