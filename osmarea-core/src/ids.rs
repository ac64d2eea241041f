use log::warn;

use crate::EntityKind;

/// Lowest bit of an area id: 0 = built from a way, 1 = built from a relation.
/// The remaining bits carry the magnitude of the source id; the sign is kept.
const RELATION_FLAG: i64 = 1;

/// Identifier of a synthetic [`Area`](crate::Area).
///
/// Derived from the source way or relation id so that replays of the same
/// input produce the same area ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AreaId(i64);

impl AreaId {
    /// The raw encoded value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Id of the way or relation this area was built from.
    #[must_use]
    pub const fn original_id(self) -> i64 {
        let magnitude = self.0.unsigned_abs() >> 1;
        #[expect(
            clippy::cast_possible_wrap,
            reason = "magnitude was halved from an i64 and fits"
        )]
        let original = magnitude as i64;
        if self.0 < 0 { -original } else { original }
    }

    /// Was the area built from a single closed way?
    #[must_use]
    pub const fn is_from_way(self) -> bool {
        self.0.unsigned_abs() & 1 == 0
    }
}

impl std::fmt::Display for AreaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Encode a way or relation id as an area id.
///
/// Returns `None` (and logs) for kinds that cannot become areas and for ids
/// whose doubled magnitude does not fit an `i64`.
pub(crate) fn encode_area_id(kind: EntityKind, raw_id: i64) -> Option<AreaId> {
    let flag = match kind {
        EntityKind::Way => 0,
        EntityKind::Relation => RELATION_FLAG,
        EntityKind::Node | EntityKind::Area => {
            warn!("Skipped area id: kind={kind}, raw_id={raw_id} (not an area source)");
            return None;
        }
    };
    let Some(magnitude) = raw_id
        .checked_abs()
        .and_then(|value| value.checked_mul(2))
        .map(|value| value | flag)
    else {
        warn!(
            "Skipped area id: kind={kind}, raw_id={raw_id} (exceeds supported maximum {})",
            i64::MAX >> 1
        );
        return None;
    };
    Some(AreaId(if raw_id < 0 { -magnitude } else { magnitude }))
}
