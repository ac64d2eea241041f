use super::{LocationIndex, LocationIndexError};
use crate::Location;

/// Marker for a slot that was never written. `i32::MAX` is outside the valid
/// longitude range, so it can never collide with a stored location.
const UNDEFINED: Location = Location::new(i32::MAX, i32::MAX);

/// Bounded flat-array index addressed directly by node id.
///
/// Memory is fixed at construction (eight bytes per slot). Ids outside
/// `0..capacity` cannot be stored; looking them up reports absence.
#[derive(Debug, Clone)]
pub struct DenseLocationIndex {
    slots: Vec<Location>,
}

impl DenseLocationIndex {
    /// Allocate an index for node ids `0..capacity`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![UNDEFINED; capacity],
        }
    }

    /// Number of addressable slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, id: i64) -> Option<usize> {
        usize::try_from(id)
            .ok()
            .filter(|slot| *slot < self.slots.len())
    }
}

impl LocationIndex for DenseLocationIndex {
    fn put(&mut self, id: i64, location: Location) -> Result<(), LocationIndexError> {
        let capacity = self.slots.len();
        let entry = self
            .slot(id)
            .and_then(|slot| self.slots.get_mut(slot))
            .ok_or(LocationIndexError::IdOutOfRange { id, capacity })?;
        *entry = location;
        Ok(())
    }

    fn get(&self, id: i64) -> Result<Option<Location>, LocationIndexError> {
        Ok(self
            .slot(id)
            .and_then(|slot| self.slots.get(slot))
            .copied()
            .filter(|location| *location != UNDEFINED))
    }
}
