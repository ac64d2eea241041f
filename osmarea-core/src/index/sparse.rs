use std::collections::HashMap;

use super::{LocationIndex, LocationIndexError};
use crate::Location;

/// Unbounded hash-map backed index.
///
/// Suitable for extracts and for ids that are sparse or negative.
#[derive(Debug, Default, Clone)]
pub struct SparseLocationIndex {
    locations: HashMap<i64, Location>,
}

impl SparseLocationIndex {
    /// Create an index with room for `capacity` nodes before reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            locations: HashMap::with_capacity(capacity),
        }
    }

    /// Number of stored locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Is the index empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

impl LocationIndex for SparseLocationIndex {
    fn put(&mut self, id: i64, location: Location) -> Result<(), LocationIndexError> {
        self.locations.insert(id, location);
        Ok(())
    }

    fn get(&self, id: i64) -> Result<Option<Location>, LocationIndexError> {
        Ok(self.locations.get(&id).copied())
    }
}
