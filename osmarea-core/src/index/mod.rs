//! Node id to location lookup used by the resolver.
//!
//! The [`LocationIndex`] trait is the only contract the resolver relies on.
//! Two in-memory implementations live here; a disk-backed one is provided by
//! `osmarea-data` behind its `store-sqlite` feature.

use std::error::Error as StdError;

use thiserror::Error;

use crate::Location;

mod dense;
mod sparse;

pub use dense::DenseLocationIndex;
pub use sparse::SparseLocationIndex;

/// Errors raised by a [`LocationIndex`] implementation.
#[derive(Debug, Error)]
pub enum LocationIndexError {
    /// The id cannot be stored by a bounded index.
    #[error("node id {id} is outside the index capacity of {capacity}")]
    IdOutOfRange {
        /// Offending node id.
        id: i64,
        /// Number of slots the index was created with.
        capacity: usize,
    },
    /// The storage backend failed.
    #[error("location index backend failed during {operation}")]
    Backend {
        /// Operation that failed, e.g. `"put"`.
        operation: &'static str,
        /// Underlying backend error.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

/// Single-consumer mapping from node id to [`Location`].
///
/// Inserts may be interleaved with lookups. Implementations must distinguish
/// an absent id from a node stored at `(0, 0)`.
///
/// # Examples
/// ```
/// use osmarea_core::{Location, LocationIndex, SparseLocationIndex};
///
/// # fn main() -> Result<(), osmarea_core::LocationIndexError> {
/// let mut index = SparseLocationIndex::default();
/// index.put(1, Location::new(0, 0))?;
/// assert_eq!(index.get(1)?, Some(Location::new(0, 0)));
/// assert_eq!(index.get(2)?, None);
/// # Ok(())
/// # }
/// ```
pub trait LocationIndex {
    /// Store or overwrite the location for `id`.
    ///
    /// # Errors
    /// Returns [`LocationIndexError`] when the id cannot be stored or the
    /// backend fails.
    fn put(&mut self, id: i64, location: Location) -> Result<(), LocationIndexError>;

    /// Look up the location for `id`; `Ok(None)` when never inserted.
    ///
    /// # Errors
    /// Returns [`LocationIndexError::Backend`] when the backend fails.
    fn get(&self, id: i64) -> Result<Option<Location>, LocationIndexError>;

    /// Make buffered writes durable. Called at every pipeline checkpoint.
    ///
    /// # Errors
    /// Returns [`LocationIndexError::Backend`] when the backend fails.
    fn checkpoint(&mut self) -> Result<(), LocationIndexError> {
        Ok(())
    }
}

impl<T: LocationIndex + ?Sized> LocationIndex for &mut T {
    fn put(&mut self, id: i64, location: Location) -> Result<(), LocationIndexError> {
        (**self).put(id, location)
    }

    fn get(&self, id: i64) -> Result<Option<Location>, LocationIndexError> {
        (**self).get(id)
    }

    fn checkpoint(&mut self) -> Result<(), LocationIndexError> {
        (**self).checkpoint()
    }
}

impl<T: LocationIndex + ?Sized> LocationIndex for Box<T> {
    fn put(&mut self, id: i64, location: Location) -> Result<(), LocationIndexError> {
        (**self).put(id, location)
    }

    fn get(&self, id: i64) -> Result<Option<Location>, LocationIndexError> {
        (**self).get(id)
    }

    fn checkpoint(&mut self) -> Result<(), LocationIndexError> {
        (**self).checkpoint()
    }
}
