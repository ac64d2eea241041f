//! Disk-backed [`LocationIndex`] for inputs whose node table does not fit in
//! memory.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use log::{debug, warn};
use osmarea_core::{Location, LocationIndex, LocationIndexError};
use rusqlite::{Connection, Error as SqliteError, OptionalExtension};
use tempfile::TempPath;
use thiserror::Error;

/// Writes grouped into one transaction unless a checkpoint commits earlier.
pub const DEFAULT_BATCH_SIZE: usize = 50_000;

/// Errors raised while creating a [`SqliteLocationIndex`].
#[derive(Debug, Error)]
pub enum SqliteIndexError {
    /// Failed to create the parent directory for the database.
    #[error("failed to create parent directory {path:?}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Failed to create a temporary database file.
    #[error("failed to create a temporary location database")]
    TempFile {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path:?}")]
    Open {
        /// Database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Creating the `locations` table failed.
    #[error("failed to create locations table")]
    CreateSchema {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

/// Node locations stored in a single SQLite table.
///
/// Writes are grouped into transactions of `batch_size` rows. A pipeline
/// checkpoint commits the open transaction so every location written before
/// a `flush` is durable.
///
/// # Examples
/// ```
/// use osmarea_core::{Location, LocationIndex};
/// use osmarea_data::SqliteLocationIndex;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut index = SqliteLocationIndex::temporary()?;
/// index.put(7, Location::new(10, 20))?;
/// assert_eq!(index.get(7)?, Some(Location::new(10, 20)));
/// assert_eq!(index.get(8)?, None);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SqliteLocationIndex {
    connection: Connection,
    batch_size: usize,
    pending: usize,
    path: Utf8PathBuf,
    _temporary: Option<TempPath>,
}

impl SqliteLocationIndex {
    /// Open or create an index at `path`, creating parent directories.
    ///
    /// Rows left by an earlier run are deleted, so every lookup is answered
    /// from nodes written through this handle.
    ///
    /// # Errors
    /// Returns [`SqliteIndexError`] when the directory, database or schema
    /// cannot be created.
    pub fn open(path: &Utf8Path) -> Result<Self, SqliteIndexError> {
        ensure_parent_dir(path)?;
        Self::connect(path.to_path_buf(), None)
    }

    /// Create an index in a temporary file removed when the index is dropped.
    ///
    /// # Errors
    /// Returns [`SqliteIndexError`] when the file or schema cannot be created.
    pub fn temporary() -> Result<Self, SqliteIndexError> {
        let temporary = tempfile::Builder::new()
            .prefix("osmarea-locations")
            .suffix(".sqlite")
            .tempfile()
            .map_err(|source| SqliteIndexError::TempFile { source })?
            .into_temp_path();
        let path = Utf8PathBuf::from_path_buf(temporary.to_path_buf()).map_err(|path| {
            SqliteIndexError::TempFile {
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("temporary path {} is not UTF-8", path.display()),
                ),
            }
        })?;
        Self::connect(path, Some(temporary))
    }

    fn connect(path: Utf8PathBuf, temporary: Option<TempPath>) -> Result<Self, SqliteIndexError> {
        let connection =
            Connection::open(path.as_std_path()).map_err(|source| SqliteIndexError::Open {
                path: path.clone(),
                source,
            })?;
        connection
            .execute_batch(
                "PRAGMA synchronous = OFF;
                 CREATE TABLE IF NOT EXISTS locations (
                     id INTEGER PRIMARY KEY,
                     x INTEGER NOT NULL,
                     y INTEGER NOT NULL
                 );
                 DELETE FROM locations;",
            )
            .map_err(|source| SqliteIndexError::CreateSchema { source })?;
        debug!("opened location index at {path}");
        Ok(Self {
            connection,
            batch_size: DEFAULT_BATCH_SIZE,
            pending: 0,
            path,
            _temporary: temporary,
        })
    }

    /// Change how many writes share one transaction. Zero is treated as one.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Database file backing the index.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Writes not yet committed.
    #[must_use]
    pub const fn pending_writes(&self) -> usize {
        self.pending
    }

    fn commit(&mut self) -> Result<(), LocationIndexError> {
        if self.connection.is_autocommit() {
            return Ok(());
        }
        self.connection
            .execute_batch("COMMIT")
            .map_err(|source| backend("commit", source))?;
        self.pending = 0;
        Ok(())
    }
}

fn backend(operation: &'static str, source: SqliteError) -> LocationIndexError {
    LocationIndexError::Backend {
        operation,
        source: Box::new(source),
    }
}

impl LocationIndex for SqliteLocationIndex {
    fn put(&mut self, id: i64, location: Location) -> Result<(), LocationIndexError> {
        if self.connection.is_autocommit() {
            self.connection
                .execute_batch("BEGIN")
                .map_err(|source| backend("begin", source))?;
        }
        self.connection
            .prepare_cached("INSERT OR REPLACE INTO locations (id, x, y) VALUES (?1, ?2, ?3)")
            .and_then(|mut statement| statement.execute((id, location.x, location.y)))
            .map_err(|source| backend("put", source))?;
        self.pending = self.pending.saturating_add(1);
        if self.pending >= self.batch_size {
            self.commit()?;
        }
        Ok(())
    }

    fn get(&self, id: i64) -> Result<Option<Location>, LocationIndexError> {
        self.connection
            .prepare_cached("SELECT x, y FROM locations WHERE id = ?1")
            .and_then(|mut statement| {
                statement
                    .query_row([id], |row| Ok(Location::new(row.get(0)?, row.get(1)?)))
                    .optional()
            })
            .map_err(|source| backend("get", source))
    }

    fn checkpoint(&mut self) -> Result<(), LocationIndexError> {
        self.commit()
    }
}

impl Drop for SqliteLocationIndex {
    fn drop(&mut self) {
        if let Err(err) = self.commit() {
            warn!("discarding uncommitted locations in {}: {err}", self.path);
        }
    }
}

fn ensure_parent_dir(path: &Utf8Path) -> Result<(), SqliteIndexError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }

    let (base, relative) = if parent.is_absolute() {
        ("/", parent.strip_prefix("/").unwrap_or(parent))
    } else {
        (".", parent)
    };
    let create = |source| SqliteIndexError::CreateDirectory {
        path: parent.to_path_buf(),
        source,
    };
    fs_utf8::Dir::open_ambient_dir(base, ambient_authority())
        .map_err(create)?
        .create_dir_all(relative)
        .map_err(create)
}
