//! Durable per-year storage.
//!
//! [`YearRepo`] is the portable surface used by the reconciler; the file
//! implementation lives in [`json_file`]. Contract:
//! - one file per year, at a path derived only from the year;
//! - `save` either replaces the whole file or leaves the old one intact;
//! - a missing or corrupt file loads as "no data", never as an error;
//! - a file written by a newer schema is an error, so it is never clobbered.

use std::{fs::File, io, path::PathBuf};

use crate::{grid::DailyGrid, store::YearStore};

mod format;
pub mod json_file;
pub mod pattern;

pub use format::SCHEMA_VERSION;
pub use json_file::JsonFileRepo;
pub use pattern::{FilePattern, PatternError};

/// Persistence failures that stop a run.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Another process holds the year lock.
    #[error("{} is locked by another run", path.display())]
    Locked {
        /// Lock file.
        path: PathBuf,
    },
    /// Filesystem failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Store could not be serialized.
    #[error("failed to encode year {year}: {source}")]
    Encode {
        /// Year being saved.
        year: i32,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// File was written by a newer schema version.
    #[error("{} uses schema version {found}, this build supports up to {supported}", path.display())]
    UnsupportedSchema {
        /// Offending file.
        path: PathBuf,
        /// Version in the file.
        found: u32,
        /// Newest version this build understands.
        supported: u32,
    },
}

impl PersistError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result of reading a year.
#[derive(Debug)]
pub enum LoadOutcome {
    /// No file for that year.
    Missing,
    /// File decoded and validated.
    Loaded(YearStore),
    /// File exists but cannot be trusted; the reason is attached.
    Corrupt(String),
}

/// Exclusive access to one year. Released on drop.
#[derive(Debug)]
pub struct YearLock {
    _file: Option<File>,
}

impl YearLock {
    pub(crate) fn held(file: File) -> Self {
        Self { _file: Some(file) }
    }

    /// A lock that guards nothing, for repos without shared state.
    pub fn detached() -> Self {
        Self { _file: None }
    }
}

/// Storage for year stores.
pub trait YearRepo: Send + Sync {
    /// Take the exclusive lock for `year`; fails fast if it is taken.
    fn lock(&self, year: i32) -> Result<YearLock, PersistError>;

    /// Read the stored year.
    fn load(&self, year: i32) -> Result<LoadOutcome, PersistError>;

    /// Replace the stored year with `store`.
    fn save(&self, store: &YearStore) -> Result<(), PersistError>;

    /// Move an untrusted year file out of the way so the next save starts clean.
    fn quarantine(&self, year: i32) -> Result<(), PersistError>;

    /// Years that have a stored file, ascending.
    fn years_available(&self) -> Result<Vec<i32>, PersistError>;

    /// The stored year, or an empty store on `grid` if there is none or it is corrupt.
    fn get(&self, year: i32, grid: DailyGrid) -> Result<YearStore, PersistError> {
        match self.load(year)? {
            LoadOutcome::Loaded(store) => Ok(store),
            LoadOutcome::Missing | LoadOutcome::Corrupt(_) => Ok(YearStore::new(year, grid)),
        }
    }
}
