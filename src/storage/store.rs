//! A JSON-file backed store for library snapshots.
//!
//! The [`JsonStore`] is the only component that touches the filesystem. The
//! in-memory [`Library`] is the source of truth during a session; the file
//! is a checkpoint written after each state change, never read back
//! mid-session.

use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use thiserror::Error;

use super::snapshot::{Snapshot, SnapshotError};
use crate::domain::Library;

/// A snapshot file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonStore {
    path: PathBuf,
}

/// Errors from loading a snapshot file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No snapshot file exists at the store's path.
    ///
    /// Callers usually treat this as "start with an empty library" rather
    /// than an error.
    #[error("no snapshot file found")]
    NotFound,
    /// The file exists but could not be read.
    #[error("failed to read snapshot: {0}")]
    Io(#[from] io::Error),
    /// The file is not valid snapshot JSON.
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The file parsed but violates a lending invariant.
    #[error("inconsistent snapshot: {0}")]
    Invalid(#[from] SnapshotError),
}

/// Errors from writing a snapshot file.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The snapshot could not be serialized.
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The file could not be written.
    #[error("failed to write snapshot: {0}")]
    Io(#[from] io::Error),
}

impl JsonStore {
    /// Creates a store for the snapshot file at `path`.
    ///
    /// Nothing is read or written until [`Self::load`] or [`Self::save`] is
    /// called.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and validates the snapshot file into a [`Library`].
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotFound`] if the file does not exist,
    /// [`LoadError::Malformed`] if it is not valid snapshot JSON, and
    /// [`LoadError::Invalid`] if it violates a lending invariant.
    pub fn load(&self) -> Result<Library, LoadError> {
        let file = File::open(&self.path).map_err(|io_error| match io_error.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound,
            _ => LoadError::Io(io_error),
        })?;

        let snapshot: Snapshot = serde_json::from_reader(BufReader::new(file))?;
        let library = Library::try_from(snapshot)?;

        tracing::debug!(
            path = %self.path.display(),
            titles = library.books().count(),
            members = library.members().count(),
            "loaded snapshot"
        );
        Ok(library)
    }

    /// Loads the snapshot file, starting a fresh library named `name` if no
    /// file exists yet.
    ///
    /// # Errors
    ///
    /// Propagates every [`LoadError`] except [`LoadError::NotFound`].
    pub fn load_or_create(&self, name: &str) -> Result<Library, LoadError> {
        match self.load() {
            Err(LoadError::NotFound) => {
                tracing::debug!(path = %self.path.display(), "no snapshot yet, starting empty");
                Ok(Library::new(name))
            }
            other => other,
        }
    }

    /// Writes the library as a pretty-printed JSON snapshot.
    ///
    /// The whole state is rewritten on every save; there are no partial
    /// writes.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError`] if serialization or the file write fails.
    pub fn save(&self, library: &Library) -> Result<(), SaveError> {
        let snapshot = Snapshot::from(library);
        let content = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(&self.path, content)?;

        tracing::debug!(path = %self.path.display(), "saved snapshot");
        Ok(())
    }
}
