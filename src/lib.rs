//! Library lending and catalog management.
//!
//! A [`Library`] holds the catalog and membership in memory and is the sole
//! authority for borrowing and returning; [`JsonStore`] checkpoints the
//! whole state to a JSON snapshot file.

pub mod domain;
pub use domain::{Book, Config, Fee, Isbn, Library, Member, MemberId};

/// Snapshot persistence.
pub mod storage;
pub use storage::{JsonStore, LoadError, SaveError, Snapshot};
