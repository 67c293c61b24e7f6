//! Snapshot persistence for the library.
//!
//! State is checkpointed as a single JSON file: a versioned [`Snapshot`] of
//! the whole catalog and membership, written by [`JsonStore`]. The domain
//! types in [`crate::domain`] know nothing about any of this.

pub mod snapshot;
pub use snapshot::{Snapshot, SnapshotError};

pub mod store;
pub use store::{JsonStore, LoadError, SaveError};
