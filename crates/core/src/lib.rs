//! Core types, label parsing, and statistics documents for the analytics importer.

pub mod days;
pub mod document;
pub mod entry;
pub mod error;
pub mod snapshot;

pub use days::*;
pub use document::*;
pub use entry::*;
pub use error::{Error, ErrorCategory, Result};
pub use snapshot::{entries_from_paths, Snapshot, SnapshotEntries};
