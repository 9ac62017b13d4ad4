//! Jobs of the analytics importer.
//!
//! - Retrieve (provider → monthly snapshot files)
//! - Ingest (snapshot files → resolution cache → bulk indexing)

pub mod ingest;
pub mod retrieve;

pub use ingest::*;
pub use retrieve::*;
