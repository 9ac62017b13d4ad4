//! Translation of external record ids and file keys into storage identifiers.
//!
//! The [`ResolutionCache`] is built once per ingestion run from the exact
//! working set of the run and answers lookups without further queries.

pub mod cache;
pub mod config;
pub mod invenio;
pub mod store;

pub use cache::*;
pub use config::*;
pub use invenio::InvenioRecordStore;
pub use store::*;
