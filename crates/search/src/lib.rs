//! Bulk indexing of statistics documents.

pub mod bulk;
pub mod client;
pub mod config;

pub use bulk::*;
pub use client::*;
pub use config::*;
