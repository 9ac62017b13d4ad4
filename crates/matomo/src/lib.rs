//! Matomo aggregate analytics retrieval.
//!
//! - [`MatomoClient`]: one request per (metric, day), never fails a run
//! - [`retriever`]: concurrent per-day fan-out and monthly snapshots

pub mod client;
pub mod config;
pub mod retriever;

pub use client::*;
pub use config::*;
pub use retriever::*;
