//! Telemetry for the analytics importer.
//!
//! Structured logging through `tracing`, plus in-process counters that are
//! summarised in the log at the end of every command.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::*;
pub use tracing_setup::*;
