//! Unified error types for the analytics importer.
//!
//! Every variant belongs to one of the failure categories below:
//! - Transport: provider could not be reached or answered badly (recovered per day)
//! - MalformedInput: a raw entry or snapshot does not have the expected shape
//! - ResolutionMiss: an identifier is absent from the resolution cache
//! - Backend: the record store or the indexing backend failed
//! - Local: filesystem, serialization, or configuration problems

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transport,
    MalformedInput,
    ResolutionMiss,
    Backend,
    Local,
}

impl ErrorCategory {
    /// Get the category name used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::MalformedInput => "malformed_input",
            Self::ResolutionMiss => "resolution_miss",
            Self::Backend => "backend",
            Self::Local => "local",
        }
    }
}

/// Unified error type for the analytics importer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider response error: {0}")]
    ProviderResponse(String),

    /// Label does not match the pattern expected for its metric.
    #[error("malformed label {label:?}: {reason}")]
    MalformedLabel { label: String, reason: String },

    #[error("invalid counts: {0}")]
    InvalidCounts(String),

    #[error("invalid day: {0}")]
    InvalidDay(String),

    /// Lookup against the resolution cache failed.
    #[error("not found in resolution cache: {0}")]
    CacheMiss(String),

    #[error("record store error: {0}")]
    RecordStore(String),

    #[error("index error: {0}")]
    Index(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn provider_response(msg: impl Into<String>) -> Self {
        Self::ProviderResponse(msg.into())
    }

    pub fn malformed_label(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedLabel {
            label: label.into(),
            reason: reason.into(),
        }
    }

    pub fn cache_miss(msg: impl Into<String>) -> Self {
        Self::CacheMiss(msg.into())
    }

    pub fn record_store(msg: impl Into<String>) -> Self {
        Self::RecordStore(msg.into())
    }

    pub fn index(msg: impl Into<String>) -> Self {
        Self::Index(msg.into())
    }

    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::Snapshot(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Get the failure category for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) | Self::ProviderResponse(_) => ErrorCategory::Transport,
            Self::MalformedLabel { .. } => ErrorCategory::MalformedInput,
            Self::InvalidCounts(_) => ErrorCategory::MalformedInput,
            Self::InvalidDay(_) => ErrorCategory::MalformedInput,
            Self::Snapshot(_) => ErrorCategory::MalformedInput,
            Self::CacheMiss(_) => ErrorCategory::ResolutionMiss,
            Self::RecordStore(_) | Self::Index(_) => ErrorCategory::Backend,
            Self::Config(_) | Self::Io(_) | Self::Serialization(_) => ErrorCategory::Local,
        }
    }

    /// Whether the error is absorbed locally instead of stopping a run.
    ///
    /// Only provider failures qualify: a failed day becomes an empty day.
    pub fn is_recoverable(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }
}
