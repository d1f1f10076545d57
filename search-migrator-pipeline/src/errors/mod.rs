//! Error types for the search migrator pipeline.

use std::time::Duration;

use search_migrator_repository::StoreError;
use thiserror::Error;

/// Errors that can occur in the migrator pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error from the index store.
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// A background task panicked or was aborted.
    #[error("Task join error: {0}")]
    JoinError(String),

    /// Work was cancelled after a sibling worker failed.
    #[error("Ingest cancelled")]
    Cancelled,

    /// Two indices failed to converge within the allowed time.
    #[error("Indices '{left}' and '{right}' did not converge within {waited:?}")]
    ConvergenceTimeout {
        left: String,
        right: String,
        waited: Duration,
    },
}

impl PipelineError {
    /// Create a channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::ChannelError(msg.into())
    }

    /// Create a join error.
    pub fn join(msg: impl Into<String>) -> Self {
        Self::JoinError(msg.into())
    }
}
