//! Store error types.
//!
//! This module defines the error types that can occur during index store
//! operations.

use thiserror::Error;

/// Errors that can occur during index store operations.
///
/// Write, query, copy, and delete failures carry the index they targeted so
/// callers can tell which side of a dual-write or migration step failed.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Failed to establish connection to the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to write a document to an index.
    #[error("Write to '{index}' failed for document {id}: {cause}")]
    WriteFailed {
        index: String,
        id: u64,
        cause: String,
    },

    /// A query against an index failed.
    #[error("Query against '{index}' failed: {cause}")]
    QueryFailed { index: String, cause: String },

    /// A server-side index copy failed to start.
    #[error("Copy from '{source}' to '{dest}' failed: {cause}")]
    CopyFailed {
        // `r#source` opts out of thiserror's source() detection; the field
        // name is still `source` for constructors and matchers.
        r#source: String,
        dest: String,
        cause: String,
    },

    /// Failed to delete an index.
    #[error("Delete of '{index}' failed: {cause}")]
    DeleteFailed { index: String, cause: String },

    /// Failed to create an index or its mappings.
    #[error("Index setup error: {0}")]
    SetupFailed(String),

    /// Failed to parse a response from the search engine.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl StoreError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a write error for a single document.
    pub fn write(index: impl Into<String>, id: u64, cause: impl Into<String>) -> Self {
        Self::WriteFailed {
            index: index.into(),
            id,
            cause: cause.into(),
        }
    }

    /// Create a query error.
    pub fn query(index: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::QueryFailed {
            index: index.into(),
            cause: cause.into(),
        }
    }

    /// Create a copy error.
    pub fn copy(
        source: impl Into<String>,
        dest: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self::CopyFailed {
            source: source.into(),
            dest: dest.into(),
            cause: cause.into(),
        }
    }

    /// Create a delete error.
    pub fn delete(index: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::DeleteFailed {
            index: index.into(),
            cause: cause.into(),
        }
    }

    /// Create a setup error.
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::SetupFailed(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }
}
