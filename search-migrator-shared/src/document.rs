//! Document model for the search migrator.
//!
//! A document is created once by a producer and never mutated afterwards.
//! Its `id` is the idempotency key for every write path in the system.

use serde::{Deserialize, Serialize};

/// Serialized name of the [`Document::id`] field.
///
/// The index mapping, the latest-document query, and the progress observer
/// all sort on this field, so it must stay in step with the serde field
/// name below.
pub const ID_FIELD: &str = "id";

/// A document flowing through the ingest pipeline.
///
/// The `id` doubles as the engine document id, which makes re-indexing the
/// same document an overwrite instead of a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Producer-assigned ordinal; unique per logical document.
    pub id: u64,
    /// Opaque document content.
    pub message: String,
}

impl Document {
    /// Create a new document.
    pub fn new(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }
}
