//! Index store trait definition.
//!
//! This module defines the abstract interface for the search engine
//! operations the migrator needs, allowing for different backend
//! implementations (OpenSearch, in-memory, etc.).

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::types::{SearchPage, SortOrder};
use search_migrator_shared::Document;

/// Abstract interface for the index operations used during a migration.
///
/// Every method takes the target index by name. Callers resolve names from
/// the routing table per call, so an implementation must not cache or pin an
/// index across calls.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, StoreError>` for consistent error handling.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Write a single document to the named index.
    ///
    /// The document id doubles as the engine document id, so writing the
    /// same document twice replaces it rather than duplicating it. The
    /// index is created implicitly by the engine if it does not exist.
    ///
    /// # Arguments
    ///
    /// * `index` - The index to write to
    /// * `document` - The document to store
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the document was accepted
    /// * `Err(StoreError::WriteFailed)` - If the write fails
    async fn put_document(&self, index: &str, document: &Document) -> Result<(), StoreError>;

    /// Query the named index, sorted on one field.
    ///
    /// Returns up to `limit` documents plus the total number of documents
    /// matching across the whole index. The total is exact, not the
    /// engine's default capped estimate.
    ///
    /// # Arguments
    ///
    /// * `index` - The index to query
    /// * `sort_field` - The document field to sort on
    /// * `order` - Sort direction
    /// * `limit` - Maximum number of hits to return
    async fn search(
        &self,
        index: &str,
        sort_field: &str,
        order: SortOrder,
        limit: usize,
    ) -> Result<SearchPage, StoreError>;

    /// Start a server-side copy of every document from `source` to `dest`.
    ///
    /// The copy runs inside the engine; this call returns once the engine
    /// has accepted the task, not when the copy completes. Callers verify
    /// completion by comparing the two indices afterwards.
    ///
    /// Documents already present in `dest` with matching ids are
    /// overwritten, so rerunning a copy is safe.
    async fn copy_index(&self, source: &str, dest: &str) -> Result<(), StoreError>;

    /// Delete the named index and all of its documents.
    ///
    /// Deleting an index that does not exist is not an error, so retiring
    /// an already-retired index is safe.
    async fn delete_index(&self, index: &str) -> Result<(), StoreError>;

    /// Ensure the named index exists with the migrator's mappings.
    ///
    /// Creates the index if missing; an index that already exists is left
    /// untouched.
    async fn ensure_index(&self, index: &str) -> Result<(), StoreError>;

    /// Check if the search engine is healthy and reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the search engine is healthy
    /// * `Ok(false)` - If the search engine is unhealthy
    /// * `Err(StoreError)` - If the health check fails to execute
    async fn health_check(&self) -> Result<bool, StoreError>;
}
