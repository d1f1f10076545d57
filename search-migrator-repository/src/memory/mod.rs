//! In-memory index store used by tests.
//!
//! Behaves like the real engine for the operations the migrator needs:
//! writes create indices implicitly and replace documents by id, searches
//! return sorted hits plus an exact total, copies overwrite matching ids in
//! the destination, and deleting a missing index succeeds.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::interfaces::IndexStore;
use crate::types::{SearchPage, SortOrder};
use search_migrator_shared::{Document, ID_FIELD};

type IndexMap = HashMap<String, BTreeMap<u64, Document>>;

/// In-memory stand-in for the search engine.
///
/// Sorting is supported on the id field only. Failure injection knobs let
/// tests target one index with write failures or slow every write down to
/// trip a deadline.
#[derive(Default)]
pub struct MemoryIndexStore {
    indices: RwLock<IndexMap>,
    fail_writes_to: RwLock<Option<String>>,
    put_delay: RwLock<Option<Duration>>,
    puts: AtomicUsize,
    searches: AtomicUsize,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write to `index` fail with `WriteFailed`.
    pub fn fail_writes_to(&self, index: impl Into<String>) {
        *self
            .fail_writes_to
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(index.into());
    }

    /// Sleep for `delay` before applying each write.
    pub fn set_put_delay(&self, delay: Duration) {
        *self
            .put_delay
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(delay);
    }

    /// Number of writes that reached an index.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of searches executed.
    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    /// Number of documents currently in `index`, or 0 if it does not exist.
    pub fn len(&self, index: &str) -> usize {
        self.indices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Whether `index` exists, even if empty.
    pub fn has_index(&self, index: &str) -> bool {
        self.indices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(index)
    }

    /// Whether `index` holds a document with the given id.
    pub fn contains(&self, index: &str, id: u64) -> bool {
        self.indices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .map(|docs| docs.contains_key(&id))
            .unwrap_or(false)
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn put_document(&self, index: &str, document: &Document) -> Result<(), StoreError> {
        let delay = *self
            .put_delay
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .fail_writes_to
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if failing.as_deref() == Some(index) {
            return Err(StoreError::write(index, document.id, "injected write failure"));
        }

        self.puts.fetch_add(1, Ordering::SeqCst);
        self.indices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(index.to_string())
            .or_default()
            .insert(document.id, document.clone());
        Ok(())
    }

    async fn search(
        &self,
        index: &str,
        sort_field: &str,
        order: SortOrder,
        limit: usize,
    ) -> Result<SearchPage, StoreError> {
        self.searches.fetch_add(1, Ordering::SeqCst);

        if sort_field != ID_FIELD {
            return Err(StoreError::query(
                index,
                format!("unsupported sort field '{}'", sort_field),
            ));
        }

        let indices = self.indices.read().unwrap_or_else(PoisonError::into_inner);
        let docs = indices
            .get(index)
            .ok_or_else(|| StoreError::query(index, "index not found"))?;

        let hits: Vec<Document> = match order {
            SortOrder::Desc => docs.values().rev().take(limit).cloned().collect(),
            SortOrder::Asc => docs.values().take(limit).cloned().collect(),
        };

        Ok(SearchPage {
            hits,
            total: docs.len() as u64,
        })
    }

    async fn copy_index(&self, source: &str, dest: &str) -> Result<(), StoreError> {
        let mut indices = self.indices.write().unwrap_or_else(PoisonError::into_inner);

        let source_docs = indices
            .get(source)
            .ok_or_else(|| StoreError::copy(source, dest, "source index not found"))?
            .clone();

        indices
            .entry(dest.to_string())
            .or_default()
            .extend(source_docs);
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), StoreError> {
        self.indices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(index);
        Ok(())
    }

    async fn ensure_index(&self, index: &str) -> Result<(), StoreError> {
        self.indices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(index.to_string())
            .or_default();
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
