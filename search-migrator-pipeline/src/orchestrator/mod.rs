//! Orchestrator module for the search migrator pipeline.
//!
//! Drives a migration step by step: each routing field is switched on its
//! own, the bulk copy is started, and the old index is retired at the end.
//! The orchestrator never pauses ingestion; correctness between steps comes
//! from dual-writing plus the convergence checks run by the caller.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::errors::PipelineError;
use search_migrator_repository::IndexStore;
use search_migrator_shared::{RoutingSnapshot, RoutingTable};

/// Orchestrator for online index migrations.
///
/// The expected sequence for moving from index A to index B:
///
/// 1. `set_secondary_index(Some("b"))` - dual-writing begins
/// 2. `reindex("a", "b")` - bulk copy of the backlog starts
/// 3. wait for convergence (see `ProgressObserver::await_convergence`)
/// 4. `set_read_index("b")` - queries move to the new index
/// 5. `set_primary_index("b")` then `set_secondary_index(None)`
/// 6. `retire_index("a")`
///
/// Each step is independently observable by the ingest workers, so a
/// document written mid-step may see a mix of the old and new routing.
/// Dual-writing through steps 1-5 is what keeps both indices complete
/// while that window is open.
pub struct MigrationOrchestrator {
    store: Arc<dyn IndexStore>,
    routing: Arc<RoutingTable>,
}

impl MigrationOrchestrator {
    /// Create a new orchestrator over the given store and routing table.
    pub fn new(store: Arc<dyn IndexStore>, routing: Arc<RoutingTable>) -> Self {
        Self { store, routing }
    }

    /// Point queries at a different index.
    pub fn set_read_index(&self, index: &str) {
        let from = self.routing.read_index();
        self.routing.set_read_index(index);
        info!(from = %from, to = %index, "Read index switched");
    }

    /// Point primary writes at a different index.
    pub fn set_primary_index(&self, index: &str) {
        let from = self.routing.primary_index();
        self.routing.set_primary_index(index);
        info!(from = %from, to = %index, "Primary index switched");
    }

    /// Enable dual-writing to `index`, or disable it with `None`.
    pub fn set_secondary_index(&self, index: Option<&str>) {
        let from = self.routing.secondary_index();
        self.routing.set_secondary_index(index.map(String::from));
        match index {
            Some(index) => info!(from = ?from, to = %index, "Dual-writing enabled"),
            None => info!(from = ?from, "Dual-writing disabled"),
        }
    }

    /// Start a bulk copy of `source` into `dest`.
    ///
    /// The destination index is created first so the copy lands on the
    /// migrator's mappings rather than engine defaults. The copy itself
    /// runs server-side; this returns once it is accepted. Callers gate the
    /// next migration step on convergence, not on this call.
    #[instrument(skip(self))]
    pub async fn reindex(&self, source: &str, dest: &str) -> Result<(), PipelineError> {
        self.store.ensure_index(dest).await?;
        self.store.copy_index(source, dest).await?;

        info!(source = %source, dest = %dest, "Bulk copy started");
        Ok(())
    }

    /// Delete a retired index and all of its documents.
    ///
    /// Retiring an index the routing table still references is almost
    /// always an operator mistake; it is logged loudly but not blocked,
    /// since the table cannot tell a mistake from an intentional rollback
    /// cleanup. Deleting an index that is already gone succeeds.
    #[instrument(skip(self))]
    pub async fn retire_index(&self, index: &str) -> Result<(), PipelineError> {
        if self.routing.references(index) {
            warn!(
                index = %index,
                routing = ?self.routing.snapshot(),
                "Retiring an index the routing table still references"
            );
        }

        self.store.delete_index(index).await?;

        info!(index = %index, "Index retired");
        Ok(())
    }

    /// Copy of the current routing state, for logging and assertions.
    pub fn routing_snapshot(&self) -> RoutingSnapshot {
        self.routing.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{IngestConfig, IngestPool};
    use crate::observer::{ObserverConfig, ProgressObserver};
    use search_migrator_repository::MemoryIndexStore;
    use search_migrator_shared::Document;
    use std::time::Duration;

    async fn seed(store: &MemoryIndexStore, index: &str, ids: std::ops::RangeInclusive<u64>) {
        for id in ids {
            store
                .put_document(index, &Document::new(id, format!("msg {}", id)))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_routing_switches_are_independent() {
        let store = Arc::new(MemoryIndexStore::new());
        let routing = Arc::new(RoutingTable::new("a"));
        let orchestrator = MigrationOrchestrator::new(store, routing.clone());

        orchestrator.set_secondary_index(Some("b"));
        assert_eq!(routing.primary_index(), "a");
        assert_eq!(routing.read_index(), "a");
        assert_eq!(routing.secondary_index(), Some("b".to_string()));

        orchestrator.set_read_index("b");
        assert_eq!(routing.primary_index(), "a");
        assert_eq!(routing.read_index(), "b");

        orchestrator.set_primary_index("b");
        orchestrator.set_secondary_index(None);
        assert_eq!(
            orchestrator.routing_snapshot(),
            RoutingSnapshot {
                read_index: "b".to_string(),
                primary_index: "b".to_string(),
                secondary_index: None,
            }
        );
    }

    #[tokio::test]
    async fn test_reindex_creates_dest_and_copies() {
        let store = Arc::new(MemoryIndexStore::new());
        seed(&store, "a", 1..=5).await;
        let routing = Arc::new(RoutingTable::new("a"));
        let orchestrator = MigrationOrchestrator::new(store.clone(), routing);

        orchestrator.reindex("a", "b").await.unwrap();

        assert!(store.has_index("b"));
        assert_eq!(store.len("b"), 5);
    }

    #[tokio::test]
    async fn test_retire_is_idempotent() {
        let store = Arc::new(MemoryIndexStore::new());
        seed(&store, "old", 1..=3).await;
        let routing = Arc::new(RoutingTable::new("current"));
        let orchestrator = MigrationOrchestrator::new(store.clone(), routing);

        orchestrator.retire_index("old").await.unwrap();
        assert!(!store.has_index("old"));

        // A second retire finds nothing to delete and still succeeds.
        orchestrator.retire_index("old").await.unwrap();
    }

    #[tokio::test]
    async fn test_retire_of_referenced_index_proceeds() {
        let store = Arc::new(MemoryIndexStore::new());
        seed(&store, "a", 1..=3).await;
        let routing = Arc::new(RoutingTable::new("a"));
        let orchestrator = MigrationOrchestrator::new(store.clone(), routing);

        // Warned about, but not blocked.
        orchestrator.retire_index("a").await.unwrap();

        assert!(!store.has_index("a"));
    }

    /// Full migration from index "a" to index "b" with ingestion running
    /// through every step.
    #[tokio::test]
    async fn test_full_migration_keeps_both_indices_complete() {
        let store = Arc::new(MemoryIndexStore::new());
        let routing = Arc::new(RoutingTable::new("a"));
        let orchestrator = MigrationOrchestrator::new(store.clone(), routing.clone());
        let pool = IngestPool::with_config(
            store.clone(),
            routing.clone(),
            IngestConfig {
                workers: 2,
                write_timeout: Duration::from_secs(5),
            },
        );
        let observer = ProgressObserver::with_config(
            store.clone(),
            ObserverConfig {
                poll_interval: Duration::from_millis(5),
            },
        );

        // Steady state: documents land in "a" only.
        for id in 1..=50 {
            pool.ingest_one(&Document::new(id, format!("msg {}", id)))
                .await
                .unwrap();
        }
        assert_eq!(store.len("a"), 50);

        // Step 1: dual-write. New documents land in both indices.
        orchestrator.set_secondary_index(Some("b"));
        for id in 51..=60 {
            pool.ingest_one(&Document::new(id, format!("msg {}", id)))
                .await
                .unwrap();
        }
        assert_eq!(store.len("a"), 60);
        assert_eq!(store.len("b"), 10);

        // Step 2: bulk copy the backlog, then wait for convergence.
        orchestrator.reindex("a", "b").await.unwrap();
        let report = observer
            .await_convergence("a", "b", Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(report.left.total, 60);
        assert_eq!(report.right.latest_id, Some(60));

        // Step 3: reads move to "b" while dual-writing continues.
        orchestrator.set_read_index("b");
        for id in 61..=70 {
            pool.ingest_one(&Document::new(id, format!("msg {}", id)))
                .await
                .unwrap();
        }
        assert_eq!(store.len("a"), 70);
        assert_eq!(store.len("b"), 70);

        // Step 4: "b" becomes the only write target.
        orchestrator.set_primary_index("b");
        orchestrator.set_secondary_index(None);
        for id in 71..=72 {
            pool.ingest_one(&Document::new(id, format!("msg {}", id)))
                .await
                .unwrap();
        }
        assert_eq!(store.len("a"), 70);
        assert_eq!(store.len("b"), 72);

        // Step 5: retire the old index.
        orchestrator.retire_index("a").await.unwrap();
        assert!(!store.has_index("a"));

        let final_state = observer.sample("b").await.unwrap();
        assert_eq!(final_state.total, 72);
        assert_eq!(final_state.latest_id, Some(72));
        assert_eq!(
            orchestrator.routing_snapshot(),
            RoutingSnapshot {
                read_index: "b".to_string(),
                primary_index: "b".to_string(),
                secondary_index: None,
            }
        );
    }
}
