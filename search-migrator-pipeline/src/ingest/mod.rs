//! Ingest module for the search migrator pipeline.
//!
//! A pool of workers drains a bounded document queue and writes each
//! document to the indices named by the routing table: always the primary
//! index, plus the secondary index while dual-writing is enabled. Routing is
//! re-read per document, so a migration step flips where the very next
//! document lands without touching the workers.

use std::sync::Arc;

use futures::future;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time::{timeout_at, Duration, Instant};
use tracing::{debug, error, info, instrument};

use crate::errors::PipelineError;
use search_migrator_repository::{IndexStore, StoreError};
use search_migrator_shared::{Document, RoutingTable};

/// Configuration for the ingest pool.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Number of concurrent ingest workers.
    pub workers: usize,
    /// Time budget for writing one document to every routed index.
    pub write_timeout: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            write_timeout: Duration::from_secs(5),
        }
    }
}

/// Create the bounded document channel feeding the pool.
///
/// Capacity is twice the worker count; once the pool falls behind, sends
/// block and producers experience backpressure.
pub fn document_queue(workers: usize) -> (mpsc::Sender<Document>, mpsc::Receiver<Document>) {
    mpsc::channel(workers.max(1) * 2)
}

/// Worker pool that writes documents to the routed indices.
///
/// The pool is responsible for:
/// - Writing every document to the primary index
/// - Mirroring the write to the secondary index while one is configured
/// - Enforcing one write deadline per document across both writes
/// - Stopping all workers once any document fails
#[derive(Clone)]
pub struct IngestPool {
    store: Arc<dyn IndexStore>,
    routing: Arc<RoutingTable>,
    config: IngestConfig,
}

impl IngestPool {
    /// Create a new ingest pool with the default configuration.
    pub fn new(store: Arc<dyn IndexStore>, routing: Arc<RoutingTable>) -> Self {
        Self {
            store,
            routing,
            config: IngestConfig::default(),
        }
    }

    /// Create a new ingest pool with custom configuration.
    pub fn with_config(
        store: Arc<dyn IndexStore>,
        routing: Arc<RoutingTable>,
        config: IngestConfig,
    ) -> Self {
        Self {
            store,
            routing,
            config,
        }
    }

    /// Write one document to every index the routing table currently names.
    ///
    /// Routing is read once at entry, so a document observes one routing
    /// state even if a migration step lands mid-write. The primary write
    /// goes first; the secondary write only runs after the primary
    /// succeeded, and both share a single deadline. A failed or timed-out
    /// primary write is returned without attempting the secondary, and a
    /// failed secondary write does not undo the primary.
    #[instrument(skip(self, document), fields(id = document.id))]
    pub async fn ingest_one(&self, document: &Document) -> Result<(), PipelineError> {
        let primary = self.routing.primary_index();
        let secondary = self.routing.secondary_index();
        let deadline = Instant::now() + self.config.write_timeout;

        self.put_with_deadline(&primary, document, deadline).await?;

        if let Some(secondary) = secondary {
            self.put_with_deadline(&secondary, document, deadline).await?;
        }

        Ok(())
    }

    async fn put_with_deadline(
        &self,
        index: &str,
        document: &Document,
        deadline: Instant,
    ) -> Result<(), PipelineError> {
        match timeout_at(deadline, self.store.put_document(index, document)).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                Err(StoreError::write(index, document.id, "write deadline exceeded").into())
            }
        }
    }

    /// Run the pool until the queue closes or a document fails.
    ///
    /// Workers pull from the shared queue; whichever worker is free takes
    /// the next document. When any worker fails, the others are cancelled
    /// and the first failure is returned. When the queue is closed and
    /// drained, all workers exit and the number of ingested documents is
    /// returned.
    #[instrument(skip(self, receiver), fields(workers = self.config.workers))]
    pub async fn run(&self, receiver: mpsc::Receiver<Document>) -> Result<u64, PipelineError> {
        info!(workers = self.config.workers, "Starting ingest workers");

        let receiver = Arc::new(Mutex::new(receiver));
        let (trip_tx, _) = broadcast::channel(1);

        let mut handles = Vec::with_capacity(self.config.workers);
        for worker in 0..self.config.workers {
            let pool = self.clone();
            let receiver = receiver.clone();
            let trip_tx = trip_tx.clone();
            let trip_rx = trip_tx.subscribe();

            handles.push(tokio::spawn(async move {
                pool.worker_loop(worker, receiver, trip_rx, trip_tx).await
            }));
        }

        let mut ingested: u64 = 0;
        let mut first_error: Option<PipelineError> = None;
        for result in future::join_all(handles).await {
            match result {
                Ok(Ok(count)) => ingested += count,
                // Cancelled workers stopped because another one failed.
                Ok(Err(PipelineError::Cancelled)) => {}
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(PipelineError::join(e.to_string()));
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(ingested = ingested, "Ingest workers drained the queue");
                Ok(ingested)
            }
        }
    }

    async fn worker_loop(
        &self,
        worker: usize,
        receiver: Arc<Mutex<mpsc::Receiver<Document>>>,
        mut trip_rx: broadcast::Receiver<()>,
        trip_tx: broadcast::Sender<()>,
    ) -> Result<u64, PipelineError> {
        let mut ingested: u64 = 0;

        loop {
            // The queue lock is held only while waiting for the next
            // document; recv is cancel safe, so losing the select race
            // drops no document.
            let next = tokio::select! {
                document = async { receiver.lock().await.recv().await } => document,
                _ = trip_rx.recv() => return Err(PipelineError::Cancelled),
            };

            let Some(document) = next else {
                debug!(worker = worker, ingested = ingested, "Document queue closed");
                return Ok(ingested);
            };

            match self.ingest_one(&document).await {
                Ok(()) => ingested += 1,
                Err(e) => {
                    error!(worker = worker, id = document.id, error = %e, "Ingest failed");
                    let _ = trip_tx.send(());
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use search_migrator_repository::MemoryIndexStore;

    fn dual_routing() -> Arc<RoutingTable> {
        let routing = Arc::new(RoutingTable::new("a"));
        routing.set_secondary_index(Some("b".to_string()));
        routing
    }

    #[tokio::test]
    async fn test_single_write_without_secondary() {
        let store = Arc::new(MemoryIndexStore::new());
        let routing = Arc::new(RoutingTable::new("a"));
        let pool = IngestPool::new(store.clone(), routing);

        pool.ingest_one(&Document::new(1, "hello")).await.unwrap();

        assert!(store.contains("a", 1));
        assert_eq!(store.put_count(), 1);
    }

    #[tokio::test]
    async fn test_dual_write_with_secondary() {
        let store = Arc::new(MemoryIndexStore::new());
        let pool = IngestPool::new(store.clone(), dual_routing());

        pool.ingest_one(&Document::new(1, "hello")).await.unwrap();

        assert!(store.contains("a", 1));
        assert!(store.contains("b", 1));
        assert_eq!(store.put_count(), 2);
    }

    #[tokio::test]
    async fn test_primary_failure_stops_before_secondary() {
        let store = Arc::new(MemoryIndexStore::new());
        store.fail_writes_to("a");
        let pool = IngestPool::new(store.clone(), dual_routing());

        let result = pool.ingest_one(&Document::new(1, "hello")).await;

        match result {
            Err(PipelineError::StoreError(StoreError::WriteFailed { index, .. })) => {
                assert_eq!(index, "a");
            }
            other => panic!("expected primary WriteFailed, got {:?}", other),
        }
        assert!(!store.contains("b", 1));
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_secondary_failure_leaves_primary_standing() {
        let store = Arc::new(MemoryIndexStore::new());
        store.fail_writes_to("b");
        let pool = IngestPool::new(store.clone(), dual_routing());

        let result = pool.ingest_one(&Document::new(1, "hello")).await;

        match result {
            Err(PipelineError::StoreError(StoreError::WriteFailed { index, .. })) => {
                assert_eq!(index, "b");
            }
            other => panic!("expected secondary WriteFailed, got {:?}", other),
        }
        // The primary write is not rolled back.
        assert!(store.contains("a", 1));
    }

    #[tokio::test]
    async fn test_write_deadline_trips() {
        let store = Arc::new(MemoryIndexStore::new());
        store.set_put_delay(Duration::from_millis(100));
        let routing = Arc::new(RoutingTable::new("a"));
        let pool = IngestPool::with_config(
            store.clone(),
            routing,
            IngestConfig {
                workers: 1,
                write_timeout: Duration::from_millis(10),
            },
        );

        let result = pool.ingest_one(&Document::new(1, "slow")).await;

        match result {
            Err(PipelineError::StoreError(StoreError::WriteFailed { index, cause, .. })) => {
                assert_eq!(index, "a");
                assert!(cause.contains("deadline"));
            }
            other => panic!("expected deadline WriteFailed, got {:?}", other),
        }
        assert!(!store.contains("a", 1));
    }

    #[tokio::test]
    async fn test_deadline_spans_both_writes() {
        let store = Arc::new(MemoryIndexStore::new());
        store.set_put_delay(Duration::from_millis(50));
        let pool = IngestPool::with_config(
            store.clone(),
            dual_routing(),
            IngestConfig {
                workers: 1,
                // Enough for one delayed write but not two.
                write_timeout: Duration::from_millis(75),
            },
        );

        let result = pool.ingest_one(&Document::new(1, "slow")).await;

        match result {
            Err(PipelineError::StoreError(StoreError::WriteFailed { index, cause, .. })) => {
                assert_eq!(index, "b");
                assert!(cause.contains("deadline"));
            }
            other => panic!("expected secondary deadline, got {:?}", other),
        }
        assert!(store.contains("a", 1));
        assert!(!store.contains("b", 1));
    }

    #[tokio::test]
    async fn test_pool_drains_queue_and_stops() {
        let store = Arc::new(MemoryIndexStore::new());
        let routing = Arc::new(RoutingTable::new("a"));
        let pool = IngestPool::with_config(
            store.clone(),
            routing,
            IngestConfig {
                workers: 2,
                write_timeout: Duration::from_secs(5),
            },
        );

        let (tx, rx) = document_queue(2);
        let producer = tokio::spawn(async move {
            for id in 1..=10 {
                tx.send(Document::new(id, format!("msg {}", id)))
                    .await
                    .unwrap();
            }
            // Dropping the sender closes the queue and stops the pool.
        });

        let ingested = pool.run(rx).await.unwrap();
        producer.await.unwrap();

        assert_eq!(ingested, 10);
        assert_eq!(store.len("a"), 10);
        assert_eq!(store.put_count(), 10);
    }

    #[tokio::test]
    async fn test_pool_fails_fast_on_write_error() {
        let store = Arc::new(MemoryIndexStore::new());
        store.fail_writes_to("a");
        let routing = Arc::new(RoutingTable::new("a"));
        let pool = IngestPool::with_config(
            store.clone(),
            routing,
            IngestConfig {
                workers: 2,
                write_timeout: Duration::from_secs(5),
            },
        );

        let (tx, rx) = document_queue(2);
        for id in 1..=4 {
            tx.try_send(Document::new(id, "doomed")).unwrap();
        }
        drop(tx);

        let result = pool.run(rx).await;

        // The pool reports the write failure itself, not the cancellation
        // of the surviving workers.
        match result {
            Err(PipelineError::StoreError(StoreError::WriteFailed { index, .. })) => {
                assert_eq!(index, "a");
            }
            other => panic!("expected WriteFailed, got {:?}", other),
        }
        assert_eq!(store.len("a"), 0);
    }

    #[tokio::test]
    async fn test_queue_capacity_is_twice_workers() {
        let (tx, _rx) = document_queue(2);

        for id in 1..=4 {
            tx.try_send(Document::new(id, "fits")).unwrap();
        }
        assert!(tx.try_send(Document::new(5, "overflow")).is_err());
    }

    #[tokio::test]
    async fn test_read_flips_do_not_disturb_workers() {
        let store = Arc::new(MemoryIndexStore::new());
        let routing = Arc::new(RoutingTable::new("a"));
        let pool = IngestPool::with_config(
            store.clone(),
            routing.clone(),
            IngestConfig {
                workers: 2,
                write_timeout: Duration::from_secs(5),
            },
        );

        // Flip the read index between every send; writes only consult the
        // primary and secondary slots.
        let (tx, rx) = document_queue(2);
        let flipper = routing.clone();
        let producer = tokio::spawn(async move {
            for id in 1..=20 {
                flipper.set_read_index(if id % 2 == 0 { "a" } else { "b" });
                tx.send(Document::new(id, format!("msg {}", id)))
                    .await
                    .unwrap();
            }
        });

        let ingested = pool.run(rx).await.unwrap();
        producer.await.unwrap();

        assert_eq!(ingested, 20);
        assert_eq!(store.len("a"), 20);
    }

    #[tokio::test]
    async fn test_routing_change_applies_to_next_document() {
        let store = Arc::new(MemoryIndexStore::new());
        let routing = Arc::new(RoutingTable::new("a"));
        let pool = IngestPool::new(store.clone(), routing.clone());

        pool.ingest_one(&Document::new(1, "before")).await.unwrap();

        routing.set_secondary_index(Some("b".to_string()));
        pool.ingest_one(&Document::new(2, "during")).await.unwrap();

        routing.set_primary_index("b");
        routing.set_secondary_index(None);
        pool.ingest_one(&Document::new(3, "after")).await.unwrap();

        assert!(store.contains("a", 1) && !store.contains("b", 1));
        assert!(store.contains("a", 2) && store.contains("b", 2));
        assert!(!store.contains("a", 3) && store.contains("b", 3));
    }
}
