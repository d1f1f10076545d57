//! Online index migration drill.
//!
//! Keeps a steady stream of writes flowing while the routing table walks
//! through a full migration: dual-write to the target, bulk copy of the
//! backlog, a convergence gate, read and primary switchover, and finally
//! retirement of the source index. Ctrl-C aborts the drill at any point.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, sleep};
use tracing::{error, info};

use search_migrator::{Dependencies, MigratorConfig, MigratorError};
use search_migrator_pipeline::{
    document_queue, MigrationOrchestrator, PipelineError, ProgressObserver,
};
use search_migrator_shared::Document;

/// Pause between migration steps so each state is visible in the logs.
const SETTLE: Duration = Duration::from_secs(6);

/// Producer tick interval.
const PRODUCE_INTERVAL: Duration = Duration::from_millis(500);

/// Upper bound on the wait for the indices to converge after the bulk copy.
const CONVERGENCE_WAIT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "Migration drill failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), MigratorError> {
    let config = MigratorConfig::from_env()?;
    let source = config.primary_index.clone();
    let target = config.migration_target.clone();
    let workers = config.ingest_workers;

    let deps = Dependencies::from_config(config).await?;
    info!(routing = ?deps.routing.snapshot(), "Initial routing");

    let pool = deps.ingest_pool;
    let observer = deps.observer;
    let orchestrator = deps.orchestrator;

    let (shutdown_tx, _) = broadcast::channel(1);

    // Producer task: one new document per tick.
    let (doc_tx, doc_rx) = document_queue(workers);
    let producer = tokio::spawn(produce(doc_tx, shutdown_tx.subscribe()));

    // Observer task: log progress of both indices throughout the drill.
    let observer_task = tokio::spawn({
        let observer = observer.clone();
        let left = source.clone();
        let right = target.clone();
        let shutdown = shutdown_tx.subscribe();
        async move { observer.run(left, right, shutdown).await }
    });

    // The pool future is polled alongside the drill so a write failure
    // aborts the run instead of going unnoticed.
    let pool_fut = pool.run(doc_rx);
    tokio::pin!(pool_fut);

    let mut pool_done = false;
    let result = tokio::select! {
        result = run_drill(&orchestrator, &observer, &source, &target) => result,
        result = &mut pool_fut => {
            pool_done = true;
            match result {
                Ok(_) => Err(PipelineError::channel(
                    "document queue closed before the drill finished",
                )
                .into()),
                Err(e) => Err(e.into()),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!(routing = ?orchestrator.routing_snapshot(), "Received shutdown signal");
            Ok(())
        }
    };

    // Stop the producer; the closed queue lets the pool drain and exit.
    let _ = shutdown_tx.send(());
    let _ = producer.await;
    if !pool_done {
        match pool_fut.await {
            Ok(ingested) => info!(ingested = ingested, "Ingest pool drained"),
            Err(e) => error!(error = %e, "Ingest pool failed while draining"),
        }
    }
    let _ = observer_task.await;

    info!("Migration drill stopped");
    result
}

/// Drive the migration steps in order.
async fn run_drill(
    orchestrator: &MigrationOrchestrator,
    observer: &ProgressObserver,
    source: &str,
    target: &str,
) -> Result<(), MigratorError> {
    info!(source = %source, target = %target, "Starting migration drill");
    sleep(SETTLE).await;

    // Mirror every write to the target while the source stays primary.
    orchestrator.set_secondary_index(Some(target));
    sleep(SETTLE).await;

    // Copy the backlog, then hold until both indices agree.
    orchestrator.reindex(source, target).await?;
    let report = observer
        .await_convergence(source, target, CONVERGENCE_WAIT)
        .await?;
    info!(
        total = report.left.total,
        latest_id = ?report.left.latest_id,
        "Indices converged"
    );
    sleep(SETTLE).await;

    // Serve queries from the target.
    orchestrator.set_read_index(target);
    sleep(SETTLE).await;

    // Make the target the sole write index.
    orchestrator.set_primary_index(target);
    orchestrator.set_secondary_index(None);
    sleep(SETTLE).await;

    // Nothing references the source anymore.
    orchestrator.retire_index(source).await?;

    info!(routing = ?orchestrator.routing_snapshot(), "Migration drill complete");
    Ok(())
}

/// Send one document per tick until shutdown.
///
/// Ids are strictly increasing so the newest document always carries the
/// highest id.
async fn produce(tx: mpsc::Sender<Document>, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = interval(PRODUCE_INTERVAL);
    let mut next_id: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let document = Document::new(next_id, format!("document {}", next_id));
                if tx.send(document).await.is_err() {
                    error!("Document queue closed, stopping producer");
                    return;
                }
                next_id += 1;
            }
            _ = shutdown.recv() => {
                info!(produced = next_id, "Producer stopping");
                return;
            }
        }
    }
}
