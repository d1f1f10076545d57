//! Observer module for the search migrator pipeline.
//!
//! Samples document totals and newest ids from two indices to show how far
//! the new index lags the old one, and to decide when the two have
//! converged. Sampling runs against a live, dual-written pair, so a report
//! is only ever a snapshot; convergence gates re-sample rather than trust a
//! single reading for long.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, instrument, warn};

use crate::errors::PipelineError;
use search_migrator_repository::{IndexStore, SortOrder};
use search_migrator_shared::ID_FIELD;

/// Configuration for the progress observer.
#[derive(Debug, Clone)]
pub struct ObserverConfig {
    /// Time between progress samples.
    pub poll_interval: Duration,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Point-in-time view of one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexProgress {
    /// The index that was sampled.
    pub index: String,
    /// Total number of documents in the index.
    pub total: u64,
    /// Newest document id, or `None` for an empty index.
    pub latest_id: Option<u64>,
}

/// Paired samples of the two indices of a migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergenceReport {
    pub left: IndexProgress,
    pub right: IndexProgress,
}

impl ConvergenceReport {
    /// Whether the two indices held the same documents when sampled.
    ///
    /// Converged means equal totals and equal newest ids. Two empty indices
    /// count as converged.
    pub fn converged(&self) -> bool {
        self.left.total == self.right.total && self.left.latest_id == self.right.latest_id
    }
}

/// Observer that tracks migration progress between two indices.
#[derive(Clone)]
pub struct ProgressObserver {
    store: Arc<dyn IndexStore>,
    config: ObserverConfig,
}

impl ProgressObserver {
    /// Create a new observer with the default configuration.
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self {
            store,
            config: ObserverConfig::default(),
        }
    }

    /// Create a new observer with custom configuration.
    pub fn with_config(store: Arc<dyn IndexStore>, config: ObserverConfig) -> Self {
        Self { store, config }
    }

    /// Sample one index: its document total and newest id.
    ///
    /// A single one-hit query sorted descending on the id field yields both
    /// numbers.
    pub async fn sample(&self, index: &str) -> Result<IndexProgress, PipelineError> {
        let page = self.store.search(index, ID_FIELD, SortOrder::Desc, 1).await?;

        Ok(IndexProgress {
            index: index.to_string(),
            total: page.total,
            latest_id: page.latest_id(),
        })
    }

    /// Sample both indices of a migration.
    ///
    /// The two samples are taken one after the other against live indices,
    /// so they can straddle in-flight writes.
    pub async fn compare(
        &self,
        left: &str,
        right: &str,
    ) -> Result<ConvergenceReport, PipelineError> {
        let left = self.sample(left).await?;
        let right = self.sample(right).await?;

        Ok(ConvergenceReport { left, right })
    }

    /// Log progress of both indices until the shutdown signal fires.
    ///
    /// Failed samples are logged and skipped; the loop keeps polling. An
    /// index that does not exist yet reads as a failed sample until its
    /// first document arrives.
    #[instrument(skip(self, shutdown))]
    pub async fn run(
        &self,
        left: String,
        right: String,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), PipelineError> {
        let mut ticker = tokio::time::interval(self.config.poll_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.compare(&left, &right).await {
                        Ok(report) => {
                            info!(
                                left = %report.left.index,
                                left_total = report.left.total,
                                left_latest = ?report.left.latest_id,
                                right = %report.right.index,
                                right_total = report.right.total,
                                right_latest = ?report.right.latest_id,
                                converged = report.converged(),
                                "Index progress"
                            );
                        }
                        Err(e) => {
                            warn!(error = %e, "Progress sample failed");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("Observer shutting down");
                    return Ok(());
                }
            }
        }
    }

    /// Poll until `left` and `right` converge, or give up after `max_wait`.
    ///
    /// Returns the converged report, or `ConvergenceTimeout` if the indices
    /// still differ when the time runs out. Failed samples are retried on
    /// the next poll rather than aborting the wait.
    #[instrument(skip(self))]
    pub async fn await_convergence(
        &self,
        left: &str,
        right: &str,
        max_wait: Duration,
    ) -> Result<ConvergenceReport, PipelineError> {
        let poll = async {
            loop {
                match self.compare(left, right).await {
                    Ok(report) if report.converged() => return report,
                    Ok(report) => {
                        debug!(
                            left_total = report.left.total,
                            right_total = report.right.total,
                            "Not converged yet"
                        );
                    }
                    Err(e) => {
                        warn!(error = %e, "Convergence sample failed");
                    }
                }
                tokio::time::sleep(self.config.poll_interval).await;
            }
        };

        match timeout(max_wait, poll).await {
            Ok(report) => {
                info!(
                    left = %report.left.index,
                    right = %report.right.index,
                    total = report.left.total,
                    latest = ?report.left.latest_id,
                    "Indices converged"
                );
                Ok(report)
            }
            Err(_) => Err(PipelineError::ConvergenceTimeout {
                left: left.to_string(),
                right: right.to_string(),
                waited: max_wait,
            }),
        }
    }
}
