//! Dependency initialization and wiring for the search migrator.

use std::sync::Arc;
use tracing::info;

use crate::config::MigratorConfig;
use crate::MigratorError;
use search_migrator_pipeline::{IngestConfig, IngestPool, MigrationOrchestrator, ProgressObserver};
use search_migrator_repository::{IndexStore, OpenSearchStore};
use search_migrator_shared::RoutingTable;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// Routing table shared by every component.
    pub routing: Arc<RoutingTable>,
    /// Worker pool that writes incoming documents.
    pub ingest_pool: IngestPool,
    /// Observer that reports progress of both indices.
    pub observer: ProgressObserver,
    /// Driver for the migration steps.
    pub orchestrator: MigrationOrchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// See [`MigratorConfig::from_env`] for the variables read.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(MigratorError)` - If initialization fails
    pub async fn new() -> Result<Self, MigratorError> {
        Self::from_config(MigratorConfig::from_env()?).await
    }

    /// Initialize all dependencies from an explicit configuration.
    pub async fn from_config(config: MigratorConfig) -> Result<Self, MigratorError> {
        info!(
            opensearch_url = %config.opensearch_url,
            primary_index = %config.primary_index,
            read_index = %config.read_index,
            secondary_index = ?config.secondary_index,
            ingest_workers = config.ingest_workers,
            "Initializing dependencies"
        );

        // Initialize OpenSearch store
        let store = OpenSearchStore::new(&config.opensearch_url)
            .await
            .map_err(|e| MigratorError::config(format!("Failed to create OpenSearch store: {}", e)))?;

        // Verify OpenSearch is reachable
        let healthy = store
            .health_check()
            .await
            .map_err(|e| MigratorError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(MigratorError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");

        let store: Arc<dyn IndexStore> = Arc::new(store);

        // Every configured index must exist before the first write or
        // progress query
        store.ensure_index(&config.primary_index).await?;
        if config.read_index != config.primary_index {
            store.ensure_index(&config.read_index).await?;
        }
        if let Some(secondary) = &config.secondary_index {
            store.ensure_index(secondary).await?;
        }

        // Seed routing from the configuration
        let routing = Arc::new(RoutingTable::new(config.primary_index.clone()));
        routing.set_read_index(config.read_index.clone());
        routing.set_secondary_index(config.secondary_index.clone());

        let ingest_pool = IngestPool::with_config(
            store.clone(),
            routing.clone(),
            IngestConfig {
                workers: config.ingest_workers,
                ..IngestConfig::default()
            },
        );

        let observer = ProgressObserver::new(store.clone());

        let orchestrator = MigrationOrchestrator::new(store, routing.clone());

        Ok(Self {
            routing,
            ingest_pool,
            observer,
            orchestrator,
        })
    }
}
