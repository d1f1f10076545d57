//! Environment-backed configuration for the migrator.

use std::env;

use crate::MigratorError;

const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";
const DEFAULT_PRIMARY_INDEX: &str = "documents";
const DEFAULT_INGEST_WORKERS: usize = 4;

/// Runtime configuration for the migrator.
///
/// Routing starts out pointing every slot at the primary index unless the
/// environment says otherwise. The migration target is the index the next
/// migration will move to.
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    /// OpenSearch endpoint URL.
    pub opensearch_url: String,
    /// Index that receives every write.
    pub primary_index: String,
    /// Index that serves queries.
    pub read_index: String,
    /// Optional index that mirrors every write during a migration.
    pub secondary_index: Option<String>,
    /// Number of concurrent ingest workers.
    pub ingest_workers: usize,
    /// Index the next migration moves to.
    pub migration_target: String,
}

impl MigratorConfig {
    /// Build the configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch endpoint (default: `http://localhost:9200`)
    /// - `PRIMARY_INDEX`: write index (default: `documents`)
    /// - `READ_INDEX`: query index (default: same as `PRIMARY_INDEX`)
    /// - `SECONDARY_INDEX`: dual-write mirror, unset or empty disables it
    /// - `INGEST_WORKERS`: worker count, must be at least 1 (default: `4`)
    /// - `MIGRATION_TARGET`: target index (default: `<PRIMARY_INDEX>-next`)
    pub fn from_env() -> Result<Self, MigratorError> {
        let opensearch_url =
            env::var("OPENSEARCH_URL").unwrap_or_else(|_| DEFAULT_OPENSEARCH_URL.to_string());
        let primary_index =
            env::var("PRIMARY_INDEX").unwrap_or_else(|_| DEFAULT_PRIMARY_INDEX.to_string());
        let read_index = env::var("READ_INDEX").unwrap_or_else(|_| primary_index.clone());
        let secondary_index = env::var("SECONDARY_INDEX").ok().filter(|s| !s.is_empty());

        let ingest_workers = match env::var("INGEST_WORKERS") {
            Ok(raw) => raw.parse::<usize>().map_err(|e| {
                MigratorError::config(format!("Invalid INGEST_WORKERS '{}': {}", raw, e))
            })?,
            Err(_) => DEFAULT_INGEST_WORKERS,
        };
        if ingest_workers == 0 {
            return Err(MigratorError::config("INGEST_WORKERS must be at least 1"));
        }

        let migration_target = env::var("MIGRATION_TARGET")
            .unwrap_or_else(|_| format!("{}-next", primary_index));

        Ok(Self {
            opensearch_url,
            primary_index,
            read_index,
            secondary_index,
            ingest_workers,
            migration_target,
        })
    }
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            opensearch_url: DEFAULT_OPENSEARCH_URL.to_string(),
            primary_index: DEFAULT_PRIMARY_INDEX.to_string(),
            read_index: DEFAULT_PRIMARY_INDEX.to_string(),
            secondary_index: None,
            ingest_workers: DEFAULT_INGEST_WORKERS,
            migration_target: format!("{}-next", DEFAULT_PRIMARY_INDEX),
        }
    }
}
