//! # Search Migrator
//!
//! Main library for the online search index migrator.
//!
//! This crate provides the entry point and configuration for running a
//! live index migration: dual-write, bulk copy, convergence check, read
//! and primary switchover, and retirement of the old index.

pub mod config;

pub use config::{Dependencies, MigratorConfig};

use thiserror::Error;

/// Errors that can occur during migrator initialization or execution.
#[derive(Error, Debug)]
pub enum MigratorError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] search_migrator_pipeline::PipelineError),

    /// Store error.
    #[error("Store error: {0}")]
    StoreError(#[from] search_migrator_repository::StoreError),
}

impl MigratorError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
