//! # Search Migrator Pipeline
//!
//! This crate provides the pipeline components for migrating a live search
//! index without pausing ingestion.
//!
//! ## Architecture
//!
//! 1. **Ingest**: a worker pool writing each document to the routed indices
//! 2. **Observer**: samples document totals and newest ids to track
//!    convergence between two indices
//! 3. **Orchestrator**: mutates the routing table and drives the reindex and
//!    retire steps of a migration

pub mod errors;
pub mod ingest;
pub mod observer;
pub mod orchestrator;

pub use errors::PipelineError;
pub use ingest::{document_queue, IngestConfig, IngestPool};
pub use observer::{ConvergenceReport, IndexProgress, ObserverConfig, ProgressObserver};
pub use orchestrator::MigrationOrchestrator;
