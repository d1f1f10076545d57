//! # Search Migrator Repository
//!
//! This crate provides traits and implementations for interacting with the
//! search engine that backs the migrator. It includes definitions for errors,
//! the `IndexStore` interface, and a concrete implementation for OpenSearch.

pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use errors::StoreError;
pub use interfaces::IndexStore;
pub use opensearch::OpenSearchStore;
pub use types::{SearchPage, SortOrder};

#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryIndexStore;
