//! OpenSearch implementation of the index store.
//!
//! This module provides a concrete implementation of `IndexStore` using
//! OpenSearch as the backend.

mod client;
mod index_config;
mod queries;

pub use client::OpenSearchStore;
