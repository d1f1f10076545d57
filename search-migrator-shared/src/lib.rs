//! # Search Migrator Shared
//!
//! Shared types for the search migrator system: the document model written
//! to the search engine and the mutable routing table that directs reads
//! and writes while an index migration is in flight.

pub mod document;
pub mod routing;

pub use document::{Document, ID_FIELD};
pub use routing::{RoutingSnapshot, RoutingTable};
