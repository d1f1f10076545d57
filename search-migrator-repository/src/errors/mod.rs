//! Error types for the search migrator repository.

mod store_error;

pub use store_error::StoreError;
