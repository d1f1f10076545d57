//! OpenSearch index configuration and mappings.
//!
//! This module defines the settings and mappings applied to every index the
//! migrator creates.

use serde_json::{json, Value};

/// Get the index settings and mappings for a document index.
///
/// The `id` field is mapped as a numeric `long` so convergence queries can
/// sort on it; `message` is a plain full-text field.
pub fn index_settings() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "properties": {
                "id": {
                    "type": "long"
                },
                "message": {
                    "type": "text"
                }
            }
        }
    })
}
