//! OpenSearch query builders.
//!
//! This module provides functions to build the queries the migrator runs
//! against document indices.

use serde_json::{json, Value};

use crate::types::SortOrder;

/// Build a match-all query sorted on one field.
///
/// `track_total_hits` is enabled so the response total is exact rather than
/// the engine's default 10k cap; convergence checks compare totals between
/// indices and a capped count would report two different indices as equal.
pub fn sorted_match_all_query(sort_field: &str, order: SortOrder, limit: usize) -> Value {
    json!({
        "query": {
            "match_all": {}
        },
        "sort": [
            { sort_field: { "order": order.as_str() } }
        ],
        "size": limit,
        "track_total_hits": true
    })
}

/// Build the body for a server-side copy from `source` to `dest`.
pub fn copy_index_body(source: &str, dest: &str) -> Value {
    json!({
        "source": { "index": source },
        "dest": { "index": dest }
    })
}
