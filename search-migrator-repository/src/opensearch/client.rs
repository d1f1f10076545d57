//! OpenSearch store implementation.
//!
//! This module provides the concrete implementation of `IndexStore` using
//! the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts},
    IndexParts, OpenSearch, SearchParts,
};
use serde_json::Value;
use tracing::{debug, error, info};
use url::Url;

use crate::errors::StoreError;
use crate::interfaces::IndexStore;
use crate::opensearch::index_config::index_settings;
use crate::opensearch::queries::{copy_index_body, sorted_match_all_query};
use crate::types::{SearchPage, SortOrder};
use search_migrator_shared::Document;

/// OpenSearch-backed index store.
///
/// One store instance serves every index involved in a migration; the
/// target index is chosen per call.
///
/// # Example
///
/// ```ignore
/// let store = OpenSearchStore::new("http://localhost:9200").await?;
///
/// store.put_document("documents", &Document::new(1, "hello")).await?;
/// let page = store.search("documents", ID_FIELD, SortOrder::Desc, 1).await?;
/// println!("{} documents, newest {:?}", page.total, page.latest_id());
/// ```
pub struct OpenSearchStore {
    client: OpenSearch,
}

impl OpenSearchStore {
    /// Create a new store connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchStore)` - A new store instance
    /// * `Err(StoreError)` - If connection setup fails
    pub async fn new(url: &str) -> Result<Self, StoreError> {
        let parsed_url = Url::parse(url).map_err(|e| StoreError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| StoreError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, "Created OpenSearch store");

        Ok(Self { client })
    }

    /// Decode a single search hit into a document.
    ///
    /// Hits without a decodable `_source` are dropped.
    fn parse_hit(hit: &Value) -> Option<Document> {
        serde_json::from_value(hit.get("_source")?.clone()).ok()
    }

    /// Decode a search response body into a page of documents.
    fn parse_search_page(body: &Value) -> Result<SearchPage, StoreError> {
        let total = body["hits"]["total"]["value"]
            .as_u64()
            .ok_or_else(|| StoreError::parse("search response missing hits.total.value"))?;

        let hits = body["hits"]["hits"]
            .as_array()
            .map(|hits| hits.iter().filter_map(Self::parse_hit).collect())
            .unwrap_or_default();

        Ok(SearchPage { hits, total })
    }
}

#[async_trait]
impl IndexStore for OpenSearchStore {
    async fn put_document(&self, index: &str, document: &Document) -> Result<(), StoreError> {
        let doc_id = document.id.to_string();

        let response = self
            .client
            .index(IndexParts::IndexId(index, &doc_id))
            .body(document)
            .send()
            .await
            .map_err(|e| StoreError::write(index, document.id, e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, index = %index, "Index request failed");
            return Err(StoreError::write(
                index,
                document.id,
                format!("status {}: {}", status, error_body),
            ));
        }

        debug!(index = %index, id = document.id, "Document indexed");
        Ok(())
    }

    async fn search(
        &self,
        index: &str,
        sort_field: &str,
        order: SortOrder,
        limit: usize,
    ) -> Result<SearchPage, StoreError> {
        let query = sorted_match_all_query(sort_field, order, limit);

        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(query)
            .send()
            .await
            .map_err(|e| StoreError::query(index, e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, index = %index, "Search request failed");
            return Err(StoreError::query(
                index,
                format!("status {}: {}", status, error_body),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::parse(e.to_string()))?;

        Self::parse_search_page(&body)
    }

    async fn copy_index(&self, source: &str, dest: &str) -> Result<(), StoreError> {
        // The copy runs as a server-side task; completion is verified by the
        // caller comparing source and dest afterwards.
        let response = self
            .client
            .reindex()
            .body(copy_index_body(source, dest))
            .wait_for_completion(false)
            .send()
            .await
            .map_err(|e| StoreError::copy(source, dest, e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Reindex request failed");
            return Err(StoreError::copy(
                source,
                dest,
                format!("status {}: {}", status, error_body),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::parse(e.to_string()))?;

        info!(
            source = %source,
            dest = %dest,
            task = %body["task"].as_str().unwrap_or("unknown"),
            "Started index copy"
        );
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| StoreError::delete(index, e.to_string()))?;

        let status = response.status_code();

        // 404 is acceptable - the index may already be gone
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, index = %index, "Delete index request failed");
            return Err(StoreError::delete(
                index,
                format!("status {}: {}", status, error_body),
            ));
        }

        info!(index = %index, "Index deleted");
        Ok(())
    }

    async fn ensure_index(&self, index: &str) -> Result<(), StoreError> {
        let exists = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| StoreError::setup(e.to_string()))?;

        if exists.status_code().is_success() {
            debug!(index = %index, "Index already exists");
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(index_settings())
            .send()
            .await
            .map_err(|e| StoreError::setup(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();

            // Another caller may create the index between the exists check
            // and this request.
            if error_body.contains("resource_already_exists_exception") {
                debug!(index = %index, "Index created concurrently");
                return Ok(());
            }

            error!(status = %status, body = %error_body, index = %index, "Create index request failed");
            return Err(StoreError::setup(format!(
                "creating '{}' failed with status {}: {}",
                index, status, error_body
            )));
        }

        info!(index = %index, "Index created");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| StoreError::connection(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::parse(e.to_string()))?;

        let status = body["status"].as_str().unwrap_or("unknown");
        debug!(status = %status, "Cluster health");

        Ok(status == "green" || status == "yellow")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_hit() {
        let hit = json!({
            "_index": "documents",
            "_id": "7",
            "_score": null,
            "_source": {
                "id": 7,
                "message": "hello world"
            },
            "sort": [7]
        });

        let doc = OpenSearchStore::parse_hit(&hit).unwrap();

        assert_eq!(doc.id, 7);
        assert_eq!(doc.message, "hello world");
    }

    #[test]
    fn test_parse_hit_invalid() {
        let hit = json!({
            "_source": {
                "message": "missing id"
            }
        });

        assert!(OpenSearchStore::parse_hit(&hit).is_none());
    }

    #[test]
    fn test_parse_search_page() {
        let body = json!({
            "took": 2,
            "hits": {
                "total": { "value": 60, "relation": "eq" },
                "hits": [
                    { "_source": { "id": 60, "message": "msg 60" }, "sort": [60] },
                    { "_source": { "id": 59, "message": "msg 59" }, "sort": [59] }
                ]
            }
        });

        let page = OpenSearchStore::parse_search_page(&body).unwrap();

        assert_eq!(page.total, 60);
        assert_eq!(page.hits.len(), 2);
        assert_eq!(page.latest_id(), Some(60));
    }

    #[test]
    fn test_parse_search_page_empty() {
        let body = json!({
            "hits": {
                "total": { "value": 0, "relation": "eq" },
                "hits": []
            }
        });

        let page = OpenSearchStore::parse_search_page(&body).unwrap();

        assert_eq!(page.total, 0);
        assert!(page.hits.is_empty());
        assert_eq!(page.latest_id(), None);
    }

    #[test]
    fn test_parse_search_page_missing_total() {
        let body = json!({ "hits": { "hits": [] } });

        let result = OpenSearchStore::parse_search_page(&body);

        assert!(matches!(result, Err(StoreError::ParseError(_))));
    }

    #[test]
    fn test_parse_search_page_drops_undecodable_hits() {
        let body = json!({
            "hits": {
                "total": { "value": 2, "relation": "eq" },
                "hits": [
                    { "_source": { "id": 2, "message": "good" } },
                    { "_source": { "message": "no id" } }
                ]
            }
        });

        let page = OpenSearchStore::parse_search_page(&body).unwrap();

        assert_eq!(page.hits.len(), 1);
        assert_eq!(page.total, 2);
    }
}
