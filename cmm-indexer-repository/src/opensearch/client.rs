//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust client.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::request::JsonBody,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts, IndicesPutMappingParts, IndicesRefreshParts},
    BulkParts, ClearScrollParts, CountParts, GetParts, OpenSearch, ScrollParts, SearchParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::{BulkItemResult, BulkOperation, Hit, IndexCreation, ScrollPage};

const RESOURCE_ALREADY_EXISTS: &str = "resource_already_exists_exception";

/// OpenSearch client implementation.
///
/// The connection is created once and shared. A request failing at the
/// transport level drops it; the next request builds a fresh one. Requests
/// are not retried here.
///
/// # Example
///
/// ```ignore
/// let client = OpenSearchClient::new("http://localhost:9200", Duration::from_secs(30))?;
/// let exists = client.index_exists("cmmstudy_en").await?;
/// ```
pub struct OpenSearchClient {
    url: Url,
    timeout: Duration,
    connection: RwLock<Option<OpenSearch>>,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client for the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `timeout` - Timeout applied to every request
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchIndexError)` - If the URL is invalid or transport setup fails
    pub fn new(url: &str, timeout: Duration) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;
        let client = Self::connect(&parsed_url, timeout)?;

        info!(url = %url, "Created OpenSearch client");

        Ok(Self {
            url: parsed_url,
            timeout,
            connection: RwLock::new(Some(client)),
        })
    }

    fn connect(url: &Url, timeout: Duration) -> Result<OpenSearch, SearchIndexError> {
        let conn_pool = SingleNodeConnectionPool::new(url.clone());
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;
        Ok(OpenSearch::new(transport))
    }

    /// The live connection, rebuilt if a previous request dropped it.
    fn client(&self) -> Result<OpenSearch, SearchIndexError> {
        if let Some(client) = self.connection.read().map_err(poisoned)?.as_ref() {
            return Ok(client.clone());
        }

        let mut guard = self.connection.write().map_err(poisoned)?;
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }
        let client = Self::connect(&self.url, self.timeout)?;
        info!(url = %self.url, "Reconnected to OpenSearch");
        *guard = Some(client.clone());
        Ok(client)
    }

    /// Drop the connection after a transport failure.
    fn connection_lost(&self, err: opensearch::Error) -> SearchIndexError {
        warn!(error = %err, "OpenSearch request failed, dropping connection");
        if let Ok(mut guard) = self.connection.write() {
            *guard = None;
        }
        SearchIndexError::connection(err.to_string())
    }

    async fn read_json(response: Response) -> Result<Value, SearchIndexError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))
    }

    async fn failure(response: Response) -> (u16, String) {
        let status = response.status_code().as_u16();
        let body = response.text().await.unwrap_or_default();
        (status, body)
    }

    /// Parse the hits of a search or scroll response.
    fn parse_hits(body: &Value) -> Vec<Hit> {
        body.get("hits")
            .and_then(|h| h.get("hits"))
            .and_then(|h| h.as_array())
            .map(|hits| hits.iter().filter_map(Self::parse_hit).collect())
            .unwrap_or_default()
    }

    fn parse_hit(hit: &Value) -> Option<Hit> {
        Some(Hit {
            index: hit.get("_index")?.as_str()?.to_string(),
            id: hit.get("_id")?.as_str()?.to_string(),
            source: hit.get("_source").cloned().unwrap_or(Value::Null),
        })
    }

    fn parse_scroll_page(body: &Value) -> ScrollPage {
        ScrollPage {
            scroll_id: body
                .get("_scroll_id")
                .and_then(|id| id.as_str())
                .map(str::to_string),
            hits: Self::parse_hits(body),
        }
    }

    /// Parse the items of a bulk response, in request order.
    ///
    /// A delete of a missing document is reported by the engine as
    /// `not_found` without an error and counts as success.
    fn parse_bulk_items(body: &Value) -> Vec<BulkItemResult> {
        let empty = Vec::new();
        body.get("items")
            .and_then(|items| items.as_array())
            .unwrap_or(&empty)
            .iter()
            .filter_map(|item| item.as_object()?.values().next())
            .map(|item| {
                let id = item.get("_id").and_then(|id| id.as_str()).unwrap_or_default();
                match item.get("error") {
                    Some(error) => BulkItemResult::failed(
                        id,
                        error.get("type").and_then(|t| t.as_str()).unwrap_or("unknown"),
                        error.get("reason").and_then(|r| r.as_str()).unwrap_or_default(),
                    ),
                    None => BulkItemResult::ok(id),
                }
            })
            .collect()
    }

    fn bulk_body(operations: &[BulkOperation]) -> Vec<JsonBody<Value>> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(operations.len() * 2);
        for operation in operations {
            match operation {
                BulkOperation::Index { index, id, source } => {
                    body.push(json!({"index": {"_index": index, "_id": id}}).into());
                    body.push(source.clone().into());
                }
                BulkOperation::Delete { index, id } => {
                    body.push(json!({"delete": {"_index": index, "_id": id}}).into());
                }
            }
        }
        body
    }
}

fn poisoned<T>(_: T) -> SearchIndexError {
    SearchIndexError::connection("connection lock poisoned")
}

fn index_refs(indices: &[String]) -> Vec<&str> {
    indices.iter().map(String::as_str).collect()
}

#[async_trait]
impl SearchIndexProvider for OpenSearchClient {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError> {
        let response = self
            .client()?
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| self.connection_lost(e))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(SearchIndexError::query(format!(
                "Index exists check for {} returned status {}",
                index, status
            ))),
        }
    }

    #[instrument(skip(self, body))]
    async fn create_index(&self, index: &str, body: &Value) -> Result<IndexCreation, SearchIndexError> {
        let response = self
            .client()?
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body.clone())
            .send()
            .await
            .map_err(|e| self.connection_lost(e))?;

        if response.status_code().is_success() {
            info!(index = %index, "Created index");
            return Ok(IndexCreation::Created);
        }

        let (status, error_body) = Self::failure(response).await;
        if error_body.contains(RESOURCE_ALREADY_EXISTS) {
            debug!(index = %index, "Index already exists");
            return Ok(IndexCreation::AlreadyExists);
        }

        error!(index = %index, status, body = %error_body, "Index creation failed");
        Err(SearchIndexError::index_creation(format!(
            "Creating {} failed with status {}: {}",
            index, status, error_body
        )))
    }

    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), SearchIndexError> {
        let response = self
            .client()?
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(mapping.clone())
            .send()
            .await
            .map_err(|e| self.connection_lost(e))?;

        if !response.status_code().is_success() {
            let (status, error_body) = Self::failure(response).await;
            return Err(SearchIndexError::mapping(format!(
                "Mapping update of {} failed with status {}: {}",
                index, status, error_body
            )));
        }
        Ok(())
    }

    async fn bulk(&self, operations: &[BulkOperation]) -> Result<Vec<BulkItemResult>, SearchIndexError> {
        if operations.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client()?
            .bulk(BulkParts::None)
            .body(Self::bulk_body(operations))
            .send()
            .await
            .map_err(|e| self.connection_lost(e))?;

        if !response.status_code().is_success() {
            let (status, error_body) = Self::failure(response).await;
            error!(status, body = %error_body, "Bulk request failed");
            return Err(SearchIndexError::bulk_operation(format!(
                "Bulk request failed with status {}: {}",
                status, error_body
            )));
        }

        let body = Self::read_json(response).await?;
        let items = Self::parse_bulk_items(&body);
        if items.len() != operations.len() {
            return Err(SearchIndexError::parse(format!(
                "Bulk response has {} items for {} operations",
                items.len(),
                operations.len()
            )));
        }
        Ok(items)
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Hit>, SearchIndexError> {
        let response = self
            .client()?
            .get(GetParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| self.connection_lost(e))?;

        if response.status_code().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status_code().is_success() {
            let (status, error_body) = Self::failure(response).await;
            return Err(SearchIndexError::query(format!(
                "Get {}/{} failed with status {}: {}",
                index, id, status, error_body
            )));
        }

        let body = Self::read_json(response).await?;
        if body.get("found").and_then(|f| f.as_bool()) != Some(true) {
            return Ok(None);
        }
        Ok(Self::parse_hit(&body))
    }

    async fn search(&self, indices: &[String], body: &Value) -> Result<Vec<Hit>, SearchIndexError> {
        let refs = index_refs(indices);
        let response = self
            .client()?
            .search(SearchParts::Index(&refs))
            .allow_no_indices(true)
            .ignore_unavailable(true)
            .body(body.clone())
            .send()
            .await
            .map_err(|e| self.connection_lost(e))?;

        if !response.status_code().is_success() {
            let (status, error_body) = Self::failure(response).await;
            return Err(SearchIndexError::query(format!(
                "Search failed with status {}: {}",
                status, error_body
            )));
        }

        let body = Self::read_json(response).await?;
        Ok(Self::parse_hits(&body))
    }

    async fn count(&self, indices: &[String]) -> Result<u64, SearchIndexError> {
        let refs = index_refs(indices);
        let response = self
            .client()?
            .count(CountParts::Index(&refs))
            .allow_no_indices(true)
            .ignore_unavailable(true)
            .send()
            .await
            .map_err(|e| self.connection_lost(e))?;

        if !response.status_code().is_success() {
            let (status, error_body) = Self::failure(response).await;
            return Err(SearchIndexError::query(format!(
                "Count failed with status {}: {}",
                status, error_body
            )));
        }

        let body = Self::read_json(response).await?;
        body.get("count")
            .and_then(|c| c.as_u64())
            .ok_or_else(|| SearchIndexError::parse("Count response has no count"))
    }

    async fn open_scroll(
        &self,
        indices: &[String],
        body: &Value,
        keep_alive: &str,
    ) -> Result<ScrollPage, SearchIndexError> {
        let refs = index_refs(indices);
        let response = self
            .client()?
            .search(SearchParts::Index(&refs))
            .allow_no_indices(true)
            .ignore_unavailable(true)
            .scroll(keep_alive)
            .body(body.clone())
            .send()
            .await
            .map_err(|e| self.connection_lost(e))?;

        if !response.status_code().is_success() {
            let (status, error_body) = Self::failure(response).await;
            return Err(SearchIndexError::scroll(format!(
                "Opening scroll failed with status {}: {}",
                status, error_body
            )));
        }

        let body = Self::read_json(response).await?;
        Ok(Self::parse_scroll_page(&body))
    }

    async fn next_scroll(&self, scroll_id: &str, keep_alive: &str) -> Result<ScrollPage, SearchIndexError> {
        let response = self
            .client()?
            .scroll(ScrollParts::None)
            .body(json!({"scroll": keep_alive, "scroll_id": scroll_id}))
            .send()
            .await
            .map_err(|e| self.connection_lost(e))?;

        if !response.status_code().is_success() {
            let (status, error_body) = Self::failure(response).await;
            return Err(SearchIndexError::scroll(format!(
                "Scroll failed with status {}: {}",
                status, error_body
            )));
        }

        let body = Self::read_json(response).await?;
        Ok(Self::parse_scroll_page(&body))
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client()?
            .clear_scroll(ClearScrollParts::None)
            .body(json!({"scroll_id": [scroll_id]}))
            .send()
            .await
            .map_err(|e| self.connection_lost(e))?;

        // 404 means the cursor already expired
        let status = response.status_code();
        if !status.is_success() && status.as_u16() != 404 {
            let (status, error_body) = Self::failure(response).await;
            return Err(SearchIndexError::scroll(format!(
                "Clearing scroll failed with status {}: {}",
                status, error_body
            )));
        }
        Ok(())
    }

    async fn refresh(&self, index: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client()?
            .indices()
            .refresh(IndicesRefreshParts::Index(&[index]))
            .allow_no_indices(true)
            .ignore_unavailable(true)
            .send()
            .await
            .map_err(|e| self.connection_lost(e))?;

        if !response.status_code().is_success() {
            let (status, error_body) = Self::failure(response).await;
            return Err(SearchIndexError::query(format!(
                "Refresh of {} failed with status {}: {}",
                index, status, error_body
            )));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchIndexError> {
        let response = self
            .client()?
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| self.connection_lost(e))?;

        let health = Self::read_json(response).await?;
        let status = health
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("unknown");

        debug!(status = %status, "OpenSearch cluster status");
        Ok(status == "green" || status == "yellow")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hit() {
        let hit = json!({
            "_index": "cmmstudy_en",
            "_id": "FSD__1000",
            "_score": 1.5,
            "_source": {"id": "FSD__1000", "titleStudy": "Title"}
        });

        let result = OpenSearchClient::parse_hit(&hit).unwrap();

        assert_eq!(result.index, "cmmstudy_en");
        assert_eq!(result.id, "FSD__1000");
        assert_eq!(result.source["titleStudy"], "Title");
    }

    #[test]
    fn test_parse_hit_without_source() {
        let hit = json!({"_index": "covid_en", "_id": "FSD__1"});
        let result = OpenSearchClient::parse_hit(&hit).unwrap();
        assert!(result.source.is_null());
    }

    #[test]
    fn test_parse_hit_invalid() {
        let hit = json!({"_source": {"id": "missing"}});
        assert!(OpenSearchClient::parse_hit(&hit).is_none());
    }

    #[test]
    fn test_parse_scroll_page() {
        let body = json!({
            "_scroll_id": "abc",
            "hits": {"hits": [
                {"_index": "cmmstudy_en", "_id": "A__1", "_source": {}},
                {"_index": "cmmstudy_fi", "_id": "A__1", "_source": {}}
            ]}
        });

        let page = OpenSearchClient::parse_scroll_page(&body);

        assert_eq!(page.scroll_id.as_deref(), Some("abc"));
        assert_eq!(page.hits.len(), 2);
        assert_eq!(page.hits[1].index, "cmmstudy_fi");
    }

    #[test]
    fn test_parse_bulk_items() {
        let body = json!({
            "errors": true,
            "items": [
                {"index": {"_index": "cmmstudy_en", "_id": "A__1", "status": 201}},
                {"index": {"_index": "cmmstudy_en", "_id": "A__2", "status": 400,
                    "error": {"type": "strict_dynamic_mapping_exception", "reason": "mapping set to strict"}}},
                {"delete": {"_index": "cmmstudy_en", "_id": "A__3", "status": 404, "result": "not_found"}}
            ]
        });

        let items = OpenSearchClient::parse_bulk_items(&body);

        assert_eq!(items.len(), 3);
        assert!(items[0].error.is_none());
        assert!(items[1].is_mapping_violation());
        assert_eq!(items[2], BulkItemResult::ok("A__3"));
    }

    #[test]
    fn test_bulk_body() {
        let body = OpenSearchClient::bulk_body(&[
            BulkOperation::index("cmmstudy_en", "A__1", json!({"id": "A__1"})),
            BulkOperation::delete("cmmstudy_en", "A__2"),
        ]);
        assert_eq!(body.len(), 3);
    }

    #[test]
    fn test_invalid_url() {
        let result = OpenSearchClient::new("not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(SearchIndexError::ConnectionError(_))));
    }
}
