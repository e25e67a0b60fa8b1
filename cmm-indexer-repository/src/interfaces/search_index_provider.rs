//! Search index provider trait definition.
//!
//! This module defines the raw document API the ingestion engine is built on:
//! index lifecycle, bulk writes, lookups and scroll cursors.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchIndexError;
use crate::types::{BulkItemResult, BulkOperation, Hit, IndexCreation, ScrollPage};

/// Abstracts the underlying search engine (OpenSearch, Elasticsearch, etc.).
///
/// Implementations are injected into `StudyIndexClient` and must be
/// `Send + Sync`; one provider is shared by every repository and language.
/// Index arguments may be concrete names or wildcard patterns wherever a
/// list of indices is accepted.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Check whether an index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError>;

    /// Create an index with the given `{settings, mappings}` body.
    ///
    /// # Returns
    ///
    /// * `Ok(IndexCreation::Created)` - If the index was created
    /// * `Ok(IndexCreation::AlreadyExists)` - If another writer created it first
    /// * `Err(SearchIndexError::IndexCreationError)` - For any other failure
    async fn create_index(&self, index: &str, body: &Value) -> Result<IndexCreation, SearchIndexError>;

    /// Replace the mapping of an existing index.
    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), SearchIndexError>;

    /// Send one bulk request.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<BulkItemResult>)` - One result per operation, in request order
    /// * `Err(SearchIndexError)` - If the request as a whole failed
    async fn bulk(&self, operations: &[BulkOperation]) -> Result<Vec<BulkItemResult>, SearchIndexError>;

    /// Fetch one document.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Hit))` - The document
    /// * `Ok(None)` - If the document or the index does not exist
    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Hit>, SearchIndexError>;

    /// Run a search and return the first page of hits. Missing indices
    /// yield no hits.
    async fn search(&self, indices: &[String], body: &Value) -> Result<Vec<Hit>, SearchIndexError>;

    /// Count documents. Missing indices count as empty.
    async fn count(&self, indices: &[String]) -> Result<u64, SearchIndexError>;

    /// Start a scroll and return its first page.
    async fn open_scroll(
        &self,
        indices: &[String],
        body: &Value,
        keep_alive: &str,
    ) -> Result<ScrollPage, SearchIndexError>;

    /// Fetch the next page of a scroll.
    async fn next_scroll(&self, scroll_id: &str, keep_alive: &str) -> Result<ScrollPage, SearchIndexError>;

    /// Release a scroll cursor on the server.
    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchIndexError>;

    /// Make all writes to the index visible to reads.
    async fn refresh(&self, index: &str) -> Result<(), SearchIndexError>;

    /// Check that the cluster is reachable and not red.
    async fn health_check(&self) -> Result<bool, SearchIndexError>;
}
