//! In-memory provider used by the unit tests.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::{
    BulkItemResult, BulkOperation, Hit, IndexCreation, ScrollPage, STRICT_DYNAMIC_MAPPING_EXCEPTION,
};

type Indices = BTreeMap<String, BTreeMap<String, Value>>;

/// Stores documents per index and answers the small query subset the
/// client issues: `match_all`, `term` and a sort on `lastModified`.
#[derive(Default)]
pub(crate) struct MemoryProvider {
    pub(crate) indices: Mutex<Indices>,
    pub(crate) created: Mutex<Vec<String>>,
    pub(crate) cleared_scrolls: Mutex<Vec<String>>,
    scrolls: Mutex<HashMap<String, (usize, VecDeque<Hit>)>>,
    pub(crate) bulk_calls: AtomicUsize,
    pub(crate) mapping_updates: AtomicUsize,
    /// When set, indexing fails with a strict mapping violation until the
    /// mapping is updated.
    pub(crate) reject_until_mapping_update: AtomicBool,
    /// Error type returned for individual document ids. Strict mapping
    /// failures are cleared by a mapping update, others persist.
    item_failures: Mutex<HashMap<String, String>>,
    /// Indices whose creation fails.
    failing_creation: Mutex<HashSet<String>>,
    next_scroll: AtomicUsize,
}

impl MemoryProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn fail_item(&self, id: &str, error_type: &str) {
        self.item_failures
            .lock()
            .await
            .insert(id.to_string(), error_type.to_string());
    }

    pub(crate) async fn fail_creation(&self, index: &str) {
        self.failing_creation.lock().await.insert(index.to_string());
    }

    pub(crate) async fn insert(&self, index: &str, id: &str, source: Value) {
        self.indices
            .lock()
            .await
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), source);
    }

    pub(crate) async fn ids(&self, index: &str) -> Vec<String> {
        self.indices
            .lock()
            .await
            .get(index)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn index_matches(pattern: &str, index: &str) -> bool {
        match pattern.strip_suffix('*') {
            Some(prefix) => index.starts_with(prefix),
            None => pattern == index,
        }
    }

    fn query_matches(query: &Value, source: &Value) -> bool {
        match query.get("term").and_then(|t| t.as_object()) {
            Some(term) => term.iter().all(|(field, expected)| {
                let expected = expected.get("value").unwrap_or(expected);
                source.get(field) == Some(expected)
            }),
            None => true,
        }
    }

    async fn matching_hits(&self, patterns: &[String], body: &Value) -> Vec<Hit> {
        let query = body.get("query").cloned().unwrap_or(Value::Null);
        let include_source = body.get("_source") != Some(&Value::Bool(false));
        let query = &query;
        let indices = self.indices.lock().await;

        let mut hits: Vec<Hit> = indices
            .iter()
            .filter(|(index, _)| patterns.iter().any(|p| Self::index_matches(p, index)))
            .flat_map(|(index, docs)| {
                docs.iter()
                    .filter(move |(_, source)| Self::query_matches(query, source))
                    .map(move |(id, source)| Hit {
                        index: index.clone(),
                        id: id.clone(),
                        source: if include_source { source.clone() } else { Value::Null },
                    })
            })
            .collect();

        if body.pointer("/sort/0/lastModified").is_some() {
            hits.retain(|hit| hit.source.get("lastModified").is_some());
            hits.sort_by(|a, b| {
                let key = |hit: &Hit| hit.source["lastModified"].as_str().unwrap_or_default().to_string();
                key(b).cmp(&key(a))
            });
        }
        hits
    }

    async fn page(&self, scroll_id: &str) -> ScrollPage {
        let mut scrolls = self.scrolls.lock().await;
        let Some((size, pending)) = scrolls.get_mut(scroll_id) else {
            return ScrollPage::default();
        };
        let take = (*size).min(pending.len());
        ScrollPage {
            scroll_id: Some(scroll_id.to_string()),
            hits: pending.drain(..take).collect(),
        }
    }
}

#[async_trait]
impl SearchIndexProvider for MemoryProvider {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError> {
        Ok(self.indices.lock().await.contains_key(index))
    }

    async fn create_index(&self, index: &str, _body: &Value) -> Result<IndexCreation, SearchIndexError> {
        if self.failing_creation.lock().await.contains(index) {
            return Err(SearchIndexError::index_creation(format!("{}: invalid settings", index)));
        }
        let mut indices = self.indices.lock().await;
        if indices.contains_key(index) {
            return Ok(IndexCreation::AlreadyExists);
        }
        indices.insert(index.to_string(), BTreeMap::new());
        self.created.lock().await.push(index.to_string());
        Ok(IndexCreation::Created)
    }

    async fn put_mapping(&self, _index: &str, _mapping: &Value) -> Result<(), SearchIndexError> {
        self.mapping_updates.fetch_add(1, Ordering::SeqCst);
        self.reject_until_mapping_update.store(false, Ordering::SeqCst);
        self.item_failures
            .lock()
            .await
            .retain(|_, error_type| error_type != STRICT_DYNAMIC_MAPPING_EXCEPTION);
        Ok(())
    }

    async fn bulk(&self, operations: &[BulkOperation]) -> Result<Vec<BulkItemResult>, SearchIndexError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        let reject = self.reject_until_mapping_update.load(Ordering::SeqCst);
        let item_failures = self.item_failures.lock().await;
        let mut indices = self.indices.lock().await;

        let mut results = Vec::with_capacity(operations.len());
        for operation in operations {
            match operation {
                BulkOperation::Index { index, id, source } => {
                    if reject {
                        results.push(BulkItemResult::failed(
                            id.as_str(),
                            STRICT_DYNAMIC_MAPPING_EXCEPTION,
                            "mapping set to strict",
                        ));
                        continue;
                    }
                    if let Some(error_type) = item_failures.get(id) {
                        results.push(BulkItemResult::failed(id.as_str(), error_type.as_str(), "rejected"));
                        continue;
                    }
                    indices
                        .entry(index.clone())
                        .or_default()
                        .insert(id.clone(), source.clone());
                    results.push(BulkItemResult::ok(id.as_str()));
                }
                BulkOperation::Delete { index, id } => {
                    if let Some(docs) = indices.get_mut(index) {
                        docs.remove(id);
                    }
                    results.push(BulkItemResult::ok(id.as_str()));
                }
            }
        }
        Ok(results)
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Hit>, SearchIndexError> {
        Ok(self
            .indices
            .lock()
            .await
            .get(index)
            .and_then(|docs| docs.get(id))
            .map(|source| Hit {
                index: index.to_string(),
                id: id.to_string(),
                source: source.clone(),
            }))
    }

    async fn search(&self, indices: &[String], body: &Value) -> Result<Vec<Hit>, SearchIndexError> {
        let mut hits = self.matching_hits(indices, body).await;
        let size = body.get("size").and_then(|s| s.as_u64()).unwrap_or(10) as usize;
        hits.truncate(size);
        Ok(hits)
    }

    async fn count(&self, indices: &[String]) -> Result<u64, SearchIndexError> {
        let hits = self.matching_hits(indices, &Value::Null).await;
        Ok(hits.len() as u64)
    }

    async fn open_scroll(
        &self,
        indices: &[String],
        body: &Value,
        _keep_alive: &str,
    ) -> Result<ScrollPage, SearchIndexError> {
        let hits = self.matching_hits(indices, body).await;
        let size = body.get("size").and_then(|s| s.as_u64()).unwrap_or(10) as usize;
        let id = format!("scroll-{}", self.next_scroll.fetch_add(1, Ordering::SeqCst));
        self.scrolls
            .lock()
            .await
            .insert(id.clone(), (size.max(1), hits.into()));
        Ok(self.page(&id).await)
    }

    async fn next_scroll(&self, scroll_id: &str, _keep_alive: &str) -> Result<ScrollPage, SearchIndexError> {
        if !self.scrolls.lock().await.contains_key(scroll_id) {
            return Err(SearchIndexError::scroll(format!("unknown scroll {}", scroll_id)));
        }
        Ok(self.page(scroll_id).await)
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchIndexError> {
        self.scrolls.lock().await.remove(scroll_id);
        self.cleared_scrolls.lock().await.push(scroll_id.to_string());
        Ok(())
    }

    async fn refresh(&self, _index: &str) -> Result<(), SearchIndexError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchIndexError> {
        Ok(true)
    }
}
