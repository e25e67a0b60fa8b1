//! Record source and search index doubles used by the unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use cmm_indexer_harvest::{HarvestError, OaiRequest, RecordSource};
use cmm_indexer_repository::{
    BulkItemResult, BulkOperation, Hit, IndexCreation, ScrollPage, SearchIndexError,
    SearchIndexProvider,
};
use cmm_indexer_shared::{Locator, Repository};

pub(crate) fn staged_repo(code: &str) -> Repository {
    Repository::new(
        Locator::Path(PathBuf::from(format!("/staged/{}", code))),
        code,
        format!("{} Archive", code),
        "oai_ddi25",
    )
}

/// A `ListIdentifiers` page of `(identifier, datestamp, deleted)` headers.
pub(crate) fn header_page(headers: &[(&str, &str, bool)]) -> String {
    let headers: String = headers
        .iter()
        .map(|(id, datestamp, deleted)| {
            let status = if *deleted { r#" status="deleted""# } else { "" };
            format!(
                "<header{}><identifier>{}</identifier><datestamp>{}</datestamp></header>",
                status, id, datestamp
            )
        })
        .collect();
    format!("<OAI-PMH><ListIdentifiers>{}</ListIdentifiers></OAI-PMH>", headers)
}

/// An English-only `GetRecord` response that qualifies for "en".
pub(crate) fn record(id: &str, title: &str, abstract_text: &str) -> String {
    format!(
        r#"<OAI-PMH><GetRecord><record>
            <header><identifier>{id}</identifier><datestamp>2018-02-21T07:48:38Z</datestamp></header>
            <metadata><codeBook xml:lang="en">
                <docDscr><citation><prodStmt><producer>Source Archive</producer></prodStmt></citation></docDscr>
                <stdyDscr>
                    <citation><titlStmt><titl>{title}</titl></titlStmt></citation>
                    <stdyInfo><abstract>{abstract_text}</abstract></stdyInfo>
                </stdyDscr>
            </codeBook></metadata>
        </record></GetRecord></OAI-PMH>"#
    )
}

/// Serves canned responses per repository code and request.
#[derive(Default)]
pub(crate) struct StagedSource {
    responses: HashMap<(String, OaiRequest), String>,
    /// Repositories whose `GetRecord` requests never complete.
    hanging: HashSet<String>,
    pub(crate) requests: StdMutex<Vec<(String, OaiRequest)>>,
}

impl StagedSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, code: &str, request: OaiRequest, body: impl Into<String>) -> Self {
        self.responses.insert((code.to_string(), request), body.into());
        self
    }

    pub(crate) fn hanging(mut self, code: &str) -> Self {
        self.hanging.insert(code.to_string());
        self
    }
}

#[async_trait]
impl RecordSource for StagedSource {
    async fn fetch(&self, repo: &Repository, request: &OaiRequest) -> Result<Vec<u8>, HarvestError> {
        let key = (repo.code.clone(), request.clone());
        self.requests.lock().unwrap().push(key.clone());

        if self.hanging.contains(&repo.code) && matches!(request, OaiRequest::GetRecord { .. }) {
            return std::future::pending().await;
        }

        self.responses
            .get(&key)
            .map(|body| body.clone().into_bytes())
            .ok_or_else(|| HarvestError::transport("connection refused"))
    }

    fn record_location(&self, repo: &Repository, identifier: &str) -> Option<String> {
        Some(format!("staged://{}/{}", repo.code, identifier))
    }
}

/// Keeps documents per index; searches return the documents of the matching
/// indices ordered by `lastModified`, newest first.
#[derive(Default)]
pub(crate) struct MemoryIndex {
    indices: Mutex<BTreeMap<String, BTreeMap<String, Value>>>,
    failing_creation: HashSet<String>,
    pub(crate) bulk_calls: AtomicUsize,
}

impl MemoryIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_creation(mut self, index: &str) -> Self {
        self.failing_creation.insert(index.to_string());
        self
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

    pub(crate) async fn document(&self, index: &str, id: &str) -> Option<Value> {
        self.indices
            .lock()
            .await
            .get(index)
            .and_then(|docs| docs.get(id).cloned())
    }

    fn matches(patterns: &[String], index: &str) -> bool {
        patterns.iter().any(|pattern| match pattern.strip_suffix('*') {
            Some(prefix) => index.starts_with(prefix),
            None => pattern == index,
        })
    }
}

#[async_trait]
impl SearchIndexProvider for MemoryIndex {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError> {
        Ok(self.indices.lock().await.contains_key(index))
    }

    async fn create_index(&self, index: &str, _body: &Value) -> Result<IndexCreation, SearchIndexError> {
        if self.failing_creation.contains(index) {
            return Err(SearchIndexError::index_creation(format!("{}: disk full", index)));
        }
        let mut indices = self.indices.lock().await;
        if indices.contains_key(index) {
            return Ok(IndexCreation::AlreadyExists);
        }
        indices.insert(index.to_string(), BTreeMap::new());
        Ok(IndexCreation::Created)
    }

    async fn put_mapping(&self, _index: &str, _mapping: &Value) -> Result<(), SearchIndexError> {
        Ok(())
    }

    async fn bulk(&self, operations: &[BulkOperation]) -> Result<Vec<BulkItemResult>, SearchIndexError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        let mut indices = self.indices.lock().await;

        Ok(operations
            .iter()
            .map(|operation| {
                let docs = indices.entry(operation.target().to_string()).or_default();
                match operation {
                    BulkOperation::Index { id, source, .. } => {
                        docs.insert(id.clone(), source.clone());
                        BulkItemResult::ok(id.as_str())
                    }
                    BulkOperation::Delete { id, .. } => {
                        docs.remove(id);
                        BulkItemResult::ok(id.as_str())
                    }
                }
            })
            .collect())
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Hit>, SearchIndexError> {
        Ok(self.document(index, id).await.map(|source| Hit {
            index: index.to_string(),
            id: id.to_string(),
            source,
        }))
    }

    async fn search(&self, indices: &[String], body: &Value) -> Result<Vec<Hit>, SearchIndexError> {
        let size = body.get("size").and_then(Value::as_u64).unwrap_or(10) as usize;
        let stored = self.indices.lock().await;

        let mut hits: Vec<Hit> = stored
            .iter()
            .filter(|(index, _)| Self::matches(indices, index))
            .flat_map(|(index, docs)| {
                docs.iter().map(move |(id, source)| Hit {
                    index: index.clone(),
                    id: id.clone(),
                    source: source.clone(),
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            let modified = |hit: &Hit| {
                hit.source
                    .get("lastModified")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };
            modified(b).cmp(&modified(a))
        });
        hits.truncate(size);
        Ok(hits)
    }

    async fn count(&self, indices: &[String]) -> Result<u64, SearchIndexError> {
        let stored = self.indices.lock().await;
        Ok(stored
            .iter()
            .filter(|(index, _)| Self::matches(indices, index))
            .map(|(_, docs)| docs.len() as u64)
            .sum())
    }

    async fn open_scroll(
        &self,
        _indices: &[String],
        _body: &Value,
        _keep_alive: &str,
    ) -> Result<ScrollPage, SearchIndexError> {
        Ok(ScrollPage {
            scroll_id: None,
            hits: Vec::new(),
        })
    }

    async fn next_scroll(&self, _scroll_id: &str, _keep_alive: &str) -> Result<ScrollPage, SearchIndexError> {
        Ok(ScrollPage {
            scroll_id: None,
            hits: Vec::new(),
        })
    }

    async fn clear_scroll(&self, _scroll_id: &str) -> Result<(), SearchIndexError> {
        Ok(())
    }

    async fn refresh(&self, _index: &str) -> Result<(), SearchIndexError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchIndexError> {
        Ok(true)
    }
}
