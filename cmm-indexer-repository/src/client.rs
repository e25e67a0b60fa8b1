//! Study index client implementation.
//!
//! This module provides the ingestion engine the pipeline writes through:
//! lazy per-language index creation, batched bulk writes with a single
//! mapping-update retry, read-back cursors and theme reindexing.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use cmm_indexer_shared::{parse_iso_instant, RecordType, StudyOfLanguage};

use crate::config::IngestConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::scroll::ScrollCursor;
use crate::templates::TemplateStore;
use crate::types::{BatchOperationSummary, BulkItemResult, BulkOperation, IndexCreation, ThemeDefinition};

/// Wildcard addressing every language in reads.
pub const ALL_LANGUAGES: &str = "*";

/// Name of the study index of a language, `cmmstudy_<lang>`.
pub fn study_index(lang: &str) -> String {
    format!("{}_{}", RecordType::Study.as_str(), lang)
}

/// Name of a theme's index for a language, `<theme>_<lang>`.
pub fn theme_index(theme: &str, lang: &str) -> String {
    format!("{}_{}", theme, lang)
}

/// Outcome of a theme reindex run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeReindexSummary {
    /// Themes whose source index existed and whose query ran.
    pub themes: usize,
    /// Documents written into theme indices.
    pub written: usize,
    /// Localized siblings that were listed as available but not found.
    pub missing_siblings: usize,
    /// Stale documents removed from theme indices.
    pub deleted: usize,
    /// Themes that could not be written. Their stale documents are kept.
    pub failed: Vec<String>,
}

/// The main client for writing and maintaining study indices.
pub struct StudyIndexClient {
    provider: Arc<dyn SearchIndexProvider>,
    templates: TemplateStore,
    config: IngestConfig,
    /// Indices known to exist, so creation is checked once per process.
    known_indices: Mutex<HashSet<String>>,
}

impl StudyIndexClient {
    /// Create a new StudyIndexClient with default configuration.
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self::with_config(provider, IngestConfig::default())
    }

    /// Create a new StudyIndexClient with custom configuration.
    pub fn with_config(provider: Arc<dyn SearchIndexProvider>, config: IngestConfig) -> Self {
        let templates = TemplateStore::new(config.templates_dir.clone(), config.shards, config.replicas);
        Self {
            provider,
            templates,
            config,
            known_indices: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Create `index` from the templates of `lang` unless it exists.
    ///
    /// An index created concurrently by another writer counts as existing.
    async fn ensure_index(&self, index: &str, lang: &str) -> Result<(), SearchIndexError> {
        let mut known = self.known_indices.lock().await;
        if known.contains(index) {
            return Ok(());
        }

        if !self.provider.index_exists(index).await? {
            let body = self.templates.create_index_body(RecordType::Study, lang).await?;
            match self.provider.create_index(index, &body).await? {
                IndexCreation::Created => info!(index = %index, lang = %lang, "Created index"),
                IndexCreation::AlreadyExists => debug!(index = %index, "Index created concurrently"),
            }
        }

        known.insert(index.to_string());
        Ok(())
    }

    /// Send one batch, updating the mapping and retrying the whole batch
    /// once if any item violated the strict mapping.
    async fn write_batch(
        &self,
        index: &str,
        operations: &[BulkOperation],
    ) -> Result<Vec<BulkItemResult>, SearchIndexError> {
        let mut items = self.provider.bulk(operations).await?;

        if items.iter().any(BulkItemResult::is_mapping_violation) {
            warn!(index = %index, "Strict mapping rejected documents, updating mapping");
            let updated = match self.templates.mappings(RecordType::Study).await {
                Ok(mapping) => self.provider.put_mapping(index, &mapping).await,
                Err(e) => Err(e),
            };
            match updated {
                Ok(()) => items = self.provider.bulk(operations).await?,
                Err(e) => error!(index = %index, error = %e, "Mapping update failed"),
            }
        }

        for item in &items {
            if let Some(error) = &item.error {
                warn!(
                    index = %index,
                    id = %item.id,
                    error_type = %error.error_type,
                    reason = %error.reason,
                    "Document not written"
                );
            }
        }
        Ok(items)
    }

    /// Index documents into `index` in fixed-size batches.
    async fn index_into(
        &self,
        index: &str,
        lang: &str,
        documents: &[StudyOfLanguage],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let mut summary = BatchOperationSummary::default();
        if documents.is_empty() {
            return Ok(summary);
        }

        self.ensure_index(index, lang).await?;

        for chunk in documents.chunks(self.config.batch_size) {
            let operations = chunk
                .iter()
                .map(|doc| Ok(BulkOperation::index(index, doc.id.as_str(), serde_json::to_value(doc)?)))
                .collect::<Result<Vec<_>, SearchIndexError>>()?;
            summary.record(self.write_batch(index, &operations).await?);
        }

        debug!(
            index = %index,
            total = summary.total,
            failed = summary.failed,
            "Indexed documents"
        );
        Ok(summary)
    }

    async fn delete_from(&self, index: &str, ids: &[String]) -> Result<BatchOperationSummary, SearchIndexError> {
        let mut summary = BatchOperationSummary::default();
        for chunk in ids.chunks(self.config.batch_size) {
            let operations: Vec<BulkOperation> = chunk
                .iter()
                .map(|id| BulkOperation::delete(index, id.as_str()))
                .collect();
            summary.record(self.provider.bulk(&operations).await?);
        }
        Ok(summary)
    }

    /// Index studies into the study index of `lang`, creating it if absent.
    ///
    /// Documents overwrite existing ones with the same id. Items rejected
    /// for reasons other than the strict mapping are reported in the
    /// summary and not retried.
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Per-document outcomes; partial success is common
    /// * `Err(SearchIndexError::IndexCreationError)` - If the index could not be created
    /// * `Err(SearchIndexError)` - If a bulk request failed as a whole
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    pub async fn bulk_index(
        &self,
        documents: &[StudyOfLanguage],
        lang: &str,
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        self.index_into(&study_index(lang), lang, documents).await
    }

    /// Delete studies from the study index of `lang`.
    ///
    /// Documents that do not exist count as deleted.
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    pub async fn bulk_delete(
        &self,
        documents: &[StudyOfLanguage],
        lang: &str,
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let index = study_index(lang);
        let ids: Vec<String> = documents.iter().map(|doc| doc.id.clone()).collect();

        if !self.provider.index_exists(&index).await? {
            let mut summary = BatchOperationSummary::default();
            summary.record(ids.into_iter().map(BulkItemResult::ok).collect());
            return Ok(summary);
        }
        self.delete_from(&index, &ids).await
    }

    /// Fetch one study.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(StudyOfLanguage))` - The stored document
    /// * `Ok(None)` - If the document or the index does not exist
    /// * `Err(SearchIndexError::ParseError)` - If the stored document does not deserialize
    pub async fn get_study(&self, id: &str, lang: &str) -> Result<Option<StudyOfLanguage>, SearchIndexError> {
        let index = study_index(lang);
        match self.provider.get_document(&index, id).await? {
            Some(hit) => serde_json::from_value(hit.source)
                .map(Some)
                .map_err(|e| SearchIndexError::parse(format!("{}/{}: {}", index, id, e))),
            None => Ok(None),
        }
    }

    async fn scroll(&self, lang: &str, query: serde_json::Value) -> Result<ScrollCursor, SearchIndexError> {
        ScrollCursor::open(
            self.provider.clone(),
            vec![study_index(lang)],
            json!({
                "size": self.config.scroll_page_size,
                "query": query,
                "sort": ["_doc"]
            }),
            self.config.scroll_keep_alive.clone(),
        )
        .await
    }

    /// Iterate over every study of `lang`, or of all languages with
    /// [`ALL_LANGUAGES`].
    pub async fn get_all_studies(&self, lang: &str) -> Result<ScrollCursor, SearchIndexError> {
        self.scroll(lang, json!({"match_all": {}})).await
    }

    /// Iterate over the studies of one repository.
    pub async fn get_studies_by_repository(
        &self,
        code: &str,
        lang: &str,
    ) -> Result<ScrollCursor, SearchIndexError> {
        self.scroll(lang, json!({"term": {"code": code}})).await
    }

    /// Number of studies in `lang`; a missing index counts as empty.
    pub async fn get_total_hit_count(&self, lang: &str) -> Result<u64, SearchIndexError> {
        self.provider.count(&[study_index(lang)]).await
    }

    /// The latest `lastModified` across every study index.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(DateTime))` - The most recent parsable value
    /// * `Ok(None)` - If no index or document exists, or the stored value does not parse
    pub async fn get_most_recent_last_modified(&self) -> Result<Option<DateTime<Utc>>, SearchIndexError> {
        let hits = self
            .provider
            .search(
                &[study_index(ALL_LANGUAGES)],
                &json!({
                    "size": 1,
                    "_source": ["lastModified"],
                    "query": {"exists": {"field": "lastModified"}},
                    "sort": [{"lastModified": {"order": "desc", "unmapped_type": "date"}}]
                }),
            )
            .await?;

        let Some(value) = hits
            .first()
            .and_then(|hit| hit.source.get("lastModified"))
            .and_then(|lm| lm.as_str())
        else {
            return Ok(None);
        };

        let parsed = parse_iso_instant(value);
        if parsed.is_none() {
            debug!(last_modified = %value, "Most recent lastModified does not parse");
        }
        Ok(parsed)
    }

    /// Make writes to the study index of `lang` visible to reads.
    pub async fn refresh(&self, lang: &str) -> Result<(), SearchIndexError> {
        self.provider.refresh(&study_index(lang)).await
    }

    /// Check that the search engine is reachable and healthy.
    pub async fn health_check(&self) -> Result<bool, SearchIndexError> {
        self.provider.health_check().await
    }

    /// Rebuild every theme index from the study indices, then delete theme
    /// documents this run did not write.
    ///
    /// For each theme whose source index exists, matching studies are copied
    /// into `<theme>_<lang>` together with their localized siblings in every
    /// other available language. Missing siblings are skipped with a warning.
    #[instrument(skip(self))]
    pub async fn reindex_all_themes(&self) -> Result<ThemeReindexSummary, SearchIndexError> {
        let themes = self.templates.themes().await?;
        let mut summary = ThemeReindexSummary::default();
        let mut written: HashSet<(String, String)> = HashSet::new();
        let mut ran: BTreeSet<String> = BTreeSet::new();

        for theme in &themes {
            match self.reindex_theme(theme, &mut summary, &mut written).await {
                Ok(true) => {
                    ran.insert(theme.name.clone());
                    summary.themes += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(theme = %theme.name, lang = %theme.lang, error = %e, "Theme reindex failed");
                    summary.failed.push(theme.name.clone());
                }
            }
        }

        for name in &ran {
            summary.deleted += self.delete_stale(name, &written).await?;
        }

        info!(
            themes = summary.themes,
            written = summary.written,
            deleted = summary.deleted,
            missing_siblings = summary.missing_siblings,
            failed = summary.failed.len(),
            "Theme reindex complete"
        );
        Ok(summary)
    }

    /// Copy one theme's matches and their siblings into its indices.
    ///
    /// Returns `false` when the theme's source index does not exist.
    async fn reindex_theme(
        &self,
        theme: &ThemeDefinition,
        summary: &mut ThemeReindexSummary,
        written: &mut HashSet<(String, String)>,
    ) -> Result<bool, SearchIndexError> {
        let source = study_index(&theme.lang);
        if !self.provider.index_exists(&source).await? {
            warn!(theme = %theme.name, index = %source, "Theme source index is missing, skipping");
            return Ok(false);
        }

        let mut cursor = ScrollCursor::open(
            self.provider.clone(),
            vec![source],
            json!({"size": self.config.scroll_page_size, "query": theme.query}),
            self.config.scroll_keep_alive.clone(),
        )
        .await?;

        let mut pending: BTreeMap<String, Vec<StudyOfLanguage>> = BTreeMap::new();
        while let Some(study) = cursor.next().await? {
            for lang in study.lang_available_in.iter().filter(|l| **l != theme.lang) {
                match self.get_study(&study.id, lang).await? {
                    Some(sibling) => pending.entry(lang.clone()).or_default().push(sibling),
                    None => {
                        warn!(id = %study.id, lang = %lang, theme = %theme.name, "Localized sibling missing, skipping");
                        summary.missing_siblings += 1;
                    }
                }
            }
            pending.entry(theme.lang.clone()).or_default().push(study);

            let full: Vec<String> = pending
                .iter()
                .filter(|(_, docs)| docs.len() >= self.config.batch_size)
                .map(|(lang, _)| lang.clone())
                .collect();
            for lang in full {
                if let Some(docs) = pending.remove(&lang) {
                    summary.written += self.write_theme(&theme.name, &lang, docs, written).await?;
                }
            }
        }

        for (lang, docs) in pending {
            summary.written += self.write_theme(&theme.name, &lang, docs, written).await?;
        }
        Ok(true)
    }

    async fn write_theme(
        &self,
        theme: &str,
        lang: &str,
        documents: Vec<StudyOfLanguage>,
        written: &mut HashSet<(String, String)>,
    ) -> Result<usize, SearchIndexError> {
        let index = theme_index(theme, lang);
        for doc in &documents {
            written.insert((index.clone(), doc.id.clone()));
        }
        let summary = self.index_into(&index, lang, &documents).await?;
        Ok(summary.succeeded)
    }

    /// Delete the documents of one theme's indices that are not in `written`.
    async fn delete_stale(
        &self,
        theme: &str,
        written: &HashSet<(String, String)>,
    ) -> Result<usize, SearchIndexError> {
        let mut cursor = ScrollCursor::open(
            self.provider.clone(),
            vec![theme_index(theme, ALL_LANGUAGES)],
            json!({
                "size": self.config.scroll_page_size,
                "_source": false,
                "query": {"match_all": {}}
            }),
            self.config.scroll_keep_alive.clone(),
        )
        .await?;

        let mut stale: BTreeMap<String, Vec<String>> = BTreeMap::new();
        while let Some(hit) = cursor.next_hit().await? {
            // `<theme>_*` also matches longer theme names sharing the prefix
            let own = hit
                .index
                .rsplit_once('_')
                .is_some_and(|(name, _)| name == theme);
            if own && !written.contains(&(hit.index.clone(), hit.id.clone())) {
                stale.entry(hit.index).or_default().push(hit.id);
            }
        }

        let mut deleted = 0;
        for (index, ids) in stale {
            info!(index = %index, count = ids.len(), "Deleting stale theme documents");
            deleted += self.delete_from(&index, &ids).await?.succeeded;
        }
        Ok(deleted)
    }
}
