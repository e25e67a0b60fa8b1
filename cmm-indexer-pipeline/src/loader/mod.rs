//! Loader module for the indexer pipeline.
//!
//! Loads per-language study documents into the study indices.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use cmm_indexer_repository::{SearchIndexError, StudyIndexClient};
use cmm_indexer_shared::StudyOfLanguage;

use crate::errors::PipelineError;

/// Configuration for the study loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Number of documents of one language to batch before flushing.
    pub batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { batch_size: 500 }
    }
}

impl LoaderConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Loader that indexes study documents, batched per language.
///
/// The loader is responsible for:
/// - Buffering documents per language until a batch is full
/// - Counting indexed and rejected documents per language
/// - Giving up on a language whose index cannot be created
pub struct StudyLoader {
    client: Arc<StudyIndexClient>,
    config: LoaderConfig,
    pending: BTreeMap<String, Vec<StudyOfLanguage>>,
    indexed: BTreeMap<String, usize>,
    rejected: usize,
    /// Languages whose index could not be created during this pass.
    disabled: BTreeSet<String>,
}

impl StudyLoader {
    /// Create a new study loader with the given client.
    pub fn new(client: Arc<StudyIndexClient>) -> Self {
        Self::with_config(client, LoaderConfig::default())
    }

    /// Create a new study loader with custom configuration.
    pub fn with_config(client: Arc<StudyIndexClient>, config: LoaderConfig) -> Self {
        Self {
            client,
            config,
            pending: BTreeMap::new(),
            indexed: BTreeMap::new(),
            rejected: 0,
            disabled: BTreeSet::new(),
        }
    }

    /// Documents successfully indexed so far, per language.
    pub fn indexed(&self) -> &BTreeMap<String, usize> {
        &self.indexed
    }

    /// Documents that were submitted but not indexed.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Queue the documents of one study.
    ///
    /// A language is flushed as soon as its batch is full.
    pub async fn load(
        &mut self,
        documents: BTreeMap<String, StudyOfLanguage>,
    ) -> Result<(), PipelineError> {
        let mut full = Vec::new();
        for (lang, doc) in documents {
            let batch = self.pending.entry(lang.clone()).or_default();
            batch.push(doc);
            if batch.len() >= self.config.batch_size {
                full.push(lang);
            }
        }

        let mut first_error = None;
        for lang in full {
            if let Err(e) = self.flush_language(&lang).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Flush every pending document to the study indices.
    ///
    /// All languages are attempted; the first failure is returned.
    #[instrument(skip(self))]
    pub async fn flush(&mut self) -> Result<(), PipelineError> {
        let languages: Vec<String> = self.pending.keys().cloned().collect();

        let mut first_error = None;
        for lang in languages {
            if let Err(e) = self.flush_language(&lang).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn flush_language(&mut self, lang: &str) -> Result<(), PipelineError> {
        let docs = self.pending.remove(lang).unwrap_or_default();
        if docs.is_empty() {
            return Ok(());
        }
        let count = docs.len();

        if self.disabled.contains(lang) {
            debug!(lang = %lang, count, "Skipping documents for language without index");
            self.rejected += count;
            return Ok(());
        }

        info!(lang = %lang, count, "Flushing documents to study index");

        match self.client.bulk_index(&docs, lang).await {
            Ok(summary) => {
                *self.indexed.entry(lang.to_string()).or_default() += summary.succeeded;
                self.rejected += summary.failed;
                if summary.failed > 0 {
                    warn!(
                        lang = %lang,
                        succeeded = summary.succeeded,
                        failed = summary.failed,
                        "Some documents were not indexed"
                    );
                }
                Ok(())
            }
            Err(e @ SearchIndexError::IndexCreationError(_)) => {
                error!(lang = %lang, error = %e, "Study index could not be created, skipping language");
                self.disabled.insert(lang.to_string());
                self.rejected += count;
                Err(e.into())
            }
            Err(e) => {
                error!(lang = %lang, error = %e, count, "Failed to index documents");
                self.rejected += count;
                Err(PipelineError::loader(format!(
                    "Failed to index {} documents for {}: {}",
                    count, lang, e
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryIndex;
    use std::sync::atomic::Ordering;

    fn doc(id: &str) -> StudyOfLanguage {
        StudyOfLanguage {
            id: id.to_string(),
            code: "FSD".into(),
            study_number: id.to_string(),
            title_study: Some("Title".into()),
            is_active: true,
            ..Default::default()
        }
    }

    fn documents(id: &str, languages: &[&str]) -> BTreeMap<String, StudyOfLanguage> {
        languages
            .iter()
            .map(|lang| (lang.to_string(), doc(id)))
            .collect()
    }

    #[tokio::test]
    async fn test_load_and_flush() {
        let index = Arc::new(MemoryIndex::new());
        let client = Arc::new(StudyIndexClient::new(index.clone()));
        let mut loader = StudyLoader::new(client);

        loader.load(documents("FSD__1", &["en", "fi"])).await.unwrap();
        loader.load(documents("FSD__2", &["en"])).await.unwrap();
        assert_eq!(index.bulk_calls.load(Ordering::SeqCst), 0);

        loader.flush().await.unwrap();

        assert_eq!(loader.indexed()["en"], 2);
        assert_eq!(loader.indexed()["fi"], 1);
        assert_eq!(index.ids("cmmstudy_en").await, vec!["FSD__1", "FSD__2"]);
        assert_eq!(index.ids("cmmstudy_fi").await, vec!["FSD__1"]);
    }

    #[tokio::test]
    async fn test_flushes_full_batches() {
        let index = Arc::new(MemoryIndex::new());
        let client = Arc::new(StudyIndexClient::new(index.clone()));
        let mut loader = StudyLoader::with_config(client, LoaderConfig::default().with_batch_size(2));

        loader.load(documents("FSD__1", &["en"])).await.unwrap();
        loader.load(documents("FSD__2", &["en", "fi"])).await.unwrap();

        // "en" reached the batch size, "fi" is still pending
        assert_eq!(index.bulk_calls.load(Ordering::SeqCst), 1);
        assert!(index.ids("cmmstudy_fi").await.is_empty());

        loader.flush().await.unwrap();
        assert_eq!(index.bulk_calls.load(Ordering::SeqCst), 2);
        assert_eq!(loader.indexed()["fi"], 1);
    }

    #[tokio::test]
    async fn test_index_creation_failure_disables_language() {
        let index = Arc::new(MemoryIndex::new().failing_creation("cmmstudy_fi"));
        let client = Arc::new(StudyIndexClient::new(index.clone()));
        let mut loader = StudyLoader::new(client);

        loader.load(documents("FSD__1", &["en", "fi"])).await.unwrap();
        let err = loader.flush().await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::SearchIndexError(SearchIndexError::IndexCreationError(_))
        ));

        loader.load(documents("FSD__2", &["en", "fi"])).await.unwrap();
        loader.flush().await.unwrap();

        assert_eq!(loader.indexed()["en"], 2);
        assert!(!loader.indexed().contains_key("fi"));
        assert_eq!(loader.rejected(), 2);
    }

    #[tokio::test]
    async fn test_flush_without_pending_documents() {
        let index = Arc::new(MemoryIndex::new());
        let mut loader = StudyLoader::new(Arc::new(StudyIndexClient::new(index.clone())));

        loader.flush().await.unwrap();
        assert_eq!(index.bulk_calls.load(Ordering::SeqCst), 0);
    }
}
