//! Orchestrator module for the indexer pipeline.
//!
//! Runs one consumer-processor-loader pipeline per repository and collects
//! their reports.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument, warn};

use cmm_indexer_harvest::StudyHarvester;
use cmm_indexer_repository::{StudyIndexClient, ThemeReindexSummary};
use cmm_indexer_shared::Repository;

use crate::consumer::{ConsumerConfig, HarvestConsumer, HarvestMessage};
use crate::errors::PipelineError;
use crate::loader::{LoaderConfig, StudyLoader};
use crate::processor::LanguageMaterializer;

/// Languages harvested when none are configured.
pub const DEFAULT_LANGUAGES: &[&str] = &[
    "cs", "da", "de", "el", "en", "et", "fi", "fr", "hu", "it", "nl", "no", "pt", "sk", "sl", "sr", "sv",
];

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Languages studies are materialized into.
    pub languages: Vec<String>,
    /// Parallel record retrievals within one repository.
    pub concurrency: usize,
    /// Only harvest records modified after the newest indexed study.
    pub incremental: bool,
    /// Rebuild the theme indices after harvesting.
    pub reindex_themes: bool,
    /// Size of each repository's message channel buffer.
    pub channel_buffer_size: usize,
    pub loader: LoaderConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            languages: DEFAULT_LANGUAGES.iter().map(|lang| lang.to_string()).collect(),
            concurrency: 8,
            incremental: false,
            reindex_themes: false,
            channel_buffer_size: 1000,
            loader: LoaderConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    pub fn with_reindex_themes(mut self, reindex_themes: bool) -> Self {
        self.reindex_themes = reindex_themes;
        self
    }

    pub fn with_loader(mut self, loader: LoaderConfig) -> Self {
        self.loader = loader;
        self
    }
}

/// Outcome of harvesting one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryReport {
    /// Code of the repository.
    pub code: String,
    /// Headers left after watermark filtering.
    pub discovered: usize,
    /// Studies harvested, tombstones included.
    pub retrieved: usize,
    /// Records that could not be retrieved or mapped.
    pub failed: usize,
    /// Documents indexed per language.
    pub indexed: BTreeMap<String, usize>,
    /// Documents submitted to the index but not written.
    pub rejected: usize,
    /// Whether the harvest was stopped by a shutdown signal.
    pub cancelled: bool,
    /// Repository-level failure, e.g. a discovery error.
    pub error: Option<String>,
}

impl RepositoryReport {
    fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn total_indexed(&self) -> usize {
        self.indexed.values().sum()
    }

    /// Whether the repository was harvested to the end without a
    /// repository-level failure. Individual record failures are allowed.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.error.is_none()
    }
}

/// Outcome of one orchestrator run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// One report per repository, in input order.
    pub repositories: Vec<RepositoryReport>,
    /// Theme reindex outcome, when it ran and succeeded.
    pub themes: Option<ThemeReindexSummary>,
}

impl RunSummary {
    pub fn total_indexed(&self) -> usize {
        self.repositories.iter().map(RepositoryReport::total_indexed).sum()
    }

    /// Repositories that did not complete.
    pub fn incomplete(&self) -> impl Iterator<Item = &RepositoryReport> {
        self.repositories.iter().filter(|report| !report.is_complete())
    }
}

/// Everything one repository task needs, cloned per repository.
struct RepositoryPipeline {
    consumer: HarvestConsumer,
    materializer: LanguageMaterializer,
    client: Arc<StudyIndexClient>,
    loader_config: LoaderConfig,
    channel_buffer_size: usize,
}

impl RepositoryPipeline {
    #[instrument(skip_all, fields(repository = %repo.code))]
    async fn run(
        self,
        repo: Repository,
        since: Option<DateTime<Utc>>,
        shutdown: broadcast::Receiver<()>,
    ) -> RepositoryReport {
        let Self {
            consumer,
            materializer,
            client,
            loader_config,
            channel_buffer_size,
        } = self;

        let repo = Arc::new(repo);
        let mut report = RepositoryReport::new(&repo.code);
        let (tx, mut rx) = mpsc::channel::<HarvestMessage>(channel_buffer_size);

        let consumer_repo = repo.clone();
        let consumer_handle =
            tokio::spawn(async move { consumer.run(&consumer_repo, since, tx, shutdown).await });

        let mut loader = StudyLoader::with_config(client, loader_config);

        while let Some(msg) = rx.recv().await {
            match msg {
                HarvestMessage::Discovered { count } => report.discovered = count,
                HarvestMessage::Study(study) => {
                    report.retrieved += 1;
                    let documents = materializer.materialize(&study, &repo);
                    if let Err(e) = loader.load(documents).await {
                        error!(error = %e, "Failed to load documents");
                    }
                }
                HarvestMessage::Error {
                    identifier: Some(identifier),
                    message,
                } => {
                    debug!(identifier = %identifier, error = %message, "Record failed");
                    report.failed += 1;
                }
                HarvestMessage::Error {
                    identifier: None,
                    message,
                } => {
                    report.error = Some(message);
                }
                HarvestMessage::End => {
                    debug!("Consumer stream ended");
                    break;
                }
            }
        }

        // Flush any remaining documents
        if let Err(e) = loader.flush().await {
            warn!(error = %e, "Failed to flush remaining documents");
        }
        report.indexed = loader.indexed().clone();
        report.rejected = loader.rejected();

        match consumer_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(PipelineError::Cancelled)) => report.cancelled = true,
            Ok(Err(e)) => {
                report.error.get_or_insert_with(|| e.to_string());
            }
            Err(e) => {
                error!(error = %e, "Consumer task failed");
                report.error = Some(PipelineError::consumer(e.to_string()).to_string());
            }
        }

        info!(
            discovered = report.discovered,
            retrieved = report.retrieved,
            failed = report.failed,
            indexed = report.total_indexed(),
            cancelled = report.cancelled,
            "Repository harvest finished"
        );
        report
    }
}

/// Orchestrator that runs the pipeline of every repository.
///
/// The orchestrator:
/// - Starts one task per repository, so repositories never wait on each other
/// - Derives the discovery watermark in incremental mode
/// - Propagates shutdown signals to every repository task
/// - Optionally rebuilds the theme indices once harvesting is done
pub struct Orchestrator {
    consumer: HarvestConsumer,
    materializer: LanguageMaterializer,
    client: Arc<StudyIndexClient>,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl Orchestrator {
    /// Create a new orchestrator with default configuration.
    pub fn new(harvester: StudyHarvester, client: Arc<StudyIndexClient>) -> Self {
        Self::with_config(harvester, client, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        harvester: StudyHarvester,
        client: Arc<StudyIndexClient>,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let consumer = HarvestConsumer::with_config(
            harvester,
            ConsumerConfig {
                concurrency: config.concurrency,
            },
        );

        Self {
            consumer,
            materializer: LanguageMaterializer::new(config.languages.iter().cloned()),
            client,
            config,
            shutdown_tx,
        }
    }

    /// Harvest every repository and index its studies.
    ///
    /// Repositories run concurrently and independently: a failing or
    /// cancelled repository is reported and does not affect the others.
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - One report per repository
    /// * `Err(PipelineError::SearchIndexError)` - If the incremental watermark could not be read
    #[instrument(skip_all, fields(repositories = repositories.len()))]
    pub async fn run(&self, repositories: Vec<Repository>) -> Result<RunSummary, PipelineError> {
        info!("Starting harvest run");

        let since = if self.config.incremental {
            let since = self.client.get_most_recent_last_modified().await?;
            info!(since = ?since, "Incremental harvest");
            since
        } else {
            None
        };

        let handles: Vec<_> = repositories
            .into_iter()
            .map(|repo| {
                let code = repo.code.clone();
                let pipeline = RepositoryPipeline {
                    consumer: self.consumer.clone(),
                    materializer: self.materializer.clone(),
                    client: self.client.clone(),
                    loader_config: self.config.loader.clone(),
                    channel_buffer_size: self.config.channel_buffer_size,
                };
                let shutdown = self.shutdown_tx.subscribe();
                (code, tokio::spawn(pipeline.run(repo, since, shutdown)))
            })
            .collect();

        let (codes, tasks): (Vec<String>, Vec<_>) = handles.into_iter().unzip();
        let mut joined = Box::pin(join_all(tasks));

        let results = tokio::select! {
            results = &mut joined => results,
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                self.shutdown();
                joined.await
            }
        };

        let repositories: Vec<RepositoryReport> = codes
            .into_iter()
            .zip(results)
            .map(|(code, result)| {
                result.unwrap_or_else(|e| {
                    error!(repository = %code, error = %e, "Repository task failed");
                    RepositoryReport {
                        error: Some(e.to_string()),
                        ..RepositoryReport::new(code)
                    }
                })
            })
            .collect();

        let mut summary = RunSummary {
            repositories,
            themes: None,
        };

        if self.config.reindex_themes {
            if summary.repositories.iter().any(|report| report.cancelled) {
                warn!("Harvest was cancelled, skipping theme reindex");
            } else {
                summary.themes = self.reindex_themes().await;
            }
        }

        info!(
            indexed = summary.total_indexed(),
            incomplete = summary.incomplete().count(),
            "Harvest run complete"
        );
        Ok(summary)
    }

    /// Refresh the study indices, then rebuild the theme indices.
    async fn reindex_themes(&self) -> Option<ThemeReindexSummary> {
        for lang in &self.config.languages {
            if let Err(e) = self.client.refresh(lang).await {
                warn!(lang = %lang, error = %e, "Failed to refresh study index");
            }
        }

        match self.client.reindex_all_themes().await {
            Ok(themes) => Some(themes),
            Err(e) => {
                error!(error = %e, "Theme reindex failed");
                None
            }
        }
    }

    /// Trigger a graceful shutdown of every running repository.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
