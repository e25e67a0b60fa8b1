//! Dependency initialization and wiring for the indexer.

use std::sync::Arc;

use tracing::info;

use cmm_indexer_harvest::StudyHarvester;
use cmm_indexer_pipeline::Orchestrator;
use cmm_indexer_repository::{OpenSearchClient, SearchIndexProvider, StudyIndexClient};

use crate::config::Settings;
use crate::IndexingError;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The study index client shared by every pipeline.
    pub index: Arc<StudyIndexClient>,
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from the settings.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails or OpenSearch is unhealthy
    pub async fn new(settings: &Settings) -> Result<Self, IndexingError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            languages = settings.languages.len(),
            concurrency = settings.concurrency,
            incremental = settings.incremental,
            "Initializing dependencies"
        );

        let ingest_config = settings.ingest_config();

        // Initialize OpenSearch client
        let search_client = OpenSearchClient::new(&settings.opensearch_url, ingest_config.request_timeout)
            .map_err(|e| IndexingError::config(format!("Failed to create OpenSearch client: {}", e)))?;

        // Verify OpenSearch is reachable
        let healthy = search_client
            .health_check()
            .await
            .map_err(|e| IndexingError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(IndexingError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");

        let index = Arc::new(StudyIndexClient::with_config(Arc::new(search_client), ingest_config));

        // Initialize harvester for endpoint and staged repositories
        let harvester = StudyHarvester::from_config(settings.harvester_config())
            .map_err(|e| IndexingError::config(format!("Failed to create harvester: {}", e)))?;

        let orchestrator =
            Orchestrator::with_config(harvester, index.clone(), settings.orchestrator_config());

        Ok(Self { index, orchestrator })
    }
}
