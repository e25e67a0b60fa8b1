//! HTTP record source for live OAI-PMH endpoints.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use cmm_indexer_shared::{Locator, Repository};

use super::RecordSource;
use crate::errors::HarvestError;
use crate::oai::OaiRequest;

/// Configuration for the HTTP record source.
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Total request timeout.
    pub timeout: Duration,
    /// Connection establishment timeout.
    pub connect_timeout: Duration,
    /// User agent sent to repositories.
    pub user_agent: String,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("cmm-indexer/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpSourceConfig {
    /// Create a config with a custom request timeout; the connect timeout is
    /// a third of it.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            connect_timeout: timeout / 3,
            ..Default::default()
        }
    }
}

/// Fetches OAI-PMH responses with HTTP GET.
pub struct HttpRecordSource {
    client: reqwest::Client,
}

impl HttpRecordSource {
    /// Create a new HTTP source.
    ///
    /// # Returns
    ///
    /// * `Ok(HttpRecordSource)` - A source sharing one connection pool
    /// * `Err(HarvestError)` - If the HTTP client cannot be built
    pub fn new(config: HttpSourceConfig) -> Result<Self, HarvestError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent)
            .build()?;

        Ok(Self { client })
    }

    fn endpoint(repo: &Repository) -> Result<&url::Url, HarvestError> {
        match &repo.locator {
            Locator::Endpoint(url) => Ok(url),
            Locator::Path(path) => Err(HarvestError::invalid_locator(format!(
                "repository {} is staged at {}, not an endpoint",
                repo.code,
                path.display()
            ))),
        }
    }
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    async fn fetch(&self, repo: &Repository, request: &OaiRequest) -> Result<Vec<u8>, HarvestError> {
        let url = request.to_url(Self::endpoint(repo)?, repo);
        debug!(repository = %repo.code, url = %url, "Fetching");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(repository = %repo.code, url = %url, status = %status, "Request failed");
            return Err(HarvestError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn record_location(&self, repo: &Repository, identifier: &str) -> Option<String> {
        Self::endpoint(repo)
            .ok()
            .map(|endpoint| OaiRequest::get_record(identifier).to_url(endpoint, repo).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use url::Url;

    #[test]
    fn test_default_config() {
        let config = HttpSourceConfig::with_timeout(Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("cmm-indexer/"));
    }

    #[test]
    fn test_record_location() {
        let source = HttpRecordSource::new(HttpSourceConfig::default()).unwrap();
        let repo = Repository::new(
            Locator::Endpoint(Url::parse("https://oai.example.org/oai").unwrap()),
            "FSD",
            "FSD",
            "oai_ddi25",
        );

        assert_eq!(
            source.record_location(&repo, "1234").as_deref(),
            Some("https://oai.example.org/oai?verb=GetRecord&identifier=1234&metadataPrefix=oai_ddi25")
        );
    }

    #[tokio::test]
    async fn test_path_repository_is_rejected() {
        let source = HttpRecordSource::new(HttpSourceConfig::default()).unwrap();
        let repo = Repository::new(Locator::Path(PathBuf::from("/tmp")), "X", "X", "ddi");

        let result = source.fetch(&repo, &OaiRequest::list_identifiers()).await;
        assert!(matches!(result, Err(HarvestError::InvalidLocator(_))));
    }
}
