//! Record sources.
//!
//! A record source answers OAI-PMH requests for a repository with the raw
//! response bytes. Which implementation serves a repository is decided by its
//! [`Locator`]: live endpoints go over HTTP, staging directories are read from
//! disk. [`LocatorSource`] routes between the two.

mod file;
mod http;

pub use file::FileRecordSource;
pub use http::{HttpRecordSource, HttpSourceConfig};

use async_trait::async_trait;

use cmm_indexer_shared::{Locator, Repository};

use crate::errors::HarvestError;
use crate::oai::OaiRequest;

/// Abstract access to the raw documents of a repository.
///
/// Implementations must be `Send + Sync` so one source can serve every
/// repository task concurrently.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Perform one request and return the raw response body.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<u8>)` - The response body, not yet checked for protocol errors
    /// * `Err(HarvestError)` - Transport, status or IO failure
    async fn fetch(&self, repo: &Repository, request: &OaiRequest) -> Result<Vec<u8>, HarvestError>;

    /// Location of the raw record document, recorded on the study.
    fn record_location(&self, repo: &Repository, identifier: &str) -> Option<String>;
}

/// Routes each repository to the HTTP or file source according to its locator.
pub struct LocatorSource {
    http: HttpRecordSource,
    file: FileRecordSource,
}

impl LocatorSource {
    /// Create a router over the two sources.
    pub fn new(http: HttpRecordSource, file: FileRecordSource) -> Self {
        Self { http, file }
    }

    fn source_for(&self, repo: &Repository) -> &dyn RecordSource {
        match repo.locator {
            Locator::Endpoint(_) => &self.http,
            Locator::Path(_) => &self.file,
        }
    }
}

#[async_trait]
impl RecordSource for LocatorSource {
    async fn fetch(&self, repo: &Repository, request: &OaiRequest) -> Result<Vec<u8>, HarvestError> {
        self.source_for(repo).fetch(repo, request).await
    }

    fn record_location(&self, repo: &Repository, identifier: &str) -> Option<String> {
        self.source_for(repo).record_location(repo, identifier)
    }
}
