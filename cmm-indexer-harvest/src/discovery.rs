//! Record discovery and retrieval.
//!
//! Discovery walks the `ListIdentifiers` pages of a repository following
//! resumption tokens, then drops headers that are not newer than the
//! optional watermark. Retrieval fetches one `GetRecord` document.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use cmm_indexer_shared::{parse_iso_instant, RecordHeader, Repository};

use crate::errors::HarvestError;
use crate::oai::{check_for_error, parse_identifiers_page, OaiRequest};
use crate::source::RecordSource;
use crate::xml::XmlDocument;

/// Enumerates and fetches records through a [`RecordSource`].
#[derive(Clone)]
pub struct RecordDiscovery {
    source: Arc<dyn RecordSource>,
}

impl RecordDiscovery {
    /// Create a discovery over the given source.
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self { source }
    }

    /// The underlying record source.
    pub fn source(&self) -> &Arc<dyn RecordSource> {
        &self.source
    }

    /// List the record headers of a repository.
    ///
    /// Pages are requested sequentially; each continuation uses the token
    /// of the previous response. Pagination stops at the first response with
    /// no or an empty token.
    ///
    /// # Arguments
    ///
    /// * `repo` - The repository to enumerate
    /// * `since` - Optional watermark; only headers modified strictly after it are returned
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<RecordHeader>)` - All headers in page order
    /// * `Err(HarvestError::Protocol)` - If any page carries an OAI-PMH error
    /// * `Err(HarvestError)` - Transport or parse failure on any page
    #[instrument(skip(self, repo), fields(repository = %repo.code))]
    pub async fn discover(
        &self,
        repo: &Repository,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RecordHeader>, HarvestError> {
        let mut headers = Vec::new();
        let mut request = OaiRequest::list_identifiers();
        let mut pages = 0usize;

        loop {
            let bytes = self.source.fetch(repo, &request).await?;
            let doc = XmlDocument::parse(&bytes)?;
            let page = parse_identifiers_page(&doc)?;
            pages += 1;

            debug!(page = pages, count = page.headers.len(), "Received identifiers page");
            headers.extend(page.headers);

            match page.resumption_token {
                Some(token) if request == OaiRequest::resume(token.as_str()) => {
                    warn!(token = %token, "Repository repeated its resumption token, stopping");
                    break;
                }
                Some(token) => request = OaiRequest::resume(token),
                None => break,
            }
        }

        let total = headers.len();
        let headers = filter_by_watermark(headers, since);
        info!(pages, total, kept = headers.len(), "Discovered records");

        Ok(headers)
    }

    /// Fetch the raw document of one record.
    ///
    /// # Returns
    ///
    /// * `Ok(XmlDocument)` - The parsed `GetRecord` response
    /// * `Err(HarvestError::Protocol)` - If the response carries an OAI-PMH error
    /// * `Err(HarvestError)` - Transport or parse failure
    pub async fn retrieve(
        &self,
        repo: &Repository,
        identifier: &str,
    ) -> Result<XmlDocument, HarvestError> {
        let bytes = self
            .source
            .fetch(repo, &OaiRequest::get_record(identifier))
            .await?;
        let doc = XmlDocument::parse(&bytes)?;
        check_for_error(&doc)?;
        Ok(doc)
    }
}

/// Keep the headers modified strictly after `since`.
///
/// Without a watermark every header is kept. With one, headers whose
/// timestamp cannot be parsed are dropped rather than treated as new.
pub fn filter_by_watermark(
    headers: Vec<RecordHeader>,
    since: Option<DateTime<Utc>>,
) -> Vec<RecordHeader> {
    let Some(since) = since else {
        return headers;
    };

    headers
        .into_iter()
        .filter(|header| match parse_iso_instant(&header.last_modified) {
            Some(modified) => modified > since,
            None => {
                warn!(
                    identifier = %header.identifier,
                    last_modified = %header.last_modified,
                    "Dropping header with unparsable timestamp"
                );
                false
            }
        })
        .collect()
}
