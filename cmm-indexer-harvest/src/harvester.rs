//! Discovery, retrieval and mapping of one repository's studies.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use cmm_indexer_shared::{RecordHeader, Repository, Study};

use crate::discovery::RecordDiscovery;
use crate::errors::HarvestError;
use crate::mapper::{CmmStudyMapper, LanguagePolicy};
use crate::source::{FileRecordSource, HttpRecordSource, HttpSourceConfig, LocatorSource, RecordSource};

/// Configuration of a [`StudyHarvester`].
#[derive(Debug, Clone, Default)]
pub struct HarvesterConfig {
    pub http: HttpSourceConfig,
    pub language_policy: LanguagePolicy,
}

impl HarvesterConfig {
    /// Create a configuration with the given HTTP settings.
    pub fn with_http(mut self, http: HttpSourceConfig) -> Self {
        self.http = http;
        self
    }

    /// Create a configuration with the given language policy.
    pub fn with_language_policy(mut self, policy: LanguagePolicy) -> Self {
        self.language_policy = policy;
        self
    }
}

/// Turns repository records into studies.
#[derive(Clone)]
pub struct StudyHarvester {
    discovery: RecordDiscovery,
    mapper: Arc<CmmStudyMapper>,
}

impl StudyHarvester {
    pub fn new(source: Arc<dyn RecordSource>, mapper: CmmStudyMapper) -> Self {
        Self {
            discovery: RecordDiscovery::new(source),
            mapper: Arc::new(mapper),
        }
    }

    /// Build a harvester serving both endpoint and staged repositories.
    pub fn from_config(config: HarvesterConfig) -> Result<Self, HarvestError> {
        let source = LocatorSource::new(HttpRecordSource::new(config.http)?, FileRecordSource::new());
        Ok(Self::new(
            Arc::new(source),
            CmmStudyMapper::new(config.language_policy),
        ))
    }

    /// List the record headers of a repository, see [`RecordDiscovery::discover`].
    pub async fn discover(
        &self,
        repo: &Repository,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RecordHeader>, HarvestError> {
        self.discovery.discover(repo, since).await
    }

    /// Produce the study of one header.
    ///
    /// A tombstoned header is turned into an inactive study without
    /// contacting the repository. Otherwise the record is retrieved and
    /// mapped, and the study records where its document came from.
    ///
    /// # Returns
    ///
    /// * `Ok(Study)` - The mapped or synthesized study
    /// * `Err(HarvestError)` - Retrieval, protocol or parse failure for this record
    #[instrument(skip(self, repo, header), fields(repository = %repo.code, identifier = %header.identifier))]
    pub async fn harvest(&self, repo: &Repository, header: &RecordHeader) -> Result<Study, HarvestError> {
        let location = self
            .discovery
            .source()
            .record_location(repo, &header.identifier);

        if header.deleted {
            debug!("Header is tombstoned, skipping retrieval");
            return Ok(Study::tombstone(header, location));
        }

        let doc = self.discovery.retrieve(repo, &header.identifier).await?;
        let mut study = self.mapper.map(&doc, repo)?;
        study.study_xml_source_url = location;
        Ok(study)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::tests::{repo, MockSource};
    use crate::oai::OaiRequest;

    const RECORD: &str = r#"<OAI-PMH><GetRecord><record>
        <header><identifier>1000</identifier><datestamp>2018-02-21</datestamp></header>
        <metadata><codeBook xml:lang="en"><stdyDscr>
            <citation><titlStmt><titl>Title</titl></titlStmt></citation>
            <stdyInfo><abstract>Abstract</abstract></stdyInfo>
        </stdyDscr></codeBook></metadata>
    </record></GetRecord></OAI-PMH>"#;

    #[tokio::test]
    async fn test_tombstone_skips_retrieval() {
        let source = Arc::new(MockSource::new());
        let harvester = StudyHarvester::new(source.clone(), CmmStudyMapper::default());
        let header = RecordHeader::new("997", "2018-02-21T07:48:38Z").deleted();

        let study = harvester.harvest(&repo(), &header).await.unwrap();

        assert!(!study.active);
        assert!(study.metadata.is_none());
        assert_eq!(study.study_xml_source_url.as_deref(), Some("mock://997"));
        assert!(source.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_harvest_maps_record() {
        let source = Arc::new(MockSource::new().with(OaiRequest::get_record("1000"), RECORD));
        let harvester = StudyHarvester::new(source.clone(), CmmStudyMapper::default());

        let study = harvester
            .harvest(&repo(), &RecordHeader::new("1000", "2018-02-21"))
            .await
            .unwrap();

        assert!(study.active);
        assert_eq!(study.study_xml_source_url.as_deref(), Some("mock://1000"));
        assert_eq!(study.metadata.unwrap().title["en"], "Title");
        assert_eq!(source.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_harvest_surfaces_protocol_error() {
        let source = MockSource::new().with(
            OaiRequest::get_record("1"),
            r#"<OAI-PMH><error code="cannotDisseminateFormat">no ddi</error></OAI-PMH>"#,
        );
        let harvester = StudyHarvester::new(Arc::new(source), CmmStudyMapper::default());

        let err = harvester
            .harvest(&repo(), &RecordHeader::new("1", "2018-02-21"))
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::Protocol { .. }));
    }
}
