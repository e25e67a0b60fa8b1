//! File record source for pre-fetched repositories.
//!
//! A staging directory holds one `GetRecord` response per file, named
//! `<identifier>.xml`. Listing the directory yields a single-page
//! `ListIdentifiers` response built from the headers of those files, so
//! staged repositories go through the same discovery path as live ones.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use quick_xml::escape::escape;
use tracing::warn;

use cmm_indexer_shared::{Locator, Repository};

use super::RecordSource;
use crate::errors::{HarvestError, OaiErrorCode};
use crate::oai::{paths, OaiRequest};
use crate::xml::XmlDocument;

const RECORD_EXTENSION: &str = "xml";

/// Reads staged `GetRecord` responses from a directory.
#[derive(Debug, Clone, Default)]
pub struct FileRecordSource;

impl FileRecordSource {
    /// Create a new file source.
    pub fn new() -> Self {
        Self
    }

    fn directory(repo: &Repository) -> Result<&Path, HarvestError> {
        match &repo.locator {
            Locator::Path(path) => Ok(path),
            Locator::Endpoint(url) => Err(HarvestError::invalid_locator(format!(
                "repository {} is served from {}, not a directory",
                repo.code, url
            ))),
        }
    }

    fn record_path(dir: &Path, identifier: &str) -> Result<PathBuf, HarvestError> {
        if identifier.is_empty()
            || identifier.contains('/')
            || identifier.contains('\\')
            || identifier == ".."
        {
            return Err(HarvestError::protocol(
                OaiErrorCode::IdDoesNotExist,
                format!("invalid staged identifier {:?}", identifier),
            ));
        }
        Ok(dir.join(format!("{}.{}", identifier, RECORD_EXTENSION)))
    }

    /// Build a `ListIdentifiers` envelope from the headers of staged files.
    async fn list_directory(dir: &Path) -> Result<Vec<u8>, HarvestError> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();

        let mut body = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<OAI-PMH><ListIdentifiers>",
        );

        for path in files {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let bytes = tokio::fs::read(&path).await?;
            let doc = match XmlDocument::parse(&bytes) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable staged record");
                    continue;
                }
            };
            let Some(header) = doc.select_first(paths::RECORD_HEADER) else {
                warn!(path = %path.display(), "Skipping staged record without header");
                continue;
            };

            let status = if header.attribute("status") == Some("deleted") {
                " status=\"deleted\""
            } else {
                ""
            };
            let datestamp = header
                .child("datestamp")
                .map(|d| d.text())
                .unwrap_or_default();

            body.push_str(&format!(
                "<header{}><identifier>{}</identifier><datestamp>{}</datestamp>",
                status,
                escape(stem),
                escape(datestamp.as_str())
            ));
            for set_spec in header.child_elements().filter(|c| c.name() == "setSpec") {
                body.push_str(&format!("<setSpec>{}</setSpec>", escape(set_spec.text().as_str())));
            }
            body.push_str("</header>");
        }

        body.push_str("</ListIdentifiers></OAI-PMH>");
        Ok(body.into_bytes())
    }
}

#[async_trait]
impl RecordSource for FileRecordSource {
    async fn fetch(&self, repo: &Repository, request: &OaiRequest) -> Result<Vec<u8>, HarvestError> {
        let dir = Self::directory(repo)?;
        match request {
            OaiRequest::ListIdentifiers {
                resumption_token: None,
            } => Self::list_directory(dir).await,
            OaiRequest::ListIdentifiers {
                resumption_token: Some(token),
            } => Err(HarvestError::protocol(
                OaiErrorCode::BadResumptionToken,
                format!("staged repositories are not paginated: {}", token),
            )),
            OaiRequest::GetRecord { identifier } => {
                let path = Self::record_path(dir, identifier)?;
                match tokio::fs::read(&path).await {
                    Ok(bytes) => Ok(bytes),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        Err(HarvestError::protocol(
                            OaiErrorCode::IdDoesNotExist,
                            format!("{} not found", path.display()),
                        ))
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    fn record_location(&self, repo: &Repository, identifier: &str) -> Option<String> {
        let dir = Self::directory(repo).ok()?;
        Self::record_path(dir, identifier)
            .ok()
            .map(|path| path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oai::parse_identifiers_page;

    fn record(identifier: &str, datestamp: &str, deleted: bool) -> String {
        let status = if deleted { r#" status="deleted""# } else { "" };
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
  <GetRecord>
    <record>
      <header{status}>
        <identifier>{identifier}</identifier>
        <datestamp>{datestamp}</datestamp>
      </header>
    </record>
  </GetRecord>
</OAI-PMH>"#
        )
    }

    fn staged_repo(dir: &Path) -> Repository {
        Repository::new(Locator::Path(dir.to_path_buf()), "UKDS", "UK Data Service", "ddi")
    }

    #[tokio::test]
    async fn test_list_staged_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1001.xml"), record("oai:ukds:1001", "2018-02-21", false)).unwrap();
        std::fs::write(dir.path().join("1000.xml"), record("oai:ukds:1000", "2018-02-20", true)).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(dir.path().join("broken.xml"), "<OAI-PMH>").unwrap();

        let source = FileRecordSource::new();
        let repo = staged_repo(dir.path());
        let bytes = source.fetch(&repo, &OaiRequest::list_identifiers()).await.unwrap();

        let page = parse_identifiers_page(&XmlDocument::parse(&bytes).unwrap()).unwrap();
        let ids: Vec<&str> = page.headers.iter().map(|h| h.identifier.as_str()).collect();
        assert_eq!(ids, vec!["1000", "1001"]);
        assert!(page.headers[0].deleted);
        assert_eq!(page.headers[1].last_modified, "2018-02-21");
        assert!(page.resumption_token.is_none());
    }

    #[tokio::test]
    async fn test_get_staged_record() {
        let dir = tempfile::tempdir().unwrap();
        let content = record("oai:ukds:1001", "2018-02-21", false);
        std::fs::write(dir.path().join("1001.xml"), &content).unwrap();

        let source = FileRecordSource::new();
        let repo = staged_repo(dir.path());
        let bytes = source
            .fetch(&repo, &OaiRequest::get_record("1001"))
            .await
            .unwrap();

        assert_eq!(bytes, content.into_bytes());
    }

    #[tokio::test]
    async fn test_missing_staged_record() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileRecordSource::new();
        let repo = staged_repo(dir.path());

        let err = source
            .fetch(&repo, &OaiRequest::get_record("nope"))
            .await
            .unwrap_err();
        assert_eq!(err.oai_code(), Some(&OaiErrorCode::IdDoesNotExist));

        let err = source
            .fetch(&repo, &OaiRequest::get_record("../etc/passwd"))
            .await
            .unwrap_err();
        assert_eq!(err.oai_code(), Some(&OaiErrorCode::IdDoesNotExist));
    }
}
