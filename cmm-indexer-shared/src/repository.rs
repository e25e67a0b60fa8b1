//! Repository definitions.

use std::fmt;
use std::path::PathBuf;

use url::Url;

/// Where the records of a repository come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// A live OAI-PMH endpoint.
    Endpoint(Url),
    /// A directory of pre-fetched `GetRecord` responses.
    Path(PathBuf),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Endpoint(url) => write!(f, "{}", url),
            Locator::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A source archive to harvest.
///
/// Repositories are loaded once at startup and never change afterwards. The
/// `code` is the identity of a repository and also prefixes every document id
/// derived from its studies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Endpoint or staging directory.
    pub locator: Locator,
    /// Short unique code, e.g. `FSD`.
    pub code: String,
    /// Human readable name, used as the indexed publisher.
    pub name: String,
    /// Metadata format token passed as `metadataPrefix`.
    pub preferred_metadata_param: String,
    /// Optional OAI-PMH set filter.
    pub set_spec: Option<String>,
    /// Overrides the configured default language for this repository.
    pub default_language: Option<String>,
}

impl Repository {
    /// Create a repository without set filter or language override.
    pub fn new(
        locator: Locator,
        code: impl Into<String>,
        name: impl Into<String>,
        preferred_metadata_param: impl Into<String>,
    ) -> Self {
        Self {
            locator,
            code: code.into(),
            name: name.into(),
            preferred_metadata_param: preferred_metadata_param.into(),
            set_spec: None,
            default_language: None,
        }
    }

    /// Restrict harvesting to one OAI-PMH set.
    pub fn with_set_spec(mut self, set_spec: impl Into<String>) -> Self {
        self.set_spec = Some(set_spec.into());
        self
    }

    /// Override the default language of the records in this repository.
    pub fn with_default_language(mut self, lang: impl Into<String>) -> Self {
        self.default_language = Some(lang.into());
        self
    }

    /// Build the document id of a study harvested from this repository.
    ///
    /// Uses format: `{code}__{study_number}` with spaces in the code replaced
    /// by `-`, so re-harvesting the same study overwrites the same document.
    pub fn document_id(&self, study_number: &str) -> String {
        format!("{}__{}", self.code.replace(' ', "-"), study_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint_repo(code: &str) -> Repository {
        Repository::new(
            Locator::Endpoint(Url::parse("https://oai.example.org/v0/oai").unwrap()),
            code,
            "Example Archive",
            "oai_ddi25",
        )
    }

    #[test]
    fn test_document_id() {
        let repo = endpoint_repo("FSD");
        assert_eq!(repo.document_id("FSD1234"), "FSD__FSD1234");
    }

    #[test]
    fn test_document_id_replaces_spaces_in_code() {
        let repo = endpoint_repo("UK Data Service");
        assert_eq!(repo.document_id("42"), "UK-Data-Service__42");
    }

    #[test]
    fn test_builder() {
        let repo = endpoint_repo("GESIS")
            .with_set_spec("DBK")
            .with_default_language("de");
        assert_eq!(repo.set_spec.as_deref(), Some("DBK"));
        assert_eq!(repo.default_language.as_deref(), Some("de"));
    }

    #[test]
    fn test_locator_display() {
        let locator = Locator::Path(PathBuf::from("/data/staged"));
        assert_eq!(locator.to_string(), "/data/staged");
    }
}
