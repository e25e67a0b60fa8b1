//! Loading of the repository list.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;
use url::Url;

use cmm_indexer_shared::{Locator, Repository};

use crate::IndexingError;

/// One entry of the repository list file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RepositoryEntry {
    url: Option<String>,
    path: Option<PathBuf>,
    code: String,
    name: String,
    preferred_metadata_param: String,
    set_spec: Option<String>,
    default_language: Option<String>,
}

impl RepositoryEntry {
    fn into_repository(self) -> Result<Repository, IndexingError> {
        let locator = match (self.url, self.path) {
            (Some(url), None) => Locator::Endpoint(Url::parse(&url).map_err(|e| {
                IndexingError::config(format!("Repository {} has an invalid url {}: {}", self.code, url, e))
            })?),
            (None, Some(path)) => Locator::Path(path),
            _ => {
                return Err(IndexingError::config(format!(
                    "Repository {} must have exactly one of url or path",
                    self.code
                )))
            }
        };

        if self.code.trim().is_empty() {
            return Err(IndexingError::config("Repository code must not be empty"));
        }

        let mut repo = Repository::new(locator, self.code, self.name, self.preferred_metadata_param);
        if let Some(set_spec) = self.set_spec.filter(|s| !s.trim().is_empty()) {
            repo = repo.with_set_spec(set_spec);
        }
        if let Some(lang) = self.default_language.filter(|l| !l.trim().is_empty()) {
            repo = repo.with_default_language(lang);
        }
        Ok(repo)
    }
}

/// Parse a JSON array of repositories.
///
/// # Returns
///
/// * `Ok(Vec<Repository>)` - The repositories in file order
/// * `Err(IndexingError::ConfigError)` - If the JSON is malformed, an entry has
///   neither or both of `url` and `path`, or a code is repeated
pub fn parse_repositories(json: &str) -> Result<Vec<Repository>, IndexingError> {
    let entries: Vec<RepositoryEntry> = serde_json::from_str(json)
        .map_err(|e| IndexingError::config(format!("Invalid repository list: {}", e)))?;

    let mut codes = HashSet::new();
    entries
        .into_iter()
        .map(|entry| {
            let repo = entry.into_repository()?;
            if !codes.insert(repo.code.clone()) {
                return Err(IndexingError::config(format!(
                    "Repository code {} is used more than once",
                    repo.code
                )));
            }
            Ok(repo)
        })
        .collect()
}

/// Read and parse the repository list file.
pub async fn load_repositories(path: &Path) -> Result<Vec<Repository>, IndexingError> {
    let json = tokio::fs::read_to_string(path).await.map_err(|e| {
        IndexingError::config(format!("Cannot read repository list {}: {}", path.display(), e))
    })?;
    let repositories = parse_repositories(&json)?;

    info!(path = %path.display(), count = repositories.len(), "Loaded repositories");
    Ok(repositories)
}
