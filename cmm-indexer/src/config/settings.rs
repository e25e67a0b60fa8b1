//! Environment driven settings.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use cmm_indexer_harvest::{CmmField, HarvesterConfig, HttpSourceConfig, LanguagePolicy};
use cmm_indexer_pipeline::orchestrator::DEFAULT_LANGUAGES;
use cmm_indexer_pipeline::OrchestratorConfig;
use cmm_indexer_repository::IngestConfig;

use crate::IndexingError;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default repository list file.
const DEFAULT_REPOSITORIES_FILE: &str = "repositories.json";

/// Settings of one indexer process, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub opensearch_url: String,
    pub repositories_file: PathBuf,
    pub languages: Vec<String>,
    pub language_policy: LanguagePolicy,
    /// HTTP request timeout for repositories and the search engine.
    pub timeout: Duration,
    pub concurrency: usize,
    pub incremental: bool,
    pub reindex_themes: bool,
    pub templates_dir: Option<PathBuf>,
    pub shards: u32,
    pub replicas: u32,
}

impl Settings {
    /// Read the settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `HARVESTER_REPOSITORIES`: Repository list file (default: repositories.json)
    /// - `HARVESTER_LANGUAGES`: Comma separated language codes
    /// - `HARVESTER_DEFAULT_LANGUAGE`: Default document language (default: en)
    /// - `HARVESTER_LANGUAGE_FALLBACK`: Untagged elements take the default language (default: true)
    /// - `HARVESTER_CONCAT_SEPARATOR`: Separator of concatenated values (default: `<br>`)
    /// - `HARVESTER_CONCAT_TITLES`, `HARVESTER_CONCAT_SAMPLING`: Concatenation per field (default: true)
    /// - `HARVESTER_TIMEOUT_SECS`: Request timeout in seconds (default: 30)
    /// - `HARVESTER_CONCURRENCY`: Parallel retrievals per repository (default: 8)
    /// - `HARVESTER_INCREMENTAL`: Harvest only records newer than the index (default: false)
    /// - `INDEX_TEMPLATES_DIR`: Directory overriding the built-in index templates
    /// - `INDEX_SHARDS`, `INDEX_REPLICAS`: Index shape (default: 2 and 0)
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the settings through `lookup`, which returns the value of a
    /// variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let languages = match var("HARVESTER_LANGUAGES") {
            Some(list) => list
                .split(',')
                .map(|lang| lang.trim().to_lowercase())
                .filter(|lang| !lang.is_empty())
                .collect(),
            None => DEFAULT_LANGUAGES.iter().map(|lang| lang.to_string()).collect(),
        };

        let mut language_policy = LanguagePolicy::default()
            .with_fallback(parse_or("HARVESTER_LANGUAGE_FALLBACK", var("HARVESTER_LANGUAGE_FALLBACK"), true)?)
            .with_concat(
                CmmField::Title,
                parse_or("HARVESTER_CONCAT_TITLES", var("HARVESTER_CONCAT_TITLES"), true)?,
            )
            .with_concat(
                CmmField::SamplingProcedureFreeTexts,
                parse_or("HARVESTER_CONCAT_SAMPLING", var("HARVESTER_CONCAT_SAMPLING"), true)?,
            );
        if let Some(lang) = var("HARVESTER_DEFAULT_LANGUAGE") {
            language_policy = language_policy.with_default_language(lang);
        }
        // The separator may legitimately be whitespace, so it is not trimmed.
        if let Some(separator) = lookup("HARVESTER_CONCAT_SEPARATOR").filter(|s| !s.is_empty()) {
            language_policy = language_policy.with_separator(separator);
        }

        let settings = Self {
            opensearch_url: var("OPENSEARCH_URL").unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string()),
            repositories_file: var("HARVESTER_REPOSITORIES")
                .unwrap_or_else(|| DEFAULT_REPOSITORIES_FILE.to_string())
                .into(),
            languages,
            language_policy,
            timeout: Duration::from_secs(parse_or("HARVESTER_TIMEOUT_SECS", var("HARVESTER_TIMEOUT_SECS"), 30)?),
            concurrency: parse_or("HARVESTER_CONCURRENCY", var("HARVESTER_CONCURRENCY"), 8)?,
            incremental: parse_or("HARVESTER_INCREMENTAL", var("HARVESTER_INCREMENTAL"), false)?,
            reindex_themes: false,
            templates_dir: var("INDEX_TEMPLATES_DIR").map(PathBuf::from),
            shards: parse_or("INDEX_SHARDS", var("INDEX_SHARDS"), 2)?,
            replicas: parse_or("INDEX_REPLICAS", var("INDEX_REPLICAS"), 0)?,
        };

        if settings.languages.is_empty() {
            return Err(IndexingError::config("HARVESTER_LANGUAGES lists no language"));
        }
        if settings.concurrency == 0 {
            return Err(IndexingError::config("HARVESTER_CONCURRENCY must be at least 1"));
        }
        Ok(settings)
    }

    pub fn harvester_config(&self) -> HarvesterConfig {
        HarvesterConfig::default()
            .with_http(HttpSourceConfig::with_timeout(self.timeout))
            .with_language_policy(self.language_policy.clone())
    }

    pub fn ingest_config(&self) -> IngestConfig {
        let config = IngestConfig::default()
            .with_shards(self.shards, self.replicas)
            .with_request_timeout(self.timeout);
        match &self.templates_dir {
            Some(dir) => config.with_templates_dir(dir.clone()),
            None => config,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::default()
            .with_languages(self.languages.iter().cloned())
            .with_concurrency(self.concurrency)
            .with_incremental(self.incremental)
            .with_reindex_themes(self.reindex_themes)
    }
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, IndexingError> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| IndexingError::config(format!("Invalid value for {}: {}", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, IndexingError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[]).unwrap();

        assert_eq!(settings.opensearch_url, "http://localhost:9200");
        assert_eq!(settings.repositories_file, PathBuf::from("repositories.json"));
        assert_eq!(settings.languages.len(), 17);
        assert_eq!(settings.language_policy.default_language, "en");
        assert!(settings.language_policy.fallback_to_default);
        assert_eq!(settings.language_policy.concat_separator, "<br>");
        assert!(settings.language_policy.concat_fields.contains(&CmmField::Title));
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.concurrency, 8);
        assert!(!settings.incremental);
        assert!(settings.templates_dir.is_none());
        assert_eq!((settings.shards, settings.replicas), (2, 0));
    }

    #[test]
    fn test_overrides() {
        let settings = settings(&[
            ("HARVESTER_LANGUAGES", "EN, fi,,sv"),
            ("HARVESTER_DEFAULT_LANGUAGE", "fi"),
            ("HARVESTER_LANGUAGE_FALLBACK", "false"),
            ("HARVESTER_CONCAT_TITLES", "false"),
            ("HARVESTER_CONCAT_SEPARATOR", " | "),
            ("HARVESTER_TIMEOUT_SECS", "9"),
            ("HARVESTER_INCREMENTAL", "true"),
            ("INDEX_TEMPLATES_DIR", "/etc/cmm/templates"),
            ("INDEX_SHARDS", "5"),
        ])
        .unwrap();

        assert_eq!(settings.languages, vec!["en", "fi", "sv"]);
        assert_eq!(settings.language_policy.default_language, "fi");
        assert!(!settings.language_policy.fallback_to_default);
        assert!(!settings.language_policy.concat_fields.contains(&CmmField::Title));
        assert!(settings
            .language_policy
            .concat_fields
            .contains(&CmmField::SamplingProcedureFreeTexts));
        assert_eq!(settings.language_policy.concat_separator, " | ");
        assert!(settings.incremental);
        assert_eq!(settings.shards, 5);

        let http = settings.harvester_config().http;
        assert_eq!(http.timeout, Duration::from_secs(9));
        assert_eq!(http.connect_timeout, Duration::from_secs(3));

        let ingest = settings.ingest_config();
        assert_eq!(ingest.templates_dir, Some(PathBuf::from("/etc/cmm/templates")));
        assert_eq!(ingest.shards, 5);
        assert_eq!(ingest.request_timeout, Duration::from_secs(9));

        let orchestrator = settings.orchestrator_config();
        assert!(orchestrator.incremental);
        assert_eq!(orchestrator.languages, vec!["en", "fi", "sv"]);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = settings(&[("HARVESTER_CONCURRENCY", "many")]).unwrap_err();
        assert!(err.to_string().contains("HARVESTER_CONCURRENCY"));

        assert!(settings(&[("HARVESTER_CONCURRENCY", "0")]).is_err());
        assert!(settings(&[("HARVESTER_LANGUAGES", " , ")]).is_err());
    }
}
