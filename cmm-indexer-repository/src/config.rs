//! Configuration types for the StudyIndexClient.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the StudyIndexClient.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Maximum number of documents sent in one bulk request.
    pub batch_size: usize,
    /// Number of hits fetched per scroll page.
    pub scroll_page_size: usize,
    /// How long the server keeps a scroll cursor alive between pages.
    pub scroll_keep_alive: String,
    /// Timeout of every request to the search engine.
    pub request_timeout: Duration,
    /// Directory with settings, mapping and theme templates. Built-in
    /// templates are used when unset or when a file is missing.
    pub templates_dir: Option<PathBuf>,
    /// Substituted for `${SHARDS}` in settings templates.
    pub shards: u32,
    /// Substituted for `${REPLICAS}` in settings templates.
    pub replicas: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            scroll_page_size: 500,
            scroll_keep_alive: "1m".to_string(),
            request_timeout: Duration::from_secs(30),
            templates_dir: None,
            shards: 2,
            replicas: 0,
        }
    }
}

impl IngestConfig {
    /// Create a config with a custom bulk batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Create a config with a custom scroll page size.
    pub fn with_scroll_page_size(mut self, page_size: usize) -> Self {
        self.scroll_page_size = page_size.max(1);
        self
    }

    /// Create a config reading templates from `dir`.
    pub fn with_templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.templates_dir = Some(dir.into());
        self
    }

    /// Create a config with custom shard and replica counts.
    pub fn with_shards(mut self, shards: u32, replicas: u32) -> Self {
        self.shards = shards;
        self.replicas = replicas;
        self
    }

    /// Create a config with a custom request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
