//! Settings, mapping and theme templates.
//!
//! Templates come from an optional directory, falling back to the built-in
//! ones when a file is absent:
//!
//! - `settings_<recordType>_<lang>.json`
//! - `mappings_<recordType>.json`
//! - `reindex/reindex_<theme>_<lang>.json` (themes exist only on disk)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use cmm_indexer_shared::RecordType;

use crate::errors::SearchIndexError;
use crate::opensearch::index_config::{
    get_index_mappings, get_index_settings, REPLICAS_PLACEHOLDER, SHARDS_PLACEHOLDER,
};
use crate::types::ThemeDefinition;

const THEME_DIR: &str = "reindex";
const THEME_PREFIX: &str = "reindex_";

/// Split a theme file name into `(theme, lang)`.
///
/// The theme is everything between `reindex_` and the last `_`, so theme
/// names may themselves contain underscores.
pub fn parse_theme_file_name(file_name: &str) -> Option<(String, String)> {
    let stem = file_name.strip_suffix(".json")?;
    let rest = stem.strip_prefix(THEME_PREFIX)?;
    let (theme, lang) = rest.rsplit_once('_')?;
    if theme.is_empty() || lang.is_empty() {
        return None;
    }
    Some((theme.to_string(), lang.to_string()))
}

/// Reads and renders index templates.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: Option<PathBuf>,
    shards: u32,
    replicas: u32,
}

impl TemplateStore {
    pub fn new(dir: Option<PathBuf>, shards: u32, replicas: u32) -> Self {
        Self {
            dir,
            shards,
            replicas,
        }
    }

    /// Substitute the shard and replica placeholders. Placeholders may
    /// appear quoted or bare.
    fn render(&self, raw: &str) -> String {
        let shards = self.shards.to_string();
        let replicas = self.replicas.to_string();
        raw.replace(&format!("\"{}\"", SHARDS_PLACEHOLDER), &shards)
            .replace(SHARDS_PLACEHOLDER, &shards)
            .replace(&format!("\"{}\"", REPLICAS_PLACEHOLDER), &replicas)
            .replace(REPLICAS_PLACEHOLDER, &replicas)
    }

    async fn read_override(&self, file_name: &str) -> Result<Option<String>, SearchIndexError> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };
        let path = dir.join(file_name);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                debug!(path = %path.display(), "Using template override");
                Ok(Some(raw))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SearchIndexError::template(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn parse(source: &str, raw: &str) -> Result<Value, SearchIndexError> {
        serde_json::from_str(raw)
            .map_err(|e| SearchIndexError::template(format!("{}: {}", source, e)))
    }

    /// Rendered index settings for a record type and language.
    pub async fn settings(&self, record_type: RecordType, lang: &str) -> Result<Value, SearchIndexError> {
        let file_name = format!("settings_{}_{}.json", record_type.as_str(), lang);
        let raw = match self.read_override(&file_name).await? {
            Some(raw) => raw,
            None => get_index_settings(lang).to_string(),
        };
        let settings = Self::parse(&file_name, &self.render(&raw))?;
        Ok(settings.get("settings").cloned().unwrap_or(settings))
    }

    /// The mapping shared by every language of a record type.
    pub async fn mappings(&self, record_type: RecordType) -> Result<Value, SearchIndexError> {
        let file_name = format!("mappings_{}.json", record_type.as_str());
        match self.read_override(&file_name).await? {
            Some(raw) => {
                let mappings = Self::parse(&file_name, &raw)?;
                Ok(mappings.get("mappings").cloned().unwrap_or(mappings))
            }
            None => Ok(get_index_mappings()),
        }
    }

    /// Body of a create-index request.
    pub async fn create_index_body(
        &self,
        record_type: RecordType,
        lang: &str,
    ) -> Result<Value, SearchIndexError> {
        Ok(serde_json::json!({
            "settings": self.settings(record_type, lang).await?,
            "mappings": self.mappings(record_type).await?,
        }))
    }

    /// Discover the theme definitions, sorted by theme and language.
    ///
    /// Files whose names do not follow the theme pattern are skipped with a
    /// warning. A file with a `query` member contributes that member,
    /// otherwise the whole document is the query.
    pub async fn themes(&self) -> Result<Vec<ThemeDefinition>, SearchIndexError> {
        let Some(dir) = &self.dir else {
            return Ok(Vec::new());
        };
        let theme_dir = dir.join(THEME_DIR);
        if !tokio::fs::try_exists(&theme_dir).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut themes = Vec::new();
        let mut entries = tokio::fs::read_dir(&theme_dir)
            .await
            .map_err(|e| template_io(&theme_dir, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| template_io(&theme_dir, e))?
        {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !file_name.ends_with(".json") {
                continue;
            }
            let Some((name, lang)) = parse_theme_file_name(&file_name) else {
                warn!(file = %file_name, "Ignoring file not named reindex_<theme>_<lang>.json");
                continue;
            };

            let raw = tokio::fs::read_to_string(entry.path())
                .await
                .map_err(|e| template_io(&entry.path(), e))?;
            let body = Self::parse(&file_name, &raw)?;
            let query = body.get("query").cloned().unwrap_or(body);

            themes.push(ThemeDefinition { name, lang, query });
        }

        themes.sort_by(|a, b| (&a.name, &a.lang).cmp(&(&b.name, &b.lang)));
        Ok(themes)
    }
}

fn template_io(path: &Path, e: std::io::Error) -> SearchIndexError {
    SearchIndexError::template(format!("{}: {}", path.display(), e))
}
