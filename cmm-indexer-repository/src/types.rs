//! Request and response types for search index operations.

use serde_json::Value;

use crate::errors::SearchIndexError;

/// Error type reported by the search engine when a document carries a field
/// the strict mapping does not know.
pub const STRICT_DYNAMIC_MAPPING_EXCEPTION: &str = "strict_dynamic_mapping_exception";

/// One action of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    /// Create or replace the document with this id.
    Index { index: String, id: String, source: Value },
    /// Delete the document with this id.
    Delete { index: String, id: String },
}

impl BulkOperation {
    pub fn index(index: impl Into<String>, id: impl Into<String>, source: Value) -> Self {
        Self::Index {
            index: index.into(),
            id: id.into(),
            source,
        }
    }

    pub fn delete(index: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Delete {
            index: index.into(),
            id: id.into(),
        }
    }

    /// Target index of the action.
    pub fn target(&self) -> &str {
        match self {
            Self::Index { index, .. } | Self::Delete { index, .. } => index,
        }
    }
}

/// Error reported for one item of a bulk response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemError {
    /// The engine's error type, e.g. `strict_dynamic_mapping_exception`.
    pub error_type: String,
    pub reason: String,
}

/// Outcome of one item of a bulk request, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemResult {
    pub id: String,
    pub error: Option<BulkItemError>,
}

impl BulkItemResult {
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            error: None,
        }
    }

    pub fn failed(id: impl Into<String>, error_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            error: Some(BulkItemError {
                error_type: error_type.into(),
                reason: reason.into(),
            }),
        }
    }

    /// Whether the item failed because of the strict mapping.
    pub fn is_mapping_violation(&self) -> bool {
        self.error
            .as_ref()
            .is_some_and(|e| e.error_type == STRICT_DYNAMIC_MAPPING_EXCEPTION)
    }
}

/// Outcome of index creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexCreation {
    Created,
    AlreadyExists,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub index: String,
    pub id: String,
    /// The stored document, `Null` when the request excluded sources.
    pub source: Value,
}

/// One page of a scroll.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScrollPage {
    /// Cursor for the next page. The engine may return a new id per page.
    pub scroll_id: Option<String>,
    pub hits: Vec<Hit>,
}

/// A theme: a fixed query over one language's study index, materialized
/// into `<name>_<lang>` indices.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeDefinition {
    pub name: String,
    /// Language of the source index the query runs against.
    pub lang: String,
    /// The search query object.
    pub query: Value,
}

/// Result of a batch operation for a single item.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// The document id.
    pub id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error if the operation failed.
    pub error: Option<SearchIndexError>,
}

/// Summary of a batch operation containing aggregate statistics and individual results.
///
/// Partial success is the common case: callers inspect `failed` and the
/// individual results rather than treating any failure as fatal.
#[derive(Debug, Clone, Default)]
pub struct BatchOperationSummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each item.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// Fold the item results of one bulk request into the summary.
    pub fn record(&mut self, items: Vec<BulkItemResult>) {
        for item in items {
            self.total += 1;
            match item.error {
                None => {
                    self.succeeded += 1;
                    self.results.push(BatchOperationResult {
                        id: item.id,
                        success: true,
                        error: None,
                    });
                }
                Some(error) => {
                    self.failed += 1;
                    self.results.push(BatchOperationResult {
                        id: item.id,
                        success: false,
                        error: Some(SearchIndexError::bulk_operation(format!(
                            "{}: {}",
                            error.error_type, error.reason
                        ))),
                    });
                }
            }
        }
    }
}
