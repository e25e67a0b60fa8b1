//! # CMM Indexer Repository
//!
//! The search-index ingestion engine. It owns the lifecycle of the
//! per-language study indices (`cmmstudy_<lang>`), writes documents in
//! bounded bulk batches, reads them back through scroll cursors and
//! maintains theme indices.
//!
//! The engine talks to the search engine through [`SearchIndexProvider`];
//! [`OpenSearchClient`] is the production implementation.

pub mod client;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod scroll;
pub mod templates;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{study_index, theme_index, StudyIndexClient, ThemeReindexSummary, ALL_LANGUAGES};
pub use config::IngestConfig;
pub use errors::SearchIndexError;
pub use interfaces::SearchIndexProvider;
pub use opensearch::OpenSearchClient;
pub use scroll::ScrollCursor;
pub use templates::TemplateStore;
pub use types::{
    BatchOperationResult, BatchOperationSummary, BulkItemError, BulkItemResult, BulkOperation, Hit,
    IndexCreation, ScrollPage, ThemeDefinition,
};
