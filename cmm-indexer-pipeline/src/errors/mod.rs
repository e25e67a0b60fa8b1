//! Error types for the indexer pipeline.

use cmm_indexer_harvest::HarvestError;
use cmm_indexer_repository::SearchIndexError;
use thiserror::Error;

/// Errors that can occur in the indexer pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error from the consumer component.
    #[error("Consumer error: {0}")]
    ConsumerError(String),

    /// Error from the loader component.
    #[error("Loader error: {0}")]
    LoaderError(String),

    /// Error while discovering or harvesting records.
    #[error("Harvest error: {0}")]
    HarvestError(#[from] HarvestError),

    /// Error from the search index.
    #[error("Search index error: {0}")]
    SearchIndexError(#[from] SearchIndexError),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// The pipeline was cancelled before it finished.
    #[error("Pipeline cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Create a consumer error.
    pub fn consumer(msg: impl Into<String>) -> Self {
        Self::ConsumerError(msg.into())
    }

    /// Create a loader error.
    pub fn loader(msg: impl Into<String>) -> Self {
        Self::LoaderError(msg.into())
    }

    /// Create a channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::ChannelError(msg.into())
    }
}
