//! # CMM Indexer
//!
//! Main library for the CMM study harvester and indexer.
//!
//! This crate provides the configuration, repository-list loading and
//! dependency wiring used by the `cmm-indexer` binary.

pub mod config;

pub use config::{load_repositories, Dependencies, Settings};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] cmm_indexer_pipeline::PipelineError),

    /// Harvest error.
    #[error("Harvest error: {0}")]
    HarvestError(#[from] cmm_indexer_harvest::HarvestError),

    /// Search index error.
    #[error("Search index error: {0}")]
    SearchIndexError(#[from] cmm_indexer_repository::SearchIndexError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
