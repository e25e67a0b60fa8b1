//! Message types for the consumer.
//!
//! Defines what flows from a repository's harvest task to its loader.

use cmm_indexer_shared::Study;

/// Messages that flow through the pipeline of one repository.
#[derive(Debug)]
pub enum HarvestMessage {
    /// Discovery finished with this many headers to harvest.
    Discovered { count: usize },
    /// A harvested study, active or tombstoned.
    Study(Box<Study>),
    /// A failure. Record failures carry the identifier; a discovery failure
    /// has none and ends the repository.
    Error {
        identifier: Option<String>,
        message: String,
    },
    /// Stream has ended.
    End,
}

impl HarvestMessage {
    /// Create a study message.
    pub fn study(study: Study) -> Self {
        Self::Study(Box::new(study))
    }

    /// Create a record failure message.
    pub fn record_error(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            identifier: Some(identifier.into()),
            message: message.into(),
        }
    }

    /// Create a repository-level failure message.
    pub fn repository_error(message: impl Into<String>) -> Self {
        Self::Error {
            identifier: None,
            message: message.into(),
        }
    }
}
