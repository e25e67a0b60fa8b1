//! Search index error types.
//!
//! This module defines the error types that can occur during search index operations.

use thiserror::Error;

/// Errors that can occur during search index operations.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Failed to reach the search engine or the request did not complete.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Creating an index failed for a reason other than it already existing.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Updating the index mapping failed.
    #[error("Mapping error: {0}")]
    MappingError(String),

    /// A bulk request, or one of its items, failed.
    #[error("Bulk operation error: {0}")]
    BulkOperationError(String),

    /// A search, count or get request was rejected.
    #[error("Query error: {0}")]
    QueryError(String),

    /// Failed to parse a response from the search engine.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize a document for the search engine.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A settings, mapping or theme template could not be read.
    #[error("Template error: {0}")]
    TemplateError(String),

    /// Opening, advancing or releasing a scroll cursor failed.
    #[error("Scroll error: {0}")]
    ScrollError(String),
}

impl SearchIndexError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a mapping error.
    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::MappingError(msg.into())
    }

    /// Create a bulk operation error.
    pub fn bulk_operation(msg: impl Into<String>) -> Self {
        Self::BulkOperationError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create a template error.
    pub fn template(msg: impl Into<String>) -> Self {
        Self::TemplateError(msg.into())
    }

    /// Create a scroll error.
    pub fn scroll(msg: impl Into<String>) -> Self {
        Self::ScrollError(msg.into())
    }
}

impl From<serde_json::Error> for SearchIndexError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
