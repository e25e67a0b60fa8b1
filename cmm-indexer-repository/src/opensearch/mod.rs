//! OpenSearch implementation of the search index provider.
//!
//! This module provides a concrete implementation of `SearchIndexProvider`
//! using OpenSearch as the backend, and the built-in index templates.

mod client;
pub mod index_config;

pub use client::OpenSearchClient;
