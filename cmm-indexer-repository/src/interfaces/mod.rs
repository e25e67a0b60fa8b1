//! Interface definitions for the search engine.
//!
//! This module defines the abstract `SearchIndexProvider` trait that allows
//! for dependency injection and in-memory implementations in tests.

mod search_index_provider;

pub use search_index_provider::SearchIndexProvider;
