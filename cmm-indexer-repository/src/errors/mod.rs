//! Error types for the study index.

mod search_index_error;

pub use search_index_error::SearchIndexError;
