//! Processor module for the indexer pipeline.
//!
//! Transforms harvested studies into per-language search documents.

mod language_materializer;

pub use language_materializer::LanguageMaterializer;
