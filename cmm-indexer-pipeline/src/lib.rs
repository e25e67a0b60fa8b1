//! # CMM Indexer Pipeline
//!
//! This crate provides the pipeline that takes one repository from OAI-PMH
//! records to indexed per-language study documents.
//!
//! ## Architecture
//!
//! The pipeline follows the Consumer-Processor-Loader pattern:
//!
//! 1. **Consumer**: Discovers and harvests the records of a repository
//! 2. **Processor**: Materializes each study into per-language documents
//! 3. **Loader**: Batches the documents per language into the study indices
//! 4. **Orchestrator**: Runs one pipeline per repository and reports the outcome

pub mod consumer;
pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod processor;

#[cfg(test)]
pub(crate) mod testing;

pub use consumer::{HarvestConsumer, HarvestMessage};
pub use errors::PipelineError;
pub use loader::{LoaderConfig, StudyLoader};
pub use orchestrator::{Orchestrator, OrchestratorConfig, RepositoryReport, RunSummary};
pub use processor::LanguageMaterializer;
