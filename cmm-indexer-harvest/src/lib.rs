//! # CMM Indexer Harvest
//!
//! Record discovery and retrieval over OAI-PMH, and the mapping of DDI
//! codebooks into language-indexed [`Study`](cmm_indexer_shared::Study)
//! values.
//!
//! ## Modules
//!
//! - [`xml`]: owned element tree with namespace-agnostic path selection
//! - [`oai`]: protocol requests, error envelopes, headers and resumption tokens
//! - [`source`]: record sources for HTTP endpoints and staged directories
//! - [`discovery`]: paginated identifier listing with watermark filtering
//! - [`mapper`]: the language-keyed field extractor and the DDI to CMM mapper
//! - [`harvester`]: per-record retrieval and mapping, tombstone handling

pub mod discovery;
pub mod errors;
pub mod harvester;
pub mod mapper;
pub mod oai;
pub mod source;
pub mod xml;

pub use discovery::{filter_by_watermark, RecordDiscovery};
pub use errors::{HarvestError, OaiErrorCode};
pub use harvester::{HarvesterConfig, StudyHarvester};
pub use mapper::{CmmField, CmmStudyMapper, LanguagePolicy};
pub use oai::OaiRequest;
pub use source::{FileRecordSource, HttpRecordSource, HttpSourceConfig, LocatorSource, RecordSource};
