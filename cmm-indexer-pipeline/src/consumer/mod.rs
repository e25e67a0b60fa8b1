//! Consumer module for the indexer pipeline.
//!
//! Discovers the records of one repository and streams the harvested
//! studies into the pipeline.

mod harvest_consumer;
mod messages;

pub use harvest_consumer::{ConsumerConfig, HarvestConsumer};
pub use messages::HarvestMessage;
