//! Error types for record harvesting.

mod harvest_error;
mod oai_error_code;

pub use harvest_error::HarvestError;
pub use oai_error_code::OaiErrorCode;
