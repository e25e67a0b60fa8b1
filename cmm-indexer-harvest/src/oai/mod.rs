//! OAI-PMH protocol plumbing: request construction and response envelopes.

mod request;
mod response;

pub use request::OaiRequest;
pub use response::{check_for_error, parse_header, parse_identifiers_page, IdentifiersPage};

/// Namespace-free paths into an OAI-PMH envelope.
pub mod paths {
    pub const ERROR: &str = "/OAI-PMH/error";
    pub const LIST_HEADERS: &str = "/OAI-PMH/ListIdentifiers/header";
    pub const RESUMPTION_TOKEN: &str = "/OAI-PMH/ListIdentifiers/resumptionToken";
    pub const RECORD_HEADER: &str = "//record/header";
}
