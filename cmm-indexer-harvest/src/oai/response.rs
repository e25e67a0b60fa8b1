//! OAI-PMH response envelopes.

use tracing::debug;

use cmm_indexer_shared::{RecordHeader, RecordType};

use super::paths;
use crate::errors::{HarvestError, OaiErrorCode};
use crate::xml::{Element, XmlDocument};

/// One page of a `ListIdentifiers` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifiersPage {
    pub headers: Vec<RecordHeader>,
    /// Token for the next page; `None` when this is the last page.
    pub resumption_token: Option<String>,
}

/// Fail with the protocol error if the envelope carries one.
///
/// # Returns
///
/// * `Ok(())` - If the response has no `<error>` element
/// * `Err(HarvestError::Protocol)` - With the code and message of the first error
pub fn check_for_error(doc: &XmlDocument) -> Result<(), HarvestError> {
    match doc.select_first(paths::ERROR) {
        Some(error) => {
            let code = OaiErrorCode::parse(error.attribute("code").unwrap_or_default());
            Err(HarvestError::protocol(code, error.text()))
        }
        None => Ok(()),
    }
}

/// Parse an OAI-PMH `<header>` element.
pub fn parse_header(header: &Element) -> Result<RecordHeader, HarvestError> {
    let identifier = header
        .child("identifier")
        .map(|id| id.text())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| HarvestError::missing_element("header/identifier"))?;

    let last_modified = header
        .child("datestamp")
        .map(|d| d.text())
        .unwrap_or_default();

    let set_specs: Vec<String> = header
        .child_elements()
        .filter(|child| child.name() == "setSpec")
        .map(|child| child.text())
        .collect();

    Ok(RecordHeader {
        identifier,
        last_modified,
        deleted: header.attribute("status") == Some("deleted"),
        record_type: RecordType::from_set_specs(set_specs.as_slice()),
    })
}

/// Parse a `ListIdentifiers` response into headers and the resumption token.
///
/// The envelope is checked for a protocol error first. Headers without an
/// identifier are skipped. A blank resumption token ends pagination.
pub fn parse_identifiers_page(doc: &XmlDocument) -> Result<IdentifiersPage, HarvestError> {
    check_for_error(doc)?;

    let mut headers = Vec::new();
    for element in doc.select(paths::LIST_HEADERS) {
        match parse_header(element) {
            Ok(header) => headers.push(header),
            Err(e) => debug!(error = %e, "Skipping malformed header"),
        }
    }

    let resumption_token = doc
        .select_first(paths::RESUMPTION_TOKEN)
        .map(|token| token.text())
        .filter(|token| !token.is_empty());

    Ok(IdentifiersPage {
        headers,
        resumption_token,
    })
}
