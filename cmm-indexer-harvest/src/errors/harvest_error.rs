//! Harvest error types.
//!
//! This module defines the errors that can occur while discovering,
//! retrieving or mapping records.

use thiserror::Error;

use super::OaiErrorCode;

/// Errors that can occur during record harvesting.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// The repository answered with an OAI-PMH `<error>` element. Terminal
    /// for the current call, never retried.
    #[error("OAI-PMH error {code}: {message}")]
    Protocol { code: OaiErrorCode, message: String },

    /// The repository could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The repository answered with a non-2xx status.
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The response is not well-formed XML.
    #[error("XML error: {0}")]
    Xml(String),

    /// Reading a staged record failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The repository locator cannot be used for the requested operation.
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    /// A required element is missing from an otherwise valid document.
    #[error("Missing element: {0}")]
    MissingElement(String),
}

impl HarvestError {
    /// Create a protocol error.
    pub fn protocol(code: OaiErrorCode, message: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an XML error.
    pub fn xml(msg: impl Into<String>) -> Self {
        Self::Xml(msg.into())
    }

    /// Create an invalid locator error.
    pub fn invalid_locator(msg: impl Into<String>) -> Self {
        Self::InvalidLocator(msg.into())
    }

    /// Create a missing element error.
    pub fn missing_element(msg: impl Into<String>) -> Self {
        Self::MissingElement(msg.into())
    }

    /// The OAI-PMH code, if this is a protocol error.
    pub fn oai_code(&self) -> Option<&OaiErrorCode> {
        match self {
            Self::Protocol { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HarvestError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<quick_xml::Error> for HarvestError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for HarvestError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(err.to_string())
    }
}
