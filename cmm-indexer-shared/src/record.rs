//! OAI-PMH record headers.

use serde::{Deserialize, Serialize};

/// Kind of record a header describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    /// Study level description (the default).
    Study,
    /// Variable level description.
    Variable,
}

impl RecordType {
    /// Infer the record type from the header's set memberships.
    pub fn from_set_specs<S: AsRef<str>>(set_specs: &[S]) -> Self {
        let is_variable = set_specs
            .iter()
            .any(|s| s.as_ref().to_lowercase().contains("variable"));
        if is_variable {
            RecordType::Variable
        } else {
            RecordType::Study
        }
    }

    /// Name used in index names and template file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Study => "cmmstudy",
            RecordType::Variable => "cmmvariable",
        }
    }
}

/// Header of one record as announced by `ListIdentifiers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHeader {
    /// OAI identifier.
    pub identifier: String,
    /// The `datestamp` exactly as the repository supplied it.
    pub last_modified: String,
    /// Whether the record is a tombstone.
    pub deleted: bool,
    /// Inferred record type.
    pub record_type: RecordType,
}

impl RecordHeader {
    /// Create a header for a live study record.
    pub fn new(identifier: impl Into<String>, last_modified: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            last_modified: last_modified.into(),
            deleted: false,
            record_type: RecordType::Study,
        }
    }

    /// Mark the header as deleted at the source.
    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_from_set_specs() {
        assert_eq!(RecordType::from_set_specs::<&str>(&[]), RecordType::Study);
        assert_eq!(
            RecordType::from_set_specs(&["data_kind:variables"]),
            RecordType::Variable
        );
        assert_eq!(RecordType::from_set_specs(&["DBK"]), RecordType::Study);
    }

    #[test]
    fn test_deleted_header() {
        let header = RecordHeader::new("997", "2018-02-21").deleted();
        assert!(header.deleted);
        assert_eq!(header.record_type, RecordType::Study);
    }
}
