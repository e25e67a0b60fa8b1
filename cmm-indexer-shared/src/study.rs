//! The language-indexed study produced by the DDI mapper.
//!
//! A [`Study`] keeps every language-variable field as a map from language
//! code to value(s). It is built once per record and not mutated afterwards.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::record::RecordHeader;

/// Values keyed by ISO-639 language code.
pub type LangMap<T> = BTreeMap<String, T>;

/// A controlled vocabulary term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermVocabAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocab: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocab_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub term: String,
}

/// A country covered by a study.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    /// ISO-3166 alpha-2 code when resolvable, otherwise the code as supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
}

/// A persistent identifier of a study.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pid {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency: Option<String>,
    pub pid: String,
}

/// Free text describing a data collection event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCollectionFreeText {
    pub data_collection_free_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

/// Publisher of a study.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publisher {
    #[serde(rename = "abbr", skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
    #[serde(rename = "publisher")]
    pub name: String,
}

/// Data collection period of a study.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCollectionPeriod {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Four digit year of the start (or single) event, when parsable.
    pub start_year: Option<i32>,
    /// Four digit year of the end event, when parsable.
    pub end_year: Option<i32>,
}

/// Language-variable content of an active study.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyMetadata {
    pub title: LangMap<String>,
    pub abstract_text: LangMap<String>,
    pub keywords: LangMap<Vec<TermVocabAttributes>>,
    pub classifications: LangMap<Vec<TermVocabAttributes>>,
    pub type_of_time_methods: LangMap<Vec<TermVocabAttributes>>,
    pub type_of_mode_of_collections: LangMap<Vec<TermVocabAttributes>>,
    pub unit_types: LangMap<Vec<TermVocabAttributes>>,
    pub type_of_sampling_procedures: LangMap<Vec<TermVocabAttributes>>,
    pub sampling_procedure_free_texts: LangMap<String>,
    pub creators: LangMap<Vec<String>>,
    pub study_area_countries: LangMap<Vec<Country>>,
    pub pid_studies: LangMap<Vec<Pid>>,
    pub data_collection_free_texts: LangMap<Vec<DataCollectionFreeText>>,
    pub data_access_free_texts: LangMap<Vec<String>>,
    pub publisher: LangMap<Publisher>,
    pub study_url: LangMap<String>,
    pub data_collection_period: DataCollectionPeriod,
}

/// A study with its language-neutral envelope.
///
/// `metadata` is `None` for tombstoned records: a deleted study carries only
/// its envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Study {
    pub study_number: String,
    pub active: bool,
    pub last_modified: Option<String>,
    pub file_languages: BTreeSet<String>,
    pub study_xml_source_url: Option<String>,
    pub metadata: Option<StudyMetadata>,
}

impl Study {
    /// Synthesize the inactive study of a tombstoned header.
    pub fn tombstone(header: &RecordHeader, study_xml_source_url: Option<String>) -> Self {
        Self {
            study_number: header.identifier.clone(),
            active: false,
            last_modified: Some(header.last_modified.trim())
                .filter(|datestamp| !datestamp.is_empty())
                .map(str::to_string),
            file_languages: BTreeSet::new(),
            study_xml_source_url,
            metadata: None,
        }
    }

    /// Whether the study carries enough content to be published in `lang`.
    ///
    /// Title, abstract and publisher must be non-empty in that language and
    /// the study number must be set.
    pub fn is_available_in(&self, lang: &str) -> bool {
        if self.study_number.trim().is_empty() {
            return false;
        }
        let Some(metadata) = &self.metadata else {
            return false;
        };

        let non_empty = |value: Option<&String>| value.is_some_and(|v| !v.trim().is_empty());

        non_empty(metadata.title.get(lang))
            && non_empty(metadata.abstract_text.get(lang))
            && metadata
                .publisher
                .get(lang)
                .is_some_and(|p| !p.name.trim().is_empty())
    }
}
