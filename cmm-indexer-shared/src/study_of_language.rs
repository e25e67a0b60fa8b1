//! Per-language projection of a study, the unit persisted in the search index.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::study::{Country, DataCollectionFreeText, Pid, Publisher, TermVocabAttributes};

/// One language's flattened view of a study.
///
/// Field order is the serialized order; absent values are omitted from the
/// document body. The `id` is stable across re-harvests of the same study so
/// that indexing overwrites rather than duplicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyOfLanguage {
    pub id: String,
    pub code: String,
    pub study_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_study: Option<String>,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classifications: Vec<TermVocabAttributes>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<TermVocabAttributes>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_of_time_methods: Vec<TermVocabAttributes>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub study_area_countries: Vec<Country>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unit_types: Vec<TermVocabAttributes>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pid_studies: Vec<Pid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub creators: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_of_sampling_procedures: Vec<TermVocabAttributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling_procedure_free_texts: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_of_mode_of_collections: Vec<TermVocabAttributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_collection_period_startdate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_collection_period_enddate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_collection_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_collection_free_texts: Vec<DataCollectionFreeText>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_access_free_texts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<Publisher>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub lang_available_in: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub file_languages: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_xml_source_url: Option<String>,
}
