//! Built-in index settings and mappings for study indices.
//!
//! Settings carry `${SHARDS}` and `${REPLICAS}` placeholders, substituted
//! when the template is rendered. The mapping is strict: a document with a
//! field it does not declare is rejected, which is what triggers the
//! mapping update on bulk writes.

use serde_json::{json, Value};

/// Shard count placeholder in settings templates.
pub const SHARDS_PLACEHOLDER: &str = "${SHARDS}";

/// Replica count placeholder in settings templates.
pub const REPLICAS_PLACEHOLDER: &str = "${REPLICAS}";

/// Name of the text analyzer declared by every study index.
pub const TEXT_ANALYZER: &str = "cmm_text";

/// The built-in language analyzer for an ISO-639 code.
///
/// Languages without a dedicated analyzer use `standard`.
pub fn language_analyzer(lang: &str) -> &'static str {
    match lang {
        "cs" => "czech",
        "da" => "danish",
        "de" => "german",
        "el" => "greek",
        "en" => "english",
        "fi" => "finnish",
        "fr" => "french",
        "hu" => "hungarian",
        "it" => "italian",
        "nl" => "dutch",
        "no" => "norwegian",
        "pt" => "portuguese",
        "sv" => "swedish",
        _ => "standard",
    }
}

/// Settings of a study index in `lang`.
pub fn get_index_settings(lang: &str) -> Value {
    json!({
        "settings": {
            "number_of_shards": SHARDS_PLACEHOLDER,
            "number_of_replicas": REPLICAS_PLACEHOLDER,
            "analysis": {
                "analyzer": {
                    TEXT_ANALYZER: {
                        "type": language_analyzer(lang)
                    }
                }
            }
        }
    })
}

fn text() -> Value {
    json!({
        "type": "text",
        "analyzer": TEXT_ANALYZER
    })
}

fn text_with_raw() -> Value {
    json!({
        "type": "text",
        "analyzer": TEXT_ANALYZER,
        "fields": {
            "raw": {
                "type": "keyword",
                "ignore_above": 256
            }
        }
    })
}

fn keyword() -> Value {
    json!({ "type": "keyword" })
}

fn lenient_date() -> Value {
    json!({
        "type": "date",
        "ignore_malformed": true
    })
}

fn term() -> Value {
    json!({
        "properties": {
            "vocab": keyword(),
            "vocabUri": keyword(),
            "id": keyword(),
            "term": text_with_raw()
        }
    })
}

/// The shared strict mapping of study indices.
pub fn get_index_mappings() -> Value {
    json!({
        "dynamic": "strict",
        "properties": {
            "id": keyword(),
            "code": keyword(),
            "studyNumber": keyword(),
            "titleStudy": text_with_raw(),
            "abstract": text(),
            "classifications": term(),
            "keywords": term(),
            "typeOfTimeMethods": term(),
            "studyAreaCountries": {
                "properties": {
                    "isoCode": keyword(),
                    "countryName": text_with_raw()
                }
            },
            "unitTypes": term(),
            "pidStudies": {
                "properties": {
                    "agency": keyword(),
                    "pid": keyword()
                }
            },
            "creators": text_with_raw(),
            "typeOfSamplingProcedures": term(),
            "samplingProcedureFreeTexts": text(),
            "typeOfModeOfCollections": term(),
            "dataCollectionPeriodStartdate": lenient_date(),
            "dataCollectionPeriodEnddate": lenient_date(),
            "dataCollectionYear": { "type": "integer" },
            "dataCollectionFreeTexts": {
                "properties": {
                    "dataCollectionFreeText": text(),
                    "event": keyword()
                }
            },
            "dataAccessFreeTexts": text(),
            "publisher": {
                "properties": {
                    "abbr": keyword(),
                    "publisher": text_with_raw()
                }
            },
            "studyUrl": { "type": "keyword", "index": false },
            "lastModified": lenient_date(),
            "isActive": { "type": "boolean" },
            "langAvailableIn": keyword(),
            "fileLanguages": keyword(),
            "studyXmlSourceUrl": { "type": "keyword", "index": false }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmm_indexer_shared::{Publisher, StudyOfLanguage, TermVocabAttributes};

    #[test]
    fn test_settings_structure() {
        let settings = get_index_settings("fi");

        assert_eq!(settings["settings"]["number_of_shards"], SHARDS_PLACEHOLDER);
        assert_eq!(
            settings["settings"]["analysis"]["analyzer"][TEXT_ANALYZER]["type"],
            "finnish"
        );
        assert_eq!(
            get_index_settings("sr")["settings"]["analysis"]["analyzer"][TEXT_ANALYZER]["type"],
            "standard"
        );
    }

    #[test]
    fn test_mapping_is_strict() {
        assert_eq!(get_index_mappings()["dynamic"], "strict");
    }

    /// Every field a study document can carry must be declared.
    #[test]
    fn test_mapping_covers_study_document() {
        let doc = StudyOfLanguage {
            id: "FSD__1".into(),
            code: "FSD".into(),
            study_number: "1".into(),
            title_study: Some("t".into()),
            abstract_text: Some("a".into()),
            classifications: vec![TermVocabAttributes::default()],
            keywords: vec![TermVocabAttributes::default()],
            type_of_time_methods: vec![TermVocabAttributes::default()],
            study_area_countries: vec![Default::default()],
            unit_types: vec![TermVocabAttributes::default()],
            pid_studies: vec![Default::default()],
            creators: vec!["c".into()],
            type_of_sampling_procedures: vec![TermVocabAttributes::default()],
            sampling_procedure_free_texts: Some("s".into()),
            type_of_mode_of_collections: vec![TermVocabAttributes::default()],
            data_collection_period_startdate: Some("2001".into()),
            data_collection_period_enddate: Some("2002".into()),
            data_collection_year: Some(2001),
            data_collection_free_texts: vec![Default::default()],
            data_access_free_texts: vec!["d".into()],
            publisher: Some(Publisher::default()),
            study_url: Some("u".into()),
            last_modified: Some("2018-01-01".into()),
            is_active: true,
            lang_available_in: ["en".to_string()].into(),
            file_languages: ["en".to_string()].into(),
            study_xml_source_url: Some("x".into()),
        };

        let value = serde_json::to_value(&doc).unwrap();
        let mapping = get_index_mappings();
        for key in value.as_object().unwrap().keys() {
            assert!(
                mapping["properties"].get(key).is_some(),
                "field {} is not mapped",
                key
            );
        }
    }
}
