//! DDI 2.5 to CMM study mapping.

use std::collections::BTreeSet;

use tracing::{debug, instrument};

use cmm_indexer_shared::{LangMap, Repository, Study, StudyMetadata};

use super::countries;
use super::dates::collection_period;
use super::extractor::{FieldExtractor, LangValues, LanguagePolicy};
use super::fields::{paths, CmmField, FIELD_TABLE};
use super::shapes::FieldValue;
use crate::errors::HarvestError;
use crate::oai::parse_header;
use crate::xml::XmlDocument;

/// Maps `GetRecord` responses carrying a DDI codebook into studies.
#[derive(Debug, Clone, Default)]
pub struct CmmStudyMapper {
    policy: LanguagePolicy,
}

impl CmmStudyMapper {
    pub fn new(policy: LanguagePolicy) -> Self {
        Self { policy }
    }

    /// Map one record document.
    ///
    /// The envelope comes from the OAI-PMH header. A deleted record yields
    /// the envelope only; an active one gets every field of the table.
    ///
    /// # Returns
    ///
    /// * `Ok(Study)` - The mapped study; missing optional content leaves fields empty
    /// * `Err(HarvestError::MissingElement)` - If the document has no record header
    #[instrument(skip_all, fields(repository = %repo.code))]
    pub fn map(&self, doc: &XmlDocument, repo: &Repository) -> Result<Study, HarvestError> {
        let header = doc
            .select_first(paths::RECORD_HEADER)
            .ok_or_else(|| HarvestError::missing_element("record/header"))
            .and_then(parse_header)?;

        if header.deleted {
            debug!(identifier = %header.identifier, "Record is deleted, mapping envelope only");
            return Ok(Study::tombstone(&header, None));
        }

        let document_language = self.document_language(doc, repo);
        let extractor = FieldExtractor::new(&self.policy, &document_language);

        let mut metadata = StudyAccumulator::default();
        for spec in FIELD_TABLE {
            metadata.put(spec.field, extractor.extract(doc, spec));
        }
        let mut metadata = metadata.freeze();
        metadata.data_collection_period = collection_period(doc.select(paths::COLLECTION_DATES));

        Ok(Study {
            study_number: header.identifier,
            active: true,
            last_modified: Some(header.last_modified).filter(|lm| !lm.is_empty()),
            file_languages: file_languages(doc),
            study_xml_source_url: None,
            metadata: Some(metadata),
        })
    }

    /// The codebook's own language, else the repository override, else the
    /// configured default.
    fn document_language(&self, doc: &XmlDocument, repo: &Repository) -> String {
        doc.select_first(paths::CODEBOOK)
            .and_then(|codebook| codebook.lang())
            .or(repo.default_language.as_deref())
            .unwrap_or(&self.policy.default_language)
            .trim()
            .to_string()
    }
}

/// Languages of the data files, from both the file description and the file
/// name attributes.
fn file_languages(doc: &XmlDocument) -> BTreeSet<String> {
    doc.select(paths::FILE_DESCRIPTION)
        .into_iter()
        .chain(doc.select(paths::FILE_NAME))
        .filter_map(|element| element.lang())
        .map(|lang| lang.trim().to_string())
        .collect()
}

/// Metadata under construction during one mapping pass.
#[derive(Default)]
struct StudyAccumulator {
    metadata: StudyMetadata,
}

fn texts(values: LangValues) -> LangMap<String> {
    match values {
        LangValues::Single(map) => map
            .into_iter()
            .filter_map(|(lang, value)| match value {
                FieldValue::Text(text) => Some((lang, text)),
                _ => None,
            })
            .collect(),
        LangValues::Multi(map) => map
            .into_iter()
            .filter_map(|(lang, values)| {
                values.into_iter().rev().find_map(|value| match value {
                    FieldValue::Text(text) => Some((lang.clone(), text)),
                    _ => None,
                })
            })
            .collect(),
    }
}

/// Flatten multi values of one variant into per-language lists.
fn lists<T>(values: LangValues, pick: impl Fn(FieldValue) -> Option<T>) -> LangMap<Vec<T>> {
    let map = match values {
        LangValues::Multi(map) => map,
        LangValues::Single(map) => map.into_iter().map(|(lang, v)| (lang, vec![v])).collect(),
    };
    map.into_iter()
        .map(|(lang, values)| (lang, values.into_iter().filter_map(&pick).collect::<Vec<T>>()))
        .filter(|(_, values)| !values.is_empty())
        .collect()
}

impl StudyAccumulator {
    fn put(&mut self, field: CmmField, values: LangValues) {
        let m = &mut self.metadata;
        let term = |v: FieldValue| match v {
            FieldValue::Term(term) => Some(term),
            _ => None,
        };
        let text = |v: FieldValue| match v {
            FieldValue::Text(text) => Some(text),
            _ => None,
        };

        match field {
            CmmField::Title => m.title = texts(values),
            CmmField::Abstract => m.abstract_text = texts(values),
            CmmField::SamplingProcedureFreeTexts => m.sampling_procedure_free_texts = texts(values),
            CmmField::StudyUrl => m.study_url = texts(values),
            CmmField::Keywords => m.keywords = lists(values, term),
            CmmField::Classifications => m.classifications = lists(values, term),
            CmmField::TypeOfTimeMethods => m.type_of_time_methods = lists(values, term),
            CmmField::TypeOfModeOfCollections => m.type_of_mode_of_collections = lists(values, term),
            CmmField::UnitTypes => m.unit_types = lists(values, term),
            CmmField::TypeOfSamplingProcedures => m.type_of_sampling_procedures = lists(values, term),
            CmmField::Creators => m.creators = lists(values, text),
            CmmField::DataAccessFreeTexts => m.data_access_free_texts = lists(values, text),
            CmmField::StudyAreaCountries => {
                m.study_area_countries = lists(values, |v: FieldValue| match v {
                    FieldValue::Country(country) => Some(countries::resolve(country)),
                    _ => None,
                })
            }
            CmmField::PidStudies => {
                m.pid_studies = lists(values, |v: FieldValue| match v {
                    FieldValue::Pid(pid) => Some(pid),
                    _ => None,
                })
            }
            CmmField::DataCollectionFreeTexts => {
                m.data_collection_free_texts = lists(values, |v: FieldValue| match v {
                    FieldValue::EventText(text) => Some(text),
                    _ => None,
                })
            }
            CmmField::Publisher => {
                m.publisher = lists(values, |v: FieldValue| match v {
                    FieldValue::Publisher(publisher) => Some(publisher),
                    _ => None,
                })
                .into_iter()
                .filter_map(|(lang, mut publishers)| publishers.pop().map(|p| (lang, p)))
                .collect()
            }
        }
    }

    fn freeze(self) -> StudyMetadata {
        self.metadata
    }
}
