//! Language materializer implementation.
//!
//! Splits a language-indexed study into one flat document per configured
//! language it qualifies for.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument};

use cmm_indexer_shared::{LangMap, Publisher, Repository, Study, StudyOfLanguage};

/// Processor that fans a study out into per-language documents.
///
/// A language qualifies when the study carries a title, an abstract and a
/// publisher in it. A tombstoned study qualifies for every configured
/// language so the inactive state reaches each index.
#[derive(Debug, Clone)]
pub struct LanguageMaterializer {
    languages: Vec<String>,
}

impl LanguageMaterializer {
    /// Create a materializer for the configured languages.
    pub fn new<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            languages: languages.into_iter().map(Into::into).collect(),
        }
    }

    /// The configured languages `study` may be published in.
    pub fn qualifying_languages(&self, study: &Study) -> BTreeSet<String> {
        self.languages
            .iter()
            .filter(|lang| !study.active || study.is_available_in(lang))
            .cloned()
            .collect()
    }

    /// Build the document of every qualifying language.
    ///
    /// Every document lists the full set of qualifying languages. The
    /// publisher is always the indexing repository, whatever the record
    /// declares.
    ///
    /// # Returns
    ///
    /// A map from language code to document; empty when no configured
    /// language qualifies.
    #[instrument(skip_all, fields(repository = %repo.code, study_number = %study.study_number))]
    pub fn materialize(&self, study: &Study, repo: &Repository) -> BTreeMap<String, StudyOfLanguage> {
        let available = self.qualifying_languages(study);
        if available.is_empty() {
            debug!("Study qualifies for no configured language");
        }

        available
            .iter()
            .map(|lang| (lang.clone(), project(study, repo, lang, &available)))
            .collect()
    }
}

fn pick<T: Clone>(map: &LangMap<T>, lang: &str) -> Option<T> {
    map.get(lang).cloned()
}

fn list<T: Clone>(map: &LangMap<Vec<T>>, lang: &str) -> Vec<T> {
    map.get(lang).cloned().unwrap_or_default()
}

fn project(study: &Study, repo: &Repository, lang: &str, available: &BTreeSet<String>) -> StudyOfLanguage {
    let mut doc = StudyOfLanguage {
        id: repo.document_id(&study.study_number),
        code: repo.code.clone(),
        study_number: study.study_number.clone(),
        publisher: Some(Publisher {
            abbreviation: Some(repo.code.clone()),
            name: repo.name.clone(),
        }),
        last_modified: study.last_modified.clone(),
        is_active: study.active,
        lang_available_in: available.clone(),
        file_languages: study.file_languages.clone(),
        study_xml_source_url: study.study_xml_source_url.clone(),
        ..Default::default()
    };

    let Some(metadata) = &study.metadata else {
        return doc;
    };

    doc.title_study = pick(&metadata.title, lang);
    doc.abstract_text = pick(&metadata.abstract_text, lang);
    doc.classifications = list(&metadata.classifications, lang);
    doc.keywords = list(&metadata.keywords, lang);
    doc.type_of_time_methods = list(&metadata.type_of_time_methods, lang);
    doc.study_area_countries = list(&metadata.study_area_countries, lang);
    doc.unit_types = list(&metadata.unit_types, lang);
    doc.pid_studies = list(&metadata.pid_studies, lang);
    doc.creators = list(&metadata.creators, lang);
    doc.type_of_sampling_procedures = list(&metadata.type_of_sampling_procedures, lang);
    doc.sampling_procedure_free_texts = pick(&metadata.sampling_procedure_free_texts, lang);
    doc.type_of_mode_of_collections = list(&metadata.type_of_mode_of_collections, lang);
    doc.data_collection_free_texts = list(&metadata.data_collection_free_texts, lang);
    doc.data_access_free_texts = list(&metadata.data_access_free_texts, lang);

    let period = &metadata.data_collection_period;
    doc.data_collection_period_startdate = period.start_date.clone();
    doc.data_collection_period_enddate = period.end_date.clone();
    doc.data_collection_year = period.start_year;

    // Same-language URL first, otherwise the first co-available one.
    doc.study_url = metadata
        .study_url
        .get(lang)
        .or_else(|| available.iter().find_map(|other| metadata.study_url.get(other)))
        .cloned();

    doc
}
