//! Language-keyed field extraction.
//!
//! Given a field spec, evaluates its paths, resolves the language of each
//! matching element and accumulates the parsed values per language.

use std::collections::BTreeSet;

use tracing::trace;

use cmm_indexer_shared::LangMap;

use super::fields::{CmmField, FieldSpec, Multiplicity};
use super::shapes::FieldValue;
use crate::xml::{Element, XmlDocument};

/// How elements without their own `xml:lang` are handled.
#[derive(Debug, Clone)]
pub struct LanguagePolicy {
    /// Language used when a record declares none.
    pub default_language: String,
    /// Whether untagged elements take the document default language. When
    /// disabled such elements are dropped.
    pub fallback_to_default: bool,
    /// Separator for concatenated values.
    pub concat_separator: String,
    /// Single-valued fields whose untagged values are joined rather than
    /// overwritten.
    pub concat_fields: BTreeSet<CmmField>,
}

impl Default for LanguagePolicy {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            fallback_to_default: true,
            concat_separator: "<br>".to_string(),
            concat_fields: [CmmField::Title, CmmField::SamplingProcedureFreeTexts].into(),
        }
    }
}

impl LanguagePolicy {
    /// Create a policy with a custom default language.
    pub fn with_default_language(mut self, lang: impl Into<String>) -> Self {
        self.default_language = lang.into();
        self
    }

    /// Enable or disable the fallback to the document default language.
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback_to_default = fallback;
        self
    }

    /// Enable or disable concatenation for one field.
    pub fn with_concat(mut self, field: CmmField, enabled: bool) -> Self {
        if enabled {
            self.concat_fields.insert(field);
        } else {
            self.concat_fields.remove(&field);
        }
        self
    }

    /// Set the concatenation separator.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.concat_separator = separator.into();
        self
    }
}

/// Values of one field, keyed by language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LangValues {
    Single(LangMap<FieldValue>),
    Multi(LangMap<Vec<FieldValue>>),
}

/// Extraction context of one document.
pub struct FieldExtractor<'a> {
    policy: &'a LanguagePolicy,
    document_language: &'a str,
}

impl<'a> FieldExtractor<'a> {
    /// Create an extractor for a document whose default language is
    /// `document_language`.
    pub fn new(policy: &'a LanguagePolicy, document_language: &'a str) -> Self {
        Self {
            policy,
            document_language,
        }
    }

    /// Resolve the language of an element. The flag is `true` when the
    /// document default was used.
    fn resolve_language(&self, element: &Element) -> Option<(String, bool)> {
        match element.lang() {
            Some(lang) => Some((lang.to_string(), false)),
            None if self.policy.fallback_to_default => {
                Some((self.document_language.to_string(), true))
            }
            None => None,
        }
    }

    /// Extract one field from the document.
    pub fn extract(&self, doc: &XmlDocument, spec: &FieldSpec) -> LangValues {
        let elements = spec.paths.iter().flat_map(|path| doc.select(path));
        let concat = self.policy.concat_fields.contains(&spec.field);

        match spec.multiplicity {
            Multiplicity::Single => {
                let mut values: LangMap<FieldValue> = LangMap::new();
                for element in elements {
                    let Some((lang, fell_back)) = self.resolve_language(element) else {
                        trace!(field = ?spec.field, element = element.name(), "Dropping untagged element");
                        continue;
                    };
                    let Some(value) = spec.shape.parse(element) else {
                        continue;
                    };
                    let value = match values.remove(&lang) {
                        Some(previous) if concat && fell_back => {
                            previous.concat(value, &self.policy.concat_separator)
                        }
                        _ => value,
                    };
                    values.insert(lang, value);
                }
                LangValues::Single(values)
            }
            Multiplicity::Multi => {
                let mut values: LangMap<Vec<FieldValue>> = LangMap::new();
                for element in elements {
                    let Some((lang, _)) = self.resolve_language(element) else {
                        continue;
                    };
                    if let Some(value) = spec.shape.parse(element) {
                        values.entry(lang).or_default().push(value);
                    }
                }
                LangValues::Multi(values)
            }
        }
    }
}
