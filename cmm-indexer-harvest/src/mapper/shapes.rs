//! Value shapes extracted from DDI elements.
//!
//! Every CMM field is one of a closed set of shapes. Parsing is a pure
//! function of the element; an element that yields no usable value is
//! skipped by the extractor.

use cmm_indexer_shared::{Country, DataCollectionFreeText, Pid, Publisher, TermVocabAttributes};

use crate::xml::Element;

/// How a field's value is read from an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// All text below the element.
    Text,
    /// Text directly inside the element, excluding child elements such as
    /// `concept`.
    OwnText,
    /// A controlled vocabulary term.
    Term,
    /// A country `{code, name}`.
    Country,
    /// A persistent identifier `{agency, id}`.
    Pid,
    /// Free text tagged with a data collection event.
    EventText,
    /// A publisher `{abbr, name}`.
    Publisher,
    /// An author, with the affiliation appended when present.
    Creator,
    /// The `URI` attribute of the element.
    Uri,
}

/// A value produced by a [`Shape`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Term(TermVocabAttributes),
    Country(Country),
    Pid(Pid),
    EventText(DataCollectionFreeText),
    Publisher(Publisher),
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn attr(element: &Element, key: &str) -> Option<String> {
    element.non_empty_attribute(key).map(str::to_string)
}

impl Shape {
    /// Parse one element into a value of this shape.
    pub fn parse(self, element: &Element) -> Option<FieldValue> {
        match self {
            Shape::Text => non_empty(element.text()).map(FieldValue::Text),
            Shape::OwnText => non_empty(element.own_text()).map(FieldValue::Text),
            Shape::Term => parse_term(element).map(FieldValue::Term),
            Shape::Country => parse_country(element).map(FieldValue::Country),
            Shape::Pid => non_empty(element.text()).map(|pid| {
                FieldValue::Pid(Pid {
                    agency: attr(element, "agency"),
                    pid,
                })
            }),
            Shape::EventText => non_empty(element.text()).map(|text| {
                FieldValue::EventText(DataCollectionFreeText {
                    data_collection_free_text: text,
                    event: attr(element, "event"),
                })
            }),
            Shape::Publisher => non_empty(element.text()).map(|name| {
                FieldValue::Publisher(Publisher {
                    abbreviation: attr(element, "abbr"),
                    name,
                })
            }),
            Shape::Creator => non_empty(element.text()).map(|name| {
                match attr(element, "affiliation") {
                    Some(affiliation) => FieldValue::Text(format!("{} ({})", name, affiliation)),
                    None => FieldValue::Text(name),
                }
            }),
            Shape::Uri => attr(element, "URI").map(FieldValue::Text),
        }
    }
}

/// A term is either described by a nested `concept` element carrying the
/// vocabulary, or by vocabulary attributes on the element itself.
fn parse_term(element: &Element) -> Option<TermVocabAttributes> {
    match element.child("concept") {
        Some(concept) => {
            let id = non_empty(concept.text());
            let term = non_empty(element.own_text()).or_else(|| id.clone())?;
            Some(TermVocabAttributes {
                vocab: attr(concept, "vocab"),
                vocab_uri: attr(concept, "vocabURI"),
                id,
                term,
            })
        }
        None => Some(TermVocabAttributes {
            vocab: attr(element, "vocab"),
            vocab_uri: attr(element, "vocabURI"),
            id: attr(element, "ID"),
            term: non_empty(element.text())?,
        }),
    }
}

fn parse_country(element: &Element) -> Option<Country> {
    let iso_code = attr(element, "abbr");
    let country_name = non_empty(element.text());
    if iso_code.is_none() && country_name.is_none() {
        return None;
    }
    Some(Country {
        iso_code,
        country_name,
    })
}

impl FieldValue {
    /// Join two text values with `separator`. Non-text values are replaced.
    pub fn concat(self, next: FieldValue, separator: &str) -> FieldValue {
        match (self, next) {
            (FieldValue::Text(first), FieldValue::Text(second)) => {
                FieldValue::Text(format!("{}{}{}", first, separator, second))
            }
            (_, next) => next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XmlDocument;

    fn element(xml: &str) -> XmlDocument {
        XmlDocument::parse(xml.as_bytes()).unwrap()
    }

    #[test]
    fn test_term_with_concept() {
        let doc = element(
            r#"<sampProc xml:lang="en">Random sample<concept vocab="SamplingProcedure" vocabURI="urn:ddi:sp">Probability.SimpleRandom</concept></sampProc>"#,
        );
        let value = Shape::Term.parse(doc.root()).unwrap();

        assert_eq!(
            value,
            FieldValue::Term(TermVocabAttributes {
                vocab: Some("SamplingProcedure".into()),
                vocab_uri: Some("urn:ddi:sp".into()),
                id: Some("Probability.SimpleRandom".into()),
                term: "Random sample".into(),
            })
        );
    }

    #[test]
    fn test_term_with_attributes() {
        let doc = element(r#"<keyword vocab="ELSST" vocabURI="https://elsst.org" ID="k1">ELECTIONS</keyword>"#);
        match Shape::Term.parse(doc.root()) {
            Some(FieldValue::Term(term)) => {
                assert_eq!(term.term, "ELECTIONS");
                assert_eq!(term.vocab.as_deref(), Some("ELSST"));
                assert_eq!(term.id.as_deref(), Some("k1"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_empty_term_is_skipped() {
        let doc = element(r#"<keyword vocab="ELSST">  </keyword>"#);
        assert!(Shape::Term.parse(doc.root()).is_none());
    }

    #[test]
    fn test_own_text_excludes_concept() {
        let doc = element(r#"<sampProc>Free text<concept>Probability</concept></sampProc>"#);
        assert_eq!(
            Shape::OwnText.parse(doc.root()),
            Some(FieldValue::Text("Free text".into()))
        );
    }

    #[test]
    fn test_country_pid_and_publisher() {
        let country = element(r#"<nation abbr="FI">Finland</nation>"#);
        assert_eq!(
            Shape::Country.parse(country.root()),
            Some(FieldValue::Country(Country {
                iso_code: Some("FI".into()),
                country_name: Some("Finland".into()),
            }))
        );

        let pid = element(r#"<IDNo agency="DOI">10.1234/abc</IDNo>"#);
        assert_eq!(
            Shape::Pid.parse(pid.root()),
            Some(FieldValue::Pid(Pid {
                agency: Some("DOI".into()),
                pid: "10.1234/abc".into(),
            }))
        );

        let publisher = element(r#"<producer abbr="FSD">Finnish Social Science Data Archive</producer>"#);
        assert_eq!(
            Shape::Publisher.parse(publisher.root()),
            Some(FieldValue::Publisher(Publisher {
                abbreviation: Some("FSD".into()),
                name: "Finnish Social Science Data Archive".into(),
            }))
        );
    }

    #[test]
    fn test_creator_and_uri() {
        let creator = element(r#"<AuthEnty affiliation="University of Tampere">Doe, Jane</AuthEnty>"#);
        assert_eq!(
            Shape::Creator.parse(creator.root()),
            Some(FieldValue::Text("Doe, Jane (University of Tampere)".into()))
        );

        let holdings = element(r#"<holdings URI="https://example.org/study/1">Link</holdings>"#);
        assert_eq!(
            Shape::Uri.parse(holdings.root()),
            Some(FieldValue::Text("https://example.org/study/1".into()))
        );
    }

    #[test]
    fn test_concat() {
        let joined = FieldValue::Text("a".into()).concat(FieldValue::Text("b".into()), "<br>");
        assert_eq!(joined, FieldValue::Text("a<br>b".into()));
    }
}
