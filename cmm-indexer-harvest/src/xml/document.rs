//! Owned XML element tree.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::errors::HarvestError;

/// Attribute carrying the language of an element.
pub const LANG_ATTRIBUTE: &str = "xml:lang";

/// A child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with namespace prefixes stripped from its name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, HarvestError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    /// Local name of the element.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of an attribute by its qualified name (e.g. `xml:lang`).
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of an attribute, treating blank values as absent.
    pub fn non_empty_attribute(&self, key: &str) -> Option<&str> {
        self.attribute(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// The element's own `xml:lang`, if present and non-empty.
    pub fn lang(&self) -> Option<&str> {
        self.non_empty_attribute(LANG_ATTRIBUTE)
    }

    /// Child elements in document order.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// First child element with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|child| child.name == name)
    }

    /// All text below this element, whitespace-normalized.
    pub fn text(&self) -> String {
        let mut parts = Vec::new();
        self.collect_text(&mut parts, true);
        parts.join(" ")
    }

    /// Text directly inside this element, ignoring child elements.
    pub fn own_text(&self) -> String {
        let mut parts = Vec::new();
        self.collect_text(&mut parts, false);
        parts.join(" ")
    }

    fn collect_text<'a>(&'a self, parts: &mut Vec<&'a str>, recurse: bool) {
        for node in &self.children {
            match node {
                Node::Text(text) => parts.extend(text.split_whitespace()),
                Node::Element(child) if recurse => child.collect_text(parts, recurse),
                Node::Element(_) => {}
            }
        }
    }

    pub(crate) fn descendants_or_self<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        if self.name == name {
            out.push(self);
        }
        for child in self.child_elements() {
            child.descendants_or_self(name, out);
        }
    }
}

/// A parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: Element,
}

impl XmlDocument {
    /// Parse a document from raw bytes.
    ///
    /// # Returns
    ///
    /// * `Ok(XmlDocument)` - The element tree
    /// * `Err(HarvestError::Xml)` - If the bytes are not well-formed XML or
    ///   contain no root element
    pub fn parse(bytes: &[u8]) -> Result<Self, HarvestError> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event_into(&mut buf)?;
            match event {
                Event::Start(ref start) => {
                    stack.push(Element::from_start(start)?);
                }
                Event::Empty(ref start) => {
                    let element = Element::from_start(start)?;
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| HarvestError::xml("unbalanced end tag"))?;
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Event::Text(ref text) => {
                    let value = match text.unescape() {
                        Ok(value) => value.into_owned(),
                        Err(_) => String::from_utf8_lossy(text).into_owned(),
                    };
                    Self::push_text(&mut stack, value);
                }
                Event::CData(ref data) => {
                    let value = String::from_utf8_lossy(data).into_owned();
                    Self::push_text(&mut stack, value);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(HarvestError::xml("unexpected end of document"));
        }

        root.map(|root| Self { root })
            .ok_or_else(|| HarvestError::xml("document has no root element"))
    }

    fn attach(
        stack: &mut [Element],
        root: &mut Option<Element>,
        element: Element,
    ) -> Result<(), HarvestError> {
        match stack.last_mut() {
            Some(parent) => {
                parent.children.push(Node::Element(element));
                Ok(())
            }
            None if root.is_none() => {
                *root = Some(element);
                Ok(())
            }
            None => Err(HarvestError::xml("multiple root elements")),
        }
    }

    fn push_text(stack: &mut [Element], value: String) {
        if value.trim().is_empty() {
            return;
        }
        if let Some(parent) = stack.last_mut() {
            parent.children.push(Node::Text(value));
        }
    }

    /// The root element.
    pub fn root(&self) -> &Element {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
  <GetRecord>
    <record>
      <header status="deleted">
        <identifier>oai:example:1</identifier>
      </header>
      <metadata>
        <ddi:codeBook xmlns:ddi="ddi:codebook:2_5" xml:lang="fi">
          <ddi:abstract>First <ddi:b>bold</ddi:b> &amp; last</ddi:abstract>
          <ddi:empty abbr="FI"/>
          <ddi:cdata><![CDATA[<raw>]]></ddi:cdata>
        </ddi:codeBook>
      </metadata>
    </record>
  </GetRecord>
</OAI-PMH>"#;

    #[test]
    fn test_parse_strips_prefixes() {
        let doc = XmlDocument::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(doc.root().name(), "OAI-PMH");

        let mut found = Vec::new();
        doc.root().descendants_or_self("codeBook", &mut found);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].lang(), Some("fi"));
    }

    #[test]
    fn test_text_and_own_text() {
        let doc = XmlDocument::parse(SAMPLE.as_bytes()).unwrap();
        let mut found = Vec::new();
        doc.root().descendants_or_self("abstract", &mut found);

        assert_eq!(found[0].text(), "First bold & last");
        assert_eq!(found[0].own_text(), "First & last");
    }

    #[test]
    fn test_empty_element_and_cdata() {
        let doc = XmlDocument::parse(SAMPLE.as_bytes()).unwrap();
        let mut empty = Vec::new();
        doc.root().descendants_or_self("empty", &mut empty);
        assert_eq!(empty[0].attribute("abbr"), Some("FI"));
        assert_eq!(empty[0].text(), "");

        let mut cdata = Vec::new();
        doc.root().descendants_or_self("cdata", &mut cdata);
        assert_eq!(cdata[0].text(), "<raw>");
    }

    #[test]
    fn test_blank_lang_is_absent() {
        let doc = XmlDocument::parse(br#"<a xml:lang="  "><b xml:lang="en"/></a>"#).unwrap();
        assert_eq!(doc.root().lang(), None);
        assert_eq!(doc.root().child("b").and_then(|b| b.lang()), Some("en"));
    }

    #[test]
    fn test_malformed_xml() {
        assert!(matches!(
            XmlDocument::parse(b"<a><b></a>"),
            Err(HarvestError::Xml(_))
        ));
        assert!(matches!(
            XmlDocument::parse(b"<a>"),
            Err(HarvestError::Xml(_))
        ));
        assert!(matches!(
            XmlDocument::parse(b"   "),
            Err(HarvestError::Xml(_))
        ));
    }
}
