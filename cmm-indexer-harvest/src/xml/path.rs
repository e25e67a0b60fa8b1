//! Path evaluation over the element tree.
//!
//! Supports the subset of XPath the DDI and OAI-PMH paths need: a leading
//! `//name` (descendant-or-self search) or `/name` (the root itself),
//! followed by `/name` child steps. Names are matched without namespace
//! prefixes, so `//oai:header` and `//header` are equivalent.

use super::document::{Element, XmlDocument};

fn local(step: &str) -> &str {
    step.rsplit(':').next().unwrap_or(step)
}

impl Element {
    /// Select the elements matching `path`, in document order, with this
    /// element as the context root.
    pub fn select(&self, path: &str) -> Vec<&Element> {
        let (descendant, rest) = match path.strip_prefix("//") {
            Some(rest) => (true, rest),
            None => (false, path.strip_prefix('/').unwrap_or(path)),
        };

        let mut steps = rest.split('/').filter(|step| !step.is_empty()).map(local);
        let Some(first) = steps.next() else {
            return Vec::new();
        };

        let mut current = Vec::new();
        if descendant {
            self.descendants_or_self(first, &mut current);
        } else if self.name() == first {
            current.push(self);
        }

        for step in steps {
            current = current
                .into_iter()
                .flat_map(|element| element.child_elements().filter(move |c| c.name() == step))
                .collect();
            if current.is_empty() {
                break;
            }
        }

        current
    }

    /// First element matching `path`.
    pub fn select_first(&self, path: &str) -> Option<&Element> {
        self.select(path).into_iter().next()
    }
}

impl XmlDocument {
    /// Select the elements matching `path` from the document root.
    pub fn select(&self, path: &str) -> Vec<&Element> {
        self.root().select(path)
    }

    /// First element matching `path` from the document root.
    pub fn select_first(&self, path: &str) -> Option<&Element> {
        self.root().select_first(path)
    }
}
