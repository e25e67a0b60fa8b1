//! Minimal XML tree built from `quick-xml` events.
//!
//! OAI-PMH envelopes and DDI payloads are small enough to be held in memory,
//! and the mapper needs random access (repeated paths, attribute lookups),
//! so responses are parsed once into an owned element tree and queried with
//! a small subset of XPath.

mod document;
mod path;

pub use document::{Element, XmlDocument};
