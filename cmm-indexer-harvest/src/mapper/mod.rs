//! DDI to CMM mapping.
//!
//! The mapper is a flat table of `(paths, shape, multiplicity)` entries
//! evaluated by the language-keyed [`FieldExtractor`]. Post-processing
//! covers country names, the collection period and file languages.

mod cmm_mapper;
pub mod countries;
mod dates;
mod extractor;
mod fields;
mod shapes;

pub use cmm_mapper::CmmStudyMapper;
pub use dates::{collection_period, leading_year};
pub use extractor::{FieldExtractor, LangValues, LanguagePolicy};
pub use fields::{paths, CmmField, FieldSpec, Multiplicity, FIELD_TABLE};
pub use shapes::{FieldValue, Shape};
