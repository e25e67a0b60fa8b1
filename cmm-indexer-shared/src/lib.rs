//! # CMM Indexer Shared
//!
//! Shared data model for the study harvester and indexer: repositories,
//! OAI-PMH record headers, the language-indexed [`Study`] produced by the
//! mapper and the flat per-language [`StudyOfLanguage`] persisted in the
//! search index.

pub mod record;
pub mod repository;
pub mod study;
pub mod study_of_language;
pub mod time;

pub use record::{RecordHeader, RecordType};
pub use repository::{Locator, Repository};
pub use study::{
    Country, DataCollectionFreeText, DataCollectionPeriod, LangMap, Pid, Publisher, Study,
    StudyMetadata, TermVocabAttributes,
};
pub use study_of_language::StudyOfLanguage;
pub use time::parse_iso_instant;
