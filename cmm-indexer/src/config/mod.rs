//! Configuration and dependency wiring for the indexer.

mod dependencies;
mod repositories;
mod settings;

pub use dependencies::Dependencies;
pub use repositories::{load_repositories, parse_repositories};
pub use settings::Settings;
