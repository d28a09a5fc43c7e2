//! Configuration and dependency wiring for the search indexer.

mod dependencies;
mod settings;

pub use dependencies::Dependencies;
pub use settings::Settings;
