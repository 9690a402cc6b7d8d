//! Domain types shared across the strategy runtime, stores, and dispatcher.

pub mod strategy_metadata;
pub mod url_configuration;
pub mod url_mapping;

pub use strategy_metadata::{Category, StrategyMetadata};
pub use url_configuration::UrlConfiguration;
pub use url_mapping::UrlMapping;
