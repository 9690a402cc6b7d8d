//! [`StrategyMetadata`] describes a registered strategy without requiring an
//! instance of it, declared as a literal at each strategy's `init()` call
//! site instead of derived by reflection at runtime.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Broad content domain a strategy specializes in (crypto, news,
/// financial, ...). Doubles as the
/// [`crate::classifier::ContentClassifier`]'s label set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Crypto,
    News,
    SocialMedia,
    Product,
    Financial,
    Academic,
    Nft,
    General,
    Composite,
    Workflow,
    Custom,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Crypto,
        Category::News,
        Category::SocialMedia,
        Category::Product,
        Category::Financial,
        Category::Academic,
        Category::Nft,
        Category::General,
        Category::Composite,
        Category::Workflow,
        Category::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Crypto => "crypto",
            Category::News => "news",
            Category::SocialMedia => "social_media",
            Category::Product => "product",
            Category::Financial => "financial",
            Category::Academic => "academic",
            Category::Nft => "nft",
            Category::General => "general",
            Category::Composite => "composite",
            Category::Workflow => "workflow",
            Category::Custom => "custom",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registered description of a strategy, independent of any live instance.
/// Declared once by each strategy module's `init()` function and handed to
/// [`crate::strategy::registry::StrategyRegistry::register`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyMetadata {
    pub name: String,
    pub description: String,
    pub category: Category,
    /// JSON Schema the strategy's extracted output is validated against.
    pub output_schema: Value,
    /// JSON Schema describing the strategy's own constructor configuration,
    /// declared by hand since Rust offers no constructor-signature
    /// introspection to derive it from automatically.
    pub config_schema: Value,
}

impl StrategyMetadata {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: Category,
        output_schema: Value,
        config_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category,
            output_schema,
            config_schema,
        }
    }
}
