//! Strategy runtime.
//!
//! `Strategy` is the async trait every extractor implements. Concrete
//! strategies and combinators live in sibling modules; this file holds the
//! shared contract and the record types that flow through all of them.

pub mod builtins;
pub mod composite;
pub mod factory;
pub mod llm_strategy;
pub mod registry;
pub mod sequential;
pub mod url_mapping;

pub use factory::StrategyFactory;
pub use llm_strategy::LlmExtractionStrategy;
pub use registry::StrategyRegistry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StrategyResult;
use crate::types::Category;

/// Per-call options threaded through a strategy invocation.
#[derive(Debug, Clone, Default)]
pub struct ExtractOpts {
    /// Results accumulated by earlier steps in a sequential pipeline.
    /// Combinators other than `SequentialStrategy` leave this `None`.
    pub previous_results: Option<Value>,
}

impl ExtractOpts {
    pub fn with_previous_results(mut self, results: Value) -> Self {
        self.previous_results = Some(results);
        self
    }
}

/// Bookkeeping attached to every extraction result, merged and extended by
/// combinators as a result passes through them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionMeta {
    pub strategy: String,
    pub strategy_version: String,
    pub extraction_timestamp: DateTime<Utc>,
    pub source_url: String,
    #[serde(default)]
    pub content_types: Vec<String>,
    #[serde(default)]
    pub confidence_scores: std::collections::HashMap<String, f32>,
    #[serde(default)]
    pub strategies_used: Vec<String>,
    #[serde(default)]
    pub successful_strategies: Vec<String>,
    #[serde(default)]
    pub failed_strategies: usize,
    #[serde(default)]
    pub steps: Vec<StepMeta>,
    /// Dispatcher-level provenance, set only when a record passed through
    /// the resolver/dispatcher rather than a direct `/test-url` call
    /// against a bare strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_id: Option<uuid::Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_config_id: Option<uuid::Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_url: Option<String>,
    #[serde(default)]
    pub extractors_used: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    /// LLM call provenance, set by
    /// [`crate::strategy::llm_strategy::LlmExtractionStrategy`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<Value>,
}

impl ExtractionMeta {
    pub fn new(strategy: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            strategy_version: "1.0.0".to_string(),
            extraction_timestamp: Utc::now(),
            source_url: source_url.into(),
            content_types: Vec::new(),
            confidence_scores: Default::default(),
            strategies_used: Vec::new(),
            successful_strategies: Vec::new(),
            failed_strategies: 0,
            steps: Vec::new(),
            mapping_id: None,
            url_config_id: None,
            matched_url: None,
            extractors_used: Vec::new(),
            elapsed_ms: None,
            provider: None,
            model: None,
            token_usage: None,
        }
    }
}

/// One step's contribution inside a `SequentialStrategy` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepMeta {
    pub strategy: String,
    pub step_index: usize,
    pub fields_added: Vec<String>,
}

/// The result of a single extraction call: the extracted fields plus the
/// metadata envelope. `data` is deliberately `serde_json::Value` rather
/// than a fixed struct — extracted shape varies per strategy/category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub data: Value,
    pub meta: ExtractionMeta,
}

impl ExtractionRecord {
    pub fn new(data: Value, meta: ExtractionMeta) -> Self {
        Self { data, meta }
    }
}

/// The core extraction contract. Every concrete extractor (LLM-backed or
/// combinator) implements this; callers never depend on a concrete type.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Stable, registry-unique name (matches `StrategyMetadata::name`).
    fn name(&self) -> &str;

    /// Content domain this strategy specializes in, used by
    /// [`crate::strategy::composite::CompositeStrategy`] to select
    /// sub-strategies by classifier output rather than by name. Combinators
    /// (composite, sequential, URL-mapping) have no single category of
    /// their own and keep the default.
    fn category(&self) -> Category {
        Category::General
    }

    async fn extract(
        &self,
        url: &str,
        content: &str,
        opts: &ExtractOpts,
    ) -> StrategyResult<ExtractionRecord>;
}
