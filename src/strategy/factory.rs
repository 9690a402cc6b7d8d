//! Strategy factory.
//!
//! `create`/`create_from_config` build a registered strategy by name from
//! a JSON config blob. Composite construction is handled by
//! [`super::composite::CompositeStrategy`] itself rather than the factory,
//! since Rust's ownership model makes it more natural for the combinator
//! to own its own construction.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{DispatchError, DispatchResult};

use super::composite::CompositeStrategy;
use super::{Strategy, StrategyRegistry};

/// `{"strategy": name, "config": {...}}`, the wire shape a caller submits
/// to build a strategy by name.
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    pub strategy: String,
    #[serde(default)]
    pub config: Value,
}

pub struct StrategyFactory {
    registry: Arc<StrategyRegistry>,
}

impl StrategyFactory {
    pub fn new(registry: Arc<StrategyRegistry>) -> Self {
        Self { registry }
    }

    pub fn create(&self, name: &str, config: &Value) -> DispatchResult<Box<dyn Strategy>> {
        self.registry.build(name, config)
    }

    pub fn create_from_config(&self, config: &StrategyConfig) -> DispatchResult<Box<dyn Strategy>> {
        self.create(&config.strategy, &config.config)
    }

    pub fn create_from_json(&self, json_config: &str) -> DispatchResult<Box<dyn Strategy>> {
        let config: StrategyConfig = serde_json::from_str(json_config)
            .map_err(|e| DispatchError::Configuration(format!("invalid strategy config JSON: {e}")))?;
        self.create_from_config(&config)
    }

    /// Builds every sub-strategy spec eagerly and wraps them in a
    /// `CompositeStrategy`. A single construction failure aborts the whole
    /// call — there is no partial composite.
    pub fn create_composite(&self, specs: &[StrategyConfig]) -> DispatchResult<CompositeStrategy> {
        let mut sub_strategies = Vec::with_capacity(specs.len());
        for spec in specs {
            let strategy = self.create_from_config(spec)?;
            sub_strategies.push(Arc::from(strategy));
        }
        Ok(CompositeStrategy::new("composite", sub_strategies))
    }

    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{ExtractOpts, ExtractionMeta, ExtractionRecord};
    use crate::types::{Category, StrategyMetadata};
    use async_trait::async_trait;
    use serde_json::json;

    struct Noop(String);

    #[async_trait]
    impl Strategy for Noop {
        fn name(&self) -> &str {
            &self.0
        }

        async fn extract(
            &self,
            url: &str,
            _content: &str,
            _opts: &ExtractOpts,
        ) -> crate::error::StrategyResult<ExtractionRecord> {
            Ok(ExtractionRecord::new(json!({}), ExtractionMeta::new(self.0.clone(), url)))
        }
    }

    fn factory_with(names: &[&str]) -> StrategyFactory {
        let registry = Arc::new(StrategyRegistry::new());
        for name in names {
            let owned = name.to_string();
            registry.register(
                StrategyMetadata::new(owned.clone(), "test", Category::General, json!({}), json!({})),
                Box::new(move |_config| Ok(Box::new(Noop(owned.clone())) as Box<dyn Strategy>)),
            );
        }
        StrategyFactory::new(registry)
    }

    #[test]
    fn create_composite_builds_every_sub_strategy_eagerly() {
        let factory = factory_with(&["a", "b"]);
        let specs = vec![
            StrategyConfig { strategy: "a".to_string(), config: json!({}) },
            StrategyConfig { strategy: "b".to_string(), config: json!({}) },
        ];
        let composite = factory.create_composite(&specs).unwrap();
        assert_eq!(composite.name(), "composite");
    }

    #[test]
    fn create_composite_aborts_on_first_construction_failure() {
        let factory = factory_with(&["a"]);
        let specs = vec![
            StrategyConfig { strategy: "a".to_string(), config: json!({}) },
            StrategyConfig { strategy: "missing".to_string(), config: json!({}) },
        ];
        assert!(factory.create_composite(&specs).is_err());
    }
}
