//! Strategy registry.
//!
//! Strategies register themselves via explicit, compile-time `init()`
//! functions (see [`super::builtins`]) rather than reflection-derived
//! config schemas and filesystem category-directory scanning. `reload()`
//! re-runs those `init()` calls rather than re-importing modules from disk.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{DispatchError, DispatchResult};
use crate::types::{Category, StrategyMetadata};

/// A constructor a registered strategy can be built from: takes a JSON
/// config value (validated against the strategy's declared
/// `config_schema` by the factory) and returns a boxed `Strategy`.
pub type StrategyConstructor =
    Box<dyn Fn(&serde_json::Value) -> crate::error::StrategyResult<Box<dyn super::Strategy>> + Send + Sync>;

struct Entry {
    metadata: StrategyMetadata,
    constructor: StrategyConstructor,
}

/// In-memory catalogue of every strategy the binary was compiled with.
/// Thread-safe via `RwLock`; cheap to clone the `Arc` wrapping it rather
/// than the registry itself.
#[derive(Default)]
pub struct StrategyRegistry {
    entries: RwLock<HashMap<String, Entry>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy under `metadata.name`. Re-registering the same
    /// name overwrites the previous entry; there is no duplicate-name
    /// guard.
    pub fn register(&self, metadata: StrategyMetadata, constructor: StrategyConstructor) {
        let name = metadata.name.clone();
        self.entries
            .write()
            .unwrap()
            .insert(name, Entry { metadata, constructor });
    }

    pub fn get_metadata(&self, name: &str) -> Option<StrategyMetadata> {
        self.entries.read().unwrap().get(name).map(|e| e.metadata.clone())
    }

    pub fn get_all_metadata(&self) -> Vec<StrategyMetadata> {
        self.entries
            .read()
            .unwrap()
            .values()
            .map(|e| e.metadata.clone())
            .collect()
    }

    pub fn get_by_category(&self, category: Category) -> Vec<StrategyMetadata> {
        self.entries
            .read()
            .unwrap()
            .values()
            .filter(|e| e.metadata.category == category)
            .map(|e| e.metadata.clone())
            .collect()
    }

    pub fn categories(&self) -> Vec<Category> {
        let mut cats: Vec<Category> = self
            .entries
            .read()
            .unwrap()
            .values()
            .map(|e| e.metadata.category)
            .collect();
        cats.sort_by_key(|c| c.as_str());
        cats.dedup();
        cats
    }

    /// Build a strategy instance by name with the given config. Returns
    /// [`DispatchError::NotFound`] for an unregistered name; config
    /// validation against `config_schema` and constructor errors surface
    /// as [`crate::error::StrategyError`] from the constructor itself.
    pub fn build(
        &self,
        name: &str,
        config: &serde_json::Value,
    ) -> DispatchResult<Box<dyn super::Strategy>> {
        let guard = self.entries.read().unwrap();
        let entry = guard
            .get(name)
            .ok_or_else(|| DispatchError::NotFound(format!("strategy '{name}' is not registered")))?;
        (entry.constructor)(config)
            .map_err(|e| DispatchError::Configuration(e.to_string()))
    }

    pub fn unregister(&self, name: &str) {
        self.entries.write().unwrap().remove(name);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Clear and re-run every compiled-in `init()` function. There is no
    /// filesystem to re-scan, so this simply repopulates from
    /// [`super::builtins::register_all`].
    pub fn reload(&self) {
        self.entries.write().unwrap().clear();
        super::builtins::register_all(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{ExtractOpts, ExtractionMeta, ExtractionRecord, Strategy};
    use async_trait::async_trait;
    use serde_json::json;

    struct Noop;

    #[async_trait]
    impl Strategy for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        async fn extract(
            &self,
            url: &str,
            _content: &str,
            _opts: &ExtractOpts,
        ) -> crate::error::StrategyResult<ExtractionRecord> {
            Ok(ExtractionRecord::new(json!({}), ExtractionMeta::new("noop", url)))
        }
    }

    #[test]
    fn register_and_build_round_trips() {
        let registry = StrategyRegistry::new();
        registry.register(
            StrategyMetadata::new("noop", "does nothing", Category::General, json!({}), json!({})),
            Box::new(|_config| Ok(Box::new(Noop) as Box<dyn Strategy>)),
        );

        assert_eq!(registry.len(), 1);
        assert!(registry.get_metadata("noop").is_some());
        assert!(registry.build("noop", &json!({})).is_ok());
        assert!(registry.build("missing", &json!({})).is_err());
    }

    #[test]
    fn unregister_removes_entry() {
        let registry = StrategyRegistry::new();
        registry.register(
            StrategyMetadata::new("noop", "does nothing", Category::General, json!({}), json!({})),
            Box::new(|_config| Ok(Box::new(Noop) as Box<dyn Strategy>)),
        );
        registry.unregister("noop");
        assert!(registry.is_empty());
    }
}
