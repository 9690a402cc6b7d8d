//! Resolver & Dispatcher.
//!
//! Looks up the persisted `url_mappings` entry for a case-insensitive
//! exact URL match, loads the owning `url_configurations` row, enforces
//! the mapping's fixed 60-second-window rate limit, builds each named
//! extractor through the factory (wrapping more than one in a `Composite`
//! with `merge_mode = smart`), runs it, and annotates the result with
//! dispatch provenance.

pub mod rate_limiter;

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::error::{DispatchError, DispatchResult};
use crate::stores::{UrlConfigurationStore, UrlMappingStore};
use crate::strategy::composite::{CompositeStrategy, MergeMode};
use crate::strategy::{ExtractOpts, ExtractionRecord, Strategy, StrategyFactory};

pub use rate_limiter::RateLimiter;

/// Fixed rate-limit window.
const RATE_LIMIT_WINDOW_SECS: u32 = 60;

pub struct Dispatcher {
    mapping_store: Arc<UrlMappingStore>,
    configuration_store: Arc<UrlConfigurationStore>,
    factory: Arc<StrategyFactory>,
    rate_limiter: Arc<RateLimiter>,
}

impl Dispatcher {
    pub fn new(
        mapping_store: Arc<UrlMappingStore>,
        configuration_store: Arc<UrlConfigurationStore>,
        factory: Arc<StrategyFactory>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            mapping_store,
            configuration_store,
            factory,
            rate_limiter,
        }
    }

    /// Dispatch `content` fetched from `url` through the mapping registered
    /// for that exact URL. `extra_config` is merged under the mapping's
    /// `crawler_settings` (mapping wins on key conflicts) before each
    /// extractor is constructed, letting a caller supply credentials
    /// (e.g. `api_key`) without persisting them in the mapping row.
    pub async fn dispatch(
        &self,
        url: &str,
        content: &str,
        extra_config: Value,
    ) -> DispatchResult<ExtractionRecord> {
        let started = Instant::now();

        let mapping = self
            .mapping_store
            .get_by_url(url)
            .await
            .map_err(|e| DispatchError::Configuration(e.to_string()))?
            .ok_or_else(|| DispatchError::NotFound(format!("no active url_mapping for '{url}'")))?;

        // The owning configuration must still exist — a dangling mapping
        // (left behind if the cascade delete somehow missed it) is never
        // dispatched successfully.
        self.configuration_store
            .get(mapping.url_config_id)
            .await
            .map_err(|e| DispatchError::Configuration(e.to_string()))?
            .ok_or_else(|| {
                DispatchError::NotFound(format!(
                    "url_configuration {} referenced by mapping {} no longer exists",
                    mapping.url_config_id, mapping.id
                ))
            })?;

        let decision = self
            .rate_limiter
            .check(mapping.id, mapping.rate_limit.max(1) as u32, RATE_LIMIT_WINDOW_SECS);
        if !decision.allowed {
            return Err(DispatchError::RateLimitExceeded {
                retry_after_secs: decision.retry_after_secs,
            });
        }

        let config = merge_config(&mapping.crawler_settings, &extra_config);

        let mut extractors = Vec::with_capacity(mapping.extractor_ids.len());
        for name in &mapping.extractor_ids {
            // A mapping naming an extractor that isn't registered yields
            // `Configuration`, not `NotFound` — an unregistered extractor
            // is a setup problem with the mapping, distinct from the
            // mapping itself being absent.
            let strategy = self.factory.create(name, &config).map_err(|e| match e {
                DispatchError::NotFound(msg) => {
                    DispatchError::Configuration(format!("extractor not registered: {msg}"))
                }
                other => other,
            })?;
            extractors.push(Arc::from(strategy));
        }

        let record = self.run(&extractors, &mapping.extractor_ids, url, content).await?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let mut record = record;
        record.meta.mapping_id = Some(mapping.id);
        record.meta.url_config_id = Some(mapping.url_config_id);
        record.meta.matched_url = Some(mapping.url.clone());
        record.meta.extractors_used = mapping.extractor_ids.clone();
        record.meta.elapsed_ms = Some(elapsed_ms);

        tracing::info!(
            mapping_id = %mapping.id,
            url,
            duration_ms = elapsed_ms,
            success = true,
            strategies_used = ?mapping.extractor_ids,
            "dispatch completed"
        );

        Ok(record)
    }

    async fn run(
        &self,
        extractors: &[Arc<dyn Strategy>],
        names: &[String],
        url: &str,
        content: &str,
    ) -> DispatchResult<ExtractionRecord> {
        match extractors {
            [] => Err(DispatchError::Configuration(
                "mapping has no extractor_ids".to_string(),
            )),
            [single] => single
                .extract(url, content, &ExtractOpts::default())
                .await
                .map_err(|e| DispatchError::AllStrategiesFailed(e.to_string())),
            many => {
                let composite = CompositeStrategy::new(format!("dispatch[{}]", names.join("+")), many.to_vec())
                    .with_merge_mode(MergeMode::Smart);
                composite
                    .extract(url, content, &ExtractOpts::default())
                    .await
                    .map_err(|e| DispatchError::AllStrategiesFailed(e.to_string()))
            }
        }
    }
}

fn merge_config(mapping_overrides: &Value, extra: &Value) -> Value {
    let mut merged = extra.as_object().cloned().unwrap_or_default();
    if let Some(overrides) = mapping_overrides.as_object() {
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{ExtractionMeta, Strategy, StrategyRegistry};
    use crate::types::url_configuration::NewUrlConfiguration;
    use crate::types::url_mapping::NewUrlMapping;
    use crate::types::{Category, StrategyMetadata};
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Strategy for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn extract(
            &self,
            url: &str,
            content: &str,
            _opts: &ExtractOpts,
        ) -> crate::error::StrategyResult<ExtractionRecord> {
            Ok(ExtractionRecord::new(
                json!({"content": content}),
                ExtractionMeta::new("echo", url),
            ))
        }
    }

    async fn setup() -> (
        Arc<UrlMappingStore>,
        Arc<UrlConfigurationStore>,
        Arc<StrategyFactory>,
        Arc<RateLimiter>,
    ) {
        let mapping_store = Arc::new(UrlMappingStore::in_memory().await.unwrap());
        let configuration_store = Arc::new(UrlConfigurationStore::in_memory().await.unwrap());
        let registry = Arc::new(StrategyRegistry::new());
        registry.register(
            StrategyMetadata::new("echo", "echoes content", Category::General, json!({}), json!({})),
            Box::new(|_config| Ok(Box::new(Echo) as Box<dyn Strategy>)),
        );
        let factory = Arc::new(StrategyFactory::new(registry));
        let limiter = Arc::new(RateLimiter::new());
        (mapping_store, configuration_store, factory, limiter)
    }

    fn sample_config() -> NewUrlConfiguration {
        NewUrlConfiguration {
            name: "Example".to_string(),
            description: None,
            url: "https://example.test/a".to_string(),
            profile_type: "general".to_string(),
            category: "general".to_string(),
            business_priority: 1,
            scraping_difficulty: None,
            has_official_api: false,
            api_pricing: None,
            recommendation: None,
            key_data_points: vec![],
            target_data: json!({}),
            rationale: None,
            cost_analysis: json!({}),
            business_value: None,
            compliance_notes: None,
            metadata: json!({}),
        }
    }

    #[tokio::test]
    async fn dispatches_to_mapped_strategy() {
        let (mapping_store, configuration_store, factory, limiter) = setup().await;
        let config = configuration_store.create(sample_config()).await.unwrap();
        mapping_store
            .create(NewUrlMapping {
                url_config_id: config.id,
                url: "https://example.test/a".to_string(),
                extractor_ids: vec!["echo".to_string()],
                rate_limit: 60,
                priority: 1,
                crawler_settings: json!({}),
                validation_rules: json!({}),
                metadata: json!({}),
                tags: vec![],
                notes: None,
                category: None,
            })
            .await
            .unwrap();

        let dispatcher = Dispatcher::new(mapping_store, configuration_store, factory, limiter);
        let record = dispatcher
            .dispatch("https://example.test/a", "hello", json!({}))
            .await
            .unwrap();
        assert_eq!(record.data["content"], "hello");
        assert_eq!(record.meta.extractors_used, vec!["echo".to_string()]);
        assert!(record.meta.mapping_id.is_some());
    }

    #[tokio::test]
    async fn unmapped_url_returns_not_found() {
        let (mapping_store, configuration_store, factory, limiter) = setup().await;
        let dispatcher = Dispatcher::new(mapping_store, configuration_store, factory, limiter);
        let result = dispatcher.dispatch("https://nope.test", "x", json!({})).await;
        assert!(matches!(result, Err(DispatchError::NotFound(_))));
    }

    #[tokio::test]
    async fn rate_limit_trips_after_threshold() {
        let (mapping_store, configuration_store, factory, limiter) = setup().await;
        let config = configuration_store.create(sample_config()).await.unwrap();
        mapping_store
            .create(NewUrlMapping {
                url_config_id: config.id,
                url: "https://example.test/b".to_string(),
                extractor_ids: vec!["echo".to_string()],
                rate_limit: 1,
                priority: 1,
                crawler_settings: json!({}),
                validation_rules: json!({}),
                metadata: json!({}),
                tags: vec![],
                notes: None,
                category: None,
            })
            .await
            .unwrap();

        let dispatcher = Dispatcher::new(mapping_store, configuration_store, factory, limiter);
        assert!(dispatcher
            .dispatch("https://example.test/b", "x", json!({}))
            .await
            .is_ok());
        let second = dispatcher
            .dispatch("https://example.test/b", "x", json!({}))
            .await;
        assert!(matches!(second, Err(DispatchError::RateLimitExceeded { .. })));
    }

    #[tokio::test]
    async fn missing_extractor_yields_configuration_not_not_found() {
        let (mapping_store, configuration_store, factory, limiter) = setup().await;
        let config = configuration_store.create(sample_config()).await.unwrap();
        mapping_store
            .create(NewUrlMapping {
                url_config_id: config.id,
                url: "https://example.test/c".to_string(),
                extractor_ids: vec!["DoesNotExist".to_string()],
                rate_limit: 60,
                priority: 1,
                crawler_settings: json!({}),
                validation_rules: json!({}),
                metadata: json!({}),
                tags: vec![],
                notes: None,
                category: None,
            })
            .await
            .unwrap();

        let dispatcher = Dispatcher::new(mapping_store, configuration_store, factory, limiter);
        let result = dispatcher.dispatch("https://example.test/c", "x", json!({})).await;
        assert!(matches!(result, Err(DispatchError::Configuration(_))));
    }
}
