//! End-to-end scenarios wiring the registry, combinators, stores, and
//! dispatcher together, the way a caller of this crate actually would.

use std::sync::Arc;

use async_trait::async_trait;
use extraction_orchestrator::error::StrategyResult;
use extraction_orchestrator::strategy::composite::{CompositeStrategy, MergeMode, PriorityFields};
use extraction_orchestrator::strategy::sequential::SequentialStrategy;
use extraction_orchestrator::strategy::url_mapping::UrlMappingStrategy;
use extraction_orchestrator::strategy::{ExtractOpts, ExtractionMeta, ExtractionRecord, Strategy, StrategyFactory, StrategyRegistry};
use extraction_orchestrator::stores::{UrlConfigurationStore, UrlMappingStore};
use extraction_orchestrator::types::url_mapping::NewUrlMapping;
use extraction_orchestrator::types::{Category, StrategyMetadata};
use extraction_orchestrator::Dispatcher;
use extraction_orchestrator::dispatch::RateLimiter;
use serde_json::json;

/// A strategy stub that returns a fixed data blob, tagging its own name
/// into the metadata so merges can be asserted against.
struct Fixed {
    name: &'static str,
    category: Category,
    data: serde_json::Value,
    fail: bool,
}

impl Fixed {
    fn new(name: &'static str, data: serde_json::Value, fail: bool) -> Self {
        Self { name, category: Category::General, data, fail }
    }
}

#[async_trait]
impl Strategy for Fixed {
    fn name(&self) -> &str {
        self.name
    }

    fn category(&self) -> Category {
        self.category
    }

    async fn extract(&self, url: &str, _content: &str, _opts: &ExtractOpts) -> StrategyResult<ExtractionRecord> {
        if self.fail {
            return Err(extraction_orchestrator::error::StrategyError::Configuration(
                format!("{} always fails", self.name),
            ));
        }
        Ok(ExtractionRecord::new(self.data.clone(), ExtractionMeta::new(self.name, url)))
    }
}

/// A strategy that echoes `previous_results` back as a `seen_previous`
/// field, so sequential threading can be asserted against.
struct SeesPrevious {
    name: &'static str,
}

#[async_trait]
impl Strategy for SeesPrevious {
    fn name(&self) -> &str {
        self.name
    }

    async fn extract(&self, url: &str, _content: &str, opts: &ExtractOpts) -> StrategyResult<ExtractionRecord> {
        let mut data = serde_json::Map::new();
        data.insert("seen_previous".to_string(), json!(opts.previous_results.is_some()));
        data.insert("added_by".to_string(), json!(self.name));
        Ok(ExtractionRecord::new(
            serde_json::Value::Object(data),
            ExtractionMeta::new(self.name, url),
        ))
    }
}

#[tokio::test]
async fn single_strategy_happy_path_through_registry_and_factory() {
    let registry = StrategyRegistry::new();
    registry.register(
        StrategyMetadata::new("echo", "echoes content", Category::General, json!({}), json!({})),
        Box::new(|_config| {
            Ok(Box::new(Fixed::new("echo", json!({"ok": true}), false)) as Box<dyn Strategy>)
        }),
    );
    let factory = StrategyFactory::new(Arc::new(registry));

    let strategy = factory.create("echo", &json!({})).unwrap();
    let record = strategy.extract("https://example.test", "content", &ExtractOpts::default()).await.unwrap();

    assert_eq!(record.data["ok"], true);
    assert_eq!(record.meta.strategy, "echo");
}

#[tokio::test]
async fn composite_smart_merge_survives_one_sub_strategy_failure() {
    let crypto: Arc<dyn Strategy> = Arc::new(Fixed {
        name: "crypto",
        category: Category::Crypto,
        data: json!({"headline": "BTC rallies", "cryptocurrencies": ["BTC"]}),
        fail: false,
    });
    let news: Arc<dyn Strategy> = Arc::new(Fixed {
        name: "news",
        category: Category::News,
        data: json!({"headline": "ignored", "summary": "market wrap"}),
        fail: false,
    });
    // Also declared `Crypto` so the composite's category-based selection
    // (matched against the real `Category`, not a name substring) picks it
    // alongside `crypto` rather than filtering it out before it ever runs.
    let broken: Arc<dyn Strategy> = Arc::new(Fixed {
        name: "crypto_broken",
        category: Category::Crypto,
        data: json!({}),
        fail: true,
    });

    let mut priority_fields: PriorityFields = PriorityFields::new();
    priority_fields.insert("crypto".to_string(), vec!["headline".to_string()]);

    let composite = CompositeStrategy::new("composite", vec![crypto, news, broken])
        .with_merge_mode(MergeMode::Smart)
        .with_priority_fields(priority_fields);

    // Content scores above the 0.2 threshold for both `news` and `crypto`
    // keywords, so all three sub-strategies (two `Crypto`, one `News`) clear
    // selection; `broken`'s failure must not sink the whole call.
    let content = "Breaking news update: officials announced Bitcoin and blockchain crypto prices surged today.";
    let record = composite.extract("https://example.test/crypto", content, &ExtractOpts::default()).await.unwrap();

    // crypto owns "headline" per priority_fields, so its value wins over news's.
    assert_eq!(record.data["headline"], "BTC rallies");
    assert_eq!(record.data["summary"], "market wrap");
    assert_eq!(record.meta.failed_strategies, 1);
    assert!(record.meta.successful_strategies.contains(&"crypto".to_string()));
    assert!(record.meta.successful_strategies.contains(&"news".to_string()));
}

#[tokio::test]
async fn composite_all_sub_strategies_failing_is_an_error() {
    let broken_a: Arc<dyn Strategy> = Arc::new(Fixed::new("a", json!({}), true));
    let broken_b: Arc<dyn Strategy> = Arc::new(Fixed::new("b", json!({}), true));
    let composite = CompositeStrategy::new("composite", vec![broken_a, broken_b]);

    let result = composite.extract("https://example.test", "irrelevant content", &ExtractOpts::default()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn sequential_pipeline_threads_previous_results_after_first_step() {
    let steps: Vec<Arc<dyn Strategy>> = vec![
        Arc::new(SeesPrevious { name: "step1" }),
        Arc::new(SeesPrevious { name: "step2" }),
    ];
    let pipeline = SequentialStrategy::new("pipeline", steps);

    let record = pipeline.extract("https://example.test", "content", &ExtractOpts::default()).await.unwrap();

    // step1 runs first with no accumulator yet, so it sees no previous
    // results; step2 runs after step1 has populated the accumulator.
    assert_eq!(record.data["seen_previous"], true);
    assert_eq!(record.data["added_by"], "step2");
    assert_eq!(record.meta.steps.len(), 2);
}

#[tokio::test]
async fn url_mapping_combinator_prefers_domain_match_over_fallback() {
    let matched: Arc<dyn Strategy> = Arc::new(Fixed::new("matched", json!({"via": "domain"}), false));
    let fallback: Arc<dyn Strategy> = Arc::new(Fixed::new("fallback", json!({"via": "fallback"}), false));

    let router = UrlMappingStrategy::new("router").with_fallback(fallback).add_mapping(
        extraction_orchestrator::strategy::url_mapping::UrlMatcher::domain("example.test", false),
        matched,
        10,
    );

    let on_domain = router.extract("https://example.test/page", "x", &ExtractOpts::default()).await.unwrap();
    assert_eq!(on_domain.data["via"], "domain");

    let off_domain = router.extract("https://other.test/page", "x", &ExtractOpts::default()).await.unwrap();
    assert_eq!(off_domain.data["via"], "fallback");
}

#[tokio::test]
async fn dispatcher_routes_by_persisted_mapping_and_enforces_its_rate_limit() {
    let mapping_store = Arc::new(UrlMappingStore::in_memory().await.unwrap());
    let configuration_store = Arc::new(UrlConfigurationStore::in_memory().await.unwrap());
    let registry = Arc::new(StrategyRegistry::new());
    registry.register(
        StrategyMetadata::new("echo", "echoes content", Category::General, json!({}), json!({})),
        Box::new(|_config| {
            Ok(Box::new(Fixed::new("echo", json!({"ok": true}), false)) as Box<dyn Strategy>)
        }),
    );
    let factory = Arc::new(StrategyFactory::new(registry));
    let limiter = Arc::new(RateLimiter::new());

    let config = configuration_store
        .create(extraction_orchestrator::types::url_configuration::NewUrlConfiguration {
            name: "News".to_string(),
            description: None,
            url: "https://news.test".to_string(),
            profile_type: "news".to_string(),
            category: "news".to_string(),
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
        })
        .await
        .unwrap();

    mapping_store
        .create(NewUrlMapping {
            url_config_id: config.id,
            url: "https://news.test/a".to_string(),
            extractor_ids: vec!["echo".to_string()],
            rate_limit: 1,
            priority: 0,
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

    let first = dispatcher.dispatch("https://news.test/a", "content", json!({})).await;
    assert!(first.is_ok());

    let second = dispatcher.dispatch("https://news.test/a", "content", json!({})).await;
    assert!(second.is_err());

    let unmapped = dispatcher.dispatch("https://news.test/unmapped", "content", json!({})).await;
    assert!(unmapped.is_err());
}

#[tokio::test]
async fn url_configuration_store_round_trips_through_create_update_list() {
    let store = UrlConfigurationStore::in_memory().await.unwrap();

    let created = store
        .create(extraction_orchestrator::types::url_configuration::NewUrlConfiguration {
            name: "Example News Site".to_string(),
            description: Some("a news outlet".to_string()),
            url: "https://news.test".to_string(),
            profile_type: "news".to_string(),
            category: "news".to_string(),
            business_priority: 5,
            scraping_difficulty: Some("easy".to_string()),
            has_official_api: false,
            api_pricing: None,
            recommendation: Some("scrape directly".to_string()),
            key_data_points: vec!["headline".to_string()],
            target_data: json!({}),
            rationale: None,
            cost_analysis: json!({}),
            business_value: None,
            compliance_notes: None,
            metadata: json!({}),
        })
        .await
        .unwrap();

    assert_eq!(created.category, "news");

    let fetched = store.get_by_url("https://news.test").await.unwrap().unwrap();
    assert_eq!(fetched.id, created.id);

    let updated = store
        .update(
            created.id,
            extraction_orchestrator::types::url_configuration::UrlConfigurationUpdate {
                business_priority: Some(9),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.business_priority, 9);
    assert_eq!(updated.name, "Example News Site");

    let listed = store.list(Some("news"), true).await.unwrap();
    assert_eq!(listed.len(), 1);
}
