//! Shared application state handed to every handler, grounded in
//! riptide-api's `AppState` pattern.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::dispatch::{Dispatcher, RateLimiter};
use crate::stores::{UrlConfigurationStore, UrlMappingStore};
use crate::strategy::{StrategyFactory, StrategyRegistry};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub url_configuration_store: Arc<UrlConfigurationStore>,
    pub url_mapping_store: Arc<UrlMappingStore>,
    pub registry: Arc<StrategyRegistry>,
    pub factory: Arc<StrategyFactory>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        url_configuration_store: UrlConfigurationStore,
        url_mapping_store: UrlMappingStore,
    ) -> Self {
        let registry = Arc::new(StrategyRegistry::new());
        crate::strategy::builtins::register_all(&registry);
        let factory = Arc::new(StrategyFactory::new(registry.clone()));
        let url_mapping_store = Arc::new(url_mapping_store);
        let url_configuration_store = Arc::new(url_configuration_store);
        let rate_limiter = Arc::new(RateLimiter::new());
        let dispatcher = Arc::new(Dispatcher::new(
            url_mapping_store.clone(),
            url_configuration_store.clone(),
            factory.clone(),
            rate_limiter,
        ));

        Self {
            config: Arc::new(config),
            url_configuration_store,
            url_mapping_store,
            registry,
            factory,
            dispatcher,
        }
    }
}
