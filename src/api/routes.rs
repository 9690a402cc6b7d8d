use axum::routing::{get, patch, post};
use axum::Router;

use super::handlers::{extract, extractors, health, url_configurations, url_mappings};
use super::state::AppState;

/// All routes sit under `/api`.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::health))
        .route("/extract", post(extract::extract))
        .route("/test-url", post(extract::test_url))
        .route("/extractors", get(extractors::list_extractors))
        .route("/extractors/reload", post(extractors::reload_extractors))
        .route("/extractors/:id", get(extractors::get_extractor))
        .route(
            "/url-configurations",
            get(url_configurations::list).post(url_configurations::create),
        )
        .route(
            "/url-configurations/:id",
            get(url_configurations::get)
                .put(url_configurations::update)
                .delete(url_configurations::delete),
        )
        .route(
            "/url-mappings",
            get(url_mappings::list).post(url_mappings::create),
        )
        .route(
            "/url-mappings/bulk-status",
            patch(url_mappings::bulk_status),
        )
        .route(
            "/url-mappings/by-extractor/:extractor_id",
            get(url_mappings::by_extractor),
        )
        .route(
            "/url-mappings/by-url-config/:url_config_id",
            get(url_mappings::by_url_config),
        )
        .route(
            "/url-mappings/:id",
            get(url_mappings::get)
                .put(url_mappings::update)
                .delete(url_mappings::delete),
        );

    Router::new().nest("/api", api).with_state(state)
}
