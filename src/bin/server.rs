//! Binary entry point: loads configuration, opens the SQLite stores, and
//! serves the HTTP API. Tracing setup follows riptide-api's main: an
//! `EnvFilter` built from `RUST_LOG`/`LOG_LEVEL`, `tracing_subscriber::fmt`.

use std::net::SocketAddr;

use extraction_orchestrator::api::build_router;
use extraction_orchestrator::api::state::AppState;
use extraction_orchestrator::config::AppConfig;
use extraction_orchestrator::stores::{UrlConfigurationStore, UrlMappingStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_lowercase()));
    fmt().with_env_filter(filter).init();

    tracing::info!(bind_addr = %config.bind_addr, database_url = %config.database_url, "starting extraction orchestrator");

    let url_configuration_store = UrlConfigurationStore::new(&config.database_url).await?;
    let url_mapping_store = UrlMappingStore::new(&config.mappings_database_url()).await?;

    let bind_addr: SocketAddr = config.bind_addr;
    let state = AppState::new(config, url_configuration_store, url_mapping_store);

    let cors = CorsLayer::permissive();
    let app = build_router(state).layer(cors).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(%bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
