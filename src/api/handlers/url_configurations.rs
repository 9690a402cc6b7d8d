use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::error::CoreError;
use crate::types::url_configuration::{NewUrlConfiguration, UrlConfigurationUpdate};
use crate::types::UrlConfiguration;

use super::{apply_sort_order, validate_listing};

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    category: Option<String>,
    #[serde(default)]
    active_only: bool,
    limit: Option<i64>,
    skip: Option<i64>,
    sort_order: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<UrlConfiguration>>, ApiError> {
    validate_listing(query.limit, query.skip, query.sort_order.as_deref())?;
    let configs = state
        .url_configuration_store
        .list(query.category.as_deref(), query.active_only)
        .await?;
    let configs = apply_sort_order(configs, query.sort_order.as_deref());
    Ok(Json(paginate(configs, query.limit, query.skip)))
}

fn paginate(
    mut items: Vec<UrlConfiguration>,
    limit: Option<i64>,
    skip: Option<i64>,
) -> Vec<UrlConfiguration> {
    let skip = skip.unwrap_or(0).max(0) as usize;
    if skip >= items.len() {
        return Vec::new();
    }
    items = items.split_off(skip);
    if let Some(limit) = limit {
        items.truncate(limit.max(0) as usize);
    }
    items
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UrlConfiguration>, ApiError> {
    let config = state
        .url_configuration_store
        .get(id)
        .await?
        .ok_or_else(|| crate::error::StoreError::NotFound(format!("url_configuration {id}")))?;
    Ok(Json(config))
}

pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<NewUrlConfiguration>,
) -> Result<(axum::http::StatusCode, Json<UrlConfiguration>), ApiError> {
    if input.url.trim().is_empty() {
        return Err(CoreError::Validation("url must not be empty".to_string()).into());
    }
    let created = state.url_configuration_store.create(input).await?;
    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UrlConfigurationUpdate>,
) -> Result<Json<UrlConfiguration>, ApiError> {
    if matches!(&input.url, Some(url) if url.trim().is_empty()) {
        return Err(CoreError::Validation("url must not be empty".to_string()).into());
    }
    let updated = state.url_configuration_store.update(id, input).await?;
    Ok(Json(updated))
}

/// Deleting a configuration cascades to every mapping that points at it —
/// the two tables live in separate SQLite files, so this is two statements
/// rather than one cross-database transaction.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<axum::http::StatusCode, ApiError> {
    state.url_configuration_store.delete(id).await?;
    state.url_mapping_store.delete_by_url_config_id(id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
