use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::error::CoreError;
use crate::types::url_mapping::{NewUrlMapping, UrlMappingUpdate};
use crate::types::UrlMapping;

use super::{apply_sort_order, validate_listing};

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    #[serde(default)]
    active_only: bool,
    limit: Option<i64>,
    skip: Option<i64>,
    sort_order: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<UrlMapping>>, ApiError> {
    validate_listing(query.limit, query.skip, query.sort_order.as_deref())?;
    let mappings = state.url_mapping_store.list(query.active_only).await?;
    let mappings = apply_sort_order(mappings, query.sort_order.as_deref());
    Ok(Json(paginate(mappings, query.limit, query.skip)))
}

fn paginate(mut items: Vec<UrlMapping>, limit: Option<i64>, skip: Option<i64>) -> Vec<UrlMapping> {
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
) -> Result<Json<UrlMapping>, ApiError> {
    let mapping = state
        .url_mapping_store
        .get(id)
        .await?
        .ok_or_else(|| crate::error::StoreError::NotFound(format!("url_mapping {id}")))?;
    Ok(Json(mapping))
}

pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<NewUrlMapping>,
) -> Result<(axum::http::StatusCode, Json<UrlMapping>), ApiError> {
    if input.extractor_ids.is_empty() {
        return Err(CoreError::Validation("extractor_ids must be non-empty".to_string()).into());
    }
    if state
        .url_configuration_store
        .get(input.url_config_id)
        .await?
        .is_none()
    {
        return Err(crate::error::StoreError::NotFound(format!(
            "url_configuration {}",
            input.url_config_id
        ))
        .into());
    }
    let created = state.url_mapping_store.create(input).await?;
    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UrlMappingUpdate>,
) -> Result<Json<UrlMapping>, ApiError> {
    let updated = state.url_mapping_store.update(id, input).await?;
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<axum::http::StatusCode, ApiError> {
    state.url_mapping_store.delete(id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

pub async fn by_extractor(
    State(state): State<AppState>,
    Path(extractor_id): Path<String>,
) -> Result<Json<Vec<UrlMapping>>, ApiError> {
    let mappings = state.url_mapping_store.list_by_extractor(&extractor_id).await?;
    Ok(Json(mappings))
}

pub async fn by_url_config(
    State(state): State<AppState>,
    Path(url_config_id): Path<Uuid>,
) -> Result<Json<Vec<UrlMapping>>, ApiError> {
    let mappings = state
        .url_mapping_store
        .list_by_url_config(url_config_id)
        .await?;
    Ok(Json(mappings))
}

#[derive(Debug, Deserialize)]
pub struct BulkStatusRequest {
    pub mapping_ids: Vec<Uuid>,
    pub is_active: bool,
}

/// `PATCH /url-mappings/bulk-status`: at most 100 items per request.
pub async fn bulk_status(
    State(state): State<AppState>,
    Json(request): Json<BulkStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.mapping_ids.is_empty() || request.mapping_ids.len() > 100 {
        return Err(CoreError::Validation(
            "mapping_ids must contain between 1 and 100 entries".to_string(),
        )
        .into());
    }
    let updated = state
        .url_mapping_store
        .bulk_set_active(&request.mapping_ids, request.is_active)
        .await?;
    Ok(Json(json!({ "updated": updated })))
}
