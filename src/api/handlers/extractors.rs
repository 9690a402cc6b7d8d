//! Extractor (= strategy) introspection endpoints, plus a `reload`
//! operation that re-runs the compiled-in registration functions rather
//! than reloading strategy source from disk — strategies are compiled in,
//! not loaded from a file.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::errors::ApiError;
use crate::api::state::AppState;

/// `GET /api/extractors` row shape: `{id,name,description,schema,file_path}`.
/// `id` and `name` are the same value (the registry key) since this crate
/// has no separate surrogate key for a strategy; `file_path` is `None` —
/// strategies are compiled in, not loaded from a file.
#[derive(Debug, Serialize)]
pub struct ExtractorSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: &'static str,
    pub schema: Value,
    pub file_path: Option<String>,
}

pub async fn list_extractors(State(state): State<AppState>) -> Json<Vec<ExtractorSummary>> {
    let metadata = state.registry.get_all_metadata();
    Json(
        metadata
            .into_iter()
            .map(|m| ExtractorSummary {
                id: m.name.clone(),
                name: m.name,
                description: m.description,
                category: m.category.as_str(),
                schema: m.output_schema,
                file_path: None,
            })
            .collect(),
    )
}

pub async fn get_extractor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let metadata = state
        .registry
        .get_metadata(&id)
        .ok_or_else(|| crate::error::DispatchError::NotFound(format!("extractor '{id}'")))?;

    Ok(Json(json!({
        "id": metadata.name,
        "name": metadata.name,
        "description": metadata.description,
        "category": metadata.category.as_str(),
        "schema": metadata.output_schema,
        "config_schema": metadata.config_schema,
        "file_path": Value::Null,
    })))
}

pub async fn reload_extractors(State(state): State<AppState>) -> Json<Value> {
    state.registry.reload();
    Json(json!({ "registered_strategies": state.registry.len() }))
}
