use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::api::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "registered_strategies": state.registry.len(),
    }))
}
