//! Extraction endpoints: `/api/extract` dispatches through a persisted URL
//! mapping; `/api/test-url` runs a named extractor directly against ad-hoc
//! content without requiring a mapping to exist first, so a caller can try
//! an extractor before persisting a mapping for it.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::error::StrategyError;
use crate::strategy::builtins::build_client;
use crate::strategy::{ExtractOpts, ExtractionRecord, LlmExtractionStrategy, Strategy};
use crate::types::Category;

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub url: String,
    pub content: String,
    #[serde(default)]
    pub config: Value,
}

pub async fn extract(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractionRecord>, ApiError> {
    let record = state
        .dispatcher
        .dispatch(&request.url, &request.content, request.config)
        .await?;
    Ok(Json(record))
}

/// `POST /api/test-url` request body. `content` is the page body to
/// extract from — the caller fetches it, this service never crawls on its
/// own. `extractor_id` names a registered extractor to build directly; it
/// is optional — when omitted, `instruction` and `schema` must both be
/// supplied and the handler constructs an ad-hoc [`LlmExtractionStrategy`]
/// on the spot instead of resolving a name through the registry, to
/// quick-test a prompt before registering a real extractor.
#[derive(Debug, Deserialize)]
pub struct TestUrlRequest {
    pub url: String,
    #[serde(default)]
    pub content: String,
    pub extractor_id: Option<String>,
    #[serde(default)]
    pub llm_config: Value,
    pub instruction: Option<String>,
    pub schema: Option<Value>,
}

/// A failed extraction is reported as a normal 200 with `success: false`
/// rather than an HTTP error — trying out an extractor against sample
/// content is expected to fail sometimes, and that isn't itself a server
/// error.
#[derive(Debug, Serialize)]
pub struct TestUrlResponse {
    pub url: String,
    pub extractor_used: String,
    pub extraction_result: Option<Value>,
    pub metadata: Option<Value>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

pub async fn test_url(
    State(state): State<AppState>,
    Json(request): Json<TestUrlRequest>,
) -> Result<Json<TestUrlResponse>, ApiError> {
    let extractor_used = request
        .extractor_id
        .clone()
        .unwrap_or_else(|| "ad-hoc".to_string());

    let strategy: Box<dyn Strategy> = match &request.extractor_id {
        Some(extractor_id) => {
            let mut config = request.llm_config.as_object().cloned().unwrap_or_default();
            if let Some(schema) = &request.schema {
                config.insert("schema".to_string(), schema.clone());
            }
            if let Some(instruction) = &request.instruction {
                config.insert("instruction".to_string(), json!(instruction));
            }
            state.factory.create(extractor_id, &Value::Object(config))?
        }
        None => Box::new(build_adhoc_strategy(&request)?),
    };

    let outcome = strategy
        .extract(&request.url, &request.content, &ExtractOpts::default())
        .await;

    let response = match outcome {
        Ok(record) => TestUrlResponse {
            url: request.url,
            extractor_used,
            extraction_result: Some(record.data),
            metadata: Some(serde_json::to_value(&record.meta).unwrap_or(Value::Null)),
            success: true,
            error_message: None,
        },
        Err(e) => TestUrlResponse {
            url: request.url,
            extractor_used,
            extraction_result: None,
            metadata: None,
            success: false,
            error_message: Some(e.to_string()),
        },
    };

    Ok(Json(response))
}

/// Builds an unregistered `LlmExtractionStrategy` straight from the
/// request body when the caller doesn't name a registered `extractor_id`,
/// at which point `instruction` and `schema` are the only way to describe
/// what to extract. Not interned in the registry: this path exists for
/// one-off prompt trials, not for building something a `UrlMapping` could
/// name.
fn build_adhoc_strategy(request: &TestUrlRequest) -> Result<LlmExtractionStrategy, ApiError> {
    let instruction = request.instruction.as_deref().ok_or_else(|| {
        StrategyError::Configuration(
            "test-url requires either 'extractor_id' or both 'instruction' and 'schema'".to_string(),
        )
    })?;
    let schema = request.schema.clone().ok_or_else(|| {
        StrategyError::Configuration(
            "test-url requires either 'extractor_id' or both 'instruction' and 'schema'".to_string(),
        )
    })?;

    let resolved = build_client(&request.llm_config)?;
    let system_prompt = format!(
        "You are an expert extractor. Return JSON matching the provided schema. {instruction}"
    );

    Ok(LlmExtractionStrategy::new(
        "ad-hoc",
        Category::General,
        Arc::new(resolved.client),
        system_prompt,
        schema,
    )
    .with_provider(resolved.provider)
    .with_model(resolved.model))
}
