//! HTTP error mapping.
//!
//! Follows riptide-api's `ApiError: IntoResponse` convention — map each
//! error kind to a status code and return a flat JSON body — while keeping
//! the underlying error taxonomy ([`crate::error::CoreError`]) as its own
//! layered-`thiserror` shape.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::error::{CoreError, DispatchError, StoreError, StrategyError};
use crate::llm::LlmError;

pub struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        ApiError(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError(CoreError::Store(e))
    }
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        ApiError(CoreError::Dispatch(e))
    }
}

impl From<StrategyError> for ApiError {
    fn from(e: StrategyError) -> Self {
        ApiError(CoreError::Strategy(e))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
    error_code: &'static str,
    timestamp: String,
}

impl ApiError {
    /// NotFound→404, Duplicate→409, Validation→422, RateLimitExceeded→429,
    /// Configuration→500, APIConnection/APIResponse→502,
    /// ContentParsing→422, Timeout→504, Database→500.
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            CoreError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            CoreError::Dispatch(DispatchError::NotFound(_)) => StatusCode::NOT_FOUND,
            CoreError::Store(StoreError::Duplicate(_)) => StatusCode::CONFLICT,
            CoreError::Store(StoreError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::Dispatch(DispatchError::RateLimitExceeded { .. }) => StatusCode::TOO_MANY_REQUESTS,
            CoreError::Dispatch(DispatchError::Configuration(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            CoreError::Dispatch(DispatchError::AllStrategiesFailed(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::Strategy(StrategyError::Configuration(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            CoreError::Strategy(StrategyError::Validation { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::Strategy(StrategyError::ContentParsing(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::Strategy(StrategyError::Llm(LlmError::Timeout(_))) => StatusCode::GATEWAY_TIMEOUT,
            CoreError::Strategy(StrategyError::Llm(LlmError::Connection(_))) => StatusCode::BAD_GATEWAY,
            CoreError::Strategy(StrategyError::Llm(LlmError::Response { .. })) => StatusCode::BAD_GATEWAY,
            CoreError::Strategy(StrategyError::Llm(LlmError::MalformedOutput(_))) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            CoreError::Store(StoreError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.0.error_code();
        let detail = self.0.to_string();

        if status.is_server_error() {
            tracing::error!(error_code, %detail, "request failed");
        } else {
            tracing::warn!(error_code, %detail, "request rejected");
        }

        let body = ErrorBody {
            detail,
            error_code,
            timestamp: Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}
