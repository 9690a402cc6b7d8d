//! Typed errors for the extraction orchestrator.
//!
//! One `thiserror` enum per subsystem, composed into [`CoreError`] at the
//! boundary the HTTP API sits behind. Each variant maps to exactly one kind
//! in the error taxonomy (NotFound, Duplicate, Validation,
//! RateLimitExceeded, Configuration, APIConnection, APIResponse,
//! ContentParsing, Timeout, Database).

use thiserror::Error;

use crate::llm::LlmError;

/// Errors raised while constructing or running a [`crate::strategy::Strategy`].
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("failed to parse LLM output: {0}")]
    ContentParsing(String),

    #[error("output failed schema validation at {path}: {detail}")]
    Validation { path: String, detail: String },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl StrategyError {
    /// Transport-level failures and 429s are worth a retry; a non-429 4xx
    /// or malformed/invalid output is not (retrying won't make the
    /// model's prior answer valid).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StrategyError::Llm(LlmError::Connection(_))
                | StrategyError::Llm(LlmError::Timeout(_))
                | StrategyError::Llm(LlmError::Response { status: 429, .. })
                | StrategyError::Llm(LlmError::Response { status: 500..=599, .. })
        )
    }
}

/// Errors raised by the persistent stores (H/I).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("invalid input: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Errors raised by the resolver/dispatcher (J).
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("all extraction strategies failed: {0}")]
    AllStrategiesFailed(String),
}

/// Top-level error used by the HTTP API layer to pick a status code.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("invalid request: {0}")]
    Validation(String),
}

impl CoreError {
    /// Stable machine-readable error code, mirrors the `error_code` field
    /// in every non-204 HTTP response.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::Strategy(StrategyError::Llm(LlmError::Connection(_))) => "APIConnection",
            CoreError::Strategy(StrategyError::Llm(LlmError::Response { .. })) => "APIResponse",
            CoreError::Strategy(StrategyError::Llm(LlmError::MalformedOutput(_))) => {
                "ContentParsing"
            }
            CoreError::Strategy(StrategyError::Llm(LlmError::Timeout(_))) => "Timeout",
            CoreError::Strategy(StrategyError::ContentParsing(_)) => "ContentParsing",
            CoreError::Strategy(StrategyError::Validation { .. }) => "Validation",
            CoreError::Strategy(StrategyError::Configuration(_)) => "Configuration",
            CoreError::Store(StoreError::NotFound(_)) => "NotFound",
            CoreError::Store(StoreError::Duplicate(_)) => "Duplicate",
            CoreError::Store(StoreError::Database(_)) => "Database",
            CoreError::Store(StoreError::Validation(_)) => "Validation",
            CoreError::Dispatch(DispatchError::NotFound(_)) => "NotFound",
            CoreError::Dispatch(DispatchError::RateLimitExceeded { .. }) => "RateLimitExceeded",
            CoreError::Dispatch(DispatchError::Configuration(_)) => "Configuration",
            CoreError::Dispatch(DispatchError::AllStrategiesFailed(_)) => "ContentParsing",
            CoreError::Validation(_) => "Validation",
        }
    }
}

pub type StrategyResult<T> = std::result::Result<T, StrategyError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
pub type Result<T> = std::result::Result<T, CoreError>;
