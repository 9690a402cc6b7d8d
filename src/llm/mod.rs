//! Abstract LLM client boundary.
//!
//! A small async trait that strategy code depends on, with a real
//! HTTP-backed implementation and a mock used throughout the test suite.
//! Transport-level failures surface as [`LlmError`] and are folded into
//! [`crate::error::StrategyError`] at the call site via `#[from]`, the same
//! layered-error shape `CoreError` itself uses one level up.

mod mock;
mod openai;

pub use mock::{MockCall, MockLlmClient};
pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("connection to LLM provider failed: {0}")]
    Connection(String),

    #[error("LLM provider responded with an error: {status} {detail}")]
    Response { status: u16, detail: String },

    #[error("LLM response was not valid JSON: {0}")]
    MalformedOutput(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// A single request to complete a prompt against a JSON schema the caller
/// expects the model to honor. `schema` is advisory: providers that support
/// structured output enforce it server-side, others rely on prompt framing.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub schema: Option<Value>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            schema: None,
            temperature: 0.0,
            max_tokens: 2048,
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    /// Raw text returned by the model. Strategy code is responsible for
    /// parsing this as JSON and validating it against the declared schema;
    /// the client itself makes no assumption about shape.
    pub text: String,
    pub model: String,
}

/// The boundary every extraction strategy talks to instead of a concrete
/// provider SDK. Swapping providers, or substituting [`MockLlmClient`] in
/// tests, never touches strategy code.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

pub type Result<T> = std::result::Result<T, LlmError>;

/// Providers are identified by a string tag (`"openai"`, `"openrouter"`,
/// ...). For OpenRouter the model id is prefixed `openrouter/<name>` if
/// not already.
pub fn normalize_model(provider: &str, model: &str) -> String {
    if provider.eq_ignore_ascii_case("openrouter") && !model.starts_with("openrouter/") {
        format!("openrouter/{model}")
    } else {
        model.to_string()
    }
}

/// Default API base URL per provider tag; any OpenAI-compatible endpoint
/// can still be targeted explicitly via a `base_url` config field.
pub fn default_base_url(provider: &str) -> &'static str {
    match provider.to_lowercase().as_str() {
        "openrouter" => "https://openrouter.ai/api/v1",
        _ => "https://api.openai.com/v1",
    }
}
