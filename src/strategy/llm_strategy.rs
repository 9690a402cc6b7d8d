//! LLM extraction strategy.
//!
//! The leaf strategy every category-specific extractor (crypto, news,
//! financial, ...) is built from; the category-specific variants differ
//! from each other only in their prompt and schema, not in control flow.
//! Prompt construction, retry-with-backoff, response parsing, and
//! structured-output validation are handled once here rather than
//! duplicated per category.

use std::time::Duration;

use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde_json::Value;

use crate::error::{StrategyError, StrategyResult};
use crate::llm::{CompletionRequest, LlmClient, LlmError};
use crate::types::Category;

use super::{ExtractOpts, ExtractionMeta, ExtractionRecord, Strategy};

/// Default truncation bound for user content injected into the prompt.
/// Measured in characters, not tokens — this crate has no tokenizer
/// dependency, and a character bound is a conservative proxy.
const DEFAULT_MAX_INPUT_CHARS: usize = 12_000;

/// Cap on the exponential backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truncation {
    Head,
    Tail,
}

#[derive(Clone)]
pub struct LlmExtractionStrategy {
    name: String,
    category: Category,
    llm: std::sync::Arc<dyn LlmClient>,
    provider: String,
    model: String,
    system_prompt: String,
    output_schema: Value,
    max_retries: u32,
    retry_delay: Duration,
    timeout: Duration,
    max_input_chars: usize,
    truncation: Truncation,
}

impl LlmExtractionStrategy {
    pub fn new(
        name: impl Into<String>,
        category: Category,
        llm: std::sync::Arc<dyn LlmClient>,
        system_prompt: impl Into<String>,
        output_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            llm,
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            system_prompt: system_prompt.into(),
            output_schema,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            truncation: Truncation::Head,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    pub fn with_truncation(mut self, truncation: Truncation) -> Self {
        self.truncation = truncation;
        self
    }

    /// Deterministic truncation from the configured end (defaults to the
    /// head).
    fn truncate<'a>(&self, content: &'a str) -> &'a str {
        if content.len() <= self.max_input_chars {
            return content;
        }
        match self.truncation {
            Truncation::Head => {
                let mut end = self.max_input_chars;
                while !content.is_char_boundary(end) {
                    end -= 1;
                }
                &content[..end]
            }
            Truncation::Tail => {
                let mut start = content.len() - self.max_input_chars;
                while !content.is_char_boundary(start) {
                    start += 1;
                }
                &content[start..]
            }
        }
    }

    fn user_prompt(&self, url: &str, content: &str, opts: &ExtractOpts) -> String {
        let bounded = self.truncate(content);
        let mut prompt = format!("URL: {url}\n\nContent:\n{bounded}");
        if let Some(previous) = &opts.previous_results {
            prompt.push_str(&format!(
                "\n\nPreviously extracted fields (extend, don't contradict unless content clearly corrects them):\n{previous}"
            ));
        }
        prompt
    }

    fn validate(&self, candidate: &Value) -> StrategyResult<()> {
        let compiled = JSONSchema::compile(&self.output_schema).map_err(|e| {
            StrategyError::Configuration(format!("invalid output_schema for '{}': {e}", self.name))
        })?;
        if let Err(errors) = compiled.validate(candidate) {
            let detail = errors
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(StrategyError::Validation {
                path: self.name.clone(),
                detail,
            });
        }
        Ok(())
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let scaled = self.retry_delay.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
        scaled.min(MAX_BACKOFF)
    }
}

/// Parse a JSON object from `text`, unwrapping a fenced code block
/// (```` ```json ... ``` ````or plain ```` ``` ... ``` ````) first if the
/// raw text isn't itself valid JSON.
fn parse_json_response(text: &str) -> StrategyResult<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    if let Some(unfenced) = unwrap_fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(unfenced.trim()) {
            return Ok(value);
        }
    }

    Err(StrategyError::ContentParsing(format!(
        "LLM response was not valid JSON even after unwrapping fenced blocks: {trimmed}"
    )))
}

fn unwrap_fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_open = &text[start + 3..];
    // Skip an optional language tag on the opening fence line (e.g. `json`).
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

#[async_trait]
impl Strategy for LlmExtractionStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Category {
        self.category
    }

    async fn extract(
        &self,
        url: &str,
        content: &str,
        opts: &ExtractOpts,
    ) -> StrategyResult<ExtractionRecord> {
        let request = CompletionRequest::new(self.system_prompt.clone(), self.user_prompt(url, content, opts))
            .with_schema(self.output_schema.clone());

        let mut attempt = 0;
        let data = loop {
            let outcome = tokio::time::timeout(self.timeout, self.llm.complete(request.clone())).await;

            let result = match outcome {
                Ok(inner) => inner.map_err(StrategyError::from),
                Err(_) => Err(StrategyError::from(LlmError::Timeout(self.timeout))),
            };

            match result {
                Ok(response) => break parse_json_response(&response.text).and_then(|parsed| {
                    self.validate(&parsed)?;
                    Ok(parsed)
                })?,
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.backoff_delay(attempt);
                    tracing::warn!(strategy = %self.name, attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying after transient LLM failure");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }
        };

        let mut meta = ExtractionMeta::new(self.name.clone(), url);
        meta.content_types = vec![self.category.to_string()];
        meta.provider = Some(self.provider.clone());
        meta.model = Some(self.model.clone());
        Ok(ExtractionRecord::new(data, meta))
    }
}
