//! Deterministic [`LlmClient`] for tests: canned responses keyed by a
//! lookup string, plus call tracking so tests can assert on what was asked
//! of the client.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Result};

#[derive(Debug, Clone)]
pub struct MockCall {
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Mock client. Responses are looked up by exact match on `user_prompt`;
/// `default_response` covers anything else. Set `fail_next` to force the
/// next `complete()` call to return an error, useful for exercising
/// per-strategy failure isolation in composite-strategy tests.
#[derive(Default)]
pub struct MockLlmClient {
    responses: RwLock<HashMap<String, String>>,
    default_response: RwLock<Option<String>>,
    fail_next: RwLock<Option<LlmErrorKind>>,
    calls: RwLock<Vec<MockCall>>,
}

#[derive(Debug, Clone, Copy)]
enum LlmErrorKind {
    Connection,
    MalformedOutput,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, user_prompt: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses
            .write()
            .unwrap()
            .insert(user_prompt.into(), response.into());
        self
    }

    pub fn with_default_response(self, response: impl Into<String>) -> Self {
        *self.default_response.write().unwrap() = Some(response.into());
        self
    }

    pub fn fail_next_with_connection_error(&self) {
        *self.fail_next.write().unwrap() = Some(LlmErrorKind::Connection);
    }

    pub fn fail_next_with_malformed_output(&self) {
        *self.fail_next.write().unwrap() = Some(LlmErrorKind::MalformedOutput);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.calls.write().unwrap().push(MockCall {
            system_prompt: request.system_prompt.clone(),
            user_prompt: request.user_prompt.clone(),
        });

        if let Some(kind) = self.fail_next.write().unwrap().take() {
            return match kind {
                LlmErrorKind::Connection => {
                    Err(LlmError::Connection("mock connection failure".to_string()))
                }
                LlmErrorKind::MalformedOutput => Err(LlmError::MalformedOutput(
                    "mock malformed output".to_string(),
                )),
            };
        }

        let text = self
            .responses
            .read()
            .unwrap()
            .get(&request.user_prompt)
            .cloned()
            .or_else(|| self.default_response.read().unwrap().clone())
            .unwrap_or_else(|| "{}".to_string());

        Ok(CompletionResponse {
            text,
            model: "mock".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_canned_response_for_matching_prompt() {
        let client = MockLlmClient::new().with_response("hello", "{\"ok\":true}");
        let resp = client
            .complete(CompletionRequest::new("sys", "hello"))
            .await
            .unwrap();
        assert_eq!(resp.text, "{\"ok\":true}");
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_default_response() {
        let client = MockLlmClient::new().with_default_response("{\"fallback\":1}");
        let resp = client
            .complete(CompletionRequest::new("sys", "anything"))
            .await
            .unwrap();
        assert_eq!(resp.text, "{\"fallback\":1}");
    }

    #[tokio::test]
    async fn fail_next_forces_a_single_error() {
        let client = MockLlmClient::new().with_default_response("{}");
        client.fail_next_with_connection_error();
        let first = client.complete(CompletionRequest::new("s", "u")).await;
        assert!(first.is_err());
        let second = client.complete(CompletionRequest::new("s", "u")).await;
        assert!(second.is_ok());
    }
}
