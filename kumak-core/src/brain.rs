//! Brain module — LLM provider abstraction.
//!
//! Defines the `LlmProvider` trait for model-agnostic LLM interactions and a
//! scripted `MockLlmProvider` for tests and offline development.

use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, Content, Message, Role, TokenUsage};
use async_trait::async_trait;
use std::sync::Mutex;

/// Trait for LLM providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Perform a full completion and return the response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Return the model name.
    fn model_name(&self) -> &str;

    /// Whether this provider honours `CompletionRequest::response_format`.
    ///
    /// Providers that don't still receive the schema in the prompt, and their
    /// output is validated after the fact.
    fn supports_structured_output(&self) -> bool {
        false
    }
}

/// A mock LLM provider for testing and development.
///
/// Responses are returned in the order they were queued. Every request is
/// recorded so tests can assert on prompts.
pub struct MockLlmProvider {
    model: String,
    responses: Mutex<Vec<Result<CompletionResponse, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            responses: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response to be returned by the next `complete` call.
    pub fn queue_response(&self, response: CompletionResponse) {
        self.lock_responses().push(Ok(response));
    }

    /// Queue an error to be returned by the next `complete` call.
    pub fn queue_error(&self, error: LlmError) {
        self.lock_responses().push(Err(error));
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lock_responses(
        &self,
    ) -> std::sync::MutexGuard<'_, Vec<Result<CompletionResponse, LlmError>>> {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create a simple text response for testing.
    pub fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            usage: TokenUsage {
                input_tokens: 100,
                output_tokens: 50,
            },
            model: "mock-model".to_string(),
            finish_reason: Some("stop".to_string()),
        }
    }

    /// Create a JSON response, as returned for a schema-constrained request.
    pub fn json_response(value: serde_json::Value) -> CompletionResponse {
        Self::text_response(&value.to_string())
    }

    /// Create a tool call response for testing.
    pub fn tool_call_response(tool_name: &str, arguments: serde_json::Value) -> CompletionResponse {
        let call_id = format!("call_{}", uuid::Uuid::new_v4());
        CompletionResponse {
            message: Message::new(
                Role::Assistant,
                Content::tool_call(&call_id, tool_name, arguments),
            ),
            usage: TokenUsage {
                input_tokens: 100,
                output_tokens: 30,
            },
            model: "mock-model".to_string(),
            finish_reason: Some("tool_calls".to_string()),
        }
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);
        let mut responses = self.lock_responses();
        if responses.is_empty() {
            Ok(MockLlmProvider::text_response(
                "I'm a mock LLM. No queued responses available.",
            ))
        } else {
            responses.remove(0)
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn supports_structured_output(&self) -> bool {
        true
    }
}
