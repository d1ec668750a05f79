//! Schema-constrained generation.
//!
//! The research pipeline and the advisor never talk to a model directly; they ask a
//! [`ContentSynthesizer`] for JSON that conforms to a schema and deserialize it into a
//! [`StructuredOutput`] type via [`generate`].

use crate::brain::LlmProvider;
use crate::error::GenerationError;
use crate::providers::{RetryConfig, with_retry};
use crate::types::{CompletionRequest, Message, ResponseFormat};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

/// A type the model can be asked to produce.
pub trait StructuredOutput: DeserializeOwned + Send {
    /// Schema name sent to the provider.
    const SCHEMA_NAME: &'static str;

    /// A strict-mode JSON schema for this type: every property listed in
    /// `required`, no additional properties, optional values typed as nullable.
    fn json_schema() -> Value;

    /// Contract checks serde cannot express.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    fn response_format() -> ResponseFormat {
        ResponseFormat {
            name: Self::SCHEMA_NAME.to_string(),
            schema: Self::json_schema(),
        }
    }
}

/// The prompt for a single schema-constrained call.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptContext {
    pub system: String,
    pub user: Option<String>,
    pub temperature: f32,
}

impl PromptContext {
    pub fn new(system: impl Into<String>, temperature: f32) -> Self {
        Self {
            system: system.into(),
            user: None,
            temperature,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

/// Produces JSON values constrained to a schema.
#[async_trait]
pub trait ContentSynthesizer: Send + Sync {
    async fn generate_value(
        &self,
        context: &PromptContext,
        format: &ResponseFormat,
    ) -> Result<Value, GenerationError>;
}

/// Generate, deserialize, and validate a `T`.
pub async fn generate<T: StructuredOutput>(
    synthesizer: &dyn ContentSynthesizer,
    context: &PromptContext,
) -> Result<T, GenerationError> {
    let value = synthesizer
        .generate_value(context, &T::response_format())
        .await?;
    let parsed: T = serde_json::from_value(value).map_err(|e| GenerationError::Malformed {
        schema: T::SCHEMA_NAME.to_string(),
        message: e.to_string(),
    })?;
    parsed.validate().map_err(|reason| GenerationError::Invalid {
        schema: T::SCHEMA_NAME.to_string(),
        reason,
    })?;
    Ok(parsed)
}

/// A [`ContentSynthesizer`] backed by an [`LlmProvider`].
pub struct LlmSynthesizer {
    provider: Arc<dyn LlmProvider>,
    retry: RetryConfig,
}

impl LlmSynthesizer {
    pub fn new(provider: Arc<dyn LlmProvider>, retry: RetryConfig) -> Self {
        Self { provider, retry }
    }

    fn build_request(&self, context: &PromptContext, format: &ResponseFormat) -> CompletionRequest {
        let system = if self.provider.supports_structured_output() {
            context.system.clone()
        } else {
            format!(
                "{}\n\nRespond with a single JSON object matching this schema and nothing else:\n{}",
                context.system, format.schema
            )
        };
        let mut messages = vec![Message::system(system)];
        if let Some(user) = &context.user {
            messages.push(Message::user(user.clone()));
        }
        CompletionRequest {
            messages,
            temperature: context.temperature,
            response_format: Some(format.clone()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ContentSynthesizer for LlmSynthesizer {
    async fn generate_value(
        &self,
        context: &PromptContext,
        format: &ResponseFormat,
    ) -> Result<Value, GenerationError> {
        let request = self.build_request(context, format);
        let response = with_retry(&self.retry, || self.provider.complete(request.clone())).await?;
        debug!(
            schema = %format.name,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Structured generation complete"
        );
        let text = response.message.content.joined_text();
        parse_json_payload(&text).map_err(|message| GenerationError::Malformed {
            schema: format.name.clone(),
            message,
        })
    }
}

/// Parse a JSON object out of model text, tolerating a surrounding code fence.
fn parse_json_payload(text: &str) -> Result<Value, String> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    if body.is_empty() {
        return Err("empty response".to_string());
    }
    serde_json::from_str(body).map_err(|e| e.to_string())
}

/// Schema helpers shared by the `StructuredOutput` impls.
pub(crate) mod schema {
    use super::*;

    /// A strict object schema: all properties required, nothing extra.
    pub fn object(properties: Value) -> Value {
        let required: Vec<String> = properties
            .as_object()
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    pub fn string(description: &str) -> Value {
        json!({ "type": "string", "description": description })
    }

    pub fn nullable_string(description: &str) -> Value {
        json!({ "type": ["string", "null"], "description": description })
    }

    pub fn number(description: &str) -> Value {
        json!({ "type": "number", "description": description })
    }

    pub fn integer(description: &str) -> Value {
        json!({ "type": "integer", "description": description })
    }

    pub fn array(items: Value, description: &str) -> Value {
        json!({ "type": "array", "items": items, "description": description })
    }

    pub fn string_array(description: &str) -> Value {
        array(json!({ "type": "string" }), description)
    }
}
