//! OpenAI-compatible LLM provider.
//!
//! Works with OpenAI and any endpoint speaking the chat completions API.
//! Schema-constrained requests are sent as `response_format: json_schema`
//! with `strict: true`.

use crate::brain::LlmProvider;
use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::types::{
    CompletionRequest, CompletionResponse, Content, Message, ResponseFormat, Role, TokenUsage,
    ToolDefinition,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider for OpenAI and OpenAI-compatible chat completion endpoints.
pub struct OpenAiCompatibleProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: usize,
    timeout_secs: u64,
}

impl OpenAiCompatibleProvider {
    /// Create a new provider from configuration.
    ///
    /// Uses `config.api_key` when set, otherwise the environment variable named by
    /// `config.api_key_env`. Local endpoints (localhost) don't need a key.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let is_local = config
            .base_url
            .as_deref()
            .is_some_and(|u| u.contains("localhost") || u.contains("127.0.0.1"));

        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(&config.api_key_env).ok())
            .or_else(|| {
                is_local.then(|| {
                    debug!("No API key set for local provider; using dummy bearer token");
                    "local".to_string()
                })
            })
            .ok_or_else(|| LlmError::AuthFailed {
                provider: format!(
                    "OpenAI-compatible: env var '{}' not set",
                    config.api_key_env
                ),
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Connection {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Convert internal messages to OpenAI JSON format.
    fn messages_to_json(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| match &msg.content {
                Content::Text { text } => json!({
                    "role": msg.role.to_string(),
                    "content": text,
                }),
                Content::ToolCall { .. } => json!({
                    "role": "assistant",
                    "content": null,
                    "tool_calls": Self::tool_calls_json(&msg.content),
                }),
                Content::ToolResult {
                    call_id, output, ..
                } => json!({
                    "role": "tool",
                    "tool_call_id": call_id,
                    "content": output,
                }),
                Content::MultiPart { .. } => {
                    let text = msg.content.joined_text();
                    let tool_calls = Self::tool_calls_json(&msg.content);
                    if tool_calls.is_empty() {
                        json!({ "role": msg.role.to_string(), "content": text })
                    } else {
                        let content = if text.is_empty() {
                            Value::Null
                        } else {
                            Value::String(text)
                        };
                        json!({
                            "role": "assistant",
                            "content": content,
                            "tool_calls": tool_calls,
                        })
                    }
                }
            })
            .collect()
    }

    fn tool_calls_json(content: &Content) -> Vec<Value> {
        content
            .tool_calls()
            .into_iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": call.arguments.to_string(),
                    }
                })
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI format.
    fn tools_to_json(tools: &[ToolDefinition]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect()
    }

    fn response_format_json(format: &ResponseFormat) -> Value {
        json!({
            "type": "json_schema",
            "json_schema": {
                "name": format.name,
                "schema": format.schema,
                "strict": true,
            }
        })
    }

    /// Build the request body for a chat completion.
    fn request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": request.model.as_deref().unwrap_or(&self.model),
            "messages": Self::messages_to_json(&request.messages),
            "temperature": request.temperature,
            "max_tokens": request.max_tokens.unwrap_or(self.max_tokens),
        });
        if let Some(tools) = &request.tools
            && !tools.is_empty()
        {
            body["tools"] = json!(Self::tools_to_json(tools));
        }
        if let Some(format) = &request.response_format {
            body["response_format"] = Self::response_format_json(format);
        }
        body
    }

    /// Parse an OpenAI-format response body into a CompletionResponse.
    fn parse_response(body: &Value, model: &str) -> Result<CompletionResponse, LlmError> {
        let choice =
            body.get("choices")
                .and_then(|c| c.get(0))
                .ok_or_else(|| LlmError::ResponseParse {
                    message: "No choices in response".to_string(),
                })?;

        let message = choice
            .get("message")
            .ok_or_else(|| LlmError::ResponseParse {
                message: "No message in choice".to_string(),
            })?;

        let finish_reason = choice
            .get("finish_reason")
            .and_then(|f| f.as_str())
            .map(|s| s.to_string());

        if let Some(refusal) = message.get("refusal").and_then(|r| r.as_str()) {
            return Err(LlmError::ResponseParse {
                message: format!("Model refused the request: {}", refusal),
            });
        }

        let text = message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or("");

        let mut calls: Vec<Content> = message
            .get("tool_calls")
            .and_then(|tc| tc.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|tc| {
                        let id = tc.get("id")?.as_str()?;
                        let func = tc.get("function")?;
                        let name = func.get("name")?.as_str()?;
                        let args_str = func.get("arguments")?.as_str()?;
                        let arguments: Value =
                            serde_json::from_str(args_str).unwrap_or_else(|_| json!({}));
                        Some(Content::tool_call(id, name, arguments))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let content = match calls.len() {
            0 => Content::text(text),
            1 if text.is_empty() => calls.remove(0),
            _ => {
                let mut parts = Vec::with_capacity(calls.len() + 1);
                if !text.is_empty() {
                    parts.push(Content::text(text));
                }
                parts.extend(calls);
                Content::MultiPart { parts }
            }
        };

        let usage_obj = body.get("usage");
        let usage = TokenUsage {
            input_tokens: usage_obj
                .and_then(|u| u.get("prompt_tokens"))
                .and_then(|t| t.as_u64())
                .unwrap_or(0) as usize,
            output_tokens: usage_obj
                .and_then(|u| u.get("completion_tokens"))
                .and_then(|t| t.as_u64())
                .unwrap_or(0) as usize,
        };

        let resp_model = body
            .get("model")
            .and_then(|m| m.as_str())
            .unwrap_or(model)
            .to_string();

        Ok(CompletionResponse {
            message: Message::new(Role::Assistant, content),
            usage,
            model: resp_model,
            finish_reason,
        })
    }

    /// Map an HTTP status code to the appropriate LlmError.
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        match status.as_u16() {
            401 | 403 => {
                debug!(body = %body, "Authentication failed ({})", status);
                LlmError::AuthFailed {
                    provider: "OpenAI-compatible".to_string(),
                }
            }
            429 => {
                // "Rate limit reached ... Please try again in 20s."
                let retry_secs = serde_json::from_str::<Value>(body)
                    .ok()
                    .and_then(|v| {
                        v.get("error")?
                            .get("message")?
                            .as_str()
                            .map(|s| s.to_string())
                    })
                    .and_then(|msg| {
                        msg.split("in ").last().and_then(|s| {
                            s.trim_end_matches('.')
                                .trim_end_matches('s')
                                .parse::<u64>()
                                .ok()
                        })
                    })
                    .unwrap_or(5);
                LlmError::RateLimited {
                    retry_after_secs: retry_secs,
                }
            }
            code if code >= 500 => LlmError::Connection {
                message: format!("Server error ({}): {}", status, body),
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {}: {}", status, body),
            },
        }
    }

    fn map_transport_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else if err.is_connect() {
            LlmError::Connection {
                message: err.to_string(),
            }
        } else {
            LlmError::ApiRequest {
                message: format!("Request failed: {}", err),
            }
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);

        debug!(
            url = %url,
            model = %self.model,
            schema = request.response_format.as_ref().map(|f| f.name.as_str()),
            "Sending OpenAI completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &response_body));
        }

        let json: Value =
            serde_json::from_str(&response_body).map_err(|e| LlmError::ResponseParse {
                message: format!("Invalid JSON: {}", e),
            })?;

        Self::parse_response(&json, &self.model)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn supports_structured_output(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_provider() -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(&LlmConfig {
            api_key: Some("sk-test".into()),
            ..LlmConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_messages_to_json_text() {
        let json = OpenAiCompatibleProvider::messages_to_json(&[
            Message::system("You are a planner."),
            Message::user("Plan research on pizza."),
        ]);
        assert_eq!(json[0]["role"], "system");
        assert_eq!(json[1]["content"], "Plan research on pizza.");
    }

    #[test]
    fn test_messages_to_json_tool_roundtrip() {
        let json = OpenAiCompatibleProvider::messages_to_json(&[
            Message::new(
                Role::Assistant,
                Content::tool_call("call_1", "deep_research", json!({"topic": "pizza"})),
            ),
            Message::tool_result("call_1", "report", false),
        ]);
        assert_eq!(json[0]["tool_calls"][0]["function"]["name"], "deep_research");
        assert_eq!(
            json[0]["tool_calls"][0]["function"]["arguments"],
            r#"{"topic":"pizza"}"#
        );
        assert_eq!(json[1]["role"], "tool");
        assert_eq!(json[1]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_request_body_includes_response_format() {
        let provider = test_provider();
        let request = CompletionRequest {
            messages: vec![Message::user("hi")],
            temperature: 0.0,
            response_format: Some(ResponseFormat {
                name: "research_plan".into(),
                schema: json!({"type": "object"}),
            }),
            ..Default::default()
        };
        let body = provider.request_body(&request);
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "research_plan");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert_eq!(body["max_tokens"], 4096);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_tools_to_json() {
        let tools = vec![ToolDefinition {
            name: "perform_market_research".into(),
            description: "Quick web search".into(),
            parameters: json!({"type": "object", "properties": {"query": {"type": "string"}}}),
        }];
        let json = OpenAiCompatibleProvider::tools_to_json(&tools);
        assert_eq!(json[0]["type"], "function");
        assert_eq!(json[0]["function"]["name"], "perform_market_research");
    }

    #[test]
    fn test_parse_text_response() {
        let body = json!({
            "choices": [{
                "message": {"role": "assistant", "content": "{\"queries\":[]}"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4},
            "model": "gpt-4.1-mini-2025-04-14"
        });
        let resp = OpenAiCompatibleProvider::parse_response(&body, "gpt-4.1-mini").unwrap();
        assert_eq!(resp.message.content.as_text(), Some("{\"queries\":[]}"));
        assert_eq!(resp.usage.total(), 16);
        assert_eq!(resp.model, "gpt-4.1-mini-2025-04-14");
    }

    #[test]
    fn test_parse_multiple_tool_calls() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "a", "type": "function", "function": {"name": "analyze_and_synthesize", "arguments": "{}"}},
                        {"id": "b", "type": "function", "function": {"name": "perform_market_research", "arguments": "{\"query\":\"rent\"}"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let resp = OpenAiCompatibleProvider::parse_response(&body, "m").unwrap();
        let calls = resp.message.content.tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].arguments["query"], "rent");
    }

    #[test]
    fn test_parse_refusal_is_error() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": null, "refusal": "no"}}]
        });
        assert!(matches!(
            OpenAiCompatibleProvider::parse_response(&body, "m"),
            Err(LlmError::ResponseParse { .. })
        ));
    }

    #[test]
    fn test_parse_response_no_choices() {
        assert!(OpenAiCompatibleProvider::parse_response(&json!({}), "m").is_err());
    }

    #[test]
    fn test_http_error_mapping() {
        let err =
            OpenAiCompatibleProvider::map_http_error(reqwest::StatusCode::UNAUTHORIZED, "nope");
        assert!(matches!(err, LlmError::AuthFailed { .. }));

        let body = r#"{"error":{"message":"Rate limit reached. Please try again in 20s."}}"#;
        let err =
            OpenAiCompatibleProvider::map_http_error(reqwest::StatusCode::TOO_MANY_REQUESTS, body);
        assert!(matches!(
            err,
            LlmError::RateLimited {
                retry_after_secs: 20
            }
        ));

        let err = OpenAiCompatibleProvider::map_http_error(
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
            "down",
        );
        assert!(matches!(err, LlmError::Connection { .. }));

        let err = OpenAiCompatibleProvider::map_http_error(reqwest::StatusCode::BAD_REQUEST, "bad");
        assert!(matches!(err, LlmError::ApiRequest { .. }));
    }

    #[test]
    fn test_missing_key_is_auth_error() {
        let config = LlmConfig {
            api_key_env: "KUMAK_TEST_NONEXISTENT_KEY_VAR".into(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            OpenAiCompatibleProvider::new(&config),
            Err(LlmError::AuthFailed { .. })
        ));
    }

    #[test]
    fn test_local_provider_needs_no_key() {
        let config = LlmConfig {
            api_key_env: "KUMAK_TEST_NONEXISTENT_KEY_VAR".into(),
            base_url: Some("http://localhost:11434/v1/".into()),
            ..LlmConfig::default()
        };
        let provider = OpenAiCompatibleProvider::new(&config).unwrap();
        assert_eq!(provider.base_url, "http://localhost:11434/v1");
    }
}
