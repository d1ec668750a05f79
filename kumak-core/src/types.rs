//! Core type definitions for Kumak.
//!
//! Defines the conversation data structures shared by the LLM providers, the
//! structured generation adapter, and the advisor: messages, tool calls,
//! content types, and completion requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a participant role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// Content within a message — text, tool call, or tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text {
        text: String,
    },
    ToolCall {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },
    ToolResult {
        call_id: String,
        output: String,
        is_error: bool,
    },
    MultiPart {
        parts: Vec<Content>,
    },
}

/// A borrowed view of a single tool call inside a message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolCallRef<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub arguments: &'a serde_json::Value,
}

impl Content {
    /// Create a simple text content.
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }

    /// Create a tool call content.
    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Content::ToolCall {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Create a tool result content.
    pub fn tool_result(
        call_id: impl Into<String>,
        output: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Content::ToolResult {
            call_id: call_id.into(),
            output: output.into(),
            is_error,
        }
    }

    /// Returns the text representation of this content.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text { text } => Some(text),
            _ => None,
        }
    }

    /// All text fragments, including those nested in a multipart message, joined by newlines.
    pub fn joined_text(&self) -> String {
        match self {
            Content::Text { text } => text.clone(),
            Content::MultiPart { parts } => parts
                .iter()
                .filter_map(|p| p.as_text())
                .collect::<Vec<_>>()
                .join("\n"),
            _ => String::new(),
        }
    }

    /// Every tool call carried by this content, in order.
    pub fn tool_calls(&self) -> Vec<ToolCallRef<'_>> {
        match self {
            Content::ToolCall {
                id,
                name,
                arguments,
            } => vec![ToolCallRef {
                id,
                name,
                arguments,
            }],
            Content::MultiPart { parts } => parts.iter().flat_map(|p| p.tool_calls()).collect(),
            _ => Vec::new(),
        }
    }
}

/// A single message in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: Content,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message with auto-generated ID and current timestamp.
    pub fn new(role: Role, content: Content) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, Content::text(text))
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Content::text(text))
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Content::text(text))
    }

    /// Create a tool result message.
    pub fn tool_result(
        call_id: impl Into<String>,
        output: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self::new(Role::Tool, Content::tool_result(call_id, output, is_error))
    }

    /// Render the message as a single transcript line, used when a conversation
    /// is handed to a model as plain context.
    pub fn transcript_line(&self) -> String {
        match &self.content {
            Content::ToolCall {
                name, arguments, ..
            } => format!("{}: [tool call {} {}]", self.role, name, arguments),
            Content::ToolResult { output, .. } => format!("{}: {}", self.role, output),
            other => format!("{}: {}", self.role, other.joined_text()),
        }
    }
}

/// A definition describing a tool for the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A JSON schema the model output must conform to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    /// Schema name reported to the provider (`[a-zA-Z0-9_-]`).
    pub name: String,
    pub schema: serde_json::Value,
}

/// Token usage for a single completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }

    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// The result of an LLM completion request.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub message: Message,
    pub usage: TokenUsage,
    pub model: String,
    pub finish_reason: Option<String>,
}

/// A request to the LLM for completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub tools: Option<Vec<ToolDefinition>>,
    pub temperature: f32,
    pub max_tokens: Option<usize>,
    pub model: Option<String>,
    /// When set, the provider must constrain its output to this schema.
    pub response_format: Option<ResponseFormat>,
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            tools: None,
            temperature: 0.7,
            max_tokens: None,
            model: None,
            response_format: None,
        }
    }
}
