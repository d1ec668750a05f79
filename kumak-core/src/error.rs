//! Error types for the Kumak core library.
//!
//! Uses `thiserror` for public API error types with structured error variants
//! covering LLM, search, structured generation, research, advisor, and
//! configuration domains.

use std::path::PathBuf;

/// Top-level error type for the Kumak core library.
#[derive(Debug, thiserror::Error)]
pub enum KumakError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Research error: {0}")]
    Research(#[from] ResearchError),

    #[error("Advisor error: {0}")]
    Advisor(#[from] AdvisorError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from LLM provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Errors from the search provider adapters.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search network failure: {message}")]
    Network { message: String },

    #[error("Search provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    #[error("Search provider '{provider}' has no API key (env var '{env_var}' not set)")]
    AuthFailed { provider: String, env_var: String },
}

/// Errors from schema-constrained generation.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Model output for schema '{schema}' could not be parsed: {message}")]
    Malformed { schema: String, message: String },

    #[error("Model output for schema '{schema}' violated its contract: {reason}")]
    Invalid { schema: String, reason: String },

    #[error("Upstream provider failed: {0}")]
    Provider(#[from] LlmError),
}

/// Errors that abort a research run.
///
/// Only planning and synthesis failures surface here; researcher failures are
/// absorbed into degraded results and quality gate failures degrade to a pass.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("Research topic is empty")]
    EmptyTopic,

    #[error("Research planning failed: {0}")]
    Planning(#[source] GenerationError),

    #[error("Research plan for '{topic}' contained no queries")]
    EmptyPlan { topic: String },

    #[error("Report synthesis failed: {0}")]
    Synthesis(#[source] GenerationError),
}

/// Errors from the advisor conversation loop.
#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    #[error("Model call failed: {0}")]
    Provider(#[from] LlmError),

    #[error("Maximum tool rounds ({max}) reached without a final answer")]
    MaxToolRounds { max: usize },

    #[error("Message is empty")]
    EmptyMessage,
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Environment variable not set: {var}")]
    EnvVarMissing { var: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `KumakError`.
pub type Result<T> = std::result::Result<T, KumakError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_llm() {
        let err = KumakError::Llm(LlmError::ApiRequest {
            message: "connection refused".into(),
        });
        assert_eq!(
            err.to_string(),
            "LLM error: API request failed: connection refused"
        );
    }

    #[test]
    fn test_error_display_search() {
        let err = KumakError::Search(SearchError::Provider {
            provider: "tavily".into(),
            message: "HTTP 500".into(),
        });
        assert_eq!(
            err.to_string(),
            "Search error: Search provider 'tavily' failed: HTTP 500"
        );
    }

    #[test]
    fn test_error_display_research_planning() {
        let err = ResearchError::Planning(GenerationError::Malformed {
            schema: "research_plan".into(),
            message: "expected value at line 1".into(),
        });
        assert_eq!(
            err.to_string(),
            "Research planning failed: Model output for schema 'research_plan' could not be parsed: expected value at line 1"
        );
    }

    #[test]
    fn test_generation_error_from_llm() {
        let err: GenerationError = LlmError::Timeout { timeout_secs: 30 }.into();
        assert!(matches!(err, GenerationError::Provider(_)));
        assert_eq!(
            err.to_string(),
            "Upstream provider failed: Request timed out after 30s"
        );
    }

    #[test]
    fn test_advisor_error_display() {
        let err = KumakError::Advisor(AdvisorError::MaxToolRounds { max: 6 });
        assert_eq!(
            err.to_string(),
            "Advisor error: Maximum tool rounds (6) reached without a final answer"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: KumakError = io_err.into();
        assert!(matches!(err, KumakError::Io(_)));
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: KumakError = serde_err.into();
        assert!(matches!(err, KumakError::Serialization(_)));
    }

    #[test]
    fn test_llm_error_variants() {
        let err = LlmError::RateLimited {
            retry_after_secs: 60,
        };
        assert_eq!(err.to_string(), "Rate limited by provider, retry after 60s");
    }
}
