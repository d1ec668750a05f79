//! Configuration system for Kumak.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from the user config directory (`config.toml`) and/or
//! `.kumak/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Hard ceiling on quality gate runs per research topic.
pub const MAX_RESEARCH_ITERATIONS: u32 = 3;

/// Top-level configuration for Kumak.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KumakConfig {
    pub llm: LlmConfig,
    pub retry: RetryConfig,
    pub search: SearchConfig,
    pub research: ResearchConfig,
    pub advisor: AdvisorConfig,
}

/// Configuration for the LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name: "openai" or any OpenAI-compatible endpoint.
    pub provider: String,
    /// Model identifier (e.g., "gpt-4.1-mini").
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Optional inline API key; takes precedence over `api_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Optional base URL override for the API endpoint.
    pub base_url: Option<String>,
    /// Maximum tokens to generate in a response.
    pub max_tokens: usize,
    /// Default temperature for conversational turns.
    pub temperature: f32,
    /// Context window size for the model.
    pub context_window: usize,
    /// HTTP timeout for a single completion request.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4.1-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            base_url: None,
            max_tokens: 4096,
            temperature: 0.0,
            context_window: 1_047_576,
            timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    /// Validate this LLM config and return any warnings.
    ///
    /// Returns an empty Vec if the config is valid. Returns human-readable
    /// warning messages for problematic values (does not error).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.max_tokens >= self.context_window {
            warnings.push(format!(
                "max_tokens ({}) >= context_window ({}); responses may be truncated or fail",
                self.max_tokens, self.context_window
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            warnings.push(format!(
                "temperature ({}) is outside the supported range 0.0-2.0",
                self.temperature
            ));
        }
        if self.model.trim().is_empty() {
            warnings.push("model is empty".to_string());
        }
        warnings
    }
}

/// Retry policy for transient provider failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Initial backoff in milliseconds.
    pub initial_backoff_ms: u64,
    /// Upper bound on a single backoff.
    pub max_backoff_ms: u64,
    /// Multiplier applied to the backoff after each attempt.
    pub backoff_multiplier: f64,
    /// Add up to 25% random jitter to each backoff.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Which web search backend the researchers use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    /// Tavily search API (requires an API key).
    Tavily,
    /// DuckDuckGo instant answers (no key, sparse results).
    DuckDuckGo,
}

impl std::fmt::Display for SearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchBackend::Tavily => write!(f, "tavily"),
            SearchBackend::DuckDuckGo => write!(f, "duckduckgo"),
        }
    }
}

/// Configuration for the web search backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub backend: SearchBackend,
    /// Environment variable holding the backend API key.
    pub api_key_env: String,
    /// Optional base URL override (testing, proxies).
    pub base_url: Option<String>,
    /// Tavily search depth: "basic" or "advanced".
    pub search_depth: String,
    /// HTTP timeout for one search call.
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: SearchBackend::Tavily,
            api_key_env: "TAVILY_API_KEY".to_string(),
            base_url: None,
            search_depth: "advanced".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Configuration for the deep research pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Maximum number of quality gate evaluations per topic, 1 to [`MAX_RESEARCH_ITERATIONS`].
    pub max_iterations: u32,
    /// Search results requested per researcher query.
    pub results_per_query: usize,
    /// Maximum insights kept per research result.
    pub max_insights: usize,
    /// Insights per result shown to the quality gate.
    pub summary_insights: usize,
    pub planner_temperature: f32,
    pub researcher_temperature: f32,
    pub quality_temperature: f32,
    pub synthesizer_temperature: f32,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            results_per_query: 4,
            max_insights: 5,
            summary_insights: 3,
            planner_temperature: 0.0,
            researcher_temperature: 0.1,
            quality_temperature: 0.0,
            synthesizer_temperature: 0.1,
        }
    }
}

impl ResearchConfig {
    /// Reject bounds the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        if self.max_iterations == 0 {
            return Err(crate::error::ConfigError::Invalid {
                message: "research.max_iterations must be at least 1".to_string(),
            });
        }
        if self.max_iterations > MAX_RESEARCH_ITERATIONS {
            return Err(crate::error::ConfigError::Invalid {
                message: format!(
                    "research.max_iterations must be at most {}, got {}",
                    MAX_RESEARCH_ITERATIONS, self.max_iterations
                ),
            });
        }
        if self.results_per_query == 0 {
            return Err(crate::error::ConfigError::Invalid {
                message: "research.results_per_query must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration for the advisor conversation loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Maximum model/tool round trips for a single user message.
    pub max_tool_rounds: usize,
    /// Search results returned by the quick market research tool.
    pub market_research_results: usize,
    /// Temperature for the strategic plan generator.
    pub planning_temperature: f32,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 6,
            market_research_results: 5,
            planning_temperature: 0.1,
        }
    }
}

/// The user-level config file path, if a home directory can be resolved.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "kumak", "kumak")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// The workspace-level config file path.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".kumak").join("config.toml")
}

/// Values given on the command line. They win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub model: Option<String>,
}

/// Load configuration by layering defaults, config files, environment variables,
/// and command-line overrides.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<KumakConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(KumakConfig::default()));

    // User-level config
    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (KUMAK_LLM__MODEL, KUMAK_RESEARCH__MAX_ITERATIONS, etc.)
    figment = figment.merge(Env::prefixed("KUMAK_").split("__"));

    // Command-line overrides
    if let Some(model) = &overrides.model {
        figment = figment.merge(Serialized::default("llm.model", model));
    }

    figment.extract().map_err(Box::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KumakConfig::default();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4.1-mini");
        assert_eq!(config.search.backend, SearchBackend::Tavily);
        assert_eq!(config.research.max_iterations, 3);
        assert_eq!(config.research.results_per_query, 4);
        assert_eq!(config.research.max_insights, 5);
        assert_eq!(config.research.summary_insights, 3);
        assert_eq!(config.advisor.max_tool_rounds, 6);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = KumakConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: KumakConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.llm.model, config.llm.model);
        assert_eq!(deserialized.search.backend, config.search.backend);
        assert_eq!(
            deserialized.research.max_iterations,
            config.research.max_iterations
        );
    }

    #[test]
    fn test_load_config_defaults() {
        let config = load_config(None, &ConfigOverrides::default()).unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.research.max_iterations, 3);
    }

    #[test]
    fn test_model_override_beats_workspace_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".kumak")).unwrap();
        std::fs::write(
            workspace_config_path(dir.path()),
            "[llm]\nmodel = \"from-file\"\n\n[research]\nresults_per_query = 6\n",
        )
        .unwrap();
        let overrides = ConfigOverrides {
            model: Some("gpt-4o".to_string()),
        };

        let config = load_config(Some(dir.path()), &overrides).unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.research.results_per_query, 6);

        let config = load_config(Some(dir.path()), &ConfigOverrides::default()).unwrap();
        assert_eq!(config.llm.model, "from-file");
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let kumak_dir = dir.path().join(".kumak");
        std::fs::create_dir_all(&kumak_dir).unwrap();
        std::fs::write(
            kumak_dir.join("config.toml"),
            r#"
[llm]
model = "gpt-4o-mini"

[search]
backend = "duckduckgo"

[research]
max_iterations = 2
"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path()), &ConfigOverrides::default()).unwrap();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.search.backend, SearchBackend::DuckDuckGo);
        assert_eq!(config.research.max_iterations, 2);
        assert_eq!(config.research.results_per_query, 4);
    }

    #[test]
    fn test_llm_config_validate_defaults_clean() {
        assert!(LlmConfig::default().validate().is_empty());
    }

    #[test]
    fn test_llm_config_validate_bad_values() {
        let config = LlmConfig {
            temperature: 3.5,
            max_tokens: 200_000,
            context_window: 128_000,
            ..LlmConfig::default()
        };
        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("max_tokens"));
        assert!(warnings[1].contains("temperature"));
    }

    #[test]
    fn test_research_config_iteration_bounds() {
        for (max_iterations, ok) in [(0, false), (1, true), (3, true), (4, false), (6, false)] {
            let config = ResearchConfig {
                max_iterations,
                ..ResearchConfig::default()
            };
            assert_eq!(config.validate().is_ok(), ok, "max_iterations = {max_iterations}");
        }
        assert!(ResearchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_search_backend_display() {
        assert_eq!(SearchBackend::Tavily.to_string(), "tavily");
        assert_eq!(SearchBackend::DuckDuckGo.to_string(), "duckduckgo");
    }
}
