//! Tavily search API backend.

use super::{SearchHit, SearchProvider, http_client, network_error};
use crate::config::SearchConfig;
use crate::error::SearchError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Calls `POST {base_url}/search`.
pub struct TavilySearchProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_key_env: String,
    search_depth: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    content: String,
    title: Option<String>,
    url: Option<String>,
}

impl TavilySearchProvider {
    /// Reads the API key from the environment variable named in `config.api_key_env`.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let api_key =
            std::env::var(&config.api_key_env).map_err(|_| SearchError::AuthFailed {
                provider: "tavily".to_string(),
                env_var: config.api_key_env.clone(),
            })?;
        Self::with_key(config, api_key)
    }

    pub fn with_key(config: &SearchConfig, api_key: String) -> Result<Self, SearchError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            api_key_env: config.api_key_env.clone(),
            search_depth: config.search_depth.clone(),
        })
    }

    fn parse_results(body: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let parsed: TavilyResponse =
            serde_json::from_str(body).map_err(|e| SearchError::Provider {
                provider: "tavily".to_string(),
                message: format!("Invalid response: {}", e),
            })?;
        Ok(parsed
            .results
            .into_iter()
            .filter(|r| !r.content.trim().is_empty())
            .take(max_results)
            .map(|r| SearchHit {
                content: r.content,
                title: r.title,
                url: r.url,
            })
            .collect())
    }
}

#[async_trait]
impl SearchProvider for TavilySearchProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let url = format!("{}/search", self.base_url);
        debug!(query, max_results, "Tavily search");

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "api_key": self.api_key,
                "query": query,
                "search_depth": self.search_depth,
                "max_results": max_results,
            }))
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response.text().await.map_err(network_error)?;
        match status.as_u16() {
            401 | 403 => Err(SearchError::AuthFailed {
                provider: "tavily".to_string(),
                env_var: self.api_key_env.clone(),
            }),
            code if !(200..300).contains(&code) => Err(SearchError::Provider {
                provider: "tavily".to_string(),
                message: format!("HTTP {}: {}", status, body),
            }),
            _ => Self::parse_results(&body, max_results),
        }
    }

    fn name(&self) -> &str {
        "tavily"
    }
}
