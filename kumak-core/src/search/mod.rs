//! Web search backends.
//!
//! Researchers and the advisor's market research tool go through the
//! [`SearchProvider`] trait. Two HTTP backends are provided (Tavily, DuckDuckGo
//! instant answers), plus [`BlockingSearchProvider`] for synchronous clients.

pub mod blocking;
pub mod duckduckgo;
pub mod tavily;

use crate::config::{SearchBackend, SearchConfig};
use crate::error::SearchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use blocking::BlockingSearchProvider;
pub use duckduckgo::DuckDuckGoSearchProvider;
pub use tavily::TavilySearchProvider;

/// One ranked snippet returned by a search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl SearchHit {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            title: None,
            url: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// A keyword search backend. Zero hits is a valid outcome, not an error.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;

    /// Short backend name for logs.
    fn name(&self) -> &str;
}

/// Create the search backend selected in config.
pub fn create_search_provider(
    config: &SearchConfig,
) -> Result<Arc<dyn SearchProvider>, SearchError> {
    match config.backend {
        SearchBackend::Tavily => Ok(Arc::new(TavilySearchProvider::new(config)?)),
        SearchBackend::DuckDuckGo => Ok(Arc::new(DuckDuckGoSearchProvider::new(config)?)),
    }
}

/// Render hits as a bullet list, one `- <content>` line per hit.
pub fn hits_to_bullets(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| format!("- {}", hit.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn network_error(err: reqwest::Error) -> SearchError {
    SearchError::Network {
        message: err.to_string(),
    }
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, SearchError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent(concat!("Kumak/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(network_error)
}
