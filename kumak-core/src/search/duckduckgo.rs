//! DuckDuckGo instant answer backend.
//!
//! No API key needed. Results are sparse: the abstract plus related topics.

use super::{SearchHit, SearchProvider, http_client, network_error};
use crate::config::SearchConfig;
use crate::error::SearchError;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.duckduckgo.com";

pub struct DuckDuckGoSearchProvider {
    client: reqwest::Client,
    base_url: String,
}

impl DuckDuckGoSearchProvider {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn parse_results(body: &Value, max_results: usize) -> Vec<SearchHit> {
        let mut hits = Vec::new();

        if let Some(abstract_text) = body.get("AbstractText").and_then(|v| v.as_str())
            && !abstract_text.is_empty()
        {
            let mut hit = SearchHit::new(abstract_text);
            if let Some(source) = body.get("AbstractSource").and_then(|v| v.as_str()) {
                hit = hit.with_title(source);
            }
            if let Some(url) = body.get("AbstractURL").and_then(|v| v.as_str())
                && !url.is_empty()
            {
                hit = hit.with_url(url);
            }
            hits.push(hit);
        }

        // Related topics may be grouped one level deep under "Topics".
        let topics = ["Results", "RelatedTopics"]
            .iter()
            .filter_map(|key| body.get(*key).and_then(|v| v.as_array()))
            .flatten()
            .flat_map(|topic| match topic.get("Topics").and_then(|t| t.as_array()) {
                Some(group) => group.iter().collect::<Vec<_>>(),
                None => vec![topic],
            });

        for topic in topics {
            if hits.len() >= max_results {
                break;
            }
            if let Some(text) = topic.get("Text").and_then(|v| v.as_str()) {
                let mut hit = SearchHit::new(text);
                if let Some(url) = topic.get("FirstURL").and_then(|v| v.as_str()) {
                    hit = hit.with_url(url);
                }
                hits.push(hit);
            }
        }

        hits.truncate(max_results);
        hits
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearchProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let url = format!(
            "{}/?q={}&format=json&no_html=1&skip_disambig=1",
            self.base_url,
            urlencoding::encode(query)
        );
        debug!(query, max_results, "DuckDuckGo search");

        let response = self.client.get(&url).send().await.map_err(network_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Provider {
                provider: "duckduckgo".to_string(),
                message: format!("HTTP {}", status),
            });
        }
        let body: Value = response.json().await.map_err(|e| SearchError::Provider {
            provider: "duckduckgo".to_string(),
            message: format!("Failed to parse search response: {}", e),
        })?;
        Ok(Self::parse_results(&body, max_results))
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}
