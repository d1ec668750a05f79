//! Parallel researcher — one search plus insight extraction per query.
//!
//! A researcher never fails: errors from either adapter, and panics in the
//! spawned task, turn into a degraded [`ResearchResult`].

use super::types::{ExtractedInsights, ResearchQuery, ResearchResult};
use crate::config::ResearchConfig;
use crate::search::{SearchProvider, hits_to_bullets};
use crate::structured::{ContentSynthesizer, PromptContext, generate};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Researcher {
    search: Arc<dyn SearchProvider>,
    synthesizer: Arc<dyn ContentSynthesizer>,
    results_per_query: usize,
    max_insights: usize,
    temperature: f32,
}

impl Researcher {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        synthesizer: Arc<dyn ContentSynthesizer>,
        config: &ResearchConfig,
    ) -> Self {
        Self {
            search,
            synthesizer,
            results_per_query: config.results_per_query,
            max_insights: config.max_insights,
            temperature: config.researcher_temperature,
        }
    }

    /// Research one query. Always yields exactly one result.
    pub async fn research(&self, topic: &str, query: &ResearchQuery) -> ResearchResult {
        info!(query = %query.search_query, purpose = %query.purpose, "Researcher running");

        let hits = match self
            .search
            .search(&query.search_query, self.results_per_query)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(
                    query = %query.search_query,
                    provider = self.search.name(),
                    error = %e,
                    "Search failed"
                );
                return ResearchResult::failed(query, e);
            }
        };
        let content = hits_to_bullets(&hits);

        let context = PromptContext::new(
            "You are a research analyst on a team researching a topic. \
             Extract 3-5 specific, valuable insights from the search content that are \
             relevant to the stated purpose. Do not invent facts absent from the content.",
            self.temperature,
        )
        .with_user(format!(
            "Topic: {}\nPurpose: {}\nQuery: {}\n\nContent:\n{}",
            topic, query.purpose, query.search_query, content
        ));

        match generate::<ExtractedInsights>(self.synthesizer.as_ref(), &context).await {
            Ok(extracted) => {
                let key_insights: Vec<String> = extracted
                    .key_insights
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .take(self.max_insights)
                    .collect();
                info!(
                    query = %query.search_query,
                    hits = hits.len(),
                    insights = key_insights.len(),
                    "Researcher finished"
                );
                ResearchResult {
                    query: query.search_query.clone(),
                    purpose: query.purpose.clone(),
                    content,
                    key_insights,
                    degraded: false,
                }
            }
            Err(e) => {
                warn!(query = %query.search_query, error = %e, "Insight extraction failed");
                ResearchResult::failed(query, e)
            }
        }
    }

    /// Fan out one task per query and wait for all of them.
    ///
    /// Returns one result per query, in query order.
    pub async fn fan_out(
        self: &Arc<Self>,
        topic: &str,
        queries: &[ResearchQuery],
    ) -> Vec<ResearchResult> {
        let handles: Vec<_> = queries
            .iter()
            .cloned()
            .map(|query| {
                let researcher = Arc::clone(self);
                let topic = topic.to_string();
                tokio::spawn(async move { researcher.research(&topic, &query).await })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(queries)
            .map(|(joined, query)| {
                joined.unwrap_or_else(|e| {
                    warn!(query = %query.search_query, error = %e, "Researcher task aborted");
                    ResearchResult::failed(query, e)
                })
            })
            .collect()
    }
}
