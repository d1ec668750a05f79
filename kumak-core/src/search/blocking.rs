//! Adapter for synchronous search clients.

use super::{SearchHit, SearchProvider};
use crate::error::SearchError;
use async_trait::async_trait;
use std::sync::Arc;

type BlockingSearchFn =
    dyn Fn(&str, usize) -> Result<Vec<SearchHit>, SearchError> + Send + Sync + 'static;

/// Runs a blocking search function on the tokio blocking pool so parallel
/// researchers never stall the async workers.
pub struct BlockingSearchProvider {
    name: String,
    search_fn: Arc<BlockingSearchFn>,
}

impl BlockingSearchProvider {
    pub fn new<F>(name: impl Into<String>, search_fn: F) -> Self
    where
        F: Fn(&str, usize) -> Result<Vec<SearchHit>, SearchError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            search_fn: Arc::new(search_fn),
        }
    }
}

#[async_trait]
impl SearchProvider for BlockingSearchProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let search_fn = Arc::clone(&self.search_fn);
        let query = query.to_string();
        tokio::task::spawn_blocking(move || search_fn(&query, max_results))
            .await
            .map_err(|e| SearchError::Provider {
                provider: self.name.clone(),
                message: format!("Task join error: {e}"),
            })?
    }

    fn name(&self) -> &str {
        &self.name
    }
}
