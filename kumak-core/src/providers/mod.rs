//! LLM provider implementations.
//!
//! Kumak talks to OpenAI and any OpenAI-compatible endpoint (Azure, Ollama,
//! vLLM, LM Studio) through [`OpenAiCompatibleProvider`]. Use `create_provider()`
//! to instantiate it from config, and `with_retry()` to wrap calls that should
//! survive transient failures.

pub mod openai_compat;

use crate::brain::LlmProvider;
use crate::config::LlmConfig;
use crate::error::LlmError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use crate::config::RetryConfig;
pub use openai_compat::OpenAiCompatibleProvider;

/// Execute an async operation with exponential backoff retry on transient errors.
///
/// Retries on `LlmError::RateLimited` (respects `retry_after_secs`),
/// `LlmError::Connection`, and `LlmError::Timeout`. Permanent errors (auth, parse)
/// return immediately.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation: F) -> Result<T, LlmError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) if !is_retryable(&e) || attempt >= config.max_retries => return Err(e),
            Err(e) => {
                let backoff_ms = compute_backoff(config, attempt, &e);
                tracing::warn!(
                    attempt = attempt + 1,
                    max = config.max_retries,
                    backoff_ms,
                    error = %e,
                    "Retrying LLM call after transient error"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                attempt += 1;
            }
        }
    }
}

/// Check if an error is retryable (transient).
fn is_retryable(err: &LlmError) -> bool {
    matches!(
        err,
        LlmError::RateLimited { .. } | LlmError::Connection { .. } | LlmError::Timeout { .. }
    )
}

/// Compute backoff delay, respecting rate limit retry-after hints.
fn compute_backoff(config: &RetryConfig, attempt: u32, err: &LlmError) -> u64 {
    let computed = compute_exponential_backoff(config, attempt);
    match err {
        LlmError::RateLimited { retry_after_secs } => (retry_after_secs * 1000).max(computed),
        _ => computed,
    }
}

fn compute_exponential_backoff(config: &RetryConfig, attempt: u32) -> u64 {
    let base = config.initial_backoff_ms as f64 * config.backoff_multiplier.powi(attempt as i32);
    let capped = base.min(config.max_backoff_ms as f64) as u64;
    if config.jitter {
        capped + (capped as f64 * 0.25 * jitter_fraction()) as u64
    } else {
        capped
    }
}

/// A value in `[0, 1)` derived from the clock; good enough to spread retries.
fn jitter_fraction() -> f64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

/// Create an LLM provider based on the configuration.
///
/// Every provider name routes to `OpenAiCompatibleProvider`; non-OpenAI hosts
/// are reached by setting `base_url`.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    if config.provider != "openai" && config.base_url.is_none() {
        tracing::warn!(
            provider = %config.provider,
            "Unknown provider without base_url; using the OpenAI endpoint"
        );
    }
    Ok(Arc::new(OpenAiCompatibleProvider::new(config)?))
}
