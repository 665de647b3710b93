//! Generation provider implementations.
//!
//! Provides concrete implementations of the `GenerationProvider` trait for:
//! - Anthropic Messages API (Claude models)
//! - Google Gemini API (Gemini models)
//!
//! Use `create_provider()` to instantiate the appropriate provider based on config.

pub mod anthropic;
pub mod gemini;

use crate::config::{LlmConfig, ProviderKind};
use crate::error::{AnalysisError, ProviderError};
use crate::generation::{GenerationProvider, MockGenerationProvider};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use crate::config::RetryConfig;
pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;

/// Execute an async operation with exponential backoff retry on transient errors.
///
/// Retries on `ProviderError::RateLimited` (respects `retry_after_secs`),
/// `ProviderError::Connection`, and `ProviderError::Timeout`. Permanent errors
/// (auth, parse, empty response) return immediately.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation: F) -> Result<T, ProviderError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut last_err = None;
    for attempt in 0..=config.max_retries {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if !is_retryable(&e) || attempt == config.max_retries {
                    return Err(e);
                }

                let backoff_ms = compute_backoff(config, attempt, &e);
                tracing::warn!(
                    attempt = attempt + 1,
                    max = config.max_retries,
                    backoff_ms = backoff_ms,
                    error = %e,
                    "Retrying after transient error"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| ProviderError::Connection {
        message: "All retry attempts exhausted".to_string(),
    }))
}

/// Check if an error is retryable (transient).
fn is_retryable(err: &ProviderError) -> bool {
    matches!(
        err,
        ProviderError::RateLimited { .. }
            | ProviderError::Connection { .. }
            | ProviderError::Timeout { .. }
    )
}

/// Compute backoff delay, respecting rate limit retry-after hints.
fn compute_backoff(config: &RetryConfig, attempt: u32, err: &ProviderError) -> u64 {
    let computed = compute_exponential_backoff(config, attempt);
    if let ProviderError::RateLimited { retry_after_secs } = err {
        return retry_after_secs.saturating_mul(1000).max(computed);
    }
    computed
}

fn compute_exponential_backoff(config: &RetryConfig, attempt: u32) -> u64 {
    let base = config.initial_backoff_ms as f64 * config.backoff_multiplier.powi(attempt as i32);
    base.min(config.max_backoff_ms as f64) as u64
}

/// Build the shared HTTP client for an adapter.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProviderError::Connection {
            message: format!("Failed to build HTTP client: {}", e),
        })
}

/// Classify a transport failure from `reqwest`.
pub(crate) fn map_transport_error(err: reqwest::Error, timeout_secs: u64) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout { timeout_secs }
    } else if err.is_connect() {
        ProviderError::Connection {
            message: err.to_string(),
        }
    } else {
        ProviderError::ApiRequest {
            message: err.to_string(),
        }
    }
}

/// Create a generation provider based on the configuration.
///
/// Credentials are resolved here, so a missing key fails at construction time
/// rather than on the first request.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn GenerationProvider>, AnalysisError> {
    match config.provider {
        ProviderKind::Anthropic => {
            let api_key = config.resolve_api_key()?;
            Ok(Arc::new(AnthropicProvider::new_with_key(config, api_key)?))
        }
        ProviderKind::Gemini => {
            let api_key = config.resolve_api_key()?;
            Ok(Arc::new(GeminiProvider::new_with_key(config, api_key)?))
        }
        ProviderKind::Mock => Ok(Arc::new(MockGenerationProvider::with_response(
            "Mock analysis: no generation backend was called.",
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_retry(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_errors() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast_retry(3), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ProviderError::Connection {
                    message: "reset".into(),
                })
            } else {
                Ok("done")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_stops_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast_retry(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::AuthFailed {
                provider: "anthropic".into(),
            })
        })
        .await;
        assert!(matches!(result, Err(ProviderError::AuthFailed { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast_retry(2), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Timeout { timeout_secs: 1 })
        })
        .await;
        assert!(matches!(result, Err(ProviderError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = RetryConfig {
            max_retries: 10,
            initial_backoff_ms: 1000,
            max_backoff_ms: 4000,
            backoff_multiplier: 2.0,
        };
        assert_eq!(compute_exponential_backoff(&config, 0), 1000);
        assert_eq!(compute_exponential_backoff(&config, 1), 2000);
        assert_eq!(compute_exponential_backoff(&config, 5), 4000);
    }

    #[test]
    fn test_backoff_respects_retry_after() {
        let config = fast_retry(1);
        let err = ProviderError::RateLimited {
            retry_after_secs: 3,
        };
        assert_eq!(compute_backoff(&config, 0, &err), 3000);
    }

    #[test]
    fn test_backoff_saturates_huge_retry_after() {
        let config = fast_retry(1);
        let err = ProviderError::RateLimited {
            retry_after_secs: u64::MAX,
        };
        assert_eq!(compute_backoff(&config, 0, &err), u64::MAX);
    }

    #[test]
    fn test_create_provider_missing_credential() {
        unsafe { std::env::remove_var("PAPERLENS_TEST_NO_SUCH_KEY") };
        let config = LlmConfig {
            provider: ProviderKind::Gemini,
            api_key_env: Some("PAPERLENS_TEST_NO_SUCH_KEY".to_string()),
            ..Default::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(matches!(err, AnalysisError::MissingCredential { .. }));
    }

    #[test]
    fn test_create_provider_with_explicit_key() {
        let config = LlmConfig {
            provider: ProviderKind::Anthropic,
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.model_name(), "claude-sonnet-4-20250514");
    }

    #[test]
    fn test_create_mock_provider_needs_no_key() {
        let config = LlmConfig::for_provider(ProviderKind::Mock);
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "mock");
    }
}
