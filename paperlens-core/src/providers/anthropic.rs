//! Anthropic Messages API provider implementation.
//!
//! Key differences from other backends:
//! - Auth via `x-api-key` header (not `Authorization: Bearer`)
//! - Required `anthropic-version` header
//! - Response text arrives as a list of typed content blocks

use crate::config::{LlmConfig, RetryConfig};
use crate::error::ProviderError;
use crate::generation::{GenerationConfig, GenerationProvider, GenerationRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// The default Anthropic API base URL.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// The required Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Anthropic Messages API provider.
pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    config: GenerationConfig,
    retry: RetryConfig,
    timeout_secs: u64,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with an already-resolved API key.
    pub fn new_with_key(config: &LlmConfig, api_key: String) -> Result<Self, ProviderError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client: super::http_client(config.timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model().to_string(),
            config: config
                .generation
                .clone()
                .unwrap_or_else(Self::default_generation_config),
            retry: config.retry.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// Claude defaults: the backend picks its own sampling parameters.
    pub fn default_generation_config() -> GenerationConfig {
        GenerationConfig::default().with_max_output_tokens(DEFAULT_MAX_TOKENS)
    }

    /// Build the JSON request body for the Messages API.
    fn build_request_body(&self, request: &GenerationRequest) -> Value {
        let config = &request.config;
        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": config.max_output_tokens,
            "messages": [
                { "role": "user", "content": request.prompt }
            ],
        });

        if let Some(temperature) = config.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        if let Some(top_p) = config.top_p {
            body["top_p"] = serde_json::json!(top_p);
        }
        if let Some(top_k) = config.top_k {
            body["top_k"] = serde_json::json!(top_k);
        }

        body
    }

    /// Extract the generated text, joining every `text` content block.
    fn parse_response(body: &Value) -> Result<String, ProviderError> {
        let blocks = body["content"]
            .as_array()
            .ok_or_else(|| ProviderError::ResponseParse {
                message: "Missing 'content' array in response".to_string(),
            })?;

        let text: String = blocks
            .iter()
            .filter(|block| block["type"].as_str().unwrap_or("text") == "text")
            .filter_map(|block| block["text"].as_str())
            .collect();

        if text.is_empty() {
            let reason = body["stop_reason"].as_str().unwrap_or("no text content");
            return Err(ProviderError::EmptyResponse {
                reason: reason.to_string(),
            });
        }
        Ok(text)
    }

    /// Map an HTTP status code to the appropriate `ProviderError`.
    fn map_http_error(status: reqwest::StatusCode, body_text: &str) -> ProviderError {
        match status.as_u16() {
            401 | 403 => ProviderError::AuthFailed {
                provider: "anthropic".to_string(),
            },
            429 => {
                let retry_after = serde_json::from_str::<Value>(body_text)
                    .ok()
                    .and_then(|v| v["error"]["retry_after_secs"].as_u64())
                    .unwrap_or(30);
                ProviderError::RateLimited {
                    retry_after_secs: retry_after,
                }
            }
            529 => ProviderError::Connection {
                message: "Anthropic API is overloaded".to_string(),
            },
            _ => ProviderError::ApiRequest {
                message: format!("HTTP {} from Anthropic API: {}", status, body_text),
            },
        }
    }

    async fn send_once(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let body = self.build_request_body(request);
        let url = format!("{}/messages", self.base_url);

        debug!(
            model = self.model.as_str(),
            url = url.as_str(),
            "Sending Anthropic generation request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| super::map_transport_error(e, self.timeout_secs))?;

        let status = response.status();
        let body_text = response.text().await.map_err(|e| ProviderError::ResponseParse {
            message: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &body_text));
        }

        let response_json: Value =
            serde_json::from_str(&body_text).map_err(|e| ProviderError::ResponseParse {
                message: format!("Invalid JSON in response: {}", e),
            })?;

        Self::parse_response(&response_json)
    }
}

#[async_trait]
impl GenerationProvider for AnthropicProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError> {
        let request = &request;
        super::with_retry(&self.retry, || self.send_once(request)).await
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn default_config(&self) -> GenerationConfig {
        self.config.clone()
    }
}
