//! Google Gemini API provider implementation.
//!
//! Key differences from the Anthropic backend:
//! - Auth via `?key=API_KEY` query parameter (not header-based)
//! - Sampling parameters live in a nested `generationConfig` object
//! - Blocked prompts come back as an empty candidate list plus `promptFeedback`

use crate::config::{LlmConfig, RetryConfig};
use crate::error::ProviderError;
use crate::generation::{GenerationConfig, GenerationProvider, GenerationRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// The default Google Gemini API base URL.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini API provider.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    config: GenerationConfig,
    retry: RetryConfig,
    timeout_secs: u64,
}

impl GeminiProvider {
    /// Create a new Gemini provider with an already-resolved API key.
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

    pub fn default_generation_config() -> GenerationConfig {
        GenerationConfig {
            temperature: Some(0.7),
            top_p: Some(0.95),
            top_k: Some(40),
            max_output_tokens: 2048,
        }
    }

    fn build_request_body(request: &GenerationRequest) -> Value {
        let config = &request.config;
        let mut generation_config = serde_json::json!({
            "maxOutputTokens": config.max_output_tokens,
        });
        if let Some(temperature) = config.temperature {
            generation_config["temperature"] = serde_json::json!(temperature);
        }
        if let Some(top_p) = config.top_p {
            generation_config["topP"] = serde_json::json!(top_p);
        }
        if let Some(top_k) = config.top_k {
            generation_config["topK"] = serde_json::json!(top_k);
        }

        serde_json::json!({
            "contents": [
                { "role": "user", "parts": [{ "text": request.prompt }] }
            ],
            "generationConfig": generation_config,
        })
    }

    /// Extract the generated text from the first candidate.
    fn parse_response(body: &Value) -> Result<String, ProviderError> {
        let candidates = body["candidates"].as_array();
        let Some(candidate) = candidates.and_then(|c| c.first()) else {
            let reason = body["promptFeedback"]["blockReason"]
                .as_str()
                .map(|r| format!("prompt blocked ({})", r))
                .unwrap_or_else(|| "no candidates in response".to_string());
            return Err(ProviderError::EmptyResponse { reason });
        };

        let text: String = candidate["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate["finishReason"]
                .as_str()
                .unwrap_or("no text parts")
                .to_string();
            return Err(ProviderError::EmptyResponse { reason });
        }
        Ok(text)
    }

    /// Map an HTTP status code to the appropriate `ProviderError`.
    fn map_http_error(status: reqwest::StatusCode, body_text: &str) -> ProviderError {
        match status.as_u16() {
            401 | 403 => ProviderError::AuthFailed {
                provider: "gemini".to_string(),
            },
            429 => ProviderError::RateLimited {
                retry_after_secs: 30,
            },
            503 => ProviderError::Connection {
                message: "Gemini API is unavailable".to_string(),
            },
            _ => ProviderError::ApiRequest {
                message: format!("HTTP {} from Gemini API: {}", status, body_text),
            },
        }
    }

    /// Endpoint for a model method; the key travels as a query parameter.
    fn endpoint_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.base_url, self.model, method, self.api_key
        )
    }

    async fn send_once(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let body = Self::build_request_body(request);
        let url = self.endpoint_url("generateContent");

        debug!(model = self.model.as_str(), "Sending Gemini generation request");

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| super::map_transport_error(e.without_url(), self.timeout_secs))?;

        let status = response.status();
        let body_text = response.text().await.map_err(|e| ProviderError::ResponseParse {
            message: format!("Failed to read response body: {}", e.without_url()),
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
impl GenerationProvider for GeminiProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError> {
        let request = &request;
        super::with_retry(&self.retry, || self.send_once(request)).await
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn default_config(&self) -> GenerationConfig {
        self.config.clone()
    }
}
