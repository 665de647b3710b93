//! Generation module — text-generation provider abstraction.
//!
//! Defines the `GenerationProvider` trait that every backend adapter implements,
//! the per-call `GenerationRequest`, and a scripted `MockGenerationProvider`
//! for tests and dry runs.

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Sampling and length parameters for one generation call.
///
/// Unset sampling parameters are omitted from the wire request so the backend
/// applies its own defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: None,
            top_p: None,
            top_k: None,
            max_output_tokens: 2048,
        }
    }
}

impl GenerationConfig {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

/// A prompt plus its generation configuration. Built fresh for every call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub config: GenerationConfig,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, config: GenerationConfig) -> Self {
        Self {
            prompt: prompt.into(),
            config,
        }
    }
}

/// A text-generation backend: prompt in, generated text out.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate text for the request, or fail with the backend's reason.
    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError>;

    /// Short provider name ("anthropic", "gemini", ...).
    fn name(&self) -> &str;

    /// Return the model name.
    fn model_name(&self) -> &str;

    /// Generation config used for single-paper and multi-paper prompts.
    fn default_config(&self) -> GenerationConfig;

    /// Generation config used for comparisons, which produce longer output.
    fn comparison_config(&self) -> GenerationConfig {
        let base = self.default_config();
        let max = base.max_output_tokens.saturating_mul(3) / 2;
        base.with_max_output_tokens(max)
    }
}

enum MockRule {
    FailWhenContains { needle: String, error: ProviderError },
}

/// Scripted provider that records every request it receives.
///
/// Responses are served from a queue; once the queue is drained the fallback
/// text is returned. Failure rules are checked before the queue.
pub struct MockGenerationProvider {
    model: String,
    fallback: String,
    config: GenerationConfig,
    responses: Mutex<Vec<String>>,
    rules: Vec<MockRule>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerationProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            fallback: "I'm a mock provider. No queued responses available.".to_string(),
            config: GenerationConfig::default(),
            responses: Mutex::new(Vec::new()),
            rules: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns the given text.
    pub fn with_response(text: &str) -> Self {
        let mut provider = Self::new();
        provider.fallback = text.to_string();
        provider
    }

    /// Fail any request whose prompt contains `needle`.
    pub fn fail_when_prompt_contains(mut self, needle: &str, error: ProviderError) -> Self {
        self.rules.push(MockRule::FailWhenContains {
            needle: needle.to_string(),
            error,
        });
        self
    }

    /// Fail every request.
    pub fn always_failing(error: ProviderError) -> Self {
        Self::new().fail_when_prompt_contains("", error)
    }

    /// Queue a response to be returned by the next successful `generate` call.
    pub fn queue_response(&self, text: &str) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
    }

    /// All requests received so far, in call order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for MockGenerationProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationProvider for MockGenerationProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError> {
        let prompt = request.prompt.clone();
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        for rule in &self.rules {
            let MockRule::FailWhenContains { needle, error } = rule;
            if prompt.contains(needle.as_str()) {
                return Err(error.clone());
            }
        }

        let mut responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
        if responses.is_empty() {
            Ok(self.fallback.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn default_config(&self) -> GenerationConfig {
        self.config.clone()
    }
}
