//! Error types for the paperlens core library.
//!
//! Uses `thiserror` for public API error types with one enum per domain:
//! generation providers, analysis orchestration, paper search, and configuration.

use std::path::PathBuf;

/// Top-level error type for the paperlens core library.
#[derive(Debug, thiserror::Error)]
pub enum PaperlensError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures surfaced by a generation backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Provider returned no text: {reason}")]
    EmptyResponse { reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Errors from prompt construction and analysis orchestration.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Missing credential for {provider}: set {env_var} or configure llm.api_key")]
    MissingCredential { provider: String, env_var: String },

    #[error("Insufficient input: need at least {required} papers, got {given}")]
    InsufficientInput { required: usize, given: usize },

    #[error("Invalid analysis kind: '{kind}'")]
    InvalidKind { kind: String },

    #[error("Analysis failed: {0}")]
    AnalysisFailed(#[from] ProviderError),
}

/// Errors from the paper search and download collaborator.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search request failed: {message}")]
    Request { message: String },

    #[error("Search service returned status {status}")]
    Status { status: u16 },

    #[error("Paper '{id}' not found")]
    NotFound { id: String },

    #[error("Invalid paper id '{id}'")]
    InvalidId { id: String },

    #[error("Download from {url} is not a PDF")]
    NotPdf { url: String },

    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `PaperlensError`.
pub type Result<T> = std::result::Result<T, PaperlensError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_provider() {
        let err = PaperlensError::Provider(ProviderError::ApiRequest {
            message: "connection refused".into(),
        });
        assert_eq!(
            err.to_string(),
            "Provider error: API request failed: connection refused"
        );
    }

    #[test]
    fn test_analysis_failed_carries_provider_reason() {
        let err = AnalysisError::from(ProviderError::RateLimited {
            retry_after_secs: 60,
        });
        assert_eq!(
            err.to_string(),
            "Analysis failed: Rate limited by provider, retry after 60s"
        );
        match err {
            AnalysisError::AnalysisFailed(inner) => {
                assert_eq!(inner, ProviderError::RateLimited { retry_after_secs: 60 });
            }
            other => panic!("Expected AnalysisFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_credential_names_env_var() {
        let err = AnalysisError::MissingCredential {
            provider: "gemini".into(),
            env_var: "GOOGLE_API_KEY".into(),
        };
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_insufficient_input_display() {
        let err = AnalysisError::InsufficientInput {
            required: 2,
            given: 1,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient input: need at least 2 papers, got 1"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PaperlensError = io_err.into();
        assert!(matches!(err, PaperlensError::Io(_)));
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: PaperlensError = serde_err.into();
        assert!(matches!(err, PaperlensError::Serialization(_)));
    }
}
