//! # Paperlens Core
//!
//! Core library for paperlens, an arXiv research assistant.
//! Provides the canonical paper record, prompt construction, the generation
//! provider abstraction with Anthropic and Gemini adapters, the analysis
//! orchestrator, result persistence, the arXiv client, and configuration.

pub mod arxiv;
pub mod config;
pub mod error;
pub mod generation;
pub mod orchestrator;
pub mod paper;
pub mod persistence;
pub mod prompt;
pub mod providers;

// Re-export commonly used types at the crate root.
pub use arxiv::{ArxivClient, PaperSource, SearchQuery, SortCriterion};
pub use config::{AppConfig, LlmConfig, ProviderKind};
pub use error::{AnalysisError, PaperlensError, ProviderError, Result, SearchError};
pub use generation::{
    GenerationConfig, GenerationProvider, GenerationRequest, MockGenerationProvider,
};
pub use orchestrator::AnalysisOrchestrator;
pub use paper::{PaperRecord, RawPaper};
pub use persistence::ResultStore;
pub use prompt::{AnalysisKind, PromptBuilder};
pub use providers::create_provider;
