//! Analysis orchestrator: binds one generation provider and runs analyses.
//!
//! Every operation renders a prompt with [`PromptBuilder`], makes exactly one
//! provider call per prompt and returns the raw text. Calls are awaited one at a
//! time; nothing is cached between operations.

use crate::error::AnalysisError;
use crate::generation::{GenerationConfig, GenerationProvider, GenerationRequest};
use crate::paper::PaperRecord;
use crate::prompt::{AnalysisKind, PromptBuilder};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Characters of the title shown in per-item progress logs.
const TITLE_PREVIEW_CHARS: usize = 50;

/// Runs analyses against a bound [`GenerationProvider`].
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    provider: Arc<dyn GenerationProvider>,
}

impl AnalysisOrchestrator {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn GenerationProvider> {
        &self.provider
    }

    async fn generate(
        &self,
        prompt: String,
        config: GenerationConfig,
    ) -> Result<String, AnalysisError> {
        debug!(
            provider = self.provider.name(),
            model = self.provider.model_name(),
            prompt_chars = prompt.len(),
            "Requesting generation"
        );
        let text = self
            .provider
            .generate(GenerationRequest::new(prompt, config))
            .await?;
        Ok(text)
    }

    /// Analyze one paper with the provider's default generation config.
    pub async fn analyze(
        &self,
        paper: &PaperRecord,
        kind: AnalysisKind,
        custom_instruction: Option<&str>,
    ) -> Result<String, AnalysisError> {
        self.analyze_with_config(paper, kind, custom_instruction, self.provider.default_config())
            .await
    }

    /// Analyze one paper with an explicit generation config.
    pub async fn analyze_with_config(
        &self,
        paper: &PaperRecord,
        kind: AnalysisKind,
        custom_instruction: Option<&str>,
        config: GenerationConfig,
    ) -> Result<String, AnalysisError> {
        let prompt = PromptBuilder::build_single(paper, kind, custom_instruction);
        self.generate(prompt, config).await
    }

    /// Analyze each paper in order, one request at a time.
    ///
    /// Returns a copy of every input record with its analysis attached. A failed
    /// item gets the `"Error: <reason>"` sentinel and the batch moves on.
    pub async fn batch_analyze(
        &self,
        papers: &[PaperRecord],
        kind: AnalysisKind,
        config: Option<GenerationConfig>,
    ) -> Vec<PaperRecord> {
        let config = config.unwrap_or_else(|| self.provider.default_config());
        let total = papers.len();
        let mut results = Vec::with_capacity(total);

        for (i, paper) in papers.iter().enumerate() {
            let preview: String = paper.title.chars().take(TITLE_PREVIEW_CHARS).collect();
            info!(
                kind = kind.as_str(),
                "Analyzing {}/{}: {}...",
                i + 1,
                total,
                preview
            );

            match self
                .analyze_with_config(paper, kind, None, config.clone())
                .await
            {
                Ok(text) => results.push(paper.with_analysis(text)),
                Err(e) => {
                    // The sentinel carries the provider's own reason.
                    let reason = match e {
                        AnalysisError::AnalysisFailed(inner) => inner.to_string(),
                        other => other.to_string(),
                    };
                    warn!(
                        paper_id = paper.id.as_str(),
                        error = reason.as_str(),
                        "Analysis failed, continuing"
                    );
                    results.push(paper.with_error(reason));
                }
            }
        }

        results
    }

    /// Compare two or more papers in a single request.
    ///
    /// Uses the provider's comparison config unless one is given.
    pub async fn compare(
        &self,
        papers: &[PaperRecord],
        config: Option<GenerationConfig>,
    ) -> Result<String, AnalysisError> {
        let prompt = PromptBuilder::build_comparison(papers)?;
        let config = config.unwrap_or_else(|| self.provider.comparison_config());
        info!(count = papers.len(), "Comparing papers");
        self.generate(prompt, config).await
    }

    /// Ask for the `max_concepts` most important concepts across `papers`.
    ///
    /// The provider's numbered list is returned as-is.
    pub async fn extract_concepts(
        &self,
        papers: &[PaperRecord],
        max_concepts: usize,
    ) -> Result<String, AnalysisError> {
        let prompt = PromptBuilder::build_concept_extraction(papers, max_concepts);
        self.generate(prompt, self.provider.default_config()).await
    }

    pub async fn generate_research_questions(
        &self,
        papers: &[PaperRecord],
        num_questions: usize,
    ) -> Result<String, AnalysisError> {
        let prompt = PromptBuilder::build_research_questions(papers, num_questions);
        self.generate(prompt, self.provider.default_config()).await
    }
}
