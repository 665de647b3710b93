//! Prompt construction for every analysis operation.
//!
//! All builders are pure functions of their inputs: identical papers, kinds and
//! instructions always render byte-identical prompts.

use crate::error::AnalysisError;
use crate::paper::PaperRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

const SUMMARY_INSTRUCTION: &str = "Please provide a concise summary of this paper, highlighting the main contributions and findings.";
const KEY_FINDINGS_INSTRUCTION: &str =
    "What are the key findings and contributions of this paper? List them clearly.";
const METHODOLOGY_INSTRUCTION: &str =
    "Analyze the methodology used in this paper. What approaches did the authors take?";
const CRITIQUE_INSTRUCTION: &str = "Provide a balanced critique of this paper, discussing both strengths and potential limitations.";

/// The four fixed directives rendered into every comparison prompt.
pub const COMPARISON_DIRECTIVES: [&str; 4] = [
    "Identifying common themes and research directions",
    "Highlighting key differences in approach or findings",
    "Discussing how these papers relate to each other",
    "Noting any complementary or contradictory findings",
];

/// Minimum number of papers a comparison needs.
pub const MIN_COMPARISON_PAPERS: usize = 2;

/// Selector for the instruction rendered into a single-paper prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    #[default]
    Summary,
    KeyFindings,
    Methodology,
    Critique,
    /// Requires a caller-supplied instruction.
    Custom,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 5] = [
        AnalysisKind::Summary,
        AnalysisKind::KeyFindings,
        AnalysisKind::Methodology,
        AnalysisKind::Critique,
        AnalysisKind::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Summary => "summary",
            AnalysisKind::KeyFindings => "key_findings",
            AnalysisKind::Methodology => "methodology",
            AnalysisKind::Critique => "critique",
            AnalysisKind::Custom => "custom",
        }
    }

    /// The fixed instruction for this kind; `None` for `Custom`.
    pub fn instruction(&self) -> Option<&'static str> {
        match self {
            AnalysisKind::Summary => Some(SUMMARY_INSTRUCTION),
            AnalysisKind::KeyFindings => Some(KEY_FINDINGS_INSTRUCTION),
            AnalysisKind::Methodology => Some(METHODOLOGY_INSTRUCTION),
            AnalysisKind::Critique => Some(CRITIQUE_INSTRUCTION),
            AnalysisKind::Custom => None,
        }
    }

    /// Parse a kind, downgrading anything unrecognized to `Summary`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(e) => {
                warn!(error = %e, "Falling back to summary analysis");
                AnalysisKind::Summary
            }
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "summary" => Ok(AnalysisKind::Summary),
            "key_findings" => Ok(AnalysisKind::KeyFindings),
            "methodology" => Ok(AnalysisKind::Methodology),
            "critique" => Ok(AnalysisKind::Critique),
            "custom" => Ok(AnalysisKind::Custom),
            _ => Err(AnalysisError::InvalidKind {
                kind: s.to_string(),
            }),
        }
    }
}

/// Renders analysis prompts from structured paper data.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    /// Render the single-paper prompt: header block followed by one instruction.
    ///
    /// A non-empty `custom_instruction` always takes precedence over `kind`.
    /// `Custom` without an instruction falls back to the summary instruction.
    pub fn build_single(
        paper: &PaperRecord,
        kind: AnalysisKind,
        custom_instruction: Option<&str>,
    ) -> String {
        let instruction = Self::resolve_instruction(kind, custom_instruction);
        let header = format!(
            "\nTitle: {}\n\nAuthors: {}\n\nPublished: {}\n\nCategories: {}\n\nAbstract:\n{}\n",
            paper.title,
            paper.authors_str(),
            paper.published.format("%Y-%m-%d"),
            paper.categories_str(),
            paper.r#abstract,
        );
        format!("{}\n\n{}", header, instruction)
    }

    fn resolve_instruction(kind: AnalysisKind, custom_instruction: Option<&str>) -> &str {
        if let Some(custom) = custom_instruction.filter(|c| !c.trim().is_empty()) {
            return custom;
        }
        kind.instruction().unwrap_or_else(|| {
            warn!(
                kind = kind.as_str(),
                "No custom instruction supplied, using summary instruction"
            );
            SUMMARY_INSTRUCTION
        })
    }

    /// Render the multi-paper comparison prompt.
    pub fn build_comparison(papers: &[PaperRecord]) -> Result<String, AnalysisError> {
        if papers.len() < MIN_COMPARISON_PAPERS {
            return Err(AnalysisError::InsufficientInput {
                required: MIN_COMPARISON_PAPERS,
                given: papers.len(),
            });
        }

        let mut papers_text = String::new();
        for (i, paper) in papers.iter().enumerate() {
            papers_text.push_str(&format!(
                "\nPaper {}:\nTitle: {}\nAuthors: {}\nAbstract: {}\n\n---\n",
                i + 1,
                paper.title,
                paper.authors_str(),
                paper.r#abstract,
            ));
        }

        let directives = COMPARISON_DIRECTIVES
            .iter()
            .enumerate()
            .map(|(i, d)| format!("{}. {}", i + 1, d))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(format!(
            "Here are {} research papers. Please compare them by:\n\n{}\n\nPapers:\n{}\n\nPlease provide a comparative analysis:",
            papers.len(),
            directives,
            papers_text,
        ))
    }

    /// Render the concept-extraction prompt over all titles and abstracts.
    pub fn build_concept_extraction(papers: &[PaperRecord], max_concepts: usize) -> String {
        let abstracts = papers
            .iter()
            .map(|p| format!("Paper: {}\n{}", p.title, p.r#abstract))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "Analyze these research paper abstracts and extract the {} most important \
technical concepts, methods, or themes. For each concept, provide a brief explanation.\n\n\
Format your response as a numbered list:\n\
1. Concept Name: Brief explanation\n\
2. Concept Name: Brief explanation\n\
...\n\n\
Abstracts:\n{}\n",
            max_concepts, abstracts,
        )
    }

    /// Render the research-question prompt over all titles and abstracts.
    pub fn build_research_questions(papers: &[PaperRecord], num_questions: usize) -> String {
        let papers_summary = papers
            .iter()
            .map(|p| format!("Title: {}\nAbstract: {}", p.title, p.r#abstract))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "Based on these research papers, generate {n} interesting and \
unexplored research questions that could advance this field. Focus on gaps, contradictions, \
or natural extensions of the current work.\n\n\
Papers:\n{papers}\n\n\
Generate {n} research questions:",
            n = num_questions,
            papers = papers_summary,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn paper(id: &str, title: &str, summary: &str) -> PaperRecord {
        let mut p = PaperRecord::new(id, title);
        p.authors = vec!["Ada Lovelace".to_string(), "Alan Turing".to_string()];
        p.r#abstract = summary.to_string();
        p.published = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        p.categories = vec!["cs.AI".to_string(), "cs.LG".to_string()];
        p
    }

    #[test]
    fn test_build_single_renders_header_and_instruction() {
        let p = paper("2403.00001", "Sparse Mixtures", "We study sparsity.");
        let prompt = PromptBuilder::build_single(&p, AnalysisKind::Critique, None);
        assert_eq!(
            prompt,
            "\nTitle: Sparse Mixtures\n\nAuthors: Ada Lovelace, Alan Turing\n\nPublished: 2024-03-01\n\n\
Categories: cs.AI, cs.LG\n\nAbstract:\nWe study sparsity.\n\n\n\
Provide a balanced critique of this paper, discussing both strengths and potential limitations."
        );
    }

    #[test]
    fn test_build_single_is_deterministic() {
        let p = paper("2403.00001", "Sparse Mixtures", "We study sparsity.");
        for kind in AnalysisKind::ALL {
            let a = PromptBuilder::build_single(&p, kind, Some("Explain the dataset."));
            let b = PromptBuilder::build_single(&p, kind, Some("Explain the dataset."));
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_custom_instruction_overrides_kind() {
        let p = paper("1", "T", "A");
        let prompt = PromptBuilder::build_single(&p, AnalysisKind::Methodology, Some("List datasets."));
        assert!(prompt.ends_with("List datasets."));
        assert!(!prompt.contains(METHODOLOGY_INSTRUCTION));
    }

    #[test]
    fn test_custom_without_instruction_falls_back_to_summary() {
        let p = paper("1", "T", "A");
        let prompt = PromptBuilder::build_single(&p, AnalysisKind::Custom, None);
        assert!(prompt.ends_with(SUMMARY_INSTRUCTION));
        let blank = PromptBuilder::build_single(&p, AnalysisKind::Custom, Some("   "));
        assert!(blank.ends_with(SUMMARY_INSTRUCTION));
    }

    #[test]
    fn test_unknown_kind_falls_back_to_summary() {
        assert_eq!(AnalysisKind::parse_lenient("eli5"), AnalysisKind::Summary);
        let p = paper("1", "T", "A");
        let prompt = PromptBuilder::build_single(&p, AnalysisKind::parse_lenient("eli5"), None);
        assert!(prompt.ends_with(SUMMARY_INSTRUCTION));
    }

    #[test]
    fn test_strict_parse_reports_invalid_kind() {
        let err = "eli5".parse::<AnalysisKind>().unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidKind { kind } if kind == "eli5"));
        assert_eq!("Key-Findings".parse::<AnalysisKind>().unwrap(), AnalysisKind::KeyFindings);
    }

    #[test]
    fn test_kind_round_trips_through_display() {
        for kind in AnalysisKind::ALL {
            assert_eq!(kind.to_string().parse::<AnalysisKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_build_comparison_requires_two_papers() {
        let err = PromptBuilder::build_comparison(&[]).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientInput { required: 2, given: 0 }));
        let one = [paper("1", "Only", "Alone")];
        let err = PromptBuilder::build_comparison(&one).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientInput { required: 2, given: 1 }));
    }

    #[test]
    fn test_build_comparison_contains_papers_and_directives() {
        let a = paper("1", "Paper Alpha", "Alpha abstract about graphs.");
        let b = paper("2", "Paper Beta", "Beta abstract about résumés.");
        let prompt = PromptBuilder::build_comparison(&[a, b]).unwrap();
        assert!(prompt.starts_with("Here are 2 research papers."));
        assert!(prompt.contains("Paper 1:\nTitle: Paper Alpha"));
        assert!(prompt.contains("Paper 2:\nTitle: Paper Beta"));
        assert!(prompt.contains("Alpha abstract about graphs."));
        assert!(prompt.contains("Beta abstract about résumés."));
        for directive in COMPARISON_DIRECTIVES {
            assert!(prompt.contains(directive), "missing directive: {}", directive);
        }
        assert_eq!(prompt.matches("\n---\n").count(), 2);
    }

    #[test]
    fn test_build_concept_extraction() {
        let papers = [paper("1", "One", "First."), paper("2", "Two", "Second.")];
        let prompt = PromptBuilder::build_concept_extraction(&papers, 7);
        assert!(prompt.contains("extract the 7 most important"));
        assert!(prompt.contains("Paper: One\nFirst.\n\nPaper: Two\nSecond."));
        assert!(prompt.contains("1. Concept Name: Brief explanation"));
    }

    #[test]
    fn test_build_research_questions() {
        let papers = [paper("1", "One", "First.")];
        let prompt = PromptBuilder::build_research_questions(&papers, 3);
        assert!(prompt.contains("generate 3 interesting"));
        assert!(prompt.contains("Title: One\nAbstract: First."));
        assert!(prompt.ends_with("Generate 3 research questions:"));
    }
}
