//! Property-based tests for core components using proptest.

use proptest::prelude::*;

use paperlens_core::error::ProviderError;
use paperlens_core::generation::MockGenerationProvider;
use paperlens_core::paper::{PaperRecord, canonical_id};
use paperlens_core::prompt::{AnalysisKind, PromptBuilder};
use paperlens_core::AnalysisOrchestrator;
use std::sync::Arc;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn kind_strategy() -> impl Strategy<Value = AnalysisKind> {
    prop::sample::select(AnalysisKind::ALL.to_vec())
}

// --- Batch analysis properties ---

proptest! {
    #[test]
    fn batch_preserves_length_and_order(
        titles in prop::collection::vec("[A-Za-z][A-Za-z ]{0,20}", 0..8),
        failing in prop::collection::vec(any::<bool>(), 8),
        kind in kind_strategy(),
    ) {
        let papers: Vec<PaperRecord> = titles
            .iter()
            .enumerate()
            .map(|(i, t)| PaperRecord::new(format!("id-{}", i), format!("{} #{}", t, i)))
            .collect();

        let mut mock = MockGenerationProvider::with_response("analysis");
        for (i, paper) in papers.iter().enumerate() {
            if failing[i] {
                mock = mock.fail_when_prompt_contains(
                    &format!("Title: {}\n", paper.title),
                    ProviderError::Timeout { timeout_secs: 1 },
                );
            }
        }
        let mock = Arc::new(mock);
        let orchestrator = AnalysisOrchestrator::new(mock.clone());

        let results = block_on(orchestrator.batch_analyze(&papers, kind, None));

        prop_assert_eq!(results.len(), papers.len());
        prop_assert_eq!(mock.call_count(), papers.len());
        for (i, (input, output)) in papers.iter().zip(&results).enumerate() {
            prop_assert_eq!(&input.id, &output.id);
            prop_assert!(output.analysis().is_some());
            prop_assert_eq!(output.has_failed_analysis(), failing[i]);
            if !failing[i] {
                prop_assert_eq!(output.analysis(), Some("analysis"));
            }
        }
    }
}

// --- Prompt properties ---

proptest! {
    #[test]
    fn build_single_is_deterministic(
        title in ".{0,40}",
        summary in ".{0,200}",
        kind in kind_strategy(),
        custom in prop::option::of(".{0,40}"),
    ) {
        let mut paper = PaperRecord::new("x", title);
        paper.r#abstract = summary;
        let a = PromptBuilder::build_single(&paper, kind, custom.as_deref());
        let b = PromptBuilder::build_single(&paper, kind, custom.as_deref());
        prop_assert_eq!(a, b);
    }

    #[test]
    fn comparison_accepts_two_or_more(n in 0usize..6) {
        let papers: Vec<PaperRecord> = (0..n)
            .map(|i| PaperRecord::new(i.to_string(), format!("Paper {}", i)))
            .collect();
        prop_assert_eq!(PromptBuilder::build_comparison(&papers).is_ok(), n >= 2);
    }

    #[test]
    fn unknown_kind_strings_fall_back_to_summary(s in "[a-z]{1,12}") {
        prop_assume!(s.parse::<AnalysisKind>().is_err());
        prop_assert_eq!(AnalysisKind::parse_lenient(&s), AnalysisKind::Summary);
    }
}

// --- Identifier properties ---

proptest! {
    #[test]
    fn canonical_id_is_last_segment(yymm in 1000u32..9999, num in 10000u32..99999, v in 1u32..9) {
        let id = format!("{}.{}v{}", yymm, num, v);
        let entry = format!("http://arxiv.org/abs/{}", id);
        prop_assert_eq!(canonical_id(&entry), id.clone());
        prop_assert_eq!(canonical_id(&entry), canonical_id(&entry));
    }
}
