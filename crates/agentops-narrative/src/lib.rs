// crates/agentops-narrative/src/lib.rs
// ============================================================================
// Crate: agentops-narrative
// Description: Hypothesis prose and action-item generation from a Category.
// Purpose: Deterministic templates (authoritative) plus opt-in LLM rewrite.
// Dependencies: agentops-core, reqwest
// ============================================================================

//! ## Overview
//! [`NarrativeEngine::describe`] and [`NarrativeEngine::action_items`]
//! implement NE. The deterministic templates in [`templates`] are always
//! computed; [`llm`] enrichment, when configured, may only rewrite the
//! description text, and any enrichment failure silently falls back to the
//! deterministic string — this crate never surfaces an LLM error to callers.

pub mod llm;
pub mod templates;

use std::sync::Arc;

use agentops_core::model::{ActionItem, Category};
use llm::LlmClient;

/// Maximum evidence snippets appended to a hypothesis description.
const MAX_SUFFIX_SNIPPETS: usize = 2;

/// Generates hypothesis prose and action items from a classified [`Category`].
pub struct NarrativeEngine {
    llm: Option<Arc<dyn LlmClient>>,
}

impl Default for NarrativeEngine {
    fn default() -> Self {
        Self::deterministic()
    }
}

impl NarrativeEngine {
    /// Builds an engine with no LLM enrichment — the authoritative mode
    /// used whenever `openai_api_key` is unset.
    #[must_use]
    pub fn deterministic() -> Self {
        Self { llm: None }
    }

    /// Builds an engine that attempts LLM enrichment before falling back
    /// to the deterministic template.
    #[must_use]
    pub fn with_llm(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm: Some(llm) }
    }

    /// Produces the hypothesis description for `category`: the fixed
    /// per-category template, optionally suffixed with up to the first two
    /// evidence snippets, then optionally rewritten by the LLM.
    #[must_use]
    pub fn describe(&self, category: Category, evidence_snippets: &[String]) -> String {
        let base = templates::description_template(category).to_owned();
        let deterministic = if evidence_snippets.is_empty() {
            base
        } else {
            let suffix = evidence_snippets
                .iter()
                .take(MAX_SUFFIX_SNIPPETS)
                .cloned()
                .collect::<Vec<_>>()
                .join("; ");
            format!("{base} Evidence shows: {suffix}")
        };

        match &self.llm {
            Some(client) => client
                .rewrite(&deterministic, evidence_snippets)
                .unwrap_or(deterministic),
            None => deterministic,
        }
    }

    /// Produces the action-item list for `category`, or the fixed
    /// insufficient-evidence list when `insufficient` is true.
    #[must_use]
    pub fn action_items(&self, category: Category, insufficient: bool) -> Vec<ActionItem> {
        if insufficient {
            templates::insufficient_evidence_action_items()
        } else {
            templates::action_items_for(category)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm::LlmError;

    struct FailingLlm;
    impl LlmClient for FailingLlm {
        fn rewrite(&self, _d: &str, _e: &[String]) -> Result<String, LlmError> {
            Err(LlmError::Empty)
        }
    }

    struct EchoLlm;
    impl LlmClient for EchoLlm {
        fn rewrite(&self, deterministic: &str, _e: &[String]) -> Result<String, LlmError> {
            Ok(format!("rewritten: {deterministic}"))
        }
    }

    #[test]
    fn deterministic_mode_ignores_llm_entirely() {
        let engine = NarrativeEngine::deterministic();
        let text = engine.describe(Category::Timeout, &[]);
        assert_eq!(text, templates::description_template(Category::Timeout));
    }

    #[test]
    fn evidence_snippets_are_suffixed_with_evidence_shows() {
        let engine = NarrativeEngine::deterministic();
        let text = engine.describe(Category::Timeout, &["snippet one".to_owned()]);
        assert!(text.ends_with("Evidence shows: snippet one"));
    }

    #[test]
    fn only_first_two_snippets_are_used() {
        let engine = NarrativeEngine::deterministic();
        let text = engine.describe(
            Category::Timeout,
            &["a".to_owned(), "b".to_owned(), "c".to_owned()],
        );
        assert!(text.contains("a; b"));
        assert!(!text.contains("c"));
    }

    #[test]
    fn failing_llm_falls_back_to_deterministic_text() {
        let engine = NarrativeEngine::with_llm(std::sync::Arc::new(FailingLlm));
        let text = engine.describe(Category::Timeout, &[]);
        assert_eq!(text, templates::description_template(Category::Timeout));
    }

    #[test]
    fn successful_llm_rewrite_is_used() {
        let engine = NarrativeEngine::with_llm(std::sync::Arc::new(EchoLlm));
        let text = engine.describe(Category::Timeout, &[]);
        assert!(text.starts_with("rewritten:"));
    }

    #[test]
    fn insufficient_gate_returns_fixed_list_regardless_of_category() {
        let engine = NarrativeEngine::deterministic();
        let items = engine.action_items(Category::RateLimited, true);
        assert!(items.iter().any(|i| i.title == "Enable detailed tracing"));
    }
}
