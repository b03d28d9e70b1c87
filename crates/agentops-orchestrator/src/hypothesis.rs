// crates/agentops-orchestrator/src/hypothesis.rs
// ============================================================================
// Module: Hypothesis Assembly
// Description: Builds the single hypothesis emitted for a sufficient report.
// Purpose: Implement RO's §4.6.5 hypothesis assembly.
// Dependencies: agentops-core, agentops-narrative
// ============================================================================

use agentops_core::model::{Category, Confidence, EvidenceRef, Hypothesis};
use agentops_core::HypothesisId;
use agentops_narrative::NarrativeEngine;

/// Maximum evidence ids attached to the hypothesis.
const MAX_EVIDENCE_IDS: usize = 5;

/// Minimum evidence-id count required for `high` confidence.
const HIGH_CONFIDENCE_EVIDENCE_THRESHOLD: usize = 2;

/// The fixed verification-step triple used for every sufficient hypothesis.
fn verification_steps() -> Vec<String> {
    vec![
        "Confirm the classified category against the referenced evidence.".to_owned(),
        "Reproduce the failure in a staging environment if possible.".to_owned(),
        "Validate that the proposed action items resolve the underlying cause.".to_owned(),
    ]
}

/// Builds the single hypothesis emitted when the sufficiency gate passes.
#[must_use]
pub fn assemble(engine: &NarrativeEngine, category: Category, evidence_index: &[EvidenceRef]) -> Hypothesis {
    let evidence_ids: Vec<_> = evidence_index.iter().take(MAX_EVIDENCE_IDS).map(|e| e.evidence_id.clone()).collect();
    let snippets: Vec<String> = evidence_index.iter().map(|e| e.snippet.clone()).collect();

    Hypothesis {
        hypothesis_id: HypothesisId::generate(),
        title: format!("{} Root Cause", category.title_case()),
        description: engine.describe(category, &snippets),
        confidence: if evidence_ids.len() >= HIGH_CONFIDENCE_EVIDENCE_THRESHOLD {
            Confidence::High
        } else {
            Confidence::Medium
        },
        evidence_ids,
        verification_steps: verification_steps(),
        mitigation: Some("Apply recommended action items below".to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use agentops_core::model::EvidenceKind;

    use super::*;

    fn evidence_ref(id: &str) -> EvidenceRef {
        EvidenceRef {
            evidence_id: id.into(),
            kind: EvidenceKind::Step,
            ref_id: id.to_owned(),
            title: "t".to_owned(),
            snippet: "s".to_owned(),
            attributes: serde_json::Value::Null,
        }
    }

    #[test]
    fn single_evidence_ref_gives_medium_confidence() {
        let engine = NarrativeEngine::deterministic();
        let hyp = assemble(&engine, Category::Timeout, &[evidence_ref("ev1")]);
        assert_eq!(hyp.confidence, Confidence::Medium);
        assert_eq!(hyp.evidence_ids.len(), 1);
    }

    #[test]
    fn two_or_more_evidence_refs_give_high_confidence() {
        let engine = NarrativeEngine::deterministic();
        let hyp = assemble(&engine, Category::Timeout, &[evidence_ref("ev1"), evidence_ref("ev2")]);
        assert_eq!(hyp.confidence, Confidence::High);
    }

    #[test]
    fn evidence_ids_are_capped_at_five() {
        let engine = NarrativeEngine::deterministic();
        let refs: Vec<_> = (0..10).map(|i| evidence_ref(&format!("ev{i}"))).collect();
        let hyp = assemble(&engine, Category::Unknown, &refs);
        assert_eq!(hyp.evidence_ids.len(), 5);
    }
}
