// crates/agentops-orchestrator/src/ticket.rs
// ============================================================================
// Module: Ticket Fields
// Description: Jira-ready summary and Markdown description for a report.
// Purpose: Implement RO's §4.6.4 ticket-field generation.
// Dependencies: agentops-core
// ============================================================================

use agentops_core::model::{ActionItem, Category, Hypothesis, JiraFields};
use agentops_core::RunId;

/// Builds `jira_summary` and `jira_description_md` for a report.
#[must_use]
pub fn build(category: Category, run_id: &RunId, hypotheses: &[Hypothesis], action_items: &[ActionItem], insufficient: bool) -> JiraFields {
    let run_prefix: String = run_id.as_str().chars().take(8).collect();
    let jira_summary = format!("[AgentOps RCA] {} - Run {}", category.title_case(), run_prefix);

    let mut md = format!("# AgentOps RCA — {}\n\n- Run: `{}`\n\n## Hypotheses\n\n", category.title_case(), run_id);

    if insufficient || hypotheses.is_empty() {
        md.push_str("_Insufficient evidence to propose a root-cause hypothesis._\n\n");
    } else {
        for hyp in hypotheses {
            md.push_str(&format!(
                "- **{}** (confidence: {:?}) — {} _(evidence: {})_\n",
                hyp.title,
                hyp.confidence,
                hyp.description,
                hyp.evidence_ids.len()
            ));
        }
        md.push('\n');
    }

    md.push_str("## Action Items\n\n");
    for item in action_items {
        md.push_str(&format!(
            "- [{:?}] **{}** ({:?})\n  {}\n",
            item.priority, item.title, item.kind, item.description
        ));
    }

    JiraFields {
        jira_summary,
        jira_description_md: md,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_uses_first_eight_chars_of_run_id() {
        let fields = build(Category::RateLimited, &RunId::new("abcdefghij"), &[], &[], true);
        assert_eq!(fields.jira_summary, "[AgentOps RCA] Rate Limited - Run abcdefgh");
    }

    #[test]
    fn insufficient_evidence_md_contains_placeholder() {
        let fields = build(Category::Unknown, &RunId::new("r1"), &[], &[], true);
        assert!(fields.jira_description_md.contains("Insufficient evidence"));
    }
}
