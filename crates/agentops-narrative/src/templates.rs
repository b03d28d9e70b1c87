// crates/agentops-narrative/src/templates.rs
// ============================================================================
// Module: Deterministic Narrative Templates
// Description: Fixed per-category hypothesis and action-item content.
// Purpose: Authoritative source of truth for NE's deterministic mode.
// Dependencies: agentops-core
// ============================================================================

use agentops_core::model::{ActionItem, ActionItemPriority, ActionItemType, Category};
use agentops_core::ActionId;

/// The fixed description template for a category, before evidence-snippet
/// suffixing.
#[must_use]
pub fn description_template(category: Category) -> &'static str {
    match category {
        Category::ToolSchemaMismatch => {
            "A tool call failed because its arguments or response did not match the expected schema."
        }
        Category::RateLimited => "A tool call was rejected because the agent exceeded an external rate limit.",
        Category::ToolPermission => {
            "A tool call failed due to an authorization or permission error on the external system."
        }
        Category::Timeout => "A step or tool call exceeded its expected time budget and timed out.",
        Category::PlannerLoop => "The agent repeatedly retried the same step, indicating a planning loop.",
        Category::RetrievalEmpty => "A retrieval or search step returned little to no usable content.",
        Category::PromptRegression => "The agent's behavior diverged from an established prompt baseline.",
        Category::Unknown => "The available telemetry does not match any known failure pattern.",
    }
}

/// The fixed, per-category action-item list used when evidence is sufficient.
#[must_use]
pub fn action_items_for(category: Category) -> Vec<ActionItem> {
    let items: &[(ActionItemType, &str, &str, ActionItemPriority)] = match category {
        Category::ToolSchemaMismatch => &[
            (
                ActionItemType::CodeChange,
                "Validate tool arguments before dispatch",
                "Add schema validation on the calling side to catch mismatches before the external call is made.",
                ActionItemPriority::High,
            ),
            (
                ActionItemType::Test,
                "Add a regression test for the failing schema",
                "Capture the failing payload shape in a test fixture to prevent recurrence.",
                ActionItemPriority::Medium,
            ),
        ],
        Category::RateLimited => &[
            (
                ActionItemType::ChangeConfig,
                "Add backoff and rate-limit handling",
                "Introduce exponential backoff with jitter around the affected tool call.",
                ActionItemPriority::High,
            ),
            (
                ActionItemType::Monitoring,
                "Alert on rate-limit responses",
                "Add a metric/alert for 429 responses from this tool so regressions are caught early.",
                ActionItemPriority::Medium,
            ),
        ],
        Category::ToolPermission => &[
            (
                ActionItemType::ChangeConfig,
                "Review tool credentials and scopes",
                "Confirm the agent's credentials still have the access required by this tool.",
                ActionItemPriority::Critical,
            ),
            (
                ActionItemType::Runbook,
                "Document credential rotation procedure",
                "Add a runbook entry covering rotation and verification of this tool's credentials.",
                ActionItemPriority::Medium,
            ),
        ],
        Category::Timeout => &[
            (
                ActionItemType::ChangeConfig,
                "Raise or tune the timeout budget",
                "Evaluate whether the configured timeout is realistic for this step under load.",
                ActionItemPriority::High,
            ),
            (
                ActionItemType::Monitoring,
                "Track step latency distribution",
                "Add latency histograms for this step to catch creeping slowdowns before they time out.",
                ActionItemPriority::Medium,
            ),
        ],
        Category::PlannerLoop => &[
            (
                ActionItemType::CodeChange,
                "Add a retry/loop ceiling to the planner",
                "Cap retries for this step and fail fast with a clear error instead of looping.",
                ActionItemPriority::High,
            ),
            (
                ActionItemType::Runbook,
                "Document planner-loop triage steps",
                "Capture how an operator should diagnose a stuck planning loop when paged.",
                ActionItemPriority::Low,
            ),
        ],
        Category::RetrievalEmpty => &[
            (
                ActionItemType::CodeChange,
                "Improve retrieval fallback handling",
                "Fall back to a broader query or alternate source when retrieval returns too little content.",
                ActionItemPriority::High,
            ),
            (
                ActionItemType::Test,
                "Add a regression test for empty retrieval",
                "Cover the retrieval path with a test that asserts a minimum useful result size.",
                ActionItemPriority::Medium,
            ),
        ],
        Category::PromptRegression | Category::Unknown => &[(
            ActionItemType::Runbook,
            "Investigate root cause",
            "No known pattern matched; manually review the timeline and evidence to determine root cause.",
            ActionItemPriority::Medium,
        )],
    };

    items
        .iter()
        .map(|(kind, title, description, priority)| ActionItem {
            action_id: ActionId::generate(),
            kind: *kind,
            title: (*title).to_owned(),
            description: (*description).to_owned(),
            owner: None,
            priority: *priority,
            due_in_days: None,
        })
        .collect()
}

/// The fixed action-item list returned whenever the sufficiency gate fails,
/// regardless of category.
#[must_use]
pub fn insufficient_evidence_action_items() -> Vec<ActionItem> {
    vec![
        ActionItem {
            action_id: ActionId::generate(),
            kind: ActionItemType::Monitoring,
            title: "Enable detailed tracing".to_owned(),
            description: "Telemetry for this run lacked tool-call or error detail; enable step-level tracing so future failures are diagnosable.".to_owned(),
            owner: None,
            priority: ActionItemPriority::High,
            due_in_days: None,
        },
        ActionItem {
            action_id: ActionId::generate(),
            kind: ActionItemType::Runbook,
            title: "Standardize error taxonomy".to_owned(),
            description: "Ensure agents populate error_type/error_message consistently so the strategy library has signal to classify against.".to_owned(),
            owner: None,
            priority: ActionItemPriority::Medium,
            due_in_days: None,
        },
    ]
}
