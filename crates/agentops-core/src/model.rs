// crates/agentops-core/src/model.rs
// ============================================================================
// Module: AgentOps Data Model
// Description: Wire and persistence types for agent telemetry and RCA reports.
// Purpose: Shared vocabulary for every other crate in the workspace.
// Dependencies: serde, chrono
// ============================================================================

//! ## Overview
//! This module mirrors the data model: `AgentRun` and its children
//! (`AgentStep`, `ToolCall`, `GuardrailEvent`), and the RCA job/report types
//! (`RcaRun`, `RcaReport` and everything it embeds). Types here carry no
//! behavior beyond bounds enforcement and are shared verbatim between the
//! store, orchestrator, and API crates.

use serde::{Deserialize, Serialize};

use crate::identifiers::{ActionId, CallId, EventId, EvidenceId, HypothesisId, RcaRunId, ReportId, RunId, StepId};
use crate::timestamp::Timestamp;

/// Maximum length, in characters, of any free-text summary field.
pub const MAX_SUMMARY_LEN: usize = 2000;

/// Truncates `s` to at most [`MAX_SUMMARY_LEN`] characters, never panicking
/// on non-ASCII input by operating on `char` boundaries.
#[must_use]
pub fn bound_summary(s: &str) -> String {
    if s.chars().count() <= MAX_SUMMARY_LEN {
        s.to_owned()
    } else {
        s.chars().take(MAX_SUMMARY_LEN).collect()
    }
}

/// Overall outcome of an agent run or one of its steps/tool calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failure)
    }
}

/// Deployment environment an agent run executed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Prod,
    Staging,
    Dev,
}

/// Token/cost accounting attached to an agent run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    #[serde(default)]
    pub tokens_prompt: i64,
    #[serde(default)]
    pub tokens_completion: i64,
    #[serde(default)]
    pub total_cost_usd: Option<f64>,
}

/// A phase of an agent run (planning, execution, retrieval, etc.).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    pub step_id: StepId,
    pub name: String,
    pub status: Outcome,
    pub started_at: Timestamp,
    pub ended_at: Timestamp,
    #[serde(default)]
    pub input_summary: String,
    #[serde(default)]
    pub output_summary: String,
    #[serde(default)]
    pub retries: i64,
    #[serde(default)]
    pub latency_ms: i64,
}

impl AgentStep {
    /// Derives `latency_ms` from timestamps when the caller supplied zero,
    /// mirroring the ingest-time validator this field historically had.
    #[must_use]
    pub fn with_derived_latency(mut self) -> Self {
        if self.latency_ms <= 0 {
            self.latency_ms = self.ended_at.millis_since(&self.started_at).max(0);
        }
        self.input_summary = bound_summary(&self.input_summary);
        self.output_summary = bound_summary(&self.output_summary);
        self
    }
}

/// An external action invoked during a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: CallId,
    pub step_id: StepId,
    pub tool_name: String,
    pub status: Outcome,
    #[serde(default)]
    pub args_json: serde_json::Value,
    #[serde(default)]
    pub args_hash: String,
    #[serde(default)]
    pub result_summary: String,
    #[serde(default)]
    pub error_class: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub status_code: Option<i64>,
    #[serde(default)]
    pub retries: i64,
    #[serde(default)]
    pub latency_ms: i64,
}

impl ToolCall {
    #[must_use]
    pub fn with_bounded_summary(mut self) -> Self {
        self.result_summary = bound_summary(&self.result_summary);
        self
    }
}

/// A policy/validation signal raised during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailKind {
    PiiRedaction,
    PolicyBlock,
    SchemaValidation,
    Other,
}

impl GuardrailKind {
    /// Wire/storage form, e.g. `schema_validation`. Matches the `#[serde(rename_all = "snake_case")]`
    /// rendering used everywhere else this type crosses a boundary.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PiiRedaction => "pii_redaction",
            Self::PolicyBlock => "policy_block",
            Self::SchemaValidation => "schema_validation",
            Self::Other => "other",
        }
    }
}

/// A guardrail-raised event, optionally tied to a step or tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailEvent {
    pub event_id: EventId,
    #[serde(rename = "type")]
    pub kind: GuardrailKind,
    pub message: String,
    #[serde(default)]
    pub step_id: Option<StepId>,
    #[serde(default)]
    pub call_id: Option<CallId>,
    pub created_at: Timestamp,
}

/// Inbound payload for `POST /agent-runs`.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentRunPayload {
    #[serde(default)]
    pub run_id: Option<RunId>,
    pub agent_name: String,
    pub agent_version: String,
    pub model: String,
    pub environment: Environment,
    pub started_at: Timestamp,
    pub ended_at: Timestamp,
    pub status: Outcome,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub correlation_ids: Vec<String>,
    #[serde(default)]
    pub steps: Vec<AgentStep>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub guardrail_events: Vec<GuardrailEvent>,
    #[serde(default)]
    pub cost: CostSummary,
}

/// Persisted agent run, minus children (those are fetched separately via the
/// evidence store).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRun {
    pub run_id: RunId,
    pub agent_name: String,
    pub agent_version: String,
    pub model: String,
    pub environment: Environment,
    pub started_at: Timestamp,
    pub ended_at: Timestamp,
    pub status: Outcome,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
    pub trace_id: Option<String>,
    pub correlation_ids: Vec<String>,
    pub cost: CostSummary,
    pub created_at: Timestamp,
}

/// Response body for `GET /agent-runs/{run_id}`.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRunSummary {
    pub run_id: RunId,
    pub agent_name: String,
    pub status: Outcome,
    pub started_at: Timestamp,
    pub ended_at: Timestamp,
    pub step_count: usize,
    pub tool_call_count: usize,
    pub guardrail_event_count: usize,
}

/// A single entry in a merged run timeline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventKind {
    Step,
    ToolCall,
    Guardrail,
}

/// One row of `GET /agent-runs/{run_id}/timeline`.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineEvent {
    pub event_id: String,
    pub event_type: TimelineEventKind,
    pub timestamp: Timestamp,
    pub name: String,
    pub status: String,
    pub details: serde_json::Value,
}

/// The complete evidence view an orchestrator invocation reads once.
#[derive(Debug, Clone)]
pub struct EvidenceBundle {
    pub run: AgentRun,
    pub steps: Vec<AgentStep>,
    pub tool_calls: Vec<ToolCall>,
    pub guardrails: Vec<GuardrailEvent>,
}

/// The eight closed failure classes the strategy library can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    ToolSchemaMismatch,
    RateLimited,
    ToolPermission,
    Timeout,
    PlannerLoop,
    RetrievalEmpty,
    /// Reserved for forward compatibility; no rule currently elects it.
    PromptRegression,
    Unknown,
}

impl Category {
    /// Human, title-cased rendering used in ticket summaries, e.g.
    /// `Tool Schema Mismatch`.
    #[must_use]
    pub fn title_case(self) -> &'static str {
        match self {
            Self::ToolSchemaMismatch => "Tool Schema Mismatch",
            Self::RateLimited => "Rate Limited",
            Self::ToolPermission => "Tool Permission",
            Self::Timeout => "Timeout",
            Self::PlannerLoop => "Planner Loop",
            Self::RetrievalEmpty => "Retrieval Empty",
            Self::PromptRegression => "Prompt Regression",
            Self::Unknown => "Unknown",
        }
    }

    /// Wire/storage form, e.g. `tool_schema_mismatch`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToolSchemaMismatch => "tool_schema_mismatch",
            Self::RateLimited => "rate_limited",
            Self::ToolPermission => "tool_permission",
            Self::Timeout => "timeout",
            Self::PlannerLoop => "planner_loop",
            Self::RetrievalEmpty => "retrieval_empty",
            Self::PromptRegression => "prompt_regression",
            Self::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "tool_schema_mismatch" => Self::ToolSchemaMismatch,
            "rate_limited" => Self::RateLimited,
            "tool_permission" => Self::ToolPermission,
            "timeout" => Self::Timeout,
            "planner_loop" => Self::PlannerLoop,
            "retrieval_empty" => Self::RetrievalEmpty,
            "prompt_regression" => Self::PromptRegression,
            "unknown" => Self::Unknown,
            other => {
                return Err(crate::error::CoreError::InvalidEnumValue {
                    field: "category",
                    value: other.to_owned(),
                })
            }
        })
    }
}

/// Kind of telemetry record an [`EvidenceRef`] points back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Step,
    ToolCall,
    Guardrail,
}

/// A report-local reference to a concrete telemetry record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRef {
    pub evidence_id: EvidenceId,
    pub kind: EvidenceKind,
    pub ref_id: String,
    pub title: String,
    pub snippet: String,
    #[serde(default)]
    pub attributes: serde_json::Value,
}

/// Confidence level attached to a hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// A proposed root cause, always backed by at least one piece of evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypothesis {
    pub hypothesis_id: HypothesisId,
    pub title: String,
    pub description: String,
    /// MUST reference ids present in the owning report's `evidence_index`.
    pub evidence_ids: Vec<EvidenceId>,
    pub confidence: Confidence,
    #[serde(default)]
    pub verification_steps: Vec<String>,
    #[serde(default)]
    pub mitigation: Option<String>,
}

/// The kind of remediation an [`ActionItem`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionItemType {
    CodeChange,
    Runbook,
    ChangeConfig,
    Rollback,
    Monitoring,
    Test,
}

/// Urgency of an [`ActionItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionItemPriority {
    Critical,
    High,
    Medium,
    Low,
}

/// A single remediation task attached to a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionItem {
    pub action_id: ActionId,
    #[serde(rename = "type")]
    pub kind: ActionItemType,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub owner: Option<String>,
    pub priority: ActionItemPriority,
    #[serde(default)]
    pub due_in_days: Option<i64>,
}

/// Aggregate numbers computed once per report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub top_failing_tool: Option<String>,
    pub max_step_latency_ms: i64,
    pub total_retries: i64,
    pub total_cost_usd: Option<f64>,
}

/// Fields ready to be copy-pasted into a ticket tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraFields {
    pub jira_summary: String,
    pub jira_description_md: String,
}

/// The full report document persisted exactly once per successful RCA run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RcaReport {
    pub report_id: ReportId,
    pub rca_run_id: RcaRunId,
    pub run_id: RunId,
    pub generated_at: Timestamp,
    pub category: Category,
    #[serde(default)]
    pub insufficient_evidence: bool,
    #[serde(default)]
    pub insufficient_reason: Option<String>,
    #[serde(default)]
    pub evidence_index: Vec<EvidenceRef>,
    #[serde(default)]
    pub hypotheses: Vec<Hypothesis>,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    #[serde(default)]
    pub metrics_snapshot: MetricsSnapshot,
    #[serde(default)]
    pub jira_fields: Option<JiraFields>,
}

/// Lifecycle state of an [`RcaRun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RcaStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl RcaStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for RcaStatus {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "queued" => Self::Queued,
            "running" => Self::Running,
            "done" => Self::Done,
            "error" => Self::Error,
            other => {
                return Err(crate::error::CoreError::InvalidEnumValue {
                    field: "rca_status",
                    value: other.to_owned(),
                })
            }
        })
    }
}

/// The job/status row driving and observing one RCA analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RcaRun {
    pub rca_run_id: RcaRunId,
    pub run_id: RunId,
    pub status: RcaStatus,
    #[serde(default)]
    pub step: String,
    #[serde(default)]
    pub pct: i32,
    #[serde(default)]
    pub message: String,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub error_message: Option<String>,
}

/// Response body for `GET /agent-runs/rca-runs/{rca_run_id}`.
#[derive(Debug, Clone, Serialize)]
pub struct RcaRunResponse {
    pub rca_run_id: RcaRunId,
    pub run_id: RunId,
    pub status: RcaStatus,
    pub step: String,
    pub pct: i32,
    pub message: String,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub report: Option<RcaReport>,
}

/// Wire shape of a progress update, used both for SSE payloads and the
/// snapshot record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub status: RcaStatus,
    pub step: String,
    pub pct: i32,
    pub message: String,
    pub updated_at: Timestamp,
}

/// One entry in [`MetricsOverview::top_failing_tools`].
#[derive(Debug, Clone, Serialize)]
pub struct ToolFailureCount {
    pub tool: String,
    pub count: i64,
}

/// Response body for `GET /metrics/overview`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsOverview {
    pub total_runs: i64,
    pub success_rate: f64,
    pub top_failing_tools: Vec<ToolFailureCount>,
    pub p95_step_latency_ms: i64,
    pub total_cost_usd: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_summary_respects_char_count_not_bytes() {
        let s = "é".repeat(MAX_SUMMARY_LEN + 10);
        let bounded = bound_summary(&s);
        assert_eq!(bounded.chars().count(), MAX_SUMMARY_LEN);
    }

    #[test]
    fn category_round_trips_through_wire_form() {
        for cat in [
            Category::ToolSchemaMismatch,
            Category::RateLimited,
            Category::ToolPermission,
            Category::Timeout,
            Category::PlannerLoop,
            Category::RetrievalEmpty,
            Category::PromptRegression,
            Category::Unknown,
        ] {
            let parsed: Category = cat.as_str().parse().unwrap();
            assert_eq!(parsed, cat);
        }
    }

    #[test]
    fn terminal_statuses_are_done_and_error() {
        assert!(RcaStatus::Done.is_terminal());
        assert!(RcaStatus::Error.is_terminal());
        assert!(!RcaStatus::Queued.is_terminal());
        assert!(!RcaStatus::Running.is_terminal());
    }
}
