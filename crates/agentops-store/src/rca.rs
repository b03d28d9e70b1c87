// crates/agentops-store/src/rca.rs
// ============================================================================
// Module: RCA Run & Report Persistence
// Description: Idempotent job creation and the RCA run/report lifecycle.
// Purpose: Implement II's idempotent-creation half and RO's persistence calls.
// Dependencies: rusqlite, serde_json
// ============================================================================

use agentops_core::identifiers::{RcaRunId, ReportId, RunId};
use agentops_core::model::{Category, RcaReport, RcaRun, RcaStatus};
use agentops_core::Timestamp;
use rusqlite::{params, OptionalExtension};

use crate::ingest::parse_timestamp;
use crate::{Store, StoreError};

/// Idempotency window for RCA-run creation, per the spec's §4.1 contract.
const IDEMPOTENCY_WINDOW_MINUTES: i64 = 10;

/// Outcome of an idempotent-creation attempt, distinguishing a brand new
/// job from one reused inside the idempotency window (callers use this to
/// decide whether to enqueue work).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(RcaRunId),
    Reused(RcaRunId),
}

impl CreateOutcome {
    #[must_use]
    pub fn rca_run_id(&self) -> &RcaRunId {
        match self {
            Self::Created(id) | Self::Reused(id) => id,
        }
    }
}

impl Store {
    /// Implements the idempotent RCA-creation algorithm: verify the agent
    /// run exists, reuse a recent non-terminal job if one exists, else mint
    /// and insert a fresh `queued` job. Does not enqueue; callers are
    /// responsible for handing a freshly [`CreateOutcome::Created`] id to
    /// the job queue.
    ///
    /// # Errors
    /// Returns [`StoreError::RunNotFound`] if `run_id` is unknown, or
    /// [`StoreError::Db`] on any other database failure.
    pub fn create_or_reuse_rca_run(&mut self, run_id: &RunId) -> Result<CreateOutcome, StoreError> {
        let tx = self.conn.transaction()?;

        let run_exists: Option<i64> = tx
            .query_row("SELECT 1 FROM agent_runs WHERE run_id = ?1", params![run_id.as_str()], |r| r.get(0))
            .optional()?;
        if run_exists.is_none() {
            return Err(StoreError::RunNotFound(run_id.to_string()));
        }

        let window_start = Timestamp::now().minus_minutes(IDEMPOTENCY_WINDOW_MINUTES).to_string();
        let existing: Option<String> = tx
            .query_row(
                "SELECT rca_run_id FROM rca_runs
                 WHERE run_id = ?1 AND status IN ('queued', 'running') AND created_at >= ?2
                 ORDER BY created_at DESC LIMIT 1",
                params![run_id.as_str(), window_start],
                |r| r.get(0),
            )
            .optional()?;

        if let Some(existing_id) = existing {
            tx.commit()?;
            return Ok(CreateOutcome::Reused(RcaRunId::new(existing_id)));
        }

        let rca_run_id = RcaRunId::generate();
        let created_at = Timestamp::now();
        tx.execute(
            "INSERT INTO rca_runs (rca_run_id, run_id, status, step, pct, message, created_at,
                                    started_at, ended_at, error_message)
             VALUES (?1, ?2, 'queued', '', 0, '', ?3, NULL, NULL, NULL)",
            params![rca_run_id.as_str(), run_id.as_str(), created_at.to_string()],
        )?;
        tx.commit()?;
        Ok(CreateOutcome::Created(rca_run_id))
    }

    /// Loads an RCA run row, embedding its report when `status = done`.
    ///
    /// # Errors
    /// Returns [`StoreError`] on a database failure.
    pub fn get_rca_run(&self, rca_run_id: &RcaRunId) -> Result<Option<RcaRun>, StoreError> {
        self.conn
            .query_row(
                "SELECT run_id, status, step, pct, message, created_at, started_at, ended_at, error_message
                 FROM rca_runs WHERE rca_run_id = ?1",
                params![rca_run_id.as_str()],
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, String>(2)?,
                        r.get::<_, i32>(3)?,
                        r.get::<_, String>(4)?,
                        r.get::<_, String>(5)?,
                        r.get::<_, Option<String>>(6)?,
                        r.get::<_, Option<String>>(7)?,
                        r.get::<_, Option<String>>(8)?,
                    ))
                },
            )
            .optional()?
            .map(|(run_id, status, step, pct, message, created_at, started_at, ended_at, error_message)| {
                Ok(RcaRun {
                    rca_run_id: rca_run_id.clone(),
                    run_id: RunId::new(run_id),
                    status: parse_rca_status(&status)?,
                    step,
                    pct,
                    message,
                    created_at: parse_timestamp(&created_at)?,
                    started_at: started_at.map(|s| parse_timestamp(&s)).transpose()?,
                    ended_at: ended_at.map(|s| parse_timestamp(&s)).transpose()?,
                    error_message,
                })
            })
            .transpose()
    }

    /// Loads the report for a completed RCA run, if one exists.
    ///
    /// # Errors
    /// Returns [`StoreError`] on a database failure or malformed stored JSON.
    pub fn get_report(&self, rca_run_id: &RcaRunId) -> Result<Option<RcaReport>, StoreError> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT report_json FROM rca_reports WHERE rca_run_id = ?1",
                params![rca_run_id.as_str()],
                |r| r.get(0),
            )
            .optional()?;
        json.map(|j| serde_json::from_str(&j).map_err(|e| StoreError::Db(e.to_string())))
            .transpose()
    }

    /// Transitions a queued job to `running`, setting `started_at`. A no-op
    /// (but not an error) if the row is missing, matching the preflight
    /// short-circuit's "return silently" contract.
    ///
    /// # Errors
    /// Returns [`StoreError`] on a database failure.
    pub fn mark_running(&self, rca_run_id: &RcaRunId) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE rca_runs SET status = 'running', started_at = ?2 WHERE rca_run_id = ?1",
            params![rca_run_id.as_str(), Timestamp::now().to_string()],
        )?;
        Ok(())
    }

    /// Persists a non-terminal progress update onto the RCA run row,
    /// mirroring what was just published to the broker.
    ///
    /// # Errors
    /// Returns [`StoreError`] on a database failure.
    pub fn persist_progress(&self, rca_run_id: &RcaRunId, step: &str, pct: i32, message: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE rca_runs SET step = ?2, pct = ?3, message = ?4 WHERE rca_run_id = ?1",
            params![rca_run_id.as_str(), step, pct, message],
        )?;
        Ok(())
    }

    /// Persists the final report and transitions the run to `done`,
    /// atomically. Per the invariant that a `done` run has exactly one
    /// report, this must be the last write of a successful orchestration.
    ///
    /// # Errors
    /// Returns [`StoreError`] on a database failure.
    pub fn save_report_and_complete(&mut self, rca_run_id: &RcaRunId, report: &RcaReport) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let report_id = ReportId::generate();
        let report_json = serde_json::to_string(report).map_err(|e| StoreError::Db(e.to_string()))?;
        tx.execute(
            "INSERT INTO rca_reports (report_id, rca_run_id, run_id, category, report_json, generated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                report_id.as_str(),
                rca_run_id.as_str(),
                report.run_id.as_str(),
                report.category.as_str(),
                report_json,
                report.generated_at.to_string(),
            ],
        )?;
        tx.execute(
            "UPDATE rca_runs SET status = 'done', pct = 100, step = 'completed', message = ?2, ended_at = ?3
             WHERE rca_run_id = ?1",
            params![rca_run_id.as_str(), "RCA complete", Timestamp::now().to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Transitions a run to `error`, recording the failure and `ended_at`.
    /// Called from the orchestrator's catch-all; never fails the caller
    /// further than logging, by design of how it is invoked.
    ///
    /// # Errors
    /// Returns [`StoreError`] on a database failure.
    pub fn mark_error(&self, rca_run_id: &RcaRunId, error_message: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE rca_runs SET status = 'error', pct = 0, message = ?2, error_message = ?2, ended_at = ?3
             WHERE rca_run_id = ?1",
            params![rca_run_id.as_str(), error_message, Timestamp::now().to_string()],
        )?;
        Ok(())
    }
}

fn parse_rca_status(s: &str) -> Result<RcaStatus, StoreError> {
    match s {
        "queued" => Ok(RcaStatus::Queued),
        "running" => Ok(RcaStatus::Running),
        "done" => Ok(RcaStatus::Done),
        "error" => Ok(RcaStatus::Error),
        other => Err(StoreError::Db(format!("invalid rca status in storage: {other}"))),
    }
}

/// Re-exported for callers that need to render a category from storage
/// without pulling in the orchestrator crate.
#[must_use]
pub fn category_from_str(s: &str) -> Option<Category> {
    s.parse().ok()
}
