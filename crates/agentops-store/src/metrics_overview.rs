// crates/agentops-store/src/metrics_overview.rs
// ============================================================================
// Module: Metrics Overview
// Description: Windowed aggregate counts across ingested runs.
// Purpose: Back `GET /metrics/overview`; preserved out-of-core per the
//          contract, computed fresh on every call (no caching).
// Dependencies: rusqlite
// ============================================================================

use agentops_core::model::{MetricsOverview, ToolFailureCount};
use agentops_core::Timestamp;
use rusqlite::params;

use crate::{Store, StoreError};

/// Maximum rows returned in `top_failing_tools`.
const TOP_FAILING_TOOLS_LIMIT: i64 = 5;

impl Store {
    /// Computes aggregate metrics across runs created in the last `hours`.
    ///
    /// # Errors
    /// Returns [`StoreError`] on a database failure.
    pub fn get_metrics_overview(&self, hours: i64) -> Result<MetricsOverview, StoreError> {
        let cutoff = Timestamp::now().minus_minutes(hours * 60).to_string();

        let total_runs: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM agent_runs WHERE created_at >= ?1",
            params![cutoff],
            |r| r.get(0),
        )?;

        let successful_runs: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM agent_runs WHERE created_at >= ?1 AND status = ?2",
            params![cutoff, "success"],
            |r| r.get(0),
        )?;
        let success_rate = if total_runs > 0 {
            (successful_runs as f64 / total_runs as f64) * 100.0
        } else {
            0.0
        };

        let mut stmt = self.conn.prepare(
            "SELECT tc.tool_name, COUNT(*) as cnt
             FROM tool_calls tc JOIN agent_runs ar ON tc.run_id = ar.run_id
             WHERE ar.created_at >= ?1 AND tc.status = 'failure'
             GROUP BY tc.tool_name
             ORDER BY cnt DESC
             LIMIT ?2",
        )?;
        let top_failing_tools = stmt
            .query_map(params![cutoff, TOP_FAILING_TOOLS_LIMIT], |r| {
                Ok(ToolFailureCount {
                    tool: r.get(0)?,
                    count: r.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);

        let mut stmt = self.conn.prepare(
            "SELECT s.latency_ms
             FROM agent_steps s JOIN agent_runs ar ON s.run_id = ar.run_id
             WHERE ar.created_at >= ?1
             ORDER BY s.latency_ms ASC",
        )?;
        let latencies: Vec<i64> = stmt
            .query_map(params![cutoff], |r| r.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        let p95_step_latency_ms = if latencies.is_empty() {
            0
        } else {
            let idx = ((latencies.len() as f64) * 0.95) as usize;
            latencies[idx.min(latencies.len() - 1)]
        };

        let mut stmt = self.conn.prepare("SELECT cost_json FROM agent_runs WHERE created_at >= ?1")?;
        let costs: Vec<String> = stmt
            .query_map(params![cutoff], |r| r.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        let total_cost_usd: f64 = costs
            .iter()
            .filter_map(|c| serde_json::from_str::<serde_json::Value>(c).ok())
            .filter_map(|v| v.get("total_cost_usd").and_then(serde_json::Value::as_f64))
            .sum();

        Ok(MetricsOverview {
            total_runs,
            success_rate: (success_rate * 100.0).round() / 100.0,
            top_failing_tools,
            p95_step_latency_ms,
            total_cost_usd: if total_cost_usd > 0.0 {
                Some((total_cost_usd * 10_000.0).round() / 10_000.0)
            } else {
                None
            },
        })
    }
}
