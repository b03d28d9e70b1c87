// crates/agentops-store/src/lib.rs
// ============================================================================
// Crate: agentops-store
// Description: SQLite-backed persistence for agent telemetry and RCA state.
// Purpose: Single source of truth for AgentRun/RcaRun/RcaReport durability.
// Dependencies: agentops-core, rusqlite, serde_json, thiserror
// ============================================================================

//! ## Overview
//! All mutations go through this crate and commit atomically per logical
//! operation, per the concurrency model: the full-replace ingest upsert, the
//! idempotent RCA-creation lookup, and the RCA-run/report lifecycle writes
//! each run inside one `rusqlite::Transaction`. Reads (the evidence store)
//! are plain connection queries with no caching.

pub mod evidence;
pub mod ingest;
pub mod metrics_overview;
pub mod rca;

use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

/// `SQLite` schema version for this store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout, matched to the workspace's broader durability posture.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// `SQLite` journal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JournalMode {
    #[default]
    Wal,
    Delete,
}

impl JournalMode {
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` synchronous mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    #[default]
    Full,
    Normal,
}

impl SyncMode {
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Errors raised by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(String),

    #[error("agent run not found: {0}")]
    RunNotFound(String),

    #[error("rca run not found: {0}")]
    RcaRunNotFound(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Db(err.to_string())
    }
}

/// Connection parameters for the store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: String,
    pub busy_timeout_ms: u64,
    pub journal_mode: JournalMode,
    pub sync_mode: SyncMode,
}

impl StoreConfig {
    /// Builds a config from a `database_url`-style value. Recognizes a bare
    /// filesystem path, a `sqlite://<path>` URL, and the special value
    /// `sqlite://:memory:` / `:memory:` for ephemeral in-process databases.
    #[must_use]
    pub fn from_database_url(database_url: &str) -> Self {
        let path = database_url
            .strip_prefix("sqlite://")
            .unwrap_or(database_url)
            .to_owned();
        Self {
            path,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: JournalMode::Wal,
            sync_mode: SyncMode::Full,
        }
    }
}

/// Owns the `SQLite` connection and exposes every store operation as a
/// method. Not `Sync`; callers share it behind `Arc<Mutex<Store>>` or open
/// one `Store` per `spawn_blocking` task, matching how the rest of the
/// workspace treats synchronous `rusqlite` access as a blocking resource.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (creating if absent) the database at `config.path` and brings
    /// the schema up to date.
    ///
    /// # Errors
    /// Returns [`StoreError`] if the file cannot be opened or pragmas/schema
    /// statements fail.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let conn = if config.path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(&config.path)?
        };
        apply_pragmas(&conn, config)?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Opens a purely in-memory database, used by tests and by the CLI's
    /// ephemeral `--in-memory` mode.
    ///
    /// # Errors
    /// Returns [`StoreError`] if schema initialization fails.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::open(&StoreConfig {
            path: ":memory:".to_owned(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: JournalMode::Delete,
            sync_mode: SyncMode::Full,
        })
    }

    #[cfg(test)]
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn apply_pragmas(conn: &Connection, config: &StoreConfig) -> Result<(), StoreError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))?;
    conn.execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(())
}

fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")?;
    let version: Option<i64> = conn
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()?;
    if version.is_some() {
        return Ok(());
    }
    conn.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS agent_runs (
            run_id TEXT PRIMARY KEY,
            agent_name TEXT NOT NULL,
            agent_version TEXT NOT NULL,
            model TEXT NOT NULL,
            environment TEXT NOT NULL,
            started_at TEXT NOT NULL,
            ended_at TEXT NOT NULL,
            status TEXT NOT NULL,
            error_type TEXT,
            error_message TEXT,
            trace_id TEXT,
            correlation_ids TEXT NOT NULL,
            cost_json TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS agent_steps (
            step_id TEXT NOT NULL,
            run_id TEXT NOT NULL REFERENCES agent_runs(run_id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            ended_at TEXT NOT NULL,
            input_summary TEXT NOT NULL,
            output_summary TEXT NOT NULL,
            retries INTEGER NOT NULL,
            latency_ms INTEGER NOT NULL,
            PRIMARY KEY (run_id, step_id)
        );
        CREATE INDEX IF NOT EXISTS idx_agent_steps_run ON agent_steps (run_id);
        CREATE TABLE IF NOT EXISTS tool_calls (
            call_id TEXT NOT NULL,
            run_id TEXT NOT NULL REFERENCES agent_runs(run_id) ON DELETE CASCADE,
            step_id TEXT NOT NULL,
            tool_name TEXT NOT NULL,
            status TEXT NOT NULL,
            args_json TEXT NOT NULL,
            args_hash TEXT NOT NULL,
            result_summary TEXT NOT NULL,
            error_class TEXT,
            error_message TEXT,
            status_code INTEGER,
            retries INTEGER NOT NULL,
            latency_ms INTEGER NOT NULL,
            PRIMARY KEY (run_id, call_id)
        );
        CREATE INDEX IF NOT EXISTS idx_tool_calls_run ON tool_calls (run_id);
        CREATE TABLE IF NOT EXISTS guardrail_events (
            event_id TEXT NOT NULL,
            run_id TEXT NOT NULL REFERENCES agent_runs(run_id) ON DELETE CASCADE,
            type TEXT NOT NULL,
            message TEXT NOT NULL,
            step_id TEXT,
            call_id TEXT,
            created_at TEXT NOT NULL,
            PRIMARY KEY (run_id, event_id)
        );
        CREATE INDEX IF NOT EXISTS idx_guardrail_events_run ON guardrail_events (run_id);
        CREATE TABLE IF NOT EXISTS rca_runs (
            rca_run_id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL REFERENCES agent_runs(run_id),
            status TEXT NOT NULL,
            step TEXT NOT NULL,
            pct INTEGER NOT NULL,
            message TEXT NOT NULL,
            created_at TEXT NOT NULL,
            started_at TEXT,
            ended_at TEXT,
            error_message TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_rca_runs_run_id_created_at
            ON rca_runs (run_id, created_at DESC);
        CREATE TABLE IF NOT EXISTS rca_reports (
            report_id TEXT PRIMARY KEY,
            rca_run_id TEXT NOT NULL UNIQUE REFERENCES rca_runs(rca_run_id),
            run_id TEXT NOT NULL,
            category TEXT NOT NULL,
            report_json TEXT NOT NULL,
            generated_at TEXT NOT NULL
        );",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_in_memory_and_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        // Re-running schema init against the same connection must be a no-op.
        initialize_schema(store.conn()).unwrap();
    }

    #[test]
    fn opens_a_file_backed_database_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agentops.db").to_string_lossy().into_owned();
        let config = StoreConfig::from_database_url(&path);

        {
            let mut store = Store::open(&config).unwrap();
            store
                .upsert_agent_run(agentops_core::model::AgentRunPayload {
                    run_id: Some("r1".into()),
                    agent_name: "a".to_owned(),
                    agent_version: "1".to_owned(),
                    model: "m".to_owned(),
                    environment: agentops_core::model::Environment::Dev,
                    started_at: agentops_core::Timestamp::now(),
                    ended_at: agentops_core::Timestamp::now(),
                    status: agentops_core::model::Outcome::Success,
                    error_type: None,
                    error_message: None,
                    trace_id: None,
                    correlation_ids: vec![],
                    steps: vec![],
                    tool_calls: vec![],
                    guardrail_events: vec![],
                    cost: agentops_core::model::CostSummary::default(),
                })
                .unwrap();
        }

        let reopened = Store::open(&config).unwrap();
        assert!(reopened.get_agent_run_summary(&"r1".into()).unwrap().is_some());
    }
}
