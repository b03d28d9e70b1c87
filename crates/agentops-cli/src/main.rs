// crates/agentops-cli/src/main.rs
// ============================================================================
// Module: AgentOps CLI Entry Point
// Description: Process entry point wiring config, store, broker, and API.
// Purpose: Start the HTTP surface and its embedded RCA worker pool.
// Dependencies: agentops-api, agentops-config, agentops-core, agentops-queue,
//               agentops-store, clap, tokio
// ============================================================================

//! ## Overview
//! The job queue is an in-process `tokio::mpsc` channel (see
//! `agentops-queue`), not a Redis-backed one, so there is no separate
//! process that could drain it the way the original's standalone `rq
//! worker` process did — a worker with nothing enqueuing into it would
//! simply never run. `serve` therefore starts the HTTP API and the RCA
//! worker pool together, in one process, and `--workers` controls the
//! pool's concurrency.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use agentops_api::AppState;
use agentops_broker::Publisher;
use agentops_config::{AppConfig, ConfigError};
use agentops_core::identifiers::RcaRunId;
use agentops_core::logging::{LogEvent, LogLevel, LogSink, StderrLogSink};
use agentops_narrative::llm::ReqwestLlmClient;
use agentops_narrative::NarrativeEngine;
use agentops_orchestrator::{OrchestratorDeps, RcaOrchestrator};
use agentops_queue::{Enqueue, Job, JobHandler, WorkerPool};
use agentops_store::{Store, StoreConfig, StoreError};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use std::sync::Mutex;
use thiserror::Error;

const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_WORKER_CONCURRENCY: usize = 4;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "agentops", disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API and its embedded RCA worker pool.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind the HTTP server to.
    #[arg(long, default_value = DEFAULT_BIND)]
    bind: String,
    /// Number of concurrent RCA worker tasks.
    #[arg(long, default_value_t = DEFAULT_WORKER_CONCURRENCY)]
    workers: usize,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: std::io::Error },

    #[error("server error: {0}")]
    Server(std::io::Error),
}

type CliResult<T> = Result<T, CliError>;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "agentops: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        let mut out = <Cli as clap::CommandFactory>::command();
        let _ = out.print_help();
        return Ok(());
    };

    match command {
        Commands::Serve(args) => command_serve(args).await,
    }
}

/// Executes the `serve` command: loads config, opens the store, wires the
/// broker/worker pool/narrative engine, and serves the API until shutdown.
async fn command_serve(args: ServeArgs) -> CliResult<()> {
    let config = AppConfig::from_env()?;
    let log: Arc<dyn LogSink> = Arc::new(StderrLogSink::new(LogLevel::parse_or_info(&config.log_level)));
    log.record(&LogEvent::new(LogLevel::Info, "agentops_cli::serve", "starting agentops"));

    let store_config = StoreConfig::from_database_url(&config.database_url);
    let store = Arc::new(Mutex::new(Store::open(&store_config)?));
    let publisher = Arc::new(Publisher::new());
    let narrative = Arc::new(build_narrative_engine(&config, &log));
    let config = Arc::new(config);

    let handler: Arc<dyn JobHandler> = Arc::new(RcaJobHandler {
        deps: OrchestratorDeps {
            store: Arc::clone(&store),
            publisher: Arc::clone(&publisher),
            narrative,
            log: Arc::clone(&log),
        },
    });
    let (pool, queue) = WorkerPool::spawn(args.workers, handler);
    let queue: Arc<dyn Enqueue> = Arc::new(queue);

    let state = AppState {
        store,
        publisher,
        queue,
        config,
    };
    let router = agentops_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .map_err(|source| CliError::Bind { addr: args.bind.clone(), source })?;
    log.record(
        &LogEvent::new(LogLevel::Info, "agentops_cli::serve", "listening")
            .with_fields(serde_json::json!({ "addr": args.bind })),
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(CliError::Server)?;

    pool.join().await;
    Ok(())
}

/// Builds the narrative engine: LLM-enriched when `openai_api_key` is set
/// and the client constructs successfully, deterministic-only otherwise.
fn build_narrative_engine(config: &AppConfig, log: &Arc<dyn LogSink>) -> NarrativeEngine {
    let Some(api_key) = config.openai_api_key.clone() else {
        return NarrativeEngine::deterministic();
    };
    match ReqwestLlmClient::new(api_key, None) {
        Ok(client) => NarrativeEngine::with_llm(Arc::new(client)),
        Err(err) => {
            log.record(
                &LogEvent::new(LogLevel::Warn, "agentops_cli::serve", "llm client init failed, falling back")
                    .with_fields(serde_json::json!({ "error": err.to_string() })),
            );
            NarrativeEngine::deterministic()
        }
    }
}

/// Waits for Ctrl-C (or a Unix `SIGTERM`) so `serve` shuts down cleanly.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let Ok(mut signal) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) else {
            return;
        };
        signal.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Adapts [`RcaOrchestrator::run`]'s synchronous, blocking execution model
/// to the queue's async [`JobHandler`] seam.
struct RcaJobHandler {
    deps: OrchestratorDeps,
}

#[async_trait]
impl JobHandler for RcaJobHandler {
    async fn handle(&self, job: &Job) {
        let rca_run_id: RcaRunId = job.rca_run_id.clone();
        let deps = self.deps.clone();
        let _ = tokio::task::spawn_blocking(move || RcaOrchestrator::run(&rca_run_id, &deps)).await;
    }
}
