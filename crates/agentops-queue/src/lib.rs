// crates/agentops-queue/src/lib.rs
// ============================================================================
// Crate: agentops-queue
// Description: In-process, at-least-once job queue and worker pool for RO.
// Purpose: Implement JQ without fabricating an external broker dependency.
// Dependencies: agentops-core, tokio, async-trait
// ============================================================================

//! ## Overview
//! No crate in this workspace's corpus depends on an external job-broker
//! client. [`Queue`] is an in-process multi-producer, pooled-consumer queue
//! over [`tokio::sync::mpsc`] that delivers each job at-least-once: a
//! handler invocation that panics causes one redelivery attempt, after
//! which the job is dropped (the orchestrator's own `done` preflight makes
//! duplicate delivery safe, per the spec this implements). A production
//! deployment can swap in a Redis/RQ-backed [`Enqueue`] without touching
//! callers.

use std::sync::Arc;

use agentops_core::RcaRunId;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Bound on in-flight jobs before `enqueue` backpressures the caller.
const QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is closed")]
    Closed,
}

/// A single unit of work: analyze one RCA run.
#[derive(Debug, Clone)]
pub struct Job {
    pub rca_run_id: RcaRunId,
    /// `true` only on the single automatic redelivery attempt.
    pub is_redelivery: bool,
}

/// Producer-side handle: the API layer enqueues jobs here.
#[async_trait]
pub trait Enqueue: Send + Sync {
    /// Submits a job naming the orchestrator as handler.
    ///
    /// # Errors
    /// Returns [`QueueError::Closed`] if no worker pool is draining the queue.
    async fn enqueue(&self, rca_run_id: RcaRunId) -> Result<(), QueueError>;
}

/// A handler invoked once per delivered job. Implemented by
/// `agentops-orchestrator`'s `RcaOrchestrator` in the running binary; kept
/// generic here so this crate has no dependency on the orchestrator.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job);
}

/// In-process queue. Cloning shares the same underlying channel.
#[derive(Clone)]
pub struct Queue {
    sender: mpsc::Sender<Job>,
}

#[async_trait]
impl Enqueue for Queue {
    async fn enqueue(&self, rca_run_id: RcaRunId) -> Result<(), QueueError> {
        self.sender
            .send(Job {
                rca_run_id,
                is_redelivery: false,
            })
            .await
            .map_err(|_| QueueError::Closed)
    }
}

/// A running worker pool draining a [`Queue`]. Dropping this stops
/// accepting new work once in-flight jobs complete; tasks are detached
/// `tokio` tasks, matching the "worker process exits 0 on clean shutdown
/// signal" contract when the owning runtime shuts down.
pub struct WorkerPool {
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `concurrency` worker tasks draining `queue`, each invoking
    /// `handler` for every delivered job. Builds the `mpsc` channel and
    /// returns both the pool and the producer-side [`Queue`].
    pub fn spawn(concurrency: usize, handler: Arc<dyn JobHandler>) -> (Self, Queue) {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let tasks = (0..concurrency.max(1))
            .map(|_| {
                let receiver = Arc::clone(&receiver);
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    loop {
                        let job = {
                            let mut guard = receiver.lock().await;
                            guard.recv().await
                        };
                        let Some(job) = job else {
                            break;
                        };
                        run_with_one_redelivery(Arc::clone(&handler), job).await;
                    }
                })
            })
            .collect();

        (Self { tasks }, Queue { sender })
    }

    /// Awaits every worker task, used by tests and graceful-shutdown paths.
    pub async fn join(self) {
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Runs one job to completion on its own task so a handler panic is caught
/// by `JoinHandle` rather than taking down the worker loop, then redelivers
/// once on panic.
async fn run_with_one_redelivery(handler: Arc<dyn JobHandler>, job: Job) {
    if run_once(Arc::clone(&handler), job.clone()).await.is_err() {
        let redelivered = Job {
            rca_run_id: job.rca_run_id,
            is_redelivery: true,
        };
        let _ = run_once(handler, redelivered).await;
    }
}

async fn run_once(handler: Arc<dyn JobHandler>, job: Job) -> Result<(), tokio::task::JoinError> {
    tokio::spawn(async move { handler.handle(&job).await }).await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingHandler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl JobHandler for CountingHandler {
        async fn handle(&self, _job: &Job) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn enqueued_job_is_delivered_once_on_success() {
        let handler = Arc::new(CountingHandler { calls: AtomicUsize::new(0) });
        let (pool, queue) = WorkerPool::spawn(1, handler.clone());
        queue.enqueue(RcaRunId::new("j1")).await.unwrap();
        // Give the worker a tick to process before dropping the sender.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        drop(queue);
        pool.join().await;
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    struct PanicOnceHandler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl JobHandler for PanicOnceHandler {
        async fn handle(&self, job: &Job) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !job.is_redelivery {
                panic!("simulated handler failure");
            }
        }
    }

    #[tokio::test]
    async fn panicking_handler_is_redelivered_exactly_once() {
        let handler = Arc::new(PanicOnceHandler { calls: AtomicUsize::new(0) });
        let (pool, queue) = WorkerPool::spawn(1, handler.clone());
        queue.enqueue(RcaRunId::new("j1")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        drop(queue);
        pool.join().await;
        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }
}
