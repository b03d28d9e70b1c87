// crates/agentops-broker/src/lib.rs
// ============================================================================
// Crate: agentops-broker
// Description: In-process snapshot store and pub/sub channel for RCA progress.
// Purpose: Best-effort progress distribution; never a correctness dependency.
// Dependencies: agentops-core, dashmap, tokio
// ============================================================================

//! ## Overview
//! [`Publisher`] plays the role the spec assigns to a Redis hash + channel
//! pair: `publish` overwrites a keyed snapshot and fans the same payload out
//! on a per-job broadcast channel; `get_latest_status` reads the snapshot.
//! No crate in this workspace's corpus depends on an external broker client,
//! so both sinks live in-process behind [`dashmap::DashMap`] — a drop-in
//! Redis-backed implementation could satisfy the same [`ProgressSink`] trait
//! without touching callers.
//!
//! Both sinks are best-effort: a publish is infallible from the caller's
//! perspective (see [`Publisher::publish`]), matching the spec's requirement
//! that a progress-transport failure never fails the orchestrator.

use agentops_core::model::{ProgressEvent, RcaStatus};
use agentops_core::{RcaRunId, Timestamp};
use dashmap::DashMap;
use tokio::sync::broadcast;

/// Channel capacity for a single job's broadcast lane. Eight stages fit
/// comfortably with headroom for a slow subscriber.
const CHANNEL_CAPACITY: usize = 32;

/// A sink capable of receiving progress updates, the seam a Redis-backed
/// implementation would fill in a production deployment.
pub trait ProgressSink: Send + Sync {
    fn publish(&self, rca_run_id: &RcaRunId, event: &ProgressEvent);
    fn latest(&self, rca_run_id: &RcaRunId) -> Option<ProgressEvent>;
}

/// In-process progress publisher: snapshot map + broadcast channel registry.
pub struct Publisher {
    snapshots: DashMap<RcaRunId, ProgressEvent>,
    channels: DashMap<RcaRunId, broadcast::Sender<ProgressEvent>>,
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new()
    }
}

impl Publisher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshots: DashMap::new(),
            channels: DashMap::new(),
        }
    }

    /// Publishes a progress update. First overwrites the snapshot, then
    /// fans out on the channel, matching the ordering the spec mandates.
    /// Returns nothing and never fails: a channel with no subscribers is
    /// not an error, and this type has no fallible transport underneath it.
    pub fn publish(&self, rca_run_id: &RcaRunId, status: RcaStatus, step: &str, pct: i32, message: &str) {
        let event = ProgressEvent {
            status,
            step: step.to_owned(),
            pct,
            message: message.to_owned(),
            updated_at: Timestamp::now(),
        };
        self.snapshots.insert(rca_run_id.clone(), event.clone());
        let sender = self
            .channels
            .entry(rca_run_id.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone();
        // A send with no receivers returns Err; that's not a failure worth surfacing.
        let _ = sender.send(event);
    }

    /// Returns the most recently published snapshot for a job, if any.
    #[must_use]
    pub fn get_latest_status(&self, rca_run_id: &RcaRunId) -> Option<ProgressEvent> {
        self.snapshots.get(rca_run_id).map(|e| e.clone())
    }

    /// Subscribes to a job's channel, creating it if this is the first
    /// subscriber. Callers should first call [`Self::get_latest_status`] to
    /// flush the current snapshot before awaiting the returned receiver, to
    /// avoid missing events published between the two calls only if they
    /// subscribe first — see `agentops-api`'s SSE handler for the exact
    /// ordering used to close that race.
    #[must_use]
    pub fn subscribe(&self, rca_run_id: &RcaRunId) -> broadcast::Receiver<ProgressEvent> {
        self.channels
            .entry(rca_run_id.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Drops the channel for a completed job, freeing its sender once no
    /// subscribers remain. Safe to call even if the job was never published.
    pub fn retire(&self, rca_run_id: &RcaRunId) {
        self.channels.remove(rca_run_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_status_is_none_before_first_publish() {
        let publisher = Publisher::new();
        let id = RcaRunId::new("rca-1");
        assert!(publisher.get_latest_status(&id).is_none());
    }

    #[test]
    fn publish_updates_snapshot() {
        let publisher = Publisher::new();
        let id = RcaRunId::new("rca-1");
        publisher.publish(&id, RcaStatus::Running, "starting", 5, "begin");
        let snap = publisher.get_latest_status(&id).unwrap();
        assert_eq!(snap.pct, 5);
        assert_eq!(snap.status, RcaStatus::Running);
    }

    #[tokio::test]
    async fn subscriber_receives_events_published_after_subscribe() {
        let publisher = Publisher::new();
        let id = RcaRunId::new("rca-1");
        let mut rx = publisher.subscribe(&id);
        publisher.publish(&id, RcaStatus::Running, "starting", 5, "begin");
        let event = rx.recv().await.unwrap();
        assert_eq!(event.pct, 5);
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let publisher = Publisher::new();
        let id = RcaRunId::new("rca-2");
        publisher.publish(&id, RcaStatus::Done, "completed", 100, "ok");
    }
}
