//! Node sync engine.
//!
//! A sync pushes the full current configuration of one node (its inbounds plus
//! the active users of its group) to the node agent and records the outcome as
//! a sync job with one attempt. Syncs of the same node are serialized through
//! [`NodeLocks`]; distinct nodes sync concurrently.

use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use nodepanel_core::config::SyncConfig;
use nodepanel_core::db::unix_timestamp;
use nodepanel_core::{SyncPayload, build_payload};

use super::locks::NodeLocks;
use crate::node::{
    NodeClient, NodeClientError, SYNC_REQUEST_PREFIX, SYNC_STATUS_PREFIX,
};
use crate::storage::{
    AttemptOutcome, AttemptStatus, JobOutcome, JobStatus, Node, PanelDatabase, TriggerSource,
};

/// Message recorded when the process shuts down before a push.
pub const SYNC_CANCELLED: &str = "sync cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Ok,
    Error,
}

/// Outcome of one `run_node_sync` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The job recording this sync; absent only when the job could not be created.
    pub job_id: Option<i64>,
}

impl SyncResult {
    const fn ok(job_id: i64) -> Self {
        Self {
            status: SyncStatus::Ok,
            error: None,
            job_id: Some(job_id),
        }
    }

    fn error(message: impl Into<String>, job_id: Option<i64>) -> Self {
        Self {
            status: SyncStatus::Error,
            error: Some(message.into()),
            job_id,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == SyncStatus::Ok
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the failure was the node being unreachable.
    pub fn is_transport_failure(&self) -> bool {
        self.error_message()
            .is_some_and(|m| m.starts_with(SYNC_REQUEST_PREFIX))
    }
}

/// Normalize a push failure for storage: application failures stay verbatim,
/// everything else is reported as a transport failure.
pub fn normalize_sync_error(message: &str) -> String {
    if message.contains(SYNC_STATUS_PREFIX) || message.starts_with(SYNC_REQUEST_PREFIX) {
        message.to_string()
    } else {
        format!("{SYNC_REQUEST_PREFIX}{message}")
    }
}

/// Runs node syncs against the panel store.
#[derive(Clone)]
pub struct SyncEngine {
    db: PanelDatabase,
    locks: NodeLocks,
    config: SyncConfig,
    shutdown: CancellationToken,
}

impl SyncEngine {
    pub fn new(db: PanelDatabase, config: SyncConfig, shutdown: CancellationToken) -> Self {
        Self {
            db,
            locks: NodeLocks::new(),
            config,
            shutdown,
        }
    }

    pub const fn db(&self) -> &PanelDatabase {
        &self.db
    }

    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub const fn locks(&self) -> &NodeLocks {
        &self.locks
    }

    /// Sync one node and record the outcome as a job.
    ///
    /// Exactly one job is created per call (unless the store refuses the
    /// insert). The job history of the node is pruned after the lock is
    /// released.
    pub async fn run_node_sync(
        &self,
        node: &Node,
        trigger: Option<TriggerSource>,
        parent_job_id: Option<i64>,
    ) -> SyncResult {
        let lock = self.locks.lock_for(node.id).await;
        let guard = lock.lock().await;
        debug!(node_id = node.id, "Node sync lock acquired");

        let result = self
            .run_locked(node, trigger.unwrap_or_default(), parent_job_id)
            .await;

        drop(guard);
        self.spawn_prune(node.id);
        result
    }

    async fn run_locked(
        &self,
        node: &Node,
        trigger: TriggerSource,
        parent_job_id: Option<i64>,
    ) -> SyncResult {
        let started = Instant::now();

        let job = match self
            .db
            .create_sync_job(node.id, parent_job_id, trigger, unix_timestamp())
            .await
        {
            Ok(job) => job,
            Err(e) => {
                warn!(node_id = node.id, error = %e, "Failed to create sync job");
                return SyncResult::error("create sync job failed", None);
            }
        };
        let job_id = job.id;
        info!(node_id = node.id, job_id, trigger = %trigger, "Sync job created");

        // The caller's copy may predate a committed update; build from the stored row.
        let node = match self.db.get_node(node.id).await {
            Ok(current) => current,
            Err(e) => {
                warn!(node_id = node.id, job_id, error = %e, "Failed to load node");
                return self
                    .fail_job(job_id, 0, started, &format!("load node failed: {e}"))
                    .await;
            }
        };
        let node = &node;

        if self.shutdown.is_cancelled() {
            return self.fail_job(job_id, 0, started, SYNC_CANCELLED).await;
        }

        let Some(group_id) = node.group_id else {
            return self
                .fail_job(job_id, 0, started, "node group_id not set")
                .await;
        };

        let inbounds = match self
            .db
            .list_inbounds_for_node(node.id, self.config.inbound_page_limit, 0)
            .await
        {
            Ok(inbounds) => inbounds,
            Err(e) => {
                warn!(node_id = node.id, job_id, error = %e, "Failed to load inbounds");
                return self
                    .fail_job(job_id, 0, started, &format!("load inbounds failed: {e}"))
                    .await;
            }
        };

        let users = match self
            .db
            .list_active_users_for_group(group_id, unix_timestamp())
            .await
        {
            Ok(users) => users,
            Err(e) => {
                warn!(node_id = node.id, job_id, error = %e, "Failed to load active users");
                return self
                    .fail_job(job_id, 0, started, &format!("load active users failed: {e}"))
                    .await;
            }
        };

        let (payload, payload_hash) = match build_payload(node, &inbounds, &users)
            .and_then(|p| p.hash().map(|h| (p, h)))
        {
            Ok(built) => built,
            Err(e) => {
                let mut message = e.to_string();
                if message.is_empty() {
                    message = "build payload failed".to_string();
                }
                warn!(node_id = node.id, job_id, error = %message, "Payload build failed");
                return self.fail_job(job_id, 0, started, &message).await;
            }
        };

        let push_started_at = unix_timestamp();
        let inbound_count = i64::try_from(inbounds.len()).unwrap_or(i64::MAX);
        let user_count = i64::try_from(users.len()).unwrap_or(i64::MAX);
        if let Err(e) = self
            .db
            .start_sync_job(job_id, inbound_count, user_count, &payload_hash, push_started_at)
            .await
        {
            warn!(job_id, error = %e, "Failed to start sync job");
            return self
                .fail_job(job_id, 0, started, "start sync job failed")
                .await;
        }
        let attempt = match self
            .db
            .create_sync_attempt(job_id, 1, push_started_at)
            .await
        {
            Ok(attempt) => attempt,
            Err(e) => {
                warn!(job_id, error = %e, "Failed to create sync attempt");
                return self
                    .fail_job(job_id, 0, started, "create sync attempt failed")
                    .await;
            }
        };

        let attempt_started = Instant::now();
        let pushed = self.push(node, &payload).await;
        let attempt_ms = elapsed_ms(attempt_started);

        match pushed {
            Ok(()) => {
                self.finish_attempt(attempt.id, AttemptStatus::Success, 200, attempt_ms, "")
                    .await;
                self.finish_job(job_id, JobStatus::Success, 1, started, "")
                    .await;
                info!(
                    node_id = node.id,
                    job_id,
                    inbounds = inbound_count,
                    users = user_count,
                    "Node sync succeeded"
                );
                SyncResult::ok(job_id)
            }
            Err(e) => {
                let http_status = e.http_status().map_or(0, i64::from);
                let message = normalize_sync_error(&e.to_string());
                self.finish_attempt(
                    attempt.id,
                    AttemptStatus::Failed,
                    http_status,
                    attempt_ms,
                    &message,
                )
                .await;
                self.finish_job(job_id, JobStatus::Failed, 1, started, &message)
                    .await;
                warn!(node_id = node.id, job_id, http_status, error = %message, "Node sync failed");
                SyncResult::error(message, Some(job_id))
            }
        }
    }

    /// Push `payload` to the node, aborting if the process shuts down.
    async fn push(&self, node: &Node, payload: &SyncPayload) -> Result<(), NodeClientError> {
        let client = NodeClient::new(node, self.config.node_timeout())?;
        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => {
                Err(NodeClientError::SyncRequest("context canceled".into()))
            }
            res = client.sync_config(payload) => res,
        }
    }

    /// Push an empty inbound list to the node under its lock.
    ///
    /// Used to drain a node before it is deleted. No job is recorded.
    pub async fn drain_node(&self, node: &Node) -> Result<(), NodeClientError> {
        let lock = self.locks.lock_for(node.id).await;
        let _guard = lock.lock().await;
        info!(node_id = node.id, "Draining node");
        self.push(node, &SyncPayload::empty()).await
    }

    async fn fail_job(
        &self,
        job_id: i64,
        attempt_count: i64,
        started: Instant,
        message: &str,
    ) -> SyncResult {
        self.finish_job(job_id, JobStatus::Failed, attempt_count, started, message)
            .await;
        SyncResult::error(message, Some(job_id))
    }

    async fn finish_job(
        &self,
        job_id: i64,
        status: JobStatus,
        attempt_count: i64,
        started: Instant,
        error_summary: &str,
    ) {
        let outcome = JobOutcome {
            status,
            attempt_count,
            duration_ms: elapsed_ms(started),
            error_summary: error_summary.to_string(),
            finished_at: unix_timestamp(),
        };
        if let Err(e) = self.db.finish_sync_job(job_id, &outcome).await {
            warn!(job_id, error = %e, "Failed to finish sync job");
        }
    }

    async fn finish_attempt(
        &self,
        attempt_id: i64,
        status: AttemptStatus,
        http_status: i64,
        duration_ms: i64,
        error_summary: &str,
    ) {
        let outcome = AttemptOutcome {
            status,
            http_status,
            duration_ms,
            error_summary: error_summary.to_string(),
            finished_at: unix_timestamp(),
        };
        if let Err(e) = self.db.finish_sync_attempt(attempt_id, &outcome).await {
            warn!(attempt_id, error = %e, "Failed to finish sync attempt");
        }
    }

    /// Trim the node's job history in the background.
    fn spawn_prune(&self, node_id: i64) {
        let db = self.db.clone();
        let keep = self.config.job_history_limit;
        tokio::spawn(async move {
            match db.prune_sync_jobs(node_id, keep).await {
                Ok(0) => {}
                Ok(removed) => debug!(node_id, removed, "Pruned sync job history"),
                Err(e) => warn!(node_id, error = %e, "Failed to prune sync job history"),
            }
        });
    }
}

fn elapsed_ms(since: Instant) -> i64 {
    i64::try_from(since.elapsed().as_millis()).unwrap_or(i64::MAX)
}
