//! Sync job history and manual retries.

use serde::Serialize;
use tracing::{info, instrument};

use super::error::{PanelError, PanelResult};
use super::{Panel, page_bounds};
use crate::storage::{SyncAttempt, SyncJob, TriggerSource};
use crate::sync::SyncResult;

#[derive(Debug, Clone, Serialize)]
pub struct SyncJobList {
    pub jobs: Vec<SyncJob>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncJobDetail {
    pub job: SyncJob,
    pub attempts: Vec<SyncAttempt>,
}

impl Panel {
    /// Jobs newest first, optionally restricted to one node.
    pub async fn list_sync_jobs(
        &self,
        node_id: Option<i64>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> PanelResult<SyncJobList> {
        let node_id = node_id.filter(|id| *id > 0);
        let (limit, offset) = page_bounds(limit, offset);
        Ok(SyncJobList {
            jobs: self.db.list_sync_jobs(node_id, limit, offset).await?,
            total: self.db.count_sync_jobs(node_id).await?,
        })
    }

    pub async fn get_sync_job(&self, id: i64) -> PanelResult<SyncJobDetail> {
        let job = self.db.get_sync_job(id).await?;
        let attempts = self.db.list_sync_attempts(id).await?;
        Ok(SyncJobDetail { job, attempts })
    }

    /// Re-run the sync of a recorded job's node. The new job links back to
    /// the original through `parent_job_id`.
    #[instrument(skip(self))]
    pub async fn retry_sync_job(&self, id: i64) -> PanelResult<SyncResult> {
        let job = self.db.get_sync_job(id).await?;
        let node = self.db.get_node(job.node_id).await?;
        info!(job_id = id, node_id = node.id, "Retrying sync job");

        let result = self
            .engine
            .sync_and_track(&node, Some(TriggerSource::ManualRetry), Some(job.id))
            .await;
        match result.error_message() {
            Some(message) => Err(PanelError::from_sync_failure(message)),
            None => Ok(result),
        }
    }
}
