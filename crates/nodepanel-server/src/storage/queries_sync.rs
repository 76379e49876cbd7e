//! Sync job and attempt queries.

use super::db::{DatabaseError, PanelDatabase};
use super::models::{AttemptStatus, JobStatus, SyncAttempt, SyncJob, TriggerSource};

/// Terminal fields written when a job finishes.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub status: JobStatus,
    pub attempt_count: i64,
    pub duration_ms: i64,
    pub error_summary: String,
    pub finished_at: i64,
}

/// Terminal fields written when an attempt finishes.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub status: AttemptStatus,
    pub http_status: i64,
    pub duration_ms: i64,
    pub error_summary: String,
    pub finished_at: i64,
}

impl PanelDatabase {
    // =========================================================================
    // Jobs
    // =========================================================================

    /// Create a queued job.
    pub async fn create_sync_job(
        &self,
        node_id: i64,
        parent_job_id: Option<i64>,
        trigger: TriggerSource,
        created_at: i64,
    ) -> Result<SyncJob, DatabaseError> {
        let id = sqlx::query(
            r"
            INSERT INTO sync_jobs (node_id, parent_job_id, trigger_source, status, created_at)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(node_id)
        .bind(parent_job_id)
        .bind(trigger)
        .bind(JobStatus::Queued)
        .bind(created_at)
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        self.get_sync_job(id).await
    }

    /// Get a job by ID.
    pub async fn get_sync_job(&self, id: i64) -> Result<SyncJob, DatabaseError> {
        sqlx::query_as::<_, SyncJob>("SELECT * FROM sync_jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Sync job {id}")))
    }

    /// Jobs newest first, optionally for one node.
    pub async fn list_sync_jobs(
        &self,
        node_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SyncJob>, DatabaseError> {
        let jobs = sqlx::query_as::<_, SyncJob>(
            r"
            SELECT * FROM sync_jobs
            WHERE (?1 IS NULL OR node_id = ?1)
            ORDER BY id DESC
            LIMIT ?2 OFFSET ?3
            ",
        )
        .bind(node_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;
        Ok(jobs)
    }

    pub async fn count_sync_jobs(&self, node_id: Option<i64>) -> Result<i64, DatabaseError> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sync_jobs WHERE (?1 IS NULL OR node_id = ?1)")
                .bind(node_id)
                .fetch_one(self.pool())
                .await?;
        Ok(row.0)
    }

    /// Move a queued job to running with the payload it is about to push.
    pub async fn start_sync_job(
        &self,
        id: i64,
        inbound_count: i64,
        active_user_count: i64,
        payload_hash: &str,
        started_at: i64,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r"
            UPDATE sync_jobs
            SET status = ?, inbound_count = ?, active_user_count = ?, payload_hash = ?,
                started_at = ?
            WHERE id = ?
            ",
        )
        .bind(JobStatus::Running)
        .bind(inbound_count)
        .bind(active_user_count)
        .bind(payload_hash)
        .bind(started_at)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Sync job {id}")));
        }
        Ok(())
    }

    /// Write a job's terminal state.
    ///
    /// A job that never started gets `started_at = finished_at` so the
    /// timestamps stay ordered.
    pub async fn finish_sync_job(
        &self,
        id: i64,
        outcome: &JobOutcome,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r"
            UPDATE sync_jobs
            SET status = ?, attempt_count = ?, duration_ms = ?, error_summary = ?,
                started_at = COALESCE(started_at, ?), finished_at = ?
            WHERE id = ?
            ",
        )
        .bind(outcome.status)
        .bind(outcome.attempt_count)
        .bind(outcome.duration_ms)
        .bind(&outcome.error_summary)
        .bind(outcome.finished_at)
        .bind(outcome.finished_at)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Sync job {id}")));
        }
        Ok(())
    }

    /// Keep only the newest `keep` jobs of a node. Returns the number removed.
    pub async fn prune_sync_jobs(&self, node_id: i64, keep: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            r"
            DELETE FROM sync_jobs
            WHERE node_id = ?1
              AND id NOT IN (
                  SELECT id FROM sync_jobs WHERE node_id = ?1 ORDER BY id DESC LIMIT ?2
              )
            ",
        )
        .bind(node_id)
        .bind(keep.max(0))
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Attempts
    // =========================================================================

    pub async fn create_sync_attempt(
        &self,
        job_id: i64,
        attempt_no: i64,
        started_at: i64,
    ) -> Result<SyncAttempt, DatabaseError> {
        let id = sqlx::query(
            r"
            INSERT INTO sync_attempts (job_id, attempt_no, status, started_at)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(job_id)
        .bind(attempt_no)
        .bind(AttemptStatus::Running)
        .bind(started_at)
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        sqlx::query_as::<_, SyncAttempt>("SELECT * FROM sync_attempts WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Sync attempt {id}")))
    }

    pub async fn finish_sync_attempt(
        &self,
        id: i64,
        outcome: &AttemptOutcome,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r"
            UPDATE sync_attempts
            SET status = ?, http_status = ?, duration_ms = ?, error_summary = ?, finished_at = ?
            WHERE id = ?
            ",
        )
        .bind(outcome.status)
        .bind(outcome.http_status)
        .bind(outcome.duration_ms)
        .bind(&outcome.error_summary)
        .bind(outcome.finished_at)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Sync attempt {id}")));
        }
        Ok(())
    }

    /// Attempts of a job in attempt order.
    pub async fn list_sync_attempts(&self, job_id: i64) -> Result<Vec<SyncAttempt>, DatabaseError> {
        let attempts = sqlx::query_as::<_, SyncAttempt>(
            "SELECT * FROM sync_attempts WHERE job_id = ? ORDER BY attempt_no",
        )
        .bind(job_id)
        .fetch_all(self.pool())
        .await?;
        Ok(attempts)
    }
}
