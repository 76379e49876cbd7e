//! Traffic sample recording and window aggregations.
//!
//! Every aggregation takes `since` as a unix timestamp; zero covers all
//! recorded history.

use nodepanel_core::db::unix_timestamp;

use super::db::{DatabaseError, PanelDatabase};
use super::models::{NodeTrafficSummary, TrafficPoint, TrafficTotals};

impl PanelDatabase {
    // =========================================================================
    // Recording
    // =========================================================================

    pub async fn record_node_traffic(
        &self,
        node_id: i64,
        upload: i64,
        download: i64,
        recorded_at: i64,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO node_traffic (node_id, upload, download, recorded_at) VALUES (?, ?, ?, ?)",
        )
        .bind(node_id)
        .bind(upload)
        .bind(download)
        .bind(recorded_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Record a per-user sample and add it to the user's quota counter.
    pub async fn record_user_inbound_traffic(
        &self,
        user_id: i64,
        inbound_id: i64,
        node_id: i64,
        upload: i64,
        download: i64,
        recorded_at: i64,
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r"
            INSERT INTO user_inbound_traffic
                (user_id, inbound_id, node_id, upload, download, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(user_id)
        .bind(inbound_id)
        .bind(node_id)
        .bind(upload)
        .bind(download)
        .bind(recorded_at)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "UPDATE users SET traffic_used = traffic_used + ?, updated_at = ? WHERE id = ?",
        )
        .bind(upload.saturating_add(download))
        .bind(unix_timestamp())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("User {user_id}")));
        }

        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // Aggregations
    // =========================================================================

    /// Per-node totals, ordered by node id.
    pub async fn node_traffic_summaries(
        &self,
        since: i64,
    ) -> Result<Vec<NodeTrafficSummary>, DatabaseError> {
        let rows = sqlx::query_as::<_, NodeTrafficSummary>(
            r"
            SELECT node_id,
                   COALESCE(SUM(upload), 0) AS upload,
                   COALESCE(SUM(download), 0) AS download,
                   COUNT(*) AS samples
            FROM node_traffic
            WHERE recorded_at >= ?
            GROUP BY node_id
            ORDER BY node_id
            ",
        )
        .bind(since)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn total_traffic(&self, since: i64) -> Result<TrafficTotals, DatabaseError> {
        let totals = sqlx::query_as::<_, TrafficTotals>(
            r"
            SELECT COALESCE(SUM(upload), 0) AS upload,
                   COALESCE(SUM(download), 0) AS download,
                   COUNT(*) AS samples
            FROM node_traffic
            WHERE recorded_at >= ?
            ",
        )
        .bind(since)
        .fetch_one(self.pool())
        .await?;
        Ok(totals)
    }

    /// Traffic summed into UTC-aligned buckets of `bucket_secs`.
    pub async fn traffic_timeseries(
        &self,
        since: i64,
        bucket_secs: i64,
        node_id: Option<i64>,
    ) -> Result<Vec<TrafficPoint>, DatabaseError> {
        let points = sqlx::query_as::<_, TrafficPoint>(
            r"
            SELECT (recorded_at / ?1) * ?1 AS bucket_start,
                   COALESCE(SUM(upload), 0) AS upload,
                   COALESCE(SUM(download), 0) AS download
            FROM node_traffic
            WHERE recorded_at >= ?2 AND (?3 IS NULL OR node_id = ?3)
            GROUP BY bucket_start
            ORDER BY bucket_start
            ",
        )
        .bind(bucket_secs.max(1))
        .bind(since)
        .bind(node_id)
        .fetch_all(self.pool())
        .await?;
        Ok(points)
    }
}
