//! Inbound queries.

use nodepanel_core::db::unix_timestamp;

use super::db::{DatabaseError, PanelDatabase};
use super::models::Inbound;

/// Editable inbound fields. Settings are canonical JSON object text.
#[derive(Debug, Clone)]
pub struct InboundParams {
    pub node_id: i64,
    pub tag: String,
    pub protocol: String,
    pub listen_port: i64,
    pub public_port: i64,
    pub settings: String,
    pub tls_settings: String,
    pub transport_settings: String,
}

impl PanelDatabase {
    pub async fn create_inbound(&self, params: &InboundParams) -> Result<Inbound, DatabaseError> {
        let now = unix_timestamp();
        let uuid = uuid::Uuid::new_v4().to_string();

        let id = sqlx::query(
            r"
            INSERT INTO inbounds
                (uuid, node_id, tag, protocol, listen_port, public_port, settings,
                 tls_settings, transport_settings, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&uuid)
        .bind(params.node_id)
        .bind(&params.tag)
        .bind(&params.protocol)
        .bind(params.listen_port)
        .bind(params.public_port)
        .bind(&params.settings)
        .bind(&params.tls_settings)
        .bind(&params.transport_settings)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        self.get_inbound(id).await
    }

    /// Get an inbound by ID.
    pub async fn get_inbound(&self, id: i64) -> Result<Inbound, DatabaseError> {
        sqlx::query_as::<_, Inbound>("SELECT * FROM inbounds WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Inbound {id}")))
    }

    /// Inbounds owned by a node, in id order.
    pub async fn list_inbounds_for_node(
        &self,
        node_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Inbound>, DatabaseError> {
        let inbounds = sqlx::query_as::<_, Inbound>(
            "SELECT * FROM inbounds WHERE node_id = ? ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(node_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;
        Ok(inbounds)
    }

    /// Overwrite an inbound's fields. The owning node never changes.
    pub async fn update_inbound(
        &self,
        id: i64,
        params: &InboundParams,
    ) -> Result<Inbound, DatabaseError> {
        let result = sqlx::query(
            r"
            UPDATE inbounds
            SET tag = ?, protocol = ?, listen_port = ?, public_port = ?, settings = ?,
                tls_settings = ?, transport_settings = ?, updated_at = ?
            WHERE id = ? AND node_id = ?
            ",
        )
        .bind(&params.tag)
        .bind(&params.protocol)
        .bind(params.listen_port)
        .bind(params.public_port)
        .bind(&params.settings)
        .bind(&params.tls_settings)
        .bind(&params.transport_settings)
        .bind(unix_timestamp())
        .bind(id)
        .bind(params.node_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "Inbound {id} on node {}",
                params.node_id
            )));
        }
        self.get_inbound(id).await
    }

    pub async fn delete_inbound(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM inbounds WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_inbounds(&self) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM inbounds")
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }
}
