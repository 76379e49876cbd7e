//! Node queries.

use nodepanel_core::db::unix_timestamp;

use super::db::{DatabaseError, PanelDatabase};
use super::models::{Node, NodeStatus};

/// Editable node fields.
#[derive(Debug, Clone)]
pub struct NodeParams {
    pub name: String,
    pub api_address: String,
    pub api_port: i64,
    pub secret_key: String,
    pub public_address: String,
    pub group_id: Option<i64>,
}

impl PanelDatabase {
    /// Register a node with a fresh uuid and `unknown` status.
    pub async fn create_node(&self, params: &NodeParams) -> Result<Node, DatabaseError> {
        let now = unix_timestamp();
        let uuid = uuid::Uuid::new_v4().to_string();

        let id = sqlx::query(
            r"
            INSERT INTO nodes
                (uuid, name, api_address, api_port, secret_key, public_address, group_id,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&uuid)
        .bind(&params.name)
        .bind(&params.api_address)
        .bind(params.api_port)
        .bind(&params.secret_key)
        .bind(&params.public_address)
        .bind(params.group_id)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        self.get_node(id).await
    }

    /// Get a node by ID.
    pub async fn get_node(&self, id: i64) -> Result<Node, DatabaseError> {
        sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Node {id}")))
    }

    /// Page through the node catalog in id order.
    pub async fn list_nodes(&self, limit: i64, offset: i64) -> Result<Vec<Node>, DatabaseError> {
        let nodes = sqlx::query_as::<_, Node>("SELECT * FROM nodes ORDER BY id LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool())
            .await?;
        Ok(nodes)
    }

    pub async fn count_nodes(&self) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM nodes")
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }

    /// Overwrite a node's editable fields.
    pub async fn update_node(&self, id: i64, params: &NodeParams) -> Result<Node, DatabaseError> {
        let result = sqlx::query(
            r"
            UPDATE nodes
            SET name = ?, api_address = ?, api_port = ?, secret_key = ?, public_address = ?,
                group_id = ?, updated_at = ?
            WHERE id = ?
            ",
        )
        .bind(&params.name)
        .bind(&params.api_address)
        .bind(params.api_port)
        .bind(&params.secret_key)
        .bind(&params.public_address)
        .bind(params.group_id)
        .bind(unix_timestamp())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Node {id}")));
        }
        self.get_node(id).await
    }

    /// Record that the node answered at `seen_at`.
    pub async fn mark_node_online(&self, id: i64, seen_at: i64) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE nodes SET status = ?, last_seen_at = ? WHERE id = ?")
            .bind(NodeStatus::Online)
            .bind(seen_at)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Record that the node could not be reached. `last_seen_at` is kept.
    pub async fn mark_node_offline(&self, id: i64) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE nodes SET status = ? WHERE id = ?")
            .bind(NodeStatus::Offline)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn count_node_inbounds(&self, node_id: i64) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM inbounds WHERE node_id = ?")
            .bind(node_id)
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }

    /// Delete a node that owns no inbounds.
    pub async fn delete_node(&self, id: i64) -> Result<(), DatabaseError> {
        if self.count_node_inbounds(id).await? > 0 {
            return Err(DatabaseError::Conflict(format!("Node {id} still has inbounds")));
        }
        let result = sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Node {id}")));
        }
        Ok(())
    }

    /// Delete a node together with every inbound it owns.
    pub async fn delete_node_with_inbounds(&self, id: i64) -> Result<u64, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let inbounds = sqlx::query("DELETE FROM inbounds WHERE node_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let result = sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Node {id}")));
        }

        tx.commit().await?;
        Ok(inbounds)
    }
}
