//! Group queries.

use nodepanel_core::db::unix_timestamp;

use super::db::{DatabaseError, PanelDatabase};
use super::models::Group;

const GROUP_SELECT: &str = r"
    SELECT g.id, g.name, g.description,
           (SELECT COUNT(*) FROM user_groups ug WHERE ug.group_id = g.id) AS member_count,
           g.created_at, g.updated_at
    FROM groups g
";

impl PanelDatabase {
    pub async fn create_group(&self, name: &str, description: &str) -> Result<Group, DatabaseError> {
        let now = unix_timestamp();

        let id = sqlx::query(
            "INSERT INTO groups (name, description, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(description)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        self.get_group(id).await
    }

    /// Get a group by ID, with its member count.
    pub async fn get_group(&self, id: i64) -> Result<Group, DatabaseError> {
        sqlx::query_as::<_, Group>(&format!("{GROUP_SELECT} WHERE g.id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Group {id}")))
    }

    pub async fn list_groups(&self, limit: i64, offset: i64) -> Result<Vec<Group>, DatabaseError> {
        let groups = sqlx::query_as::<_, Group>(&format!(
            "{GROUP_SELECT} ORDER BY g.id LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;
        Ok(groups)
    }

    pub async fn count_groups(&self) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM groups")
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }

    pub async fn update_group(
        &self,
        id: i64,
        name: &str,
        description: &str,
    ) -> Result<Group, DatabaseError> {
        let result =
            sqlx::query("UPDATE groups SET name = ?, description = ?, updated_at = ? WHERE id = ?")
                .bind(name)
                .bind(description)
                .bind(unix_timestamp())
                .bind(id)
                .execute(self.pool())
                .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Group {id}")));
        }
        self.get_group(id).await
    }

    /// Delete a group that has neither members nor nodes.
    pub async fn delete_group(&self, id: i64) -> Result<(), DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let (members, nodes): (i64, i64) = sqlx::query_as(
            r"
            SELECT (SELECT COUNT(*) FROM user_groups WHERE group_id = ?),
                   (SELECT COUNT(*) FROM nodes WHERE group_id = ?)
            ",
        )
        .bind(id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if members > 0 || nodes > 0 {
            return Err(DatabaseError::Conflict(format!(
                "Group {id} in use by {members} users and {nodes} nodes"
            )));
        }

        let result = sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Group {id}")));
        }

        tx.commit().await?;
        Ok(())
    }

    /// User ids that belong to the group, ascending.
    pub async fn group_user_ids(&self, group_id: i64) -> Result<Vec<i64>, DatabaseError> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT user_id FROM user_groups WHERE group_id = ? ORDER BY user_id")
                .bind(group_id)
                .fetch_all(self.pool())
                .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Replace the group's user set in one transaction.
    pub async fn replace_group_users(
        &self,
        group_id: i64,
        user_ids: &[i64],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM user_groups WHERE group_id = ?")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        for user_id in user_ids {
            sqlx::query("INSERT OR IGNORE INTO user_groups (user_id, group_id) VALUES (?, ?)")
                .bind(user_id)
                .bind(group_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
