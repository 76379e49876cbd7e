//! User and membership queries.

use std::collections::HashMap;

use nodepanel_core::db::unix_timestamp;
use nodepanel_core::effective_status;

use super::db::{DatabaseError, PanelDatabase};
use super::models::{User, UserStatus};

/// Editable user fields.
#[derive(Debug, Clone)]
pub struct UserParams {
    pub username: String,
    pub traffic_limit: i64,
    pub traffic_reset_day: i64,
    pub status: UserStatus,
    pub expire_at: Option<i64>,
}

impl PanelDatabase {
    /// Create a user with a fresh uuid.
    pub async fn create_user(&self, params: &UserParams) -> Result<User, DatabaseError> {
        self.create_user_with_groups(params, &[]).await
    }

    /// Create a user and its group memberships in one transaction.
    pub async fn create_user_with_groups(
        &self,
        params: &UserParams,
        group_ids: &[i64],
    ) -> Result<User, DatabaseError> {
        let now = unix_timestamp();
        let uuid = uuid::Uuid::new_v4().to_string();
        let mut tx = self.pool().begin().await?;

        let id = sqlx::query(
            r"
            INSERT INTO users
                (uuid, username, traffic_limit, traffic_reset_day, status, expire_at,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&uuid)
        .bind(&params.username)
        .bind(params.traffic_limit)
        .bind(params.traffic_reset_day)
        .bind(params.status)
        .bind(params.expire_at)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for group_id in group_ids {
            sqlx::query("INSERT OR IGNORE INTO user_groups (user_id, group_id) VALUES (?, ?)")
                .bind(id)
                .bind(group_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        self.get_user(id).await
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: i64) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// List users ordered by id.
    pub async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool())
            .await?;
        Ok(users)
    }

    pub async fn count_users(&self) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }

    /// Overwrite a user's editable fields.
    pub async fn update_user(&self, id: i64, params: &UserParams) -> Result<User, DatabaseError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET username = ?, traffic_limit = ?, traffic_reset_day = ?, status = ?,
                expire_at = ?, updated_at = ?
            WHERE id = ?
            ",
        )
        .bind(&params.username)
        .bind(params.traffic_limit)
        .bind(params.traffic_reset_day)
        .bind(params.status)
        .bind(params.expire_at)
        .bind(unix_timestamp())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("User {id}")));
        }
        self.get_user(id).await
    }

    /// Set the stored status of a user.
    pub async fn set_user_status(&self, id: i64, status: UserStatus) -> Result<User, DatabaseError> {
        let result = sqlx::query("UPDATE users SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(unix_timestamp())
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("User {id}")));
        }
        self.get_user(id).await
    }

    /// Delete a user. Memberships and traffic rows go with it.
    pub async fn delete_user(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Group ids the user belongs to, ascending.
    pub async fn user_group_ids(&self, user_id: i64) -> Result<Vec<i64>, DatabaseError> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT group_id FROM user_groups WHERE user_id = ? ORDER BY group_id")
                .bind(user_id)
                .fetch_all(self.pool())
                .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Group ids of every user on a page of [`Self::list_users`], keyed by user id.
    pub async fn user_group_ids_page(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<HashMap<i64, Vec<i64>>, DatabaseError> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r"
            SELECT ug.user_id, ug.group_id FROM user_groups ug
            JOIN (SELECT id FROM users ORDER BY id LIMIT ? OFFSET ?) page
                ON page.id = ug.user_id
            ORDER BY ug.user_id, ug.group_id
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        let mut groups: HashMap<i64, Vec<i64>> = HashMap::new();
        for (user_id, group_id) in rows {
            groups.entry(user_id).or_default().push(group_id);
        }
        Ok(groups)
    }

    /// Replace the user's group memberships in one transaction.
    pub async fn set_user_groups(
        &self,
        user_id: i64,
        group_ids: &[i64],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM user_groups WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        for group_id in group_ids {
            sqlx::query("INSERT OR IGNORE INTO user_groups (user_id, group_id) VALUES (?, ?)")
                .bind(user_id)
                .bind(group_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Users of a group whose effective status is active at `now`, ordered by id.
    pub async fn list_active_users_for_group(
        &self,
        group_id: i64,
        now: i64,
    ) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(
            r"
            SELECT u.* FROM users u
            JOIN user_groups ug ON ug.user_id = u.id
            WHERE ug.group_id = ? AND u.status = ?
            ORDER BY u.id
            ",
        )
        .bind(group_id)
        .bind(UserStatus::Active)
        .fetch_all(self.pool())
        .await?;

        Ok(users
            .into_iter()
            .filter(|u| effective_status(u, now) == UserStatus::Active)
            .collect())
    }
}
