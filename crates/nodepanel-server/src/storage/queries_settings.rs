//! System settings key/value queries.

use std::collections::BTreeMap;

use nodepanel_core::db::unix_timestamp;

use super::db::{DatabaseError, PanelDatabase};

pub const KEY_ADMIN_USERNAME: &str = "admin_username";
pub const KEY_ADMIN_PASSWORD_HASH: &str = "admin_password_hash";

impl PanelDatabase {
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM system_settings WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(|r| r.0))
    }

    /// Insert or overwrite a setting.
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            r"
            INSERT INTO system_settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
        )
        .bind(key)
        .bind(value)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Store the admin credentials unless they already exist.
    ///
    /// Returns `false` when an admin was configured earlier; the stored
    /// credentials are left untouched in that case.
    pub async fn create_admin(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<bool, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO system_settings (key, value, updated_at) VALUES (?, ?, ?)",
        )
        .bind(KEY_ADMIN_USERNAME)
        .bind(username)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if inserted == 0 {
            return Ok(false);
        }

        sqlx::query(
            r"
            INSERT INTO system_settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
        )
        .bind(KEY_ADMIN_PASSWORD_HASH)
        .bind(password_hash)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn all_settings(&self) -> Result<BTreeMap<String, String>, DatabaseError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM system_settings ORDER BY key")
                .fetch_all(self.pool())
                .await?;
        Ok(rows.into_iter().collect())
    }
}
