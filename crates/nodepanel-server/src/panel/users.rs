//! User write path. Every change fans out to the nodes of the groups the
//! user belonged to before or after the change.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use nodepanel_core::db::unix_timestamp;
use nodepanel_core::effective_status;

use super::error::{PanelError, PanelResult};
use super::{Panel, Synced, double_option, page_bounds};
use crate::storage::{TriggerSource, User, UserParams, UserStatus};
use crate::sync::NodeSyncReport;

#[derive(Debug, Clone, Deserialize)]
pub struct UserInput {
    pub username: String,
    #[serde(default)]
    pub traffic_limit: i64,
    #[serde(default)]
    pub traffic_reset_day: i64,
    #[serde(default)]
    pub status: UserStatus,
    pub expire_at: Option<i64>,
    #[serde(default)]
    pub group_ids: Vec<i64>,
}

/// Partial user update. `expire_at: Some(None)` clears the expiry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub traffic_limit: Option<i64>,
    pub traffic_reset_day: Option<i64>,
    pub status: Option<UserStatus>,
    #[serde(default, with = "double_option")]
    pub expire_at: Option<Option<i64>>,
    pub group_ids: Option<Vec<i64>>,
}

/// A user as presented to operators.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    pub effective_status: UserStatus,
    pub group_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserList {
    pub users: Vec<UserView>,
    pub total: i64,
}

type UserWrite = Synced<UserView, Vec<NodeSyncReport>>;

impl Panel {
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create_user(&self, input: UserInput) -> PanelResult<UserWrite> {
        let params = user_params(
            &input.username,
            input.traffic_limit,
            input.traffic_reset_day,
            input.status,
            input.expire_at,
        )?;
        let group_ids = self.checked_group_ids(&input.group_ids).await?;

        let user = self.db.create_user_with_groups(&params, &group_ids).await?;
        info!(user_id = user.id, "User created");

        let sync = self
            .engine
            .sync_nodes_by_group_ids(&group_ids, TriggerSource::AutoUserChange)
            .await;
        Ok(Synced {
            entity: self.user_view(user).await?,
            sync,
        })
    }

    pub async fn get_user(&self, id: i64) -> PanelResult<UserView> {
        let user = self.db.get_user(id).await?;
        self.user_view(user).await
    }

    pub async fn list_users(&self, limit: Option<i64>, offset: Option<i64>) -> PanelResult<UserList> {
        let (limit, offset) = page_bounds(limit, offset);
        let mut memberships = self.db.user_group_ids_page(limit, offset).await?;
        let now = unix_timestamp();
        let users = self
            .db
            .list_users(limit, offset)
            .await?
            .into_iter()
            .map(|user| UserView {
                effective_status: effective_status(&user, now),
                group_ids: memberships.remove(&user.id).unwrap_or_default(),
                user,
            })
            .collect();
        Ok(UserList {
            users,
            total: self.db.count_users().await?,
        })
    }

    #[instrument(skip(self, patch))]
    pub async fn update_user(&self, id: i64, patch: UserPatch) -> PanelResult<UserWrite> {
        let current = self.db.get_user(id).await?;
        let params = user_params(
            patch.username.as_deref().unwrap_or(&current.username),
            patch.traffic_limit.unwrap_or(current.traffic_limit),
            patch.traffic_reset_day.unwrap_or(current.traffic_reset_day),
            patch.status.unwrap_or(current.status),
            patch.expire_at.unwrap_or(current.expire_at),
        )?;
        let new_groups = match &patch.group_ids {
            Some(ids) => Some(self.checked_group_ids(ids).await?),
            None => None,
        };

        let before = self.db.user_group_ids(id).await?;
        let user = self.db.update_user(id, &params).await?;
        if let Some(group_ids) = &new_groups {
            self.db.set_user_groups(id, group_ids).await?;
        }
        let after = self.db.user_group_ids(id).await?;
        info!(user_id = id, "User updated");

        let sync = self.fan_out_user_change(&before, &after).await;
        Ok(Synced {
            entity: self.user_view(user).await?,
            sync,
        })
    }

    #[instrument(skip(self))]
    pub async fn disable_user(&self, id: i64) -> PanelResult<UserWrite> {
        let user = self.db.set_user_status(id, UserStatus::Disabled).await?;
        let groups = self.db.user_group_ids(id).await?;
        info!(user_id = id, "User disabled");

        let sync = self.fan_out_user_change(&groups, &[]).await;
        Ok(Synced {
            entity: self.user_view(user).await?,
            sync,
        })
    }

    /// Delete a user. Memberships are read first since the join rows go
    /// with the user.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i64) -> PanelResult<UserWrite> {
        let user = self.db.get_user(id).await?;
        let groups = self.db.user_group_ids(id).await?;
        if !self.db.delete_user(id).await? {
            return Err(PanelError::NotFound(format!("User {id} not found")));
        }
        info!(user_id = id, "User deleted");

        let sync = self.fan_out_user_change(&groups, &[]).await;
        let status = effective_status(&user, unix_timestamp());
        Ok(Synced {
            entity: UserView {
                user,
                effective_status: status,
                group_ids: groups,
            },
            sync,
        })
    }

    /// Replace the groups a user belongs to.
    #[instrument(skip(self, group_ids))]
    pub async fn set_user_groups(&self, id: i64, group_ids: &[i64]) -> PanelResult<UserWrite> {
        let user = self.db.get_user(id).await?;
        let group_ids = self.checked_group_ids(group_ids).await?;

        let before = self.db.user_group_ids(id).await?;
        self.db.set_user_groups(id, &group_ids).await?;
        info!(user_id = id, groups = group_ids.len(), "User groups replaced");

        let sync = self.fan_out_user_change(&before, &group_ids).await;
        Ok(Synced {
            entity: self.user_view(user).await?,
            sync,
        })
    }

    async fn fan_out_user_change(&self, before: &[i64], after: &[i64]) -> Vec<NodeSyncReport> {
        let union: Vec<i64> = before
            .iter()
            .chain(after)
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        self.engine
            .sync_nodes_by_group_ids(&union, TriggerSource::AutoUserChange)
            .await
    }

    /// Deduplicate group ids and make sure each one exists.
    async fn checked_group_ids(&self, ids: &[i64]) -> PanelResult<Vec<i64>> {
        let ids: BTreeSet<i64> = ids.iter().copied().collect();
        for id in &ids {
            self.db.get_group(*id).await?;
        }
        Ok(ids.into_iter().collect())
    }

    async fn user_view(&self, user: User) -> PanelResult<UserView> {
        let group_ids = self.db.user_group_ids(user.id).await?;
        Ok(UserView {
            effective_status: effective_status(&user, unix_timestamp()),
            user,
            group_ids,
        })
    }
}

fn user_params(
    username: &str,
    traffic_limit: i64,
    traffic_reset_day: i64,
    status: UserStatus,
    expire_at: Option<i64>,
) -> PanelResult<UserParams> {
    let username = username.trim();
    if username.is_empty() {
        return Err(PanelError::validation("username required"));
    }
    if traffic_limit < 0 {
        return Err(PanelError::validation("traffic_limit must not be negative"));
    }
    if !(0..=31).contains(&traffic_reset_day) {
        return Err(PanelError::validation(format!(
            "traffic_reset_day {traffic_reset_day} out of range"
        )));
    }
    Ok(UserParams {
        username: username.to_string(),
        traffic_limit,
        traffic_reset_day,
        status,
        expire_at,
    })
}
