//! Group catalog and membership replacement.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::error::{PanelError, PanelResult};
use super::{Panel, Synced, page_bounds};
use crate::storage::{Group, TriggerSource};
use crate::sync::NodeSyncReport;

#[derive(Debug, Clone, Deserialize)]
pub struct GroupInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupList {
    pub groups: Vec<Group>,
    pub total: i64,
}

impl Panel {
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_group(&self, input: GroupInput) -> PanelResult<Group> {
        let name = group_name(&input.name)?;
        let group = self.db.create_group(name, input.description.trim()).await?;
        info!(group_id = group.id, "Group created");
        Ok(group)
    }

    pub async fn get_group(&self, id: i64) -> PanelResult<Group> {
        Ok(self.db.get_group(id).await?)
    }

    pub async fn list_groups(&self, limit: Option<i64>, offset: Option<i64>) -> PanelResult<GroupList> {
        let (limit, offset) = page_bounds(limit, offset);
        Ok(GroupList {
            groups: self.db.list_groups(limit, offset).await?,
            total: self.db.count_groups().await?,
        })
    }

    /// Rename or redescribe a group. Membership is untouched, so no sync runs.
    #[instrument(skip(self, input))]
    pub async fn update_group(&self, id: i64, input: GroupInput) -> PanelResult<Group> {
        let name = group_name(&input.name)?;
        let group = self
            .db
            .update_group(id, name, input.description.trim())
            .await?;
        info!(group_id = id, "Group updated");
        Ok(group)
    }

    /// Delete an unused group; members or nodes make it a conflict.
    #[instrument(skip(self))]
    pub async fn delete_group(&self, id: i64) -> PanelResult<()> {
        self.db.delete_group(id).await?;
        info!(group_id = id, "Group deleted");
        Ok(())
    }

    /// Replace the user set of a group and resync the group's nodes.
    #[instrument(skip(self, user_ids))]
    pub async fn replace_group_users(
        &self,
        id: i64,
        user_ids: &[i64],
    ) -> PanelResult<Synced<Group, Vec<NodeSyncReport>>> {
        self.db.get_group(id).await?;
        let mut user_ids = user_ids.to_vec();
        user_ids.sort_unstable();
        user_ids.dedup();
        for user_id in &user_ids {
            self.db.get_user(*user_id).await?;
        }

        self.db.replace_group_users(id, &user_ids).await?;
        info!(group_id = id, users = user_ids.len(), "Group users replaced");

        let sync = self
            .engine
            .sync_nodes_by_group_ids(&[id], TriggerSource::AutoGroupChange)
            .await;
        Ok(Synced {
            entity: self.db.get_group(id).await?,
            sync,
        })
    }
}

fn group_name(raw: &str) -> PanelResult<&str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(PanelError::validation("name required"));
    }
    Ok(name)
}
