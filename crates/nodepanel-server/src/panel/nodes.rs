//! Node catalog, manual sync, health checks and deletion.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use nodepanel_core::db::unix_timestamp;

use super::error::{PanelError, PanelResult};
use super::{Panel, Synced, double_option, page_bounds};
use crate::node::NodeClient;
use crate::storage::{Node, NodeParams, NodeStatus, TriggerSource};
use crate::sync::SyncResult;

#[derive(Debug, Clone, Deserialize)]
pub struct NodeInput {
    pub name: String,
    pub api_address: String,
    pub api_port: i64,
    pub secret_key: String,
    #[serde(default)]
    pub public_address: String,
    pub group_id: Option<i64>,
}

/// Partial node update. `group_id: null` detaches the node from its group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodePatch {
    pub name: Option<String>,
    pub api_address: Option<String>,
    pub api_port: Option<i64>,
    pub secret_key: Option<String>,
    pub public_address: Option<String>,
    #[serde(default, with = "double_option")]
    pub group_id: Option<Option<i64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeList {
    pub nodes: Vec<Node>,
    pub total: i64,
}

/// Result of probing a node agent.
#[derive(Debug, Clone, Serialize)]
pub struct NodeHealth {
    pub node_id: i64,
    pub status: NodeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Panel {
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_node(&self, input: NodeInput) -> PanelResult<Node> {
        let params = node_params(
            &input.name,
            &input.api_address,
            input.api_port,
            &input.secret_key,
            &input.public_address,
            input.group_id,
        )?;
        if let Some(group_id) = params.group_id {
            self.db.get_group(group_id).await?;
        }
        let node = self.db.create_node(&params).await?;
        info!(node_id = node.id, "Node created");
        Ok(node)
    }

    pub async fn get_node(&self, id: i64) -> PanelResult<Node> {
        Ok(self.db.get_node(id).await?)
    }

    pub async fn list_nodes(&self, limit: Option<i64>, offset: Option<i64>) -> PanelResult<NodeList> {
        let (limit, offset) = page_bounds(limit, offset);
        Ok(NodeList {
            nodes: self.db.list_nodes(limit, offset).await?,
            total: self.db.count_nodes().await?,
        })
    }

    /// Update a node. Moving it to another group resyncs it so it serves the
    /// new group's users.
    #[instrument(skip(self, patch))]
    pub async fn update_node(
        &self,
        id: i64,
        patch: NodePatch,
    ) -> PanelResult<Synced<Node, Option<SyncResult>>> {
        let current = self.db.get_node(id).await?;
        let params = node_params(
            patch.name.as_deref().unwrap_or(&current.name),
            patch.api_address.as_deref().unwrap_or(&current.api_address),
            patch.api_port.unwrap_or(current.api_port),
            patch.secret_key.as_deref().unwrap_or(&current.secret_key),
            patch
                .public_address
                .as_deref()
                .unwrap_or(&current.public_address),
            patch.group_id.unwrap_or(current.group_id),
        )?;
        if let Some(group_id) = params.group_id {
            self.db.get_group(group_id).await?;
        }

        let node = self.db.update_node(id, &params).await?;
        info!(node_id = id, "Node updated");

        let sync = if node.group_id == current.group_id {
            None
        } else {
            Some(
                self.engine
                    .sync_and_track(&node, Some(TriggerSource::AutoGroupChange), None)
                    .await,
            )
        };
        Ok(Synced { entity: node, sync })
    }

    /// Delete a node.
    ///
    /// Without `force` the node must own no inbounds. With `force` the node is
    /// first drained by pushing an empty inbound list; if the push fails
    /// nothing is deleted.
    #[instrument(skip(self))]
    pub async fn delete_node(&self, id: i64, force: bool) -> PanelResult<()> {
        if !force {
            self.db.delete_node(id).await?;
            info!(node_id = id, "Node deleted");
            return Ok(());
        }

        let node = self.db.get_node(id).await?;
        if let Err(e) = self.engine.drain_node(&node).await {
            warn!(node_id = id, error = %e, "Node drain failed, keeping node");
            return Err(PanelError::Transport(e.to_string()));
        }
        self.db.mark_node_online(id, unix_timestamp()).await?;

        let inbounds = self.db.delete_node_with_inbounds(id).await?;
        info!(node_id = id, inbounds, "Node force-deleted");
        Ok(())
    }

    /// Manually sync a node. A failed sync is returned as an error.
    #[instrument(skip(self))]
    pub async fn sync_node(&self, id: i64) -> PanelResult<SyncResult> {
        let node = self.db.get_node(id).await?;
        let result = self
            .engine
            .sync_and_track(&node, Some(TriggerSource::ManualNodeSync), None)
            .await;
        match result.error_message() {
            Some(message) => Err(PanelError::from_sync_failure(message)),
            None => Ok(result),
        }
    }

    /// Probe the node agent and record its liveness.
    #[instrument(skip(self))]
    pub async fn check_node_health(&self, id: i64) -> PanelResult<NodeHealth> {
        let node = self.db.get_node(id).await?;
        let probe = match NodeClient::new(&node, self.engine.config().node_timeout()) {
            Ok(client) => client.health().await,
            Err(e) => Err(e),
        };

        match probe {
            Ok(()) => {
                self.db.mark_node_online(id, unix_timestamp()).await?;
                Ok(NodeHealth {
                    node_id: id,
                    status: NodeStatus::Online,
                    error: None,
                })
            }
            Err(e) => {
                if e.is_transport() {
                    self.db.mark_node_offline(id).await?;
                }
                let status = self.db.get_node(id).await?.status;
                warn!(node_id = id, error = %e, "Node health check failed");
                Ok(NodeHealth {
                    node_id: id,
                    status,
                    error: Some(e.to_string()),
                })
            }
        }
    }
}

fn node_params(
    name: &str,
    api_address: &str,
    api_port: i64,
    secret_key: &str,
    public_address: &str,
    group_id: Option<i64>,
) -> PanelResult<NodeParams> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PanelError::validation("name required"));
    }
    let api_address = api_address.trim();
    if api_address.is_empty() {
        return Err(PanelError::validation("api_address required"));
    }
    if !(1..=65_535).contains(&api_port) {
        return Err(PanelError::validation(format!(
            "api_port {api_port} out of range"
        )));
    }
    if secret_key.is_empty() {
        return Err(PanelError::validation("secret_key required"));
    }
    if group_id.is_some_and(|g| g <= 0) {
        return Err(PanelError::validation("group_id must be positive"));
    }
    Ok(NodeParams {
        name: name.to_string(),
        api_address: api_address.to_string(),
        api_port,
        secret_key: secret_key.to_string(),
        public_address: public_address.trim().to_string(),
        group_id,
    })
}
