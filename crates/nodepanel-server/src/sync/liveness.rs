//! Node liveness bookkeeping driven by sync outcomes.

use nodepanel_core::db::unix_timestamp;
use tracing::{debug, warn};

use super::engine::{SyncEngine, SyncResult};
use crate::storage::{Node, TriggerSource};

impl SyncEngine {
    /// Apply the liveness side effects of a sync result.
    ///
    /// Success marks the node online. A transport failure marks it offline.
    /// Any other failure means the node answered, so its status is left alone.
    pub async fn apply_liveness(&self, node_id: i64, result: &SyncResult) {
        let update = if result.is_ok() {
            self.db().mark_node_online(node_id, unix_timestamp()).await
        } else if result.is_transport_failure() {
            self.db().mark_node_offline(node_id).await
        } else {
            return;
        };

        match update {
            Ok(()) => debug!(node_id, online = result.is_ok(), "Node liveness updated"),
            Err(e) => warn!(node_id, error = %e, "Failed to update node liveness"),
        }
    }

    /// Sync a node and apply the liveness side effects.
    pub async fn sync_and_track(
        &self,
        node: &Node,
        trigger: Option<TriggerSource>,
        parent_job_id: Option<i64>,
    ) -> SyncResult {
        let result = self.run_node_sync(node, trigger, parent_job_id).await;
        self.apply_liveness(node.id, &result).await;
        result
    }
}
