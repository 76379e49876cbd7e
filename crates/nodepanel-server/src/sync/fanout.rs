//! Group fan-out: sync every node serving a set of groups.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use super::engine::{SyncEngine, SyncResult};
use crate::storage::TriggerSource;

/// Outcome of syncing one node during a fan-out.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSyncReport {
    pub node_id: i64,
    pub node_name: String,
    pub result: SyncResult,
}

impl SyncEngine {
    /// Sync every node whose group is in `group_ids`, in catalog order.
    ///
    /// Non-positive and repeated ids are ignored. Nodes are synced one at a
    /// time. A failure to read the catalog stops the fan-out; per-node
    /// outcomes are already recorded as sync jobs.
    pub async fn sync_nodes_by_group_ids(
        &self,
        group_ids: &[i64],
        trigger: TriggerSource,
    ) -> Vec<NodeSyncReport> {
        let groups: BTreeSet<i64> = group_ids.iter().copied().filter(|id| *id > 0).collect();
        if groups.is_empty() {
            return Vec::new();
        }

        let page_size = self.config().fanout_page_size.max(1);
        let mut reports = Vec::new();
        let mut offset = 0;
        loop {
            let page = match self.db().list_nodes(page_size, offset).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(offset, error = %e, "Fan-out aborted reading node catalog");
                    break;
                }
            };
            debug!(offset, nodes = page.len(), "Fan-out page");

            for node in &page {
                if !node.group_id.is_some_and(|g| groups.contains(&g)) {
                    continue;
                }
                let result = self.sync_and_track(node, Some(trigger), None).await;
                reports.push(NodeSyncReport {
                    node_id: node.id,
                    node_name: node.name.clone(),
                    result,
                });
            }

            if i64::try_from(page.len()).unwrap_or(i64::MAX) < page_size {
                break;
            }
            offset += page_size;
        }
        reports
    }
}
