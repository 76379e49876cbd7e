//! Per-node mutual exclusion for sync pushes.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

/// Lazily populated table of per-node mutexes.
///
/// Entries are never removed, so the table is bounded by the number of nodes
/// ever synced. Cloning shares the table.
#[derive(Clone, Default)]
pub struct NodeLocks {
    table: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl NodeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding `node_id`, created on first use.
    pub async fn lock_for(&self, node_id: i64) -> Arc<Mutex<()>> {
        let mut table = self.table.lock().await;
        Arc::clone(table.entry(node_id).or_default())
    }

    pub async fn tracked_nodes(&self) -> usize {
        self.table.lock().await.len()
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_node_shares_mutex() {
        let locks = NodeLocks::new();
        let a = locks.lock_for(1).await;
        let b = locks.lock_for(1).await;
        let c = locks.lock_for(2).await;

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.tracked_nodes().await, 2);
    }

    #[tokio::test]
    async fn held_lock_blocks_same_node_only() {
        let locks = NodeLocks::new();
        let first = locks.lock_for(7).await;
        let _guard = first.lock().await;

        assert!(locks.lock_for(7).await.try_lock().is_err());
        assert!(locks.lock_for(8).await.try_lock().is_ok());
    }

    #[tokio::test]
    async fn clones_share_the_table() {
        let locks = NodeLocks::new();
        let clone = locks.clone();
        let a = locks.lock_for(3).await;
        let b = clone.lock_for(3).await;
        assert!(Arc::ptr_eq(&a, &b));
    }
}
