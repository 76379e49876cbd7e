//! Node synchronization: per-node locking, the sync engine, group fan-out and
//! liveness tracking.

mod engine;
mod fanout;
mod liveness;
mod locks;


pub use engine::{SYNC_CANCELLED, SyncEngine, SyncResult, SyncStatus, normalize_sync_error};
pub use fanout::NodeSyncReport;
pub use locks::NodeLocks;
