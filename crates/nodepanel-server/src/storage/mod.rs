//! `SQLite` storage for the panel.
//!
//! Owns every persistent entity: users, groups and memberships, nodes,
//! inbounds, sync job history, traffic samples and system settings.

mod db;
mod models;
mod queries_groups;
mod queries_inbounds;
mod queries_nodes;
mod queries_settings;
mod queries_sync;
mod queries_traffic;
mod queries_users;


pub use db::{DatabaseError, PanelDatabase};
pub use models::*;
pub use queries_inbounds::InboundParams;
pub use queries_nodes::NodeParams;
pub use queries_settings::{KEY_ADMIN_PASSWORD_HASH, KEY_ADMIN_USERNAME};
pub use queries_sync::{AttemptOutcome, JobOutcome};
pub use queries_users::UserParams;
