//! `NodePanel` Core Library
//!
//! Shared functionality for the panel:
//! - Domain models for users, groups, nodes, inbounds and sync history
//! - Effective user status evaluation
//! - Per-protocol inbound settings validation
//! - Deterministic sync payload construction
//! - sing-box editor shaping, traffic windows, settings validation
//! - Configuration, database helpers, tracing setup

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod payload;
pub mod singbox;
pub mod system_settings;
pub mod tracing_init;
pub mod user_state;
pub mod validators;
pub mod window;

pub use config::PanelConfig;
pub use error::{Error, Result};
pub use payload::{SyncPayload, build_payload};
pub use user_state::{effective_status, is_subscription_eligible};
pub use validators::SettingsValidators;
