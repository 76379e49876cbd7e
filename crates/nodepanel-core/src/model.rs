//! Domain models shared by the store, the payload builder and the sync engine.
//!
//! Rows are read straight into these types through `sqlx::FromRow`; enums are
//! persisted as snake_case TEXT.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::Error;

/// Stored user lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Active,
    Disabled,
    Expired,
    TrafficExceeded,
}

impl UserStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
            Self::Expired => "expired",
            Self::TrafficExceeded => "traffic_exceeded",
        }
    }
}

impl FromStr for UserStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "active" => Ok(Self::Active),
            "disabled" => Ok(Self::Disabled),
            "expired" => Ok(Self::Expired),
            "traffic_exceeded" => Ok(Self::TrafficExceeded),
            other => Err(Error::validation(format!("invalid user status {other:?}"))),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node liveness as last observed by the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum NodeStatus {
    Online,
    Offline,
    #[default]
    Unknown,
}

/// Why a sync job was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TriggerSource {
    #[default]
    ManualNodeSync,
    ManualRetry,
    AutoInboundChange,
    AutoUserChange,
    AutoGroupChange,
}

impl TriggerSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ManualNodeSync => "manual_node_sync",
            Self::ManualRetry => "manual_retry",
            Self::AutoInboundChange => "auto_inbound_change",
            Self::AutoUserChange => "auto_user_change",
            Self::AutoGroupChange => "auto_group_change",
        }
    }

    /// Parse a trigger name; an empty string means [`TriggerSource::ManualNodeSync`].
    pub fn parse_or_default(s: &str) -> Result<Self, Error> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        s.parse()
    }
}

impl FromStr for TriggerSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "manual_node_sync" => Ok(Self::ManualNodeSync),
            "manual_retry" => Ok(Self::ManualRetry),
            "auto_inbound_change" => Ok(Self::AutoInboundChange),
            "auto_user_change" => Ok(Self::AutoUserChange),
            "auto_group_change" => Ok(Self::AutoGroupChange),
            other => Err(Error::validation(format!("invalid trigger source {other:?}"))),
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sync job lifecycle: queued -> running -> success | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Success,
    Failed,
}

impl JobStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AttemptStatus {
    Running,
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub uuid: String,
    pub username: String,
    /// Quota in bytes; zero means unlimited.
    pub traffic_limit: i64,
    pub traffic_used: i64,
    /// Day of month the quota resets on; zero disables resets.
    pub traffic_reset_day: i64,
    pub status: UserStatus,
    pub expire_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub member_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Node {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub api_address: String,
    pub api_port: i64,
    pub secret_key: String,
    pub public_address: String,
    pub status: NodeStatus,
    pub group_id: Option<i64>,
    pub last_seen_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A listener owned by one node. Settings columns hold canonical JSON objects.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Inbound {
    pub id: i64,
    pub uuid: String,
    pub node_id: i64,
    pub tag: String,
    pub protocol: String,
    pub listen_port: i64,
    pub public_port: i64,
    #[serde(serialize_with = "raw_json")]
    pub settings: String,
    #[serde(serialize_with = "raw_json")]
    pub tls_settings: String,
    #[serde(serialize_with = "raw_json")]
    pub transport_settings: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SyncJob {
    pub id: i64,
    pub node_id: i64,
    pub parent_job_id: Option<i64>,
    pub trigger_source: TriggerSource,
    pub status: JobStatus,
    pub inbound_count: i64,
    pub active_user_count: i64,
    pub payload_hash: Option<String>,
    pub attempt_count: i64,
    pub duration_ms: i64,
    pub error_summary: String,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SyncAttempt {
    pub id: i64,
    pub job_id: i64,
    pub attempt_no: i64,
    pub status: AttemptStatus,
    pub http_status: i64,
    pub duration_ms: i64,
    pub backoff_ms: i64,
    pub error_summary: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
}

/// Serialize a stored JSON text column as structured JSON.
fn raw_json<S: Serializer>(raw: &str, serializer: S) -> Result<S::Ok, S::Error> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => value.serialize(serializer),
        Err(_) => serializer.serialize_str(raw),
    }
}
