//! Configuration resolution for `NodePanel`.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Config file (`$XDG_CONFIG_HOME/nodepanel/settings.json` or an explicit path)
//! 3. Environment variables (`NODEPANEL_*`)
//! 4. CLI arguments (applied by the binary, highest priority)

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Complete panel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PanelConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Listener and storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub database_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_path: None,
        }
    }
}

/// Admin token configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret-change-me".to_string(),
            token_ttl_secs: 24 * 60 * 60,
        }
    }
}

/// Node synchronization tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Deadline applied to every HTTP call to a node agent.
    pub node_timeout_secs: u64,
    /// Sync jobs retained per node after each sync.
    pub job_history_limit: i64,
    /// Node catalog page size used by group fan-out.
    pub fanout_page_size: i64,
    /// Upper bound on inbounds read for a single node payload.
    pub inbound_page_limit: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            node_timeout_secs: 10,
            job_history_limit: 500,
            fanout_page_size: 200,
            inbound_page_limit: 10_000,
        }
    }
}

impl SyncConfig {
    pub const fn node_timeout(&self) -> Duration {
        Duration::from_secs(self.node_timeout_secs)
    }
}

/// Logging output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "nodepanel_server=info,nodepanel_core=info".to_string(),
            json: false,
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// An explicit `path` must exist; the default location is optional.
pub fn load_config(path: Option<&Path>) -> Result<PanelConfig> {
    let mut config = match path {
        Some(p) => load_config_file(p)?,
        None => match global_config_path() {
            Some(p) if p.exists() => load_config_file(&p)?,
            _ => PanelConfig::default(),
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Get the default config file path.
pub fn global_config_path() -> Option<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
        .map(|p| p.join("nodepanel").join("settings.json"))
}

fn load_config_file(path: &Path) -> Result<PanelConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn apply_env_overrides(config: &mut PanelConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(addr) = env("NODEPANEL_ADDR").and_then(|v| v.parse().ok()) {
        config.server.addr = addr;
    }
    if let Some(path) = env("NODEPANEL_DB_PATH") {
        config.server.database_path = Some(PathBuf::from(path));
    }
    if let Some(secret) = env("NODEPANEL_JWT_SECRET") {
        config.auth.jwt_secret = secret;
    }
    if let Some(n) = env("NODEPANEL_NODE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        config.sync.node_timeout_secs = n;
    }
    if let Some(n) = env("NODEPANEL_JOB_HISTORY_LIMIT").and_then(|v| v.parse().ok()) {
        config.sync.job_history_limit = n;
    }
    if let Some(filter) = env("NODEPANEL_LOG") {
        config.log.filter = filter;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_sync_contract() {
        let config = PanelConfig::default();
        assert_eq!(config.sync.job_history_limit, 500);
        assert_eq!(config.sync.fanout_page_size, 200);
        assert_eq!(config.sync.inbound_page_limit, 10_000);
        assert_eq!(config.auth.token_ttl_secs, 86_400);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"sync": {"node_timeout_secs": 3}}"#).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.sync.node_timeout_secs, 3);
        assert_eq!(config.sync.job_history_limit, 500);
        assert_eq!(config.server.addr.port(), 8080);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("NODEPANEL_ADDR", "127.0.0.1:9000"),
            ("NODEPANEL_JWT_SECRET", "s3cret"),
            ("NODEPANEL_JOB_HISTORY_LIMIT", "not-a-number"),
        ]);
        let mut config = PanelConfig::default();
        apply_env_overrides(&mut config, |k| vars.get(k).map(ToString::to_string));

        assert_eq!(config.server.addr.port(), 9000);
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.sync.job_history_limit, 500);
    }
}
