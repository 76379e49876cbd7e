//! HTTP client for a node agent.
//!
//! The agent exposes `GET /health` and `POST /sync`, both bearer-authenticated
//! with the node's secret key. The client is cheap to build and holds no state
//! beyond the target, so callers create one per operation.

use std::error::Error as StdError;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use thiserror::Error;

use nodepanel_core::SyncPayload;

use crate::storage::Node;

/// Prefix of an application-level sync failure (the node answered non-2xx).
pub const SYNC_STATUS_PREFIX: &str = "node sync status ";

/// Prefix of a transport-level sync failure (the node could not be reached).
pub const SYNC_REQUEST_PREFIX: &str = "node sync request failed: ";

/// Node client errors.
///
/// `Display` renders the wire forms operators and stored job history see.
#[derive(Debug, Clone, Error)]
pub enum NodeClientError {
    #[error("node sync status {status}: {body}")]
    SyncStatus { status: u16, body: String },

    #[error("node sync request failed: {0}")]
    SyncRequest(String),

    #[error("node health status {status}: {body}")]
    HealthStatus { status: u16, body: String },

    #[error("node health request failed: {0}")]
    HealthRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl NodeClientError {
    /// HTTP status returned by the node, if it answered at all.
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::SyncStatus { status, .. } | Self::HealthStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the node could not be reached (as opposed to answering with an error).
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::SyncRequest(_) | Self::HealthRequest(_))
    }
}

/// Client for one node agent.
#[derive(Debug)]
pub struct NodeClient {
    http: reqwest::Client,
    base_url: String,
}

impl NodeClient {
    /// Build a client for `node`; `timeout` bounds every request.
    pub fn new(node: &Node, timeout: Duration) -> Result<Self, NodeClientError> {
        let base_url = base_url(&node.api_address, node.api_port)?;
        if node.secret_key.is_empty() {
            return Err(NodeClientError::Config("node secret_key is empty".into()));
        }

        let mut headers = HeaderMap::new();
        let token_val = HeaderValue::from_str(&format!("Bearer {}", node.secret_key))
            .map_err(|_| NodeClientError::Config("invalid secret_key format".into()))?;
        headers.insert(AUTHORIZATION, token_val);

        // reqwest is built with rustls-no-provider; Err means a provider is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| NodeClientError::Config(error_chain(&e)))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the agent is up and accepts our credentials.
    pub async fn health(&self) -> Result<(), NodeClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| NodeClientError::HealthRequest(error_chain(&e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NodeClientError::HealthStatus {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        Ok(())
    }

    /// Push a full configuration snapshot to the agent.
    pub async fn sync_config(&self, payload: &SyncPayload) -> Result<(), NodeClientError> {
        let body = payload
            .to_canonical_json()
            .map_err(|e| NodeClientError::SyncRequest(e.to_string()))?;

        let resp = self
            .http
            .post(format!("{}/sync", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| NodeClientError::SyncRequest(error_chain(&e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NodeClientError::SyncStatus {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Base URL for a node's agent API.
///
/// An address that already carries an http(s) scheme is used as given;
/// otherwise `http://<address>:<port>`, with IPv6 literals bracketed.
pub fn base_url(api_address: &str, api_port: i64) -> Result<String, NodeClientError> {
    let address = api_address.trim();
    if address.is_empty() {
        return Err(NodeClientError::Config("node api_address is empty".into()));
    }
    if address.starts_with("http://") || address.starts_with("https://") {
        return Ok(address.trim_end_matches('/').to_string());
    }
    if !(1..=65_535).contains(&api_port) {
        return Err(NodeClientError::Config(format!(
            "node api_port {api_port} out of range"
        )));
    }
    if address.contains(':') && !address.starts_with('[') {
        Ok(format!("http://[{address}]:{api_port}"))
    } else {
        Ok(format!("http://{address}:{api_port}"))
    }
}

/// Recover the node's HTTP status from a rendered sync error.
///
/// Returns the code for `node sync status <n>: ...` with `100 <= n <= 599`,
/// and zero for anything else.
pub fn parse_sync_http_status(message: &str) -> i64 {
    let Some(rest) = message.strip_prefix(SYNC_STATUS_PREFIX) else {
        return 0;
    };
    let code = rest.split(':').next().unwrap_or_default().trim();
    match code.parse::<i64>() {
        Ok(n) if (100..=599).contains(&n) => n,
        _ => 0,
    }
}

/// Render an error with its sources, e.g. `error sending request: connection refused`.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}
