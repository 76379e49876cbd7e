//! Tests for the node agent client.

#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use serde_json::json;

use nodepanel_core::SyncPayload;

use super::client::{NodeClient, NodeClientError, base_url, parse_sync_http_status};
use crate::test_helpers::{MockBehavior, MockNode, create_node, refused_addr, test_db};

const TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// URL and status parsing
// =============================================================================

#[test]
fn base_url_forms() {
    assert_eq!(base_url("10.0.0.1", 9090).unwrap(), "http://10.0.0.1:9090");
    assert_eq!(base_url("2001:db8::1", 9090).unwrap(), "http://[2001:db8::1]:9090");
    assert_eq!(
        base_url("https://agent.example:8443/", 0).unwrap(),
        "https://agent.example:8443"
    );
    assert!(matches!(base_url("", 9090), Err(NodeClientError::Config(_))));
    assert!(matches!(base_url("10.0.0.1", 0), Err(NodeClientError::Config(_))));
    assert!(matches!(base_url("10.0.0.1", 70_000), Err(NodeClientError::Config(_))));
}

#[test]
fn parse_status_from_message() {
    assert_eq!(parse_sync_http_status("node sync status 500: boom"), 500);
    assert_eq!(parse_sync_http_status("node sync status 404: "), 404);
    assert_eq!(parse_sync_http_status("node sync status 100: x"), 100);
    assert_eq!(parse_sync_http_status("node sync status 599: x"), 599);
    assert_eq!(parse_sync_http_status("node sync status 99: x"), 0);
    assert_eq!(parse_sync_http_status("node sync status 600: x"), 0);
    assert_eq!(parse_sync_http_status("node sync status abc: x"), 0);
    assert_eq!(parse_sync_http_status("node sync request failed: dial tcp: refused"), 0);
    assert_eq!(parse_sync_http_status(""), 0);
}

#[test]
fn error_display_forms() {
    let status = NodeClientError::SyncStatus {
        status: 500,
        body: "boom".into(),
    };
    assert_eq!(status.to_string(), "node sync status 500: boom");
    assert_eq!(parse_sync_http_status(&status.to_string()), 500);
    assert_eq!(status.http_status(), Some(500));
    assert!(!status.is_transport());

    let transport = NodeClientError::SyncRequest("dial tcp: refused".into());
    assert_eq!(
        transport.to_string(),
        "node sync request failed: dial tcp: refused"
    );
    assert!(transport.is_transport());
    assert_eq!(transport.http_status(), None);
}

// =============================================================================
// Against a mock agent
// =============================================================================

#[tokio::test]
async fn sync_posts_payload_with_bearer_secret() {
    let mock = MockNode::ok().await;
    let db = test_db().await;
    let node = create_node(&db, "n1", mock.addr, None).await;

    let client = NodeClient::new(&node, TIMEOUT).unwrap();
    let payload = SyncPayload {
        inbounds: vec![json!({"type": "vless", "tag": "edge"})],
    };
    client.sync_config(&payload).await.unwrap();

    let payloads = mock.payloads().await;
    assert_eq!(payloads, [json!({"inbounds": [{"tag": "edge", "type": "vless"}]})]);
    assert_eq!(
        mock.auth_headers().await,
        [Some("Bearer n1-secret".to_string())]
    );
}

#[tokio::test]
async fn sync_non_2xx_carries_status_and_trimmed_body() {
    let mock = MockNode::failing(500, "boom\n").await;
    let db = test_db().await;
    let node = create_node(&db, "n1", mock.addr, None).await;

    let err = NodeClient::new(&node, TIMEOUT)
        .unwrap()
        .sync_config(&SyncPayload::empty())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "node sync status 500: boom");
}

#[tokio::test]
async fn sync_connection_refused_is_transport_error() {
    let addr = refused_addr().await;
    let db = test_db().await;
    let node = create_node(&db, "n1", addr, None).await;

    let err = NodeClient::new(&node, TIMEOUT)
        .unwrap()
        .sync_config(&SyncPayload::empty())
        .await
        .unwrap_err();
    assert!(err.is_transport());
    assert!(
        err.to_string().starts_with("node sync request failed: "),
        "got {err}"
    );
}

#[tokio::test]
async fn sync_timeout_is_transport_error() {
    let mock = MockNode::spawn(MockBehavior {
        delay: Duration::from_secs(2),
        ..MockBehavior::default()
    })
    .await;
    let db = test_db().await;
    let node = create_node(&db, "n1", mock.addr, None).await;

    let err = NodeClient::new(&node, Duration::from_millis(100))
        .unwrap()
        .sync_config(&SyncPayload::empty())
        .await
        .unwrap_err();
    assert!(err.is_transport(), "got {err}");
}

#[tokio::test]
async fn health_reports_status() {
    let mock = MockNode::ok().await;
    let db = test_db().await;
    let node = create_node(&db, "n1", mock.addr, None).await;
    NodeClient::new(&node, TIMEOUT)
        .unwrap()
        .health()
        .await
        .unwrap();

    mock.set_behavior(MockBehavior {
        status: axum::http::StatusCode::SERVICE_UNAVAILABLE,
        body: "draining".into(),
        ..MockBehavior::default()
    })
    .await;
    let err = NodeClient::new(&node, TIMEOUT)
        .unwrap()
        .health()
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "node health status 503: draining");
}
