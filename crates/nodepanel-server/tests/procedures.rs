//! End-to-end tests of the procedure surface.

#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{ADMIN_PASS, ADMIN_USER, Agent, admin_token, call, test_app};

// =============================================================================
// Health and auth
// =============================================================================

#[tokio::test]
async fn health_is_public() {
    let app = test_app().await;
    let (status, body) = call(&app, "/panel.v1.HealthService/Check", None, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "serving");
}

#[tokio::test]
async fn protected_procedures_need_a_token() {
    let app = test_app().await;
    let (status, body) = call(&app, "/panel.v1.UserService/List", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthenticated");

    let (status, _) = call(
        &app,
        "/panel.v1.UserService/List",
        Some("not-a-token"),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bootstrap_and_login_flow() {
    let app = test_app().await;
    let (status, body) = call(&app, "/panel.v1.AuthService/BootstrapStatus", None, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["needs_setup"], true);

    let (status, body) = call(
        &app,
        "/panel.v1.AuthService/Login",
        None,
        json!({"username": ADMIN_USER, "password": ADMIN_PASS}),
    )
    .await;
    assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);
    assert_eq!(body["code"], "failed_precondition");

    let token = admin_token(&app).await;
    let (status, _) = call(&app, "/panel.v1.UserService/List", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        "/panel.v1.AuthService/Bootstrap",
        None,
        json!({"username": "again", "password": "pass123456"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "admin already configured");

    let (status, body) = call(
        &app,
        "/panel.v1.AuthService/Login",
        None,
        json!({"username": ADMIN_USER, "password": "wrong-pass"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid credentials");

    let (status, body) = call(
        &app,
        "/panel.v1.AuthService/Login",
        None,
        json!({"username": ADMIN_USER, "password": ADMIN_PASS}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["expires_at"].as_i64().unwrap() > 0);
}

// =============================================================================
// Catalog and sync
// =============================================================================

#[tokio::test]
async fn malformed_body_is_invalid_argument() {
    let app = test_app().await;
    let token = admin_token(&app).await;
    let (status, body) = call(
        &app,
        "/panel.v1.UserService/Get",
        Some(&token),
        json!({"id": "seven"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_argument");
}

#[tokio::test]
async fn missing_entity_is_not_found() {
    let app = test_app().await;
    let token = admin_token(&app).await;
    let (status, body) = call(&app, "/panel.v1.NodeService/Get", Some(&token), json!({"id": 42})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn inbound_write_embeds_sync_outcome() {
    let app = test_app().await;
    let token = admin_token(&app).await;
    let agent = Agent::spawn(StatusCode::INTERNAL_SERVER_ERROR, "boom").await;

    let (_, group) = call(
        &app,
        "/panel.v1.GroupService/Create",
        Some(&token),
        json!({"name": "g1"}),
    )
    .await;
    let (status, node) = call(
        &app,
        "/panel.v1.NodeService/Create",
        Some(&token),
        json!({
            "name": "n1",
            "api_address": agent.addr.ip().to_string(),
            "api_port": agent.addr.port(),
            "secret_key": "n1-secret",
            "group_id": group["id"],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{node}");

    let (status, body) = call(
        &app,
        "/panel.v1.InboundService/Create",
        Some(&token),
        json!({
            "node_id": node["id"],
            "tag": "edge",
            "protocol": "trojan",
            "listen_port": 443,
            "settings": {"x": 1},
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["entity"]["tag"], "edge");
    assert_eq!(body["entity"]["settings"], json!({"x": 1}));
    assert_eq!(body["sync"]["status"], "error");
    assert_eq!(body["sync"]["error"], "node sync status 500: boom");
    assert_eq!(agent.payloads().await.len(), 1);

    let (status, body) = call(
        &app,
        "/panel.v1.NodeService/Sync",
        Some(&token),
        json!({"id": node["id"]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "unavailable");
    assert_eq!(body["message"], "node sync status 500: boom");

    let (status, jobs) = call(
        &app,
        "/panel.v1.SyncJobService/List",
        Some(&token),
        json!({"node_id": node["id"]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(jobs["total"], 2);
    assert_eq!(jobs["jobs"][0]["trigger_source"], "manual_node_sync");
    assert_eq!(jobs["jobs"][1]["trigger_source"], "auto_inbound_change");

    let (status, detail) = call(
        &app,
        "/panel.v1.SyncJobService/Get",
        Some(&token),
        json!({"id": jobs["jobs"][0]["id"]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["job"]["status"], "failed");
    assert_eq!(detail["attempts"][0]["http_status"], 500);
}

#[tokio::test]
async fn user_create_fans_out_to_group_nodes() {
    let app = test_app().await;
    let token = admin_token(&app).await;
    let agent = Agent::spawn(StatusCode::OK, "ok").await;

    let (_, group) = call(
        &app,
        "/panel.v1.GroupService/Create",
        Some(&token),
        json!({"name": "g1"}),
    )
    .await;
    let (_, node) = call(
        &app,
        "/panel.v1.NodeService/Create",
        Some(&token),
        json!({
            "name": "n1",
            "api_address": agent.addr.ip().to_string(),
            "api_port": agent.addr.port(),
            "secret_key": "n1-secret",
            "group_id": group["id"],
        }),
    )
    .await;

    let (status, body) = call(
        &app,
        "/panel.v1.UserService/Create",
        Some(&token),
        json!({"username": "alice", "group_ids": [group["id"]]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["entity"]["username"], "alice");
    assert_eq!(body["entity"]["effective_status"], "active");
    assert_eq!(body["sync"][0]["node_id"], node["id"]);
    assert_eq!(body["sync"][0]["result"]["status"], "ok");

    let (_, node_after) = call(
        &app,
        "/panel.v1.NodeService/Get",
        Some(&token),
        json!({"id": node["id"]}),
    )
    .await;
    assert_eq!(node_after["status"], "online");

    let (status, body) = call(
        &app,
        "/panel.v1.GroupService/Delete",
        Some(&token),
        json!({"id": group["id"]}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

#[tokio::test]
async fn node_update_with_null_group_detaches() {
    let app = test_app().await;
    let token = admin_token(&app).await;
    let (_, group) = call(
        &app,
        "/panel.v1.GroupService/Create",
        Some(&token),
        json!({"name": "g1"}),
    )
    .await;
    let (_, node) = call(
        &app,
        "/panel.v1.NodeService/Create",
        Some(&token),
        json!({
            "name": "n1",
            "api_address": "127.0.0.1",
            "api_port": 1,
            "secret_key": "s",
            "group_id": group["id"],
        }),
    )
    .await;

    let (status, body) = call(
        &app,
        "/panel.v1.NodeService/Update",
        Some(&token),
        json!({"id": node["id"], "name": "renamed"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["entity"]["group_id"], group["id"]);
    assert_eq!(body["sync"], serde_json::Value::Null);

    let (status, body) = call(
        &app,
        "/panel.v1.NodeService/Update",
        Some(&token),
        json!({"id": node["id"], "group_id": null}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["entity"]["group_id"], serde_json::Value::Null);
    assert_eq!(body["sync"]["status"], "error");
    assert_eq!(body["sync"]["error"], "node group_id not set");
}

// =============================================================================
// Settings, traffic, sing-box
// =============================================================================

#[tokio::test]
async fn settings_round_trip_through_procedures() {
    let app = test_app().await;
    let token = admin_token(&app).await;

    let (status, body) = call(
        &app,
        "/panel.v1.SystemService/UpdateSettings",
        Some(&token),
        json!({"timezone": "Asia/Tokyo"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["timezone"], "Asia/Tokyo");

    let (_, info) = call(&app, "/panel.v1.SystemService/GetInfo", Some(&token), json!({})).await;
    assert_eq!(info["timezone"], "Asia/Tokyo");
    assert!(info["server_time"].as_str().unwrap().ends_with("+09:00"));

    let (status, body) = call(
        &app,
        "/panel.v1.SystemService/UpdateSettings",
        Some(&token),
        json!({"subscription_base_url": "https://panel.example.com:443"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_argument");
}

#[tokio::test]
async fn traffic_window_is_validated() {
    let app = test_app().await;
    let token = admin_token(&app).await;

    let (status, body) = call(
        &app,
        "/panel.v1.TrafficService/TotalSummary",
        Some(&token),
        json!({"window": "7d"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["samples"], 0);

    let (status, _) = call(
        &app,
        "/panel.v1.TrafficService/NodesSummary",
        Some(&token),
        json!({"window": "30s"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        "/panel.v1.TrafficService/Timeseries",
        Some(&token),
        json!({"window": "all", "bucket": "day"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bucket_secs"], 86_400);
    assert_eq!(body["window_secs"], 0);
}

#[tokio::test]
async fn singbox_wrap_config() {
    let app = test_app().await;
    let token = admin_token(&app).await;

    let (status, body) = call(
        &app,
        "/panel.v1.SingboxService/WrapConfig",
        Some(&token),
        json!({"config": r#"{"type":"vless","tag":"in","listen_port":443}"#}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["config"]["inbounds"][0]["tag"], "in");

    let (status, _) = call(
        &app,
        "/panel.v1.SingboxService/WrapConfig",
        Some(&token),
        json!({"config": "not json"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn database_opens_on_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("panel.db");
    let db = nodepanel_server::storage::PanelDatabase::open(&path)
        .await
        .unwrap();
    db.set_setting("timezone", "UTC").await.unwrap();
    db.pool().close().await;

    let reopened = nodepanel_server::storage::PanelDatabase::open(&path)
        .await
        .unwrap();
    assert_eq!(
        reopened.get_setting("timezone").await.unwrap().as_deref(),
        Some("UTC")
    );
}
