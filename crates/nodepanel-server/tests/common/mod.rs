//! Fixtures shared by the procedure tests.

#![allow(dead_code, clippy::panic, clippy::expect_used, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use nodepanel_core::SettingsValidators;
use nodepanel_core::config::SyncConfig;
use nodepanel_server::auth::JwtManager;
use nodepanel_server::panel::{Panel, TimezoneCell};
use nodepanel_server::server::{AppState, build_router};
use nodepanel_server::storage::PanelDatabase;
use nodepanel_server::sync::SyncEngine;

pub const ADMIN_USER: &str = "root";
pub const ADMIN_PASS: &str = "pass123456";

pub async fn test_app() -> Router {
    let db = PanelDatabase::open_in_memory().await.unwrap();
    let engine = SyncEngine::new(db.clone(), SyncConfig::default(), CancellationToken::new());
    let panel = Panel::new(
        db,
        engine,
        Arc::new(SettingsValidators::with_builtins()),
        JwtManager::new(b"integration-secret", 3600),
        TimezoneCell::default(),
    );
    build_router(AppState { panel })
}

/// Call a procedure and return (status, JSON body).
pub async fn call(app: &Router, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let resp = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Bootstrap the admin account and return its token.
pub async fn admin_token(app: &Router) -> String {
    let (status, body) = call(
        app,
        "/panel.v1.AuthService/Bootstrap",
        None,
        serde_json::json!({"username": ADMIN_USER, "password": ADMIN_PASS}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
}

/// A node agent that answers every push with a fixed status.
pub struct Agent {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<Value>>>,
}

impl Agent {
    pub async fn spawn(status: StatusCode, body: &'static str) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/sync",
                post(
                    move |State(seen): State<Arc<Mutex<Vec<Value>>>>, payload: String| async move {
                        seen.lock()
                            .await
                            .push(serde_json::from_str(&payload).unwrap_or(Value::Null));
                        (status, body)
                    },
                ),
            )
            .route("/health", get(move || async move { (status, body) }))
            .with_state(Arc::clone(&received));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, received }
    }

    pub async fn payloads(&self) -> Vec<Value> {
        self.received.lock().await.clone()
    }
}
