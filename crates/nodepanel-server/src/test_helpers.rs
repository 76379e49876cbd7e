//! Shared test fixtures: an in-memory panel store and mock node agents.

#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::storage::{Node, NodeParams, PanelDatabase, UserParams};
use crate::storage::{User, UserStatus};

/// How a mock agent answers `POST /sync`.
#[derive(Debug, Clone)]
pub struct MockBehavior {
    pub status: StatusCode,
    pub body: String,
    pub delay: Duration,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            body: "ok".into(),
            delay: Duration::ZERO,
        }
    }
}

#[derive(Default)]
struct MockState {
    behavior: Mutex<MockBehavior>,
    received: Mutex<Vec<(Option<String>, Value)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// A node agent listening on a loopback port.
pub struct MockNode {
    pub addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockNode {
    pub async fn spawn(behavior: MockBehavior) -> Self {
        let state = Arc::new(MockState {
            behavior: Mutex::new(behavior),
            ..MockState::default()
        });
        let app = Router::new()
            .route("/sync", post(handle_sync))
            .route("/health", get(handle_health))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, state }
    }

    pub async fn ok() -> Self {
        Self::spawn(MockBehavior::default()).await
    }

    pub async fn failing(status: u16, body: &str) -> Self {
        Self::spawn(MockBehavior {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.into(),
            delay: Duration::ZERO,
        })
        .await
    }

    pub async fn set_behavior(&self, behavior: MockBehavior) {
        *self.state.behavior.lock().await = behavior;
    }

    /// Sync payloads received so far.
    pub async fn payloads(&self) -> Vec<Value> {
        self.state
            .received
            .lock()
            .await
            .iter()
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Authorization headers received so far.
    pub async fn auth_headers(&self) -> Vec<Option<String>> {
        self.state
            .received
            .lock()
            .await
            .iter()
            .map(|(a, _)| a.clone())
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

async fn handle_sync(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(now, Ordering::SeqCst);

    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let payload = serde_json::from_str(&body).unwrap_or(Value::Null);
    state.received.lock().await.push((auth, payload));

    let behavior = state.behavior.lock().await.clone();
    if !behavior.delay.is_zero() {
        tokio::time::sleep(behavior.delay).await;
    }
    state.in_flight.fetch_sub(1, Ordering::SeqCst);
    (behavior.status, behavior.body)
}

async fn handle_health(State(state): State<Arc<MockState>>) -> (StatusCode, String) {
    let behavior = state.behavior.lock().await.clone();
    (behavior.status, behavior.body)
}

/// A loopback address nothing listens on.
pub async fn refused_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub async fn test_db() -> PanelDatabase {
    PanelDatabase::open_in_memory().await.unwrap()
}

/// Register a node pointing at `addr`.
pub async fn create_node(
    db: &PanelDatabase,
    name: &str,
    addr: SocketAddr,
    group_id: Option<i64>,
) -> Node {
    db.create_node(&NodeParams {
        name: name.into(),
        api_address: addr.ip().to_string(),
        api_port: i64::from(addr.port()),
        secret_key: format!("{name}-secret"),
        public_address: "203.0.113.1".into(),
        group_id,
    })
    .await
    .unwrap()
}

pub async fn create_user(db: &PanelDatabase, username: &str) -> User {
    db.create_user(&UserParams {
        username: username.into(),
        traffic_limit: 0,
        traffic_reset_day: 0,
        status: UserStatus::Active,
        expire_at: None,
    })
    .await
    .unwrap()
}
