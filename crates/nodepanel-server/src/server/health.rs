//! `panel.v1.HealthService`: liveness for load balancers and the web UI.

use axum::Json;
use axum::Router;
use axum::routing::post;
use serde::Serialize;

use super::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/panel.v1.HealthService/Check", post(check))
}

// If this handler runs, the panel is accepting requests.
async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "serving",
        version: env!("CARGO_PKG_VERSION"),
    })
}
