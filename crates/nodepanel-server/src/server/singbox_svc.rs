//! `panel.v1.SingboxService`: shaping editor input into a full config.

use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use nodepanel_core::singbox::{WrapMode, wrap_config};

use super::AppState;
use super::rpc::{Rpc, RpcResult};

#[derive(Debug, Clone, Deserialize)]
pub struct WrapConfigRequest {
    pub config: String,
    #[serde(default)]
    pub mode: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WrapConfigResponse {
    pub config: Value,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/panel.v1.SingboxService/WrapConfig", post(wrap))
}

async fn wrap(Rpc(req): Rpc<WrapConfigRequest>) -> RpcResult<WrapConfigResponse> {
    let mode = WrapMode::parse(&req.mode)?;
    let config = wrap_config(&req.config, mode)?;
    Ok(Json(WrapConfigResponse { config }))
}
