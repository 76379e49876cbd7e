//! `panel.v1.SystemService`: panel summary and settings.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tracing::instrument;

use super::AppState;
use super::rpc::{Empty, Rpc, RpcResult};
use crate::panel::{SettingsPatch, SystemInfo, SystemSettings};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/panel.v1.SystemService/GetInfo", post(get_info))
        .route("/panel.v1.SystemService/GetSettings", post(get_settings))
        .route("/panel.v1.SystemService/UpdateSettings", post(update_settings))
}

async fn get_info(State(state): State<AppState>, Rpc(_): Rpc<Empty>) -> RpcResult<SystemInfo> {
    Ok(Json(state.panel.system_info().await?))
}

async fn get_settings(
    State(state): State<AppState>,
    Rpc(_): Rpc<Empty>,
) -> RpcResult<SystemSettings> {
    Ok(Json(state.panel.get_settings().await?))
}

#[instrument(skip(state, req), fields(rpc = "SystemService/UpdateSettings"))]
async fn update_settings(
    State(state): State<AppState>,
    Rpc(req): Rpc<SettingsPatch>,
) -> RpcResult<SystemSettings> {
    Ok(Json(state.panel.update_settings(req).await?))
}
