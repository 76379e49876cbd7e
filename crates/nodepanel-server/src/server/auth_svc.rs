//! `panel.v1.AuthService`: one-time admin bootstrap and login.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::instrument;

use super::AppState;
use super::rpc::{Empty, Rpc, RpcResult};
use crate::panel::{BootstrapStatus, IssuedToken};

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/panel.v1.AuthService/BootstrapStatus", post(bootstrap_status))
        .route("/panel.v1.AuthService/Bootstrap", post(bootstrap))
        .route("/panel.v1.AuthService/Login", post(login))
}

async fn bootstrap_status(
    State(state): State<AppState>,
    Rpc(_): Rpc<Empty>,
) -> RpcResult<BootstrapStatus> {
    Ok(Json(state.panel.bootstrap_status().await?))
}

#[instrument(skip(state, req), fields(rpc = "AuthService/Bootstrap", username = %req.username))]
async fn bootstrap(
    State(state): State<AppState>,
    Rpc(req): Rpc<CredentialsRequest>,
) -> RpcResult<IssuedToken> {
    Ok(Json(state.panel.bootstrap(&req.username, &req.password).await?))
}

#[instrument(skip(state, req), fields(rpc = "AuthService/Login", username = %req.username))]
async fn login(
    State(state): State<AppState>,
    Rpc(req): Rpc<CredentialsRequest>,
) -> RpcResult<IssuedToken> {
    Ok(Json(state.panel.login(&req.username, &req.password).await?))
}
