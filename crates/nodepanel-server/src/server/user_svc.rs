//! `panel.v1.UserService`: user catalog. Writes embed the fan-out reports.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::instrument;

use super::AppState;
use super::rpc::{IdRequest, PageRequest, Rpc, RpcResult};
use crate::panel::{Synced, UserInput, UserList, UserPatch, UserView};
use crate::sync::NodeSyncReport;

type UserWrite = Synced<UserView, Vec<NodeSyncReport>>;

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserRequest {
    pub id: i64,
    #[serde(flatten)]
    pub patch: UserPatch,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetGroupsRequest {
    pub id: i64,
    #[serde(default)]
    pub group_ids: Vec<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/panel.v1.UserService/Create", post(create))
        .route("/panel.v1.UserService/Get", post(get))
        .route("/panel.v1.UserService/List", post(list))
        .route("/panel.v1.UserService/Update", post(update))
        .route("/panel.v1.UserService/Disable", post(disable))
        .route("/panel.v1.UserService/Delete", post(delete))
        .route("/panel.v1.UserService/SetGroups", post(set_groups))
}

#[instrument(skip(state, req), fields(rpc = "UserService/Create"))]
async fn create(State(state): State<AppState>, Rpc(req): Rpc<UserInput>) -> RpcResult<UserWrite> {
    Ok(Json(state.panel.create_user(req).await?))
}

async fn get(State(state): State<AppState>, Rpc(req): Rpc<IdRequest>) -> RpcResult<UserView> {
    Ok(Json(state.panel.get_user(req.id).await?))
}

async fn list(State(state): State<AppState>, Rpc(req): Rpc<PageRequest>) -> RpcResult<UserList> {
    Ok(Json(state.panel.list_users(req.limit, req.offset).await?))
}

#[instrument(skip(state, req), fields(rpc = "UserService/Update", id = req.id))]
async fn update(
    State(state): State<AppState>,
    Rpc(req): Rpc<UpdateUserRequest>,
) -> RpcResult<UserWrite> {
    Ok(Json(state.panel.update_user(req.id, req.patch).await?))
}

#[instrument(skip(state, req), fields(rpc = "UserService/Disable", id = req.id))]
async fn disable(State(state): State<AppState>, Rpc(req): Rpc<IdRequest>) -> RpcResult<UserWrite> {
    Ok(Json(state.panel.disable_user(req.id).await?))
}

#[instrument(skip(state, req), fields(rpc = "UserService/Delete", id = req.id))]
async fn delete(State(state): State<AppState>, Rpc(req): Rpc<IdRequest>) -> RpcResult<UserWrite> {
    Ok(Json(state.panel.delete_user(req.id).await?))
}

#[instrument(skip(state, req), fields(rpc = "UserService/SetGroups", id = req.id))]
async fn set_groups(
    State(state): State<AppState>,
    Rpc(req): Rpc<SetGroupsRequest>,
) -> RpcResult<UserWrite> {
    Ok(Json(state.panel.set_user_groups(req.id, &req.group_ids).await?))
}
