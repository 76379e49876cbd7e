//! `panel.v1.GroupService`: group catalog and membership replacement.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::instrument;

use super::AppState;
use super::rpc::{Empty, IdRequest, PageRequest, Rpc, RpcResult};
use crate::panel::{GroupInput, GroupList, Synced};
use crate::storage::Group;
use crate::sync::NodeSyncReport;

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateGroupRequest {
    pub id: i64,
    #[serde(flatten)]
    pub group: GroupInput,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceUsersRequest {
    pub id: i64,
    #[serde(default)]
    pub user_ids: Vec<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/panel.v1.GroupService/Create", post(create))
        .route("/panel.v1.GroupService/Get", post(get))
        .route("/panel.v1.GroupService/List", post(list))
        .route("/panel.v1.GroupService/Update", post(update))
        .route("/panel.v1.GroupService/Delete", post(delete))
        .route("/panel.v1.GroupService/ReplaceUsers", post(replace_users))
}

#[instrument(skip(state, req), fields(rpc = "GroupService/Create"))]
async fn create(State(state): State<AppState>, Rpc(req): Rpc<GroupInput>) -> RpcResult<Group> {
    Ok(Json(state.panel.create_group(req).await?))
}

async fn get(State(state): State<AppState>, Rpc(req): Rpc<IdRequest>) -> RpcResult<Group> {
    Ok(Json(state.panel.get_group(req.id).await?))
}

async fn list(State(state): State<AppState>, Rpc(req): Rpc<PageRequest>) -> RpcResult<GroupList> {
    Ok(Json(state.panel.list_groups(req.limit, req.offset).await?))
}

#[instrument(skip(state, req), fields(rpc = "GroupService/Update", id = req.id))]
async fn update(
    State(state): State<AppState>,
    Rpc(req): Rpc<UpdateGroupRequest>,
) -> RpcResult<Group> {
    Ok(Json(state.panel.update_group(req.id, req.group).await?))
}

#[instrument(skip(state, req), fields(rpc = "GroupService/Delete", id = req.id))]
async fn delete(State(state): State<AppState>, Rpc(req): Rpc<IdRequest>) -> RpcResult<Empty> {
    state.panel.delete_group(req.id).await?;
    Ok(Json(Empty {}))
}

#[instrument(skip(state, req), fields(rpc = "GroupService/ReplaceUsers", id = req.id))]
async fn replace_users(
    State(state): State<AppState>,
    Rpc(req): Rpc<ReplaceUsersRequest>,
) -> RpcResult<Synced<Group, Vec<NodeSyncReport>>> {
    Ok(Json(state.panel.replace_group_users(req.id, &req.user_ids).await?))
}
