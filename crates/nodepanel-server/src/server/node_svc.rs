//! `panel.v1.NodeService`: node catalog, manual sync and health probes.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::instrument;

use super::AppState;
use super::rpc::{Empty, IdRequest, PageRequest, Rpc, RpcResult};
use crate::panel::{NodeHealth, NodeInput, NodeList, NodePatch, Synced};
use crate::storage::Node;
use crate::sync::SyncResult;

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateNodeRequest {
    pub id: i64,
    #[serde(flatten)]
    pub patch: NodePatch,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DeleteNodeRequest {
    pub id: i64,
    #[serde(default)]
    pub force: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/panel.v1.NodeService/Create", post(create))
        .route("/panel.v1.NodeService/Get", post(get))
        .route("/panel.v1.NodeService/List", post(list))
        .route("/panel.v1.NodeService/Update", post(update))
        .route("/panel.v1.NodeService/Delete", post(delete))
        .route("/panel.v1.NodeService/Sync", post(sync))
        .route("/panel.v1.NodeService/CheckHealth", post(check_health))
}

#[instrument(skip(state, req), fields(rpc = "NodeService/Create"))]
async fn create(State(state): State<AppState>, Rpc(req): Rpc<NodeInput>) -> RpcResult<Node> {
    Ok(Json(state.panel.create_node(req).await?))
}

async fn get(State(state): State<AppState>, Rpc(req): Rpc<IdRequest>) -> RpcResult<Node> {
    Ok(Json(state.panel.get_node(req.id).await?))
}

async fn list(State(state): State<AppState>, Rpc(req): Rpc<PageRequest>) -> RpcResult<NodeList> {
    Ok(Json(state.panel.list_nodes(req.limit, req.offset).await?))
}

#[instrument(skip(state, req), fields(rpc = "NodeService/Update", id = req.id))]
async fn update(
    State(state): State<AppState>,
    Rpc(req): Rpc<UpdateNodeRequest>,
) -> RpcResult<Synced<Node, Option<SyncResult>>> {
    Ok(Json(state.panel.update_node(req.id, req.patch).await?))
}

#[instrument(skip(state, req), fields(rpc = "NodeService/Delete", id = req.id, force = req.force))]
async fn delete(
    State(state): State<AppState>,
    Rpc(req): Rpc<DeleteNodeRequest>,
) -> RpcResult<Empty> {
    state.panel.delete_node(req.id, req.force).await?;
    Ok(Json(Empty {}))
}

#[instrument(skip(state, req), fields(rpc = "NodeService/Sync", id = req.id))]
async fn sync(State(state): State<AppState>, Rpc(req): Rpc<IdRequest>) -> RpcResult<SyncResult> {
    Ok(Json(state.panel.sync_node(req.id).await?))
}

#[instrument(skip(state, req), fields(rpc = "NodeService/CheckHealth", id = req.id))]
async fn check_health(
    State(state): State<AppState>,
    Rpc(req): Rpc<IdRequest>,
) -> RpcResult<NodeHealth> {
    Ok(Json(state.panel.check_node_health(req.id).await?))
}
