//! `panel.v1.InboundService`: inbound catalog. Writes embed the node sync result.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::instrument;

use super::AppState;
use super::rpc::{IdRequest, Rpc, RpcResult};
use crate::panel::{InboundInput, InboundList, InboundPatch, Synced};
use crate::storage::Inbound;
use crate::sync::SyncResult;

type InboundWrite = Synced<Inbound, SyncResult>;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ListInboundsRequest {
    pub node_id: i64,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateInboundRequest {
    pub id: i64,
    #[serde(flatten)]
    pub patch: InboundPatch,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/panel.v1.InboundService/Create", post(create))
        .route("/panel.v1.InboundService/Get", post(get))
        .route("/panel.v1.InboundService/List", post(list))
        .route("/panel.v1.InboundService/Update", post(update))
        .route("/panel.v1.InboundService/Delete", post(delete))
}

#[instrument(skip(state, req), fields(rpc = "InboundService/Create", node_id = req.node_id))]
async fn create(
    State(state): State<AppState>,
    Rpc(req): Rpc<InboundInput>,
) -> RpcResult<InboundWrite> {
    Ok(Json(state.panel.create_inbound(req).await?))
}

async fn get(State(state): State<AppState>, Rpc(req): Rpc<IdRequest>) -> RpcResult<Inbound> {
    Ok(Json(state.panel.get_inbound(req.id).await?))
}

async fn list(
    State(state): State<AppState>,
    Rpc(req): Rpc<ListInboundsRequest>,
) -> RpcResult<InboundList> {
    Ok(Json(
        state
            .panel
            .list_inbounds(req.node_id, req.limit, req.offset)
            .await?,
    ))
}

#[instrument(skip(state, req), fields(rpc = "InboundService/Update", id = req.id))]
async fn update(
    State(state): State<AppState>,
    Rpc(req): Rpc<UpdateInboundRequest>,
) -> RpcResult<InboundWrite> {
    Ok(Json(state.panel.update_inbound(req.id, req.patch).await?))
}

#[instrument(skip(state, req), fields(rpc = "InboundService/Delete", id = req.id))]
async fn delete(
    State(state): State<AppState>,
    Rpc(req): Rpc<IdRequest>,
) -> RpcResult<InboundWrite> {
    Ok(Json(state.panel.delete_inbound(req.id).await?))
}
