//! `panel.v1.SyncJobService`: sync history and manual retries.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::instrument;

use super::AppState;
use super::rpc::{IdRequest, Rpc, RpcResult};
use crate::panel::{SyncJobDetail, SyncJobList};
use crate::sync::SyncResult;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListJobsRequest {
    pub node_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/panel.v1.SyncJobService/List", post(list))
        .route("/panel.v1.SyncJobService/Get", post(get))
        .route("/panel.v1.SyncJobService/Retry", post(retry))
}

async fn list(
    State(state): State<AppState>,
    Rpc(req): Rpc<ListJobsRequest>,
) -> RpcResult<SyncJobList> {
    Ok(Json(
        state
            .panel
            .list_sync_jobs(req.node_id, req.limit, req.offset)
            .await?,
    ))
}

async fn get(State(state): State<AppState>, Rpc(req): Rpc<IdRequest>) -> RpcResult<SyncJobDetail> {
    Ok(Json(state.panel.get_sync_job(req.id).await?))
}

#[instrument(skip(state, req), fields(rpc = "SyncJobService/Retry", id = req.id))]
async fn retry(State(state): State<AppState>, Rpc(req): Rpc<IdRequest>) -> RpcResult<SyncResult> {
    Ok(Json(state.panel.retry_sync_job(req.id).await?))
}
