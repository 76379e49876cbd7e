//! `panel.v1.TrafficService`: traffic summaries over a trailing window.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use nodepanel_core::window::{Bucket, parse_window};

use super::AppState;
use super::rpc::{Rpc, RpcResult};
use crate::panel::{NodesTraffic, PanelError, PanelResult, TrafficSeries};
use crate::storage::TrafficTotals;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowRequest {
    #[serde(default)]
    pub window: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeseriesRequest {
    #[serde(default)]
    pub window: String,
    #[serde(default)]
    pub bucket: String,
    pub node_id: Option<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/panel.v1.TrafficService/NodesSummary", post(nodes_summary))
        .route("/panel.v1.TrafficService/TotalSummary", post(total_summary))
        .route("/panel.v1.TrafficService/Timeseries", post(timeseries))
}

/// Window length in seconds; zero means all history.
fn window_secs(raw: &str) -> PanelResult<i64> {
    let window = parse_window(raw)?;
    i64::try_from(window.as_secs()).map_err(|_| PanelError::validation("window too large"))
}

async fn nodes_summary(
    State(state): State<AppState>,
    Rpc(req): Rpc<WindowRequest>,
) -> RpcResult<NodesTraffic> {
    let window = window_secs(&req.window)?;
    Ok(Json(state.panel.nodes_traffic(window).await?))
}

async fn total_summary(
    State(state): State<AppState>,
    Rpc(req): Rpc<WindowRequest>,
) -> RpcResult<TrafficTotals> {
    let window = window_secs(&req.window)?;
    Ok(Json(state.panel.total_traffic(window).await?))
}

async fn timeseries(
    State(state): State<AppState>,
    Rpc(req): Rpc<TimeseriesRequest>,
) -> RpcResult<TrafficSeries> {
    let window = window_secs(&req.window)?;
    let bucket = Bucket::parse(&req.bucket)?;
    Ok(Json(
        state
            .panel
            .traffic_timeseries(window, bucket, req.node_id)
            .await?,
    ))
}
