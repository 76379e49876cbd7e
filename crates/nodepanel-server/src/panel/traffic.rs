//! Traffic views over a trailing window.

use serde::Serialize;

use nodepanel_core::db::unix_timestamp;
use nodepanel_core::window::Bucket;

use super::Panel;
use super::error::{PanelError, PanelResult};
use crate::storage::{NodeTrafficSummary, TrafficPoint, TrafficTotals};

#[derive(Debug, Clone, Serialize)]
pub struct NodesTraffic {
    pub window_secs: i64,
    pub nodes: Vec<NodeTrafficSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrafficSeries {
    pub window_secs: i64,
    pub bucket_secs: i64,
    pub points: Vec<TrafficPoint>,
}

/// Start of a window ending now; a zero window covers all history.
fn window_start(window_secs: i64) -> PanelResult<i64> {
    match window_secs {
        w if w < 0 => Err(PanelError::validation("window must not be negative")),
        0 => Ok(0),
        w => Ok(unix_timestamp().saturating_sub(w).max(0)),
    }
}

impl Panel {
    pub async fn nodes_traffic(&self, window_secs: i64) -> PanelResult<NodesTraffic> {
        let since = window_start(window_secs)?;
        Ok(NodesTraffic {
            window_secs,
            nodes: self.db.node_traffic_summaries(since).await?,
        })
    }

    pub async fn total_traffic(&self, window_secs: i64) -> PanelResult<TrafficTotals> {
        let since = window_start(window_secs)?;
        Ok(self.db.total_traffic(since).await?)
    }

    pub async fn traffic_timeseries(
        &self,
        window_secs: i64,
        bucket: Bucket,
        node_id: Option<i64>,
    ) -> PanelResult<TrafficSeries> {
        let since = window_start(window_secs)?;
        let node_id = node_id.filter(|id| *id > 0);
        Ok(TrafficSeries {
            window_secs,
            bucket_secs: bucket.seconds(),
            points: self
                .db
                .traffic_timeseries(since, bucket.seconds(), node_id)
                .await?,
        })
    }
}
