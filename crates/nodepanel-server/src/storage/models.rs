//! Data models for panel storage.

use serde::{Deserialize, Serialize};

pub use nodepanel_core::model::*;

/// Per-node traffic totals over a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NodeTrafficSummary {
    pub node_id: i64,
    pub upload: i64,
    pub download: i64,
    pub samples: i64,
}

/// Fleet-wide traffic totals over a window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrafficTotals {
    pub upload: i64,
    pub download: i64,
    pub samples: i64,
}

/// One timeseries bucket; `bucket_start` is a unix timestamp aligned to the bucket width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrafficPoint {
    pub bucket_start: i64,
    pub upload: i64,
    pub download: i64,
}
