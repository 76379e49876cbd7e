//! Node agent client.

mod client;

#[cfg(test)]
mod tests;

pub use client::{
    NodeClient, NodeClientError, SYNC_REQUEST_PREFIX, SYNC_STATUS_PREFIX, base_url,
    parse_sync_http_status,
};
