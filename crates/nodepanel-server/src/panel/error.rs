//! Panel error classification.

use thiserror::Error;
use tracing::warn;

use crate::node::{SYNC_REQUEST_PREFIX, SYNC_STATUS_PREFIX};
use crate::storage::DatabaseError;
use crate::sync::SYNC_CANCELLED;

/// Errors surfaced by panel operations. Each variant maps to one transport code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PanelError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NeedsSetup(String),

    /// The node could not be reached or rejected the push.
    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Internal(String),
}

pub type PanelResult<T> = Result<T, PanelError>;

impl PanelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Classify the error message of a failed sync.
    pub fn from_sync_failure(message: &str) -> Self {
        if message.starts_with(SYNC_REQUEST_PREFIX) || message.contains(SYNC_STATUS_PREFIX) {
            return Self::Transport(message.to_string());
        }
        match message {
            SYNC_CANCELLED
            | "create sync job failed"
            | "start sync job failed"
            | "create sync attempt failed" => Self::Internal(message.to_string()),
            m if m.starts_with("load ") => Self::Internal(message.to_string()),
            _ => Self::Conflict(message.to_string()),
        }
    }
}

impl From<DatabaseError> for PanelError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            DatabaseError::Conflict(msg) => Self::Conflict(msg),
            other => {
                warn!(error = %other, "Store error");
                Self::Internal("internal error".into())
            }
        }
    }
}

impl From<nodepanel_core::Error> for PanelError {
    fn from(e: nodepanel_core::Error) -> Self {
        match e {
            nodepanel_core::Error::Validation(msg) => Self::Validation(msg),
            nodepanel_core::Error::Json(e) => Self::Validation(format!("invalid json: {e}")),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_classify_by_variant() {
        assert_eq!(
            PanelError::from(DatabaseError::NotFound("Node 3".into())),
            PanelError::NotFound("Node 3 not found".into())
        );
        assert!(matches!(
            PanelError::from(DatabaseError::Conflict("UNIQUE constraint failed".into())),
            PanelError::Conflict(_)
        ));
        assert_eq!(
            PanelError::from(DatabaseError::Query("disk I/O error".into())),
            PanelError::Internal("internal error".into())
        );
    }

    #[test]
    fn sync_failures_classify_by_message() {
        assert!(matches!(
            PanelError::from_sync_failure("node sync status 500: boom"),
            PanelError::Transport(_)
        ));
        assert!(matches!(
            PanelError::from_sync_failure("node sync request failed: connection refused"),
            PanelError::Transport(_)
        ));
        assert!(matches!(
            PanelError::from_sync_failure("node group_id not set"),
            PanelError::Conflict(_)
        ));
        assert!(matches!(
            PanelError::from_sync_failure("duplicate inbound tag edge"),
            PanelError::Conflict(_)
        ));
        assert!(matches!(
            PanelError::from_sync_failure("sync cancelled"),
            PanelError::Internal(_)
        ));
        assert!(matches!(
            PanelError::from_sync_failure("load inbounds failed: Query error: x"),
            PanelError::Internal(_)
        ));
    }

    #[test]
    fn core_validation_keeps_message() {
        let err = PanelError::from(nodepanel_core::Error::validation("settings.method required"));
        assert_eq!(err, PanelError::Validation("settings.method required".into()));
    }
}
