//! Procedure plumbing: JSON request extraction, shared request shapes and
//! the `{code, message}` error body.

use axum::Json;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::panel::PanelError;

/// Result of a procedure handler.
pub type RpcResult<T> = Result<Json<T>, PanelError>;

/// JSON request body whose rejection is reported as `invalid_argument`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rpc<T>(pub T);

impl<S, T> FromRequest<S> for Rpc<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = PanelError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| PanelError::validation(e.body_text()))?;
        Ok(Self(value))
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IdRequest {
    pub id: i64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Request or response without fields.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    message: &'a str,
}

impl PanelError {
    /// Transport status and wire code for this error.
    pub const fn rpc_status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
            Self::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "failed_precondition"),
            Self::NeedsSetup(_) => (StatusCode::PRECONDITION_REQUIRED, "failed_precondition"),
            Self::Transport(_) => (StatusCode::BAD_GATEWAY, "unavailable"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for PanelError {
    fn into_response(self) -> Response {
        let (status, code) = self.rpc_status();
        let message = self.to_string();
        (status, Json(ErrorBody { code, message: &message })).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn error_body_carries_code_and_message() {
        let resp = PanelError::Transport("node sync status 500: boom".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(resp).await;
        assert_eq!(body["code"], "unavailable");
        assert_eq!(body["message"], "node sync status 500: boom");
    }

    #[test]
    fn status_mapping() {
        let cases = [
            (PanelError::validation("x"), 400, "invalid_argument"),
            (PanelError::Unauthenticated("x".into()), 401, "unauthenticated"),
            (PanelError::NotFound("x".into()), 404, "not_found"),
            (PanelError::Conflict("x".into()), 409, "failed_precondition"),
            (PanelError::NeedsSetup("x".into()), 428, "failed_precondition"),
            (PanelError::Internal("x".into()), 500, "internal"),
        ];
        for (err, status, code) in cases {
            let (got_status, got_code) = err.rpc_status();
            assert_eq!(got_status.as_u16(), status, "{err:?}");
            assert_eq!(got_code, code);
        }
    }
}
