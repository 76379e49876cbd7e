//! Bearer token check for admin procedures.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use super::AppState;
use crate::auth::Claims;
use crate::panel::PanelError;

/// Validate the bearer token and stash its claims in the request extensions.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, PanelError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| PanelError::Unauthenticated("missing authorization header".into()))?;

    let claims: Claims = state.panel.authenticate(token.trim())?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
