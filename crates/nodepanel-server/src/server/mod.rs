//! Procedure surface for the panel.
//!
//! Every procedure is `POST /panel.v1.<Service>/<Method>` with a JSON body.
//! Errors come back as `{code, message}` with an HTTP status per error class.
//! Everything except health, bootstrap and login requires an admin bearer
//! token.

pub mod auth_svc;
pub mod group_svc;
pub mod health;
pub mod inbound_svc;
pub mod interceptor;
pub mod node_svc;
pub mod rpc;
pub mod singbox_svc;
pub mod sync_job_svc;
pub mod system_svc;
pub mod traffic_svc;
pub mod user_svc;

use axum::Router;
use axum::middleware;
use tower_http::trace::TraceLayer;

use crate::panel::Panel;

pub use interceptor::require_admin;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub panel: Panel,
}

pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .merge(health::routes())
        .merge(auth_svc::routes());

    let protected = Router::new()
        .merge(system_svc::routes())
        .merge(user_svc::routes())
        .merge(group_svc::routes())
        .merge(node_svc::routes())
        .merge(inbound_svc::routes())
        .merge(sync_job_svc::routes())
        .merge(traffic_svc::routes())
        .merge(singbox_svc::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
