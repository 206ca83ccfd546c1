// Application state and router assembly
use std::sync::Arc;

use axum::{middleware::from_fn_with_state, Router};
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{edge_routes, proxy, UpstreamProxy},
    middleware::{session_guard_middleware, SessionGuard},
};

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub guard: Arc<SessionGuard>,
    pub upstream: Arc<UpstreamProxy>,
}

/// Production router: every request not answered locally is guarded and forwarded upstream
pub fn create_router(state: AppState) -> Router {
    with_session_guard(Router::new().fallback(proxy::forward), state)
}

/// Put the session guard in front of `inner`; the gateway's own routes stay unguarded
pub fn with_session_guard(inner: Router<AppState>, state: AppState) -> Router {
    inner
        .layer(from_fn_with_state(state.clone(), session_guard_middleware))
        .merge(edge_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
