// Handlers owned by the gateway: upstream forwarding and its own health route

pub mod health;
pub mod proxy;

use crate::app::AppState;
use axum::{routing::get, Router};

pub use proxy::UpstreamProxy;

/// Path of the gateway's own health endpoint, mounted outside the guard
pub const HEALTH_PATH: &str = "/_edge/health";

// Gateway-local routes
pub fn edge_routes() -> Router<AppState> {
    Router::new().route(HEALTH_PATH, get(health::health_check))
}
