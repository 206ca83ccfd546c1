// Liveness endpoint for the gateway process itself

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// GET /_edge/health
/// Reports the gateway only; upstream and backend health are not probed
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}
