// Errors surfaced to clients by the gateway itself
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EdgeError {
    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Request body too large")]
    BodyTooLarge,

    #[error("Invalid URI: {0}")]
    InvalidUri(String),
}

impl EdgeError {
    pub fn status(&self) -> StatusCode {
        match self {
            EdgeError::Upstream(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            EdgeError::Upstream(_) => StatusCode::BAD_GATEWAY,
            EdgeError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            EdgeError::InvalidUri(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            EdgeError::Upstream(_) => "Upstream unavailable".to_string(),
            EdgeError::BodyTooLarge => "Request body too large".to_string(),
            EdgeError::InvalidUri(_) => "Invalid request path".to_string(),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
