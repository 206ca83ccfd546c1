// Forwarding of guarded requests to the web app
// The guard has already rewritten the path and attached locale/cookies
// Response bodies are streamed back without buffering

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request},
    response::Response,
};
use std::time::Duration;
use tracing::error;

use crate::{app::AppState, config::has_dot_segment, utils::service_error::EdgeError};

/// Connection-scoped headers that must not cross the proxy
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

#[derive(Debug, Clone)]
pub struct UpstreamProxy {
    http_client: reqwest::Client,
    base_url: String,
    max_body_bytes: usize,
}

impl UpstreamProxy {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        max_body_bytes: usize,
    ) -> Result<Self, reqwest::Error> {
        // Upstream redirects go back to the browser untouched
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_body_bytes,
        })
    }

    pub fn target_url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }

    pub async fn forward(&self, request: Request<Body>) -> Result<Response, EdgeError> {
        let (parts, body) = request.into_parts();

        if has_dot_segment(parts.uri.path()) {
            return Err(EdgeError::InvalidUri(parts.uri.path().to_string()));
        }

        let body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|_| EdgeError::BodyTooLarge)?;

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = self.target_url(path_and_query);

        let mut headers = strip_hop_by_hop(&parts.headers);
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);

        // Client-supplied forwarding headers are never trusted
        headers.remove(X_FORWARDED_HOST);
        let original_host = parts
            .headers
            .get(header::HOST)
            .cloned()
            .or_else(|| {
                parts
                    .uri
                    .authority()
                    .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
            });
        if let Some(host) = original_host {
            headers.insert(X_FORWARDED_HOST, host);
        }
        let proto = parts.uri.scheme_str().unwrap_or("http");
        match HeaderValue::from_str(proto) {
            Ok(value) => {
                headers.insert(X_FORWARDED_PROTO, value);
            },
            Err(_) => {
                headers.remove(X_FORWARDED_PROTO);
            },
        }

        let upstream = self
            .http_client
            .request(parts.method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!(url = %url, error = %e, "Upstream request failed");
                EdgeError::Upstream(e)
            })?;

        let status = upstream.status();
        let mut response_headers = strip_hop_by_hop(upstream.headers());
        response_headers.remove(header::CONTENT_LENGTH);

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    for name in HOP_BY_HOP {
        out.remove(*name);
    }
    out
}

/// Fallback handler: everything the gateway does not answer itself goes upstream
pub async fn forward(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Response, EdgeError> {
    state.upstream.forward(request).await
}
