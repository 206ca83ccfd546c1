// Common test utilities shared across the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
    Json, Router,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tenant_edge::{
    handlers::UpstreamProxy, with_session_guard, AccessTokenClaims, AccessTokenVerifier,
    AppState, GuardSettings, JwtError, JwtVerifier, PublicRoutes, RefreshClient, RefreshError,
    RotatedCookies, SessionGuard, SubdomainMatcher,
};
use tower::util::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-chars";
pub const TEST_ISSUER: &str = "BackendApi";
pub const TEST_AUDIENCE: &str = "BackendApiClients";
pub const ROOT_DOMAIN: &str = "example.com";

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Sign an access token the way the backend would
pub fn sign_access_token(exp: Option<i64>) -> String {
    sign_with(TEST_SECRET, TEST_ISSUER, exp)
}

pub fn sign_with(secret: &str, issuer: &str, exp: Option<i64>) -> String {
    let mut claims = json!({
        "sub": "owner-42",
        "email": "owner@example.com",
        "iss": issuer,
        "aud": TEST_AUDIENCE,
    });
    if let Some(exp) = exp {
        claims["exp"] = json!(exp);
    }

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign test token")
}

/// Verifier that counts calls before delegating to the real HMAC verifier
pub struct SpyVerifier {
    inner: JwtVerifier,
    calls: AtomicUsize,
}

impl SpyVerifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: JwtVerifier::new(TEST_SECRET.as_bytes(), TEST_ISSUER, TEST_AUDIENCE),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AccessTokenVerifier for SpyVerifier {
    fn verify(&self, token: &str) -> Result<AccessTokenClaims, JwtError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(token)
    }
}

/// Refresh client stub: either mints a fresh token pair or fails
pub struct MockRefresher {
    succeed: bool,
    new_exp: i64,
    calls: AtomicUsize,
    last_token: Mutex<Option<String>>,
}

impl MockRefresher {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            succeed: true,
            new_exp: now() + 3600,
            calls: AtomicUsize::new(0),
            last_token: Mutex::new(None),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            succeed: false,
            new_exp: 0,
            calls: AtomicUsize::new(0),
            last_token: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_token(&self) -> Option<String> {
        self.last_token.lock().unwrap().clone()
    }
}

#[async_trait]
impl RefreshClient for MockRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<RotatedCookies, RefreshError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock().unwrap() = Some(refresh_token.to_string());

        if !self.succeed {
            return Err(RefreshError::Rejected(401));
        }

        let access = format!(
            "AccessToken={}; Path=/; HttpOnly",
            sign_access_token(Some(self.new_exp))
        );
        RotatedCookies::from_set_cookie_values([access.as_str(), "RefreshToken=rotated-refresh"])
            .ok_or(RefreshError::NoCookies)
    }
}

pub struct TestApp {
    pub app: Router,
    pub verifier: Arc<SpyVerifier>,
    pub refresher: Arc<MockRefresher>,
}

impl TestApp {
    /// Guarded app whose downstream echoes what the guard forwarded
    pub fn new(refresher: Arc<MockRefresher>) -> Self {
        let verifier = SpyVerifier::new();
        let guard = SessionGuard::new(
            SubdomainMatcher::new(ROOT_DOMAIN).unwrap(),
            PublicRoutes::default(),
            verifier.clone(),
            refresher.clone(),
            GuardSettings::default(),
        );
        let state = test_state(guard, "http://127.0.0.1:9");
        let app = with_session_guard(Router::new().fallback(echo), state);

        Self {
            app,
            verifier,
            refresher,
        }
    }

    pub async fn get(&self, host: &str, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.get_with(host, uri, cookie, None).await
    }

    pub async fn get_with(
        &self,
        host: &str,
        uri: &str,
        cookie: Option<&str>,
        accept_language: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().uri(uri).header(header::HOST, host);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        if let Some(lang) = accept_language {
            builder = builder.header(header::ACCEPT_LANGUAGE, lang);
        }
        let request = builder.body(Body::empty()).unwrap();

        self.app.clone().oneshot(request).await.unwrap()
    }
}

pub fn test_state(guard: SessionGuard, upstream_url: &str) -> AppState {
    AppState {
        guard: Arc::new(guard),
        upstream: Arc::new(
            UpstreamProxy::new(upstream_url, Duration::from_secs(5), 1024 * 1024).unwrap(),
        ),
    }
}

/// Downstream stand-in reporting the forwarded path and headers
pub async fn echo(request: Request<Body>) -> Json<Value> {
    let header_str = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    Json(json!({
        "path": request.uri().path(),
        "query": request.uri().query(),
        "x_locale": header_str("x-locale"),
        "cookie": header_str("cookie"),
    }))
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Extract `name=value` for a cookie from a list of Set-Cookie strings
pub fn cookie_pair(set_cookies: &[String], name: &str) -> Option<String> {
    set_cookies
        .iter()
        .filter_map(|c| c.split(';').next())
        .find(|pair| pair.starts_with(&format!("{}=", name)))
        .map(str::to_string)
}

/// Serve `router` on an ephemeral local port, returning its base URL
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    format!("http://{}", addr)
}
