// Session refresh against the backend auth API
// POST {api_base}/api/auth/refresh with the RefreshToken forwarded as a cookie

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue};
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Cookie carrying the signed access token
pub const ACCESS_COOKIE_NAME: &str = "AccessToken";

/// Cookie carrying the opaque refresh credential
pub const REFRESH_COOKIE_NAME: &str = "RefreshToken";

const REFRESH_PATH: &str = "/api/auth/refresh";

#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("No refresh token present")]
    MissingRefreshToken,

    #[error("Refresh request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Refresh rejected with status {0}")]
    Rejected(u16),

    #[error("Refresh response carried no session cookies")]
    NoCookies,
}

/// Rotated session cookies, already normalised for the browser
#[derive(Debug, Clone, PartialEq)]
pub struct RotatedCookies {
    cookies: Vec<Cookie<'static>>,
}

impl RotatedCookies {
    /// Keep only AccessToken/RefreshToken from raw Set-Cookie values and
    /// re-emit them as Secure, HttpOnly, SameSite=None, Path=/.
    /// Returns None when neither token cookie is present.
    pub fn from_set_cookie_values<'a, I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut cookies: Vec<Cookie<'static>> = Vec::new();

        for raw in values {
            let parsed = match Cookie::parse(raw.to_string()) {
                Ok(cookie) => cookie,
                Err(e) => {
                    debug!(error = %e, "Skipping unparseable Set-Cookie from refresh response");
                    continue;
                },
            };

            if parsed.name() != ACCESS_COOKIE_NAME && parsed.name() != REFRESH_COOKIE_NAME {
                continue;
            }

            let rotated = Cookie::build((parsed.name().to_string(), parsed.value().to_string()))
                .path("/")
                .secure(true)
                .http_only(true)
                .same_site(SameSite::None)
                .build();

            // A later value for the same name replaces the earlier one
            cookies.retain(|c| c.name() != rotated.name());
            cookies.push(rotated);
        }

        if cookies.is_empty() {
            None
        } else {
            Some(Self { cookies })
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.value())
    }

    pub fn access_token(&self) -> Option<&str> {
        self.get(ACCESS_COOKIE_NAME)
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.get(REFRESH_COOKIE_NAME)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie<'static>> {
        self.cookies.iter()
    }

    /// Append every rotated cookie as a Set-Cookie header
    pub fn apply_to_response(&self, headers: &mut HeaderMap) {
        for cookie in &self.cookies {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    headers.append(header::SET_COOKIE, value);
                },
                Err(e) => warn!(cookie = cookie.name(), error = %e, "Rotated cookie is not a valid header"),
            }
        }
    }
}

/// Seam for the guard so tests can stub or count refresh attempts
#[async_trait]
pub trait RefreshClient: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RotatedCookies, RefreshError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    client_type: &'static str,
}

/// reqwest-backed refresh client with a bounded timeout
#[derive(Debug, Clone)]
pub struct HttpRefreshClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpRefreshClient {
    pub fn new(api_base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tenant-edge/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            endpoint: format!("{}{}", api_base_url.trim_end_matches('/'), REFRESH_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RefreshClient for HttpRefreshClient {
    async fn refresh(&self, refresh_token: &str) -> Result<RotatedCookies, RefreshError> {
        if refresh_token.is_empty() {
            return Err(RefreshError::MissingRefreshToken);
        }

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(
                header::COOKIE,
                format!("{}={}", REFRESH_COOKIE_NAME, refresh_token),
            )
            .json(&RefreshRequest { client_type: "Web" })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected(status.as_u16()));
        }

        let set_cookies: Vec<&str> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();

        if set_cookies.is_empty() {
            return Err(RefreshError::NoCookies);
        }

        RotatedCookies::from_set_cookie_values(set_cookies).ok_or(RefreshError::NoCookies)
    }
}
