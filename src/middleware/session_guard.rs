// Edge request router and session guard
// Runs ahead of every page request: tenant rewrite, locale negotiation, session check

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{self, HeaderValue},
        uri::PathAndQuery,
        HeaderMap, Request, Uri,
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    app::AppState,
    config::{
        has_dot_segment, is_bypassed, resolve_locale, Locale, PublicRoutes, LOCALE_COOKIE_NAME,
        LOCALE_HEADER,
    },
    services::{
        AccessTokenVerifier, RefreshClient, RotatedCookies, SubdomainMatcher, ACCESS_COOKIE_NAME,
        REFRESH_COOKIE_NAME,
    },
    utils::service_error::EdgeError,
};

/// What the gateway does with a request. Exactly one per invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    /// Serve the tenant's published site from an internal path
    Rewrite { path_and_query: String },
    /// Forward as-is with the negotiated locale, plus rotated cookies after a refresh
    Continue {
        locale: Locale,
        rotated: Option<RotatedCookies>,
    },
    /// No usable session
    Redirect { location: String },
}

#[derive(Debug, Clone)]
pub struct GuardSettings {
    pub refresh_threshold_secs: i64,
    pub login_path: String,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            refresh_threshold_secs: 300,
            login_path: "/login".to_string(),
        }
    }
}

pub struct SessionGuard {
    subdomains: SubdomainMatcher,
    public_routes: PublicRoutes,
    verifier: Arc<dyn AccessTokenVerifier>,
    refresher: Arc<dyn RefreshClient>,
    settings: GuardSettings,
}

impl SessionGuard {
    pub fn new(
        subdomains: SubdomainMatcher,
        public_routes: PublicRoutes,
        verifier: Arc<dyn AccessTokenVerifier>,
        refresher: Arc<dyn RefreshClient>,
        settings: GuardSettings,
    ) -> Self {
        Self {
            subdomains,
            public_routes,
            verifier,
            refresher,
            settings,
        }
    }

    pub async fn evaluate(&self, uri: &Uri, headers: &HeaderMap) -> GuardOutcome {
        self.evaluate_at(uri, headers, chrono::Utc::now().timestamp())
            .await
    }

    /// Run the guard checks in order; the first decisive one wins.
    /// `now` is seconds since epoch.
    pub async fn evaluate_at(&self, uri: &Uri, headers: &HeaderMap, now: i64) -> GuardOutcome {
        // 1. Tenant subdomain: skips locale and auth entirely
        if let Some(host) = request_host(uri, headers) {
            if let Some(path_and_query) = self.subdomains.rewrite_target(&host, uri.path(), uri.query()) {
                debug!(host = %host, target = %path_and_query, "Rewriting tenant request");
                return GuardOutcome::Rewrite { path_and_query };
            }
        }

        // 2. Locale
        let jar = CookieJar::from_headers(headers);
        let locale = resolve_locale(
            jar.get(LOCALE_COOKIE_NAME).map(|c| c.value()),
            headers
                .get(header::ACCEPT_LANGUAGE)
                .and_then(|v| v.to_str().ok()),
        );

        // 3. Public routes never look at the session
        if self.public_routes.is_public(uri.path()) {
            return GuardOutcome::Continue {
                locale,
                rotated: None,
            };
        }

        // 4. No access token: refresh or log in
        let Some(access_token) = cookie_value(&jar, ACCESS_COOKIE_NAME) else {
            debug!(path = %uri.path(), "No access token, attempting refresh");
            return self.refresh_or_redirect(&jar, locale).await;
        };

        // 5. Verify signature, issuer and audience
        let claims = match self.verifier.verify(access_token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(path = %uri.path(), error = %e, "Access token rejected, attempting refresh");
                return self.refresh_or_redirect(&jar, locale).await;
            },
        };

        // 6. Proactive refresh; on failure the current token still serves this request
        if claims.expires_within(now, self.settings.refresh_threshold_secs) {
            debug!(exp = ?claims.exp, "Access token close to expiry, refreshing");
            let rotated = self.try_refresh(&jar).await;
            return GuardOutcome::Continue { locale, rotated };
        }

        GuardOutcome::Continue {
            locale,
            rotated: None,
        }
    }

    async fn refresh_or_redirect(&self, jar: &CookieJar, locale: Locale) -> GuardOutcome {
        match self.try_refresh(jar).await {
            Some(rotated) => GuardOutcome::Continue {
                locale,
                rotated: Some(rotated),
            },
            None => GuardOutcome::Redirect {
                location: self.settings.login_path.clone(),
            },
        }
    }

    /// One refresh attempt; every failure is logged and reported as None
    async fn try_refresh(&self, jar: &CookieJar) -> Option<RotatedCookies> {
        let Some(refresh_token) = cookie_value(jar, REFRESH_COOKIE_NAME) else {
            debug!("No refresh token, skipping refresh");
            return None;
        };

        match self.refresher.refresh(refresh_token).await {
            Ok(rotated) => {
                debug!("Session refreshed");
                Some(rotated)
            },
            Err(e) => {
                warn!(error = %e, "Session refresh failed");
                None
            },
        }
    }
}

fn cookie_value<'a>(jar: &'a CookieJar, name: &str) -> Option<&'a str> {
    jar.get(name).map(|c| c.value()).filter(|v| !v.is_empty())
}

/// Host header, falling back to the URI authority (HTTP/2)
fn request_host(uri: &Uri, headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.as_str().to_string()))
}

/// Swap rotated values into the forwarded Cookie header so the page
/// renders with the new session
fn replace_request_cookies(headers: &mut HeaderMap, rotated: &RotatedCookies) {
    let mut jar = CookieJar::from_headers(headers);
    for cookie in rotated.iter() {
        jar = jar.add(Cookie::new(
            cookie.name().to_string(),
            cookie.value().to_string(),
        ));
    }

    let value = jar
        .iter()
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect::<Vec<_>>()
        .join("; ");

    headers.remove(header::COOKIE);
    match HeaderValue::from_str(&value) {
        Ok(value) => {
            headers.insert(header::COOKIE, value);
        },
        Err(e) => warn!(error = %e, "Could not rebuild Cookie header after refresh"),
    }
}

fn rewrite_uri(uri: &Uri, path_and_query: &str) -> Result<Uri, EdgeError> {
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .map_err(|e| EdgeError::InvalidUri(e.to_string()))?,
    );
    Uri::from_parts(parts).map_err(|e| EdgeError::InvalidUri(e.to_string()))
}

/// Axum middleware applying the guard's decision to the request and response
pub async fn session_guard_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    // Upstream URL parsing would resolve these after the checks below ran
    if has_dot_segment(request.uri().path()) {
        warn!(path = %request.uri().path(), "Rejecting path with dot segments");
        return EdgeError::InvalidUri(request.uri().path().to_string()).into_response();
    }

    if is_bypassed(request.uri().path()) {
        return next.run(request).await;
    }

    let outcome = state
        .guard
        .evaluate(request.uri(), request.headers())
        .await;

    match outcome {
        GuardOutcome::Rewrite { path_and_query } => {
            match rewrite_uri(request.uri(), &path_and_query) {
                Ok(uri) => {
                    *request.uri_mut() = uri;
                    next.run(request).await
                },
                Err(e) => {
                    warn!(target_path = %path_and_query, error = %e, "Tenant rewrite produced an invalid URI");
                    e.into_response()
                },
            }
        },
        GuardOutcome::Continue { locale, rotated } => {
            let locale_value = HeaderValue::from_static(locale.as_str());
            request
                .headers_mut()
                .insert(LOCALE_HEADER, locale_value.clone());
            if let Some(rotated) = &rotated {
                replace_request_cookies(request.headers_mut(), rotated);
            }

            let mut response = next.run(request).await;
            response.headers_mut().insert(LOCALE_HEADER, locale_value);
            if let Some(rotated) = &rotated {
                rotated.apply_to_response(response.headers_mut());
            }
            response
        },
        GuardOutcome::Redirect { location } => {
            debug!(location = %location, "Redirecting to login");
            Redirect::temporary(&location).into_response()
        },
    }
}
