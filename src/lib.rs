// Library exports for the tenant edge gateway
// Exposes the session guard and router so the binary and tests share one assembly

pub mod app;
pub mod app_config;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

// Re-export commonly used types
pub use app::{create_router, with_session_guard, AppState};
pub use app_config::{AppConfig, ConfigError};
pub use config::{Locale, PublicRoutes};
pub use middleware::{GuardOutcome, GuardSettings, SessionGuard};
pub use services::{
    AccessTokenClaims, AccessTokenVerifier, HttpRefreshClient, JwtError, JwtVerifier,
    RefreshClient, RefreshError, RotatedCookies, SubdomainMatcher,
};
pub use utils::EdgeError;

/// Build the shared state from a loaded configuration
pub fn initialize_app_state(config: &AppConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    use tracing::info;

    let subdomains = SubdomainMatcher::new(&config.tenancy.root_domain)?;
    let public_routes = PublicRoutes::new(config.tenancy.public_routes.iter().cloned());

    let verifier = Arc::new(JwtVerifier::new(
        config.jwt.secret.as_bytes(),
        &config.jwt.issuer,
        &config.jwt.audience,
    ));

    let refresher = Arc::new(HttpRefreshClient::new(
        &config.session.api_base_url,
        Duration::from_secs(config.session.refresh_timeout_secs),
    )?);
    info!(endpoint = %refresher.endpoint(), "Refresh client ready");

    let settings = GuardSettings {
        refresh_threshold_secs: config.session.refresh_threshold_secs,
        login_path: config.session.login_path.clone(),
    };

    let guard = SessionGuard::new(subdomains, public_routes, verifier, refresher, settings);

    let upstream = handlers::UpstreamProxy::new(
        &config.upstream.url,
        Duration::from_secs(config.upstream.timeout_secs),
        config.upstream.max_body_bytes,
    )?;
    info!(upstream = %config.upstream.url, "Upstream proxy ready");

    Ok(AppState {
        guard: Arc::new(guard),
        upstream: Arc::new(upstream),
    })
}
