// Centralized configuration management for the edge gateway
// All env vars are read once at startup into AppConfig

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use url::Url;

use crate::config::routes::DEFAULT_PUBLIC_ROUTES;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub tenancy: TenancyConfig,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub upstream: UpstreamConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub environment: Environment,
    pub rust_log: String,
}

/// Environment type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Multi-tenant hosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    /// Public root domain tenants live under (e.g. "example.com")
    pub root_domain: String,
    /// Path prefixes reachable without a session
    pub public_routes: Vec<String>,
}

/// Access token verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

/// Session refresh behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Backend API base, the refresh endpoint lives at {api_base_url}/api/auth/refresh
    pub api_base_url: String,
    /// Tokens closer than this to expiry are refreshed proactively
    pub refresh_threshold_secs: i64,
    pub refresh_timeout_secs: u64,
    pub login_path: String,
}

/// Web app the gateway forwards to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub max_body_bytes: usize,
}

const MIN_JWT_SECRET_LENGTH: usize = 32;

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let get_required = |key: &str| -> Result<String, ConfigError> {
            env::var(key).map_err(|_| ConfigError::MissingVar(key.to_string()))
        };

        let get_or_default = |key: &str, default: &str| -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let parse_u64_or_default = |key: &str, default: &str| -> Result<u64, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u64".to_string())
            })
        };

        let parse_url = |key: &str, default: &str| -> Result<String, ConfigError> {
            let raw = get_or_default(key, default);
            Url::parse(&raw).map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))?;
            Ok(raw.trim_end_matches('/').to_string())
        };

        let bind_address = get_or_default("BIND_ADDRESS", "0.0.0.0:8080");

        let environment = Environment::from(get_or_default("ENVIRONMENT", "development"));
        let rust_log = get_or_default("RUST_LOG", "info");

        // No fallback secret: a missing key must stop startup
        let secret = get_required("JWT_SECRET")?;
        if secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::InvalidValue(
                "JWT_SECRET".to_string(),
                format!(
                    "Secret must be at least {} characters long",
                    MIN_JWT_SECRET_LENGTH
                ),
            ));
        }

        let root_domain = get_or_default("ROOT_DOMAIN", "localhost")
            .trim()
            .trim_start_matches('.')
            .to_lowercase();
        if root_domain.is_empty() {
            return Err(ConfigError::InvalidValue(
                "ROOT_DOMAIN".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let public_routes = match env::var("PUBLIC_ROUTES") {
            Ok(raw) => parse_route_list(&raw)?,
            Err(_) => DEFAULT_PUBLIC_ROUTES.iter().map(|s| s.to_string()).collect(),
        };

        let login_path = get_or_default("LOGIN_PATH", "/login");
        if !login_path.starts_with('/') {
            return Err(ConfigError::InvalidValue(
                "LOGIN_PATH".to_string(),
                "must start with '/'".to_string(),
            ));
        }

        let refresh_threshold_secs = parse_u64_or_default("REFRESH_THRESHOLD_SECS", "300")? as i64;
        let refresh_timeout_secs = parse_u64_or_default("REFRESH_TIMEOUT_SECS", "5")?;
        if refresh_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "REFRESH_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let server = ServerConfig {
            bind_address,
            environment,
            rust_log,
        };

        let tenancy = TenancyConfig {
            root_domain,
            public_routes,
        };

        let jwt = JwtConfig {
            secret,
            issuer: get_or_default("JWT_ISSUER", "BackendApi"),
            audience: get_or_default("JWT_AUDIENCE", "BackendApiClients"),
        };

        let session = SessionConfig {
            api_base_url: parse_url("API_BASE_URL", "http://localhost:5000")?,
            refresh_threshold_secs,
            refresh_timeout_secs,
            login_path,
        };

        let upstream_timeout_secs = parse_u64_or_default("UPSTREAM_TIMEOUT_SECS", "30")?;
        if upstream_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "UPSTREAM_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let upstream = UpstreamConfig {
            url: parse_url("UPSTREAM_URL", "http://localhost:3000")?,
            timeout_secs: upstream_timeout_secs,
            max_body_bytes: parse_u64_or_default("MAX_BODY_BYTES", "10485760")? as usize,
        };

        Ok(Self {
            server,
            tenancy,
            jwt,
            session,
            upstream,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.server.environment == Environment::Production
    }
}

fn parse_route_list(raw: &str) -> Result<Vec<String>, ConfigError> {
    let routes: Vec<String> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();

    if let Some(bad) = routes.iter().find(|r| !r.starts_with('/')) {
        return Err(ConfigError::InvalidValue(
            "PUBLIC_ROUTES".to_string(),
            format!("route must start with '/': {}", bad),
        ));
    }

    Ok(routes)
}
