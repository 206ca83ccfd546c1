// Access token verification for the session guard
// Tokens are minted by the backend auth service; this side only verifies them

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

// Error types for JWT verification. Every variant means "needs refresh".
#[derive(Error, Debug, PartialEq, Eq)]
pub enum JwtError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid issuer")]
    InvalidIssuer,

    #[error("Invalid audience")]
    InvalidAudience,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Malformed token: {0}")]
    Malformed(String),
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            ErrorKind::InvalidSignature => JwtError::InvalidSignature,
            ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
            ErrorKind::InvalidAudience => JwtError::InvalidAudience,
            ErrorKind::InvalidToken => JwtError::InvalidToken,
            _ => JwtError::Malformed(err.to_string()),
        }
    }
}

/// Claims read from the AccessToken cookie.
/// `aud` is checked by the validator and not kept here since the backend
/// may send it as a string or an array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessTokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Expiry, seconds since epoch. Absent means the token is treated as expiring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl AccessTokenClaims {
    /// Whether the token should be refreshed before it is relied on.
    /// Missing `exp` counts as already expiring.
    pub fn expires_within(&self, now: i64, threshold_secs: i64) -> bool {
        match self.exp {
            Some(exp) => exp - now < threshold_secs,
            None => true,
        }
    }
}

/// Seam for the guard so tests can count or stub verification
pub trait AccessTokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<AccessTokenClaims, JwtError>;
}

// HMAC verifier configuration
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("decoding_key", &"<redacted>")
            .field("algorithms", &self.validation.algorithms)
            .field("iss", &self.validation.iss)
            .field("aud", &self.validation.aud)
            .finish()
    }
}

impl JwtVerifier {
    pub fn new(secret: &[u8], issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        // exp stays optional; a token without one is refreshed, not rejected
        validation.required_spec_claims =
            HashSet::from(["iss".to_string(), "aud".to_string()]);

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl AccessTokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<AccessTokenClaims, JwtError> {
        let data = decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}
