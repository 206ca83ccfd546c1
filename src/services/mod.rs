// Services module for the edge gateway
// Token verification, session refresh and tenant host matching

pub mod jwt;
pub mod refresh;
pub mod subdomain;

// Re-export commonly used services
pub use jwt::{AccessTokenClaims, AccessTokenVerifier, JwtError, JwtVerifier};
pub use refresh::{
    HttpRefreshClient, RefreshClient, RefreshError, RotatedCookies, ACCESS_COOKIE_NAME,
    REFRESH_COOKIE_NAME,
};
pub use subdomain::{site_path, SubdomainMatcher};
