// Static routing configuration for the edge gateway

pub mod locale;
pub mod routes;

pub use locale::{resolve_locale, Locale, LOCALE_COOKIE_NAME, LOCALE_HEADER};
pub use routes::{has_dot_segment, is_bypassed, PublicRoutes, DEFAULT_PUBLIC_ROUTES};
