// Static routing tables: public routes and paths the guard never sees

/// Paths reachable without a session when PUBLIC_ROUTES is not set
pub const DEFAULT_PUBLIC_ROUTES: &[&str] = &[
    "/",
    "/login",
    "/register",
    "/pricing",
    "/forgot-password",
    "/reset-password",
    "/verify-email",
    "/about",
    "/contact",
    "/terms",
    "/privacy",
    "/site",
];

/// Prefixes forwarded untouched: API routes, build assets and icons
const BYPASS_PREFIXES: &[&str] = &["/api/", "/_next/static/", "/_next/image/", "/icons/"];

const BYPASS_EXACT: &[&str] = &["/api", "/_next/image", "/favicon.ico"];

/// Immutable public route table, built once at startup
#[derive(Debug, Clone)]
pub struct PublicRoutes {
    routes: Vec<String>,
}

impl PublicRoutes {
    pub fn new<I, S>(routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let routes = routes
            .into_iter()
            .map(Into::into)
            .map(|r: String| {
                if r.len() > 1 {
                    r.trim_end_matches('/').to_string()
                } else {
                    r
                }
            })
            .collect();
        Self { routes }
    }

    /// True when `path` equals an entry or sits below it as a path segment.
    /// The root entry only matches `/` itself.
    pub fn is_public(&self, path: &str) -> bool {
        self.routes.iter().any(|route| {
            if route == "/" {
                return path == "/";
            }
            path == route
                || path
                    .strip_prefix(route.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    pub fn routes(&self) -> &[String] {
        &self.routes
    }
}

impl Default for PublicRoutes {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLIC_ROUTES.iter().copied())
    }
}

/// Requests the guard must not intercept at all.
/// Covers API routes, framework assets, icons and files from the public directory.
pub fn is_bypassed(path: &str) -> bool {
    if BYPASS_EXACT.contains(&path) || BYPASS_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return true;
    }

    // Public directory files: last segment carries an extension
    path.rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .is_some_and(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
}

/// True when any path segment is `.` or `..`, percent-encoded forms included.
/// URL parsers resolve these, so the forwarded path would differ from the one checked here.
pub fn has_dot_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_segment_prefix_match() {
        let routes = PublicRoutes::default();
        assert!(routes.is_public("/login"));
        assert!(routes.is_public("/pricing/enterprise"));
        assert!(routes.is_public("/site/acme/menu"));
    }

    #[test]
    fn test_prefix_must_end_on_segment_boundary() {
        let routes = PublicRoutes::default();
        assert!(!routes.is_public("/loginx"));
        assert!(!routes.is_public("/pricingpage"));
    }

    #[test]
    fn test_root_entry_only_matches_root() {
        let routes = PublicRoutes::default();
        assert!(routes.is_public("/"));
        assert!(!routes.is_public("/dashboard"));
        assert!(!routes.is_public("/menu/edit"));
    }

    #[test]
    fn test_trailing_slash_in_config_is_normalised() {
        let routes = PublicRoutes::new(["/docs/"]);
        assert_eq!(routes.routes(), &["/docs".to_string()]);
        assert!(routes.is_public("/docs"));
        assert!(routes.is_public("/docs/intro"));
    }

    #[test]
    fn test_bypassed_paths() {
        assert!(is_bypassed("/api/menu"));
        assert!(is_bypassed("/api"));
        assert!(is_bypassed("/_next/static/chunks/main.js"));
        assert!(is_bypassed("/_next/image"));
        assert!(is_bypassed("/favicon.ico"));
        assert!(is_bypassed("/icons/logo"));
        assert!(is_bypassed("/robots.txt"));
        assert!(is_bypassed("/images/hero.webp"));
    }

    #[test]
    fn test_pages_are_not_bypassed() {
        assert!(!is_bypassed("/"));
        assert!(!is_bypassed("/dashboard"));
        assert!(!is_bypassed("/apiary"));
        assert!(!is_bypassed("/orders/42"));
        assert!(!is_bypassed("/.well-known"));
    }

    #[test]
    fn test_dot_segments_detected() {
        assert!(has_dot_segment("/login/../dashboard"));
        assert!(has_dot_segment("/api/./x"));
        assert!(has_dot_segment("/site/%2e%2e/dashboard"));
        assert!(has_dot_segment("/site/%2E./dashboard"));
        assert!(has_dot_segment("/site/.%2e"));
        assert!(has_dot_segment("/login\\..\\dashboard"));
        assert!(has_dot_segment("/.."));
    }

    #[test]
    fn test_ordinary_paths_have_no_dot_segments() {
        assert!(!has_dot_segment("/"));
        assert!(!has_dot_segment("/.well-known/security.txt"));
        assert!(!has_dot_segment("/menu/...more"));
        assert!(!has_dot_segment("/files/a..b"));
        assert!(!has_dot_segment("/site/%2e%2ex"));
    }
}
