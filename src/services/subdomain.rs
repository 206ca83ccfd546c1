// Tenant subdomain detection for hostname-based site hosting
// Every tenant's published website is served from the same deployment

use regex::Regex;

/// Host labels that belong to the product itself, never to a tenant
const RESERVED_LABELS: &[&str] = &["www", "app"];

#[derive(Debug, Clone)]
pub struct SubdomainMatcher {
    pattern: Regex,
}

impl SubdomainMatcher {
    /// Build a matcher for `{label}.{root_domain}` and `{label}.localhost`, optional port.
    /// Labels are limited to lowercase hostname characters.
    pub fn new(root_domain: &str) -> Result<Self, regex::Error> {
        let pattern = format!(
            r"^([a-z0-9-]+)\.({}|localhost)(:\d+)?$",
            regex::escape(&root_domain.to_lowercase())
        );
        Ok(Self {
            pattern: Regex::new(&pattern)?,
        })
    }

    /// Extract the tenant label from a lowercased Host header value, if it names one
    pub fn tenant_label<'a>(&self, host: &'a str) -> Option<&'a str> {
        let captures = self.pattern.captures(host)?;
        let label = captures.get(1)?.as_str();

        if RESERVED_LABELS
            .iter()
            .any(|reserved| label.eq_ignore_ascii_case(reserved))
        {
            return None;
        }

        Some(label)
    }

    /// Rewrite target for a tenant request, query string preserved
    pub fn rewrite_target(&self, host: &str, path: &str, query: Option<&str>) -> Option<String> {
        let label = self.tenant_label(&host.to_lowercase())?.to_string();
        Some(site_path(&label, path, query))
    }
}

/// `/site/{label}` for the root path, `/site/{label}{path}` otherwise
pub fn site_path(label: &str, path: &str, query: Option<&str>) -> String {
    let mut target = if path == "/" || path.is_empty() {
        format!("/site/{}", label)
    } else {
        format!("/site/{}{}", label, path)
    };

    if let Some(query) = query.filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(query);
    }

    target
}
