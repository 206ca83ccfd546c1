// Supported UI locales and per-request locale negotiation

use serde::{Deserialize, Serialize};

/// Cookie holding an explicit locale choice made in the UI
pub const LOCALE_COOKIE_NAME: &str = "locale";

/// Header the app's i18n loader reads the negotiated locale from
pub const LOCALE_HEADER: &str = "x-locale";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    No,
    Sv,
    Da,
    Th,
}

impl Locale {
    pub const ALL: [Locale; 5] = [Locale::En, Locale::No, Locale::Sv, Locale::Da, Locale::Th];

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::No => "no",
            Locale::Sv => "sv",
            Locale::Da => "da",
            Locale::Th => "th",
        }
    }

    /// Exact match against a supported locale code, as stored in the cookie
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == code)
    }

    /// Map a language subtag from Accept-Language onto a supported locale.
    /// Norwegian Bokmål (`nb`) shares the `no` bundle.
    fn from_language_subtag(subtag: &str) -> Option<Self> {
        match subtag {
            "nb" | "no" => Some(Locale::No),
            "sv" => Some(Locale::Sv),
            "da" => Some(Locale::Da),
            "th" => Some(Locale::Th),
            "en" => Some(Locale::En),
            _ => None,
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the first supported language in header order.
/// Quality weights are ignored on purpose: `da;q=0.9, en;q=0.8` and
/// `en;q=0.1, da` both resolve to whichever tag is listed first.
pub fn from_accept_language(header: &str) -> Option<Locale> {
    header
        .split(',')
        .filter_map(|entry| {
            let tag = entry.split(';').next()?.trim().to_lowercase();
            let primary = tag.split(['-', '_']).next()?.to_string();
            Locale::from_language_subtag(&primary)
        })
        .next()
}

/// Resolve the request locale: cookie, then Accept-Language, then English
pub fn resolve_locale(cookie: Option<&str>, accept_language: Option<&str>) -> Locale {
    cookie
        .and_then(Locale::from_code)
        .or_else(|| accept_language.and_then(from_accept_language))
        .unwrap_or_default()
}
