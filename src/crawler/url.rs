use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// A URL with its query and fragment removed. This is the only identity
/// used for visited-tracking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Authority used for internal/external classification.
    pub fn host_key(&self) -> Option<String> {
        host_key(&self.0)
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonicalize a URL for identity comparison.
///
/// Query and fragment are dropped, everything else is re-serialized by the
/// URL parser. Input the parser rejects is returned with anything from the
/// first `?` or `#` cut off.
pub fn normalize(url: &str) -> NormalizedUrl {
    match Url::parse(url.trim()) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            NormalizedUrl(parsed.to_string())
        }
        Err(_) => {
            let end = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
            NormalizedUrl(url[..end].trim().to_string())
        }
    }
}

/// Resolve a possibly-relative `href` against the URL of the page it was
/// found on.
pub fn resolve(base: &str, href: &str) -> String {
    let href = href.trim();
    match Url::parse(base) {
        Ok(base) => match base.join(href) {
            Ok(joined) => joined.to_string(),
            Err(_) => href.to_string(),
        },
        Err(_) => href.to_string(),
    }
}

/// `host[:port]` of a URL, compared verbatim against the seed's.
/// Returns `None` for URLs without a host (`mailto:`, `javascript:`, ...).
pub fn host_key(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_and_fragment_collapse() {
        let plain = normalize("https://example.com/docs/page");
        assert_eq!(normalize("https://example.com/docs/page#intro"), plain);
        assert_eq!(normalize("https://example.com/docs/page?lang=en"), plain);
        assert_eq!(normalize("https://example.com/docs/page?a=1#b"), plain);
        assert_eq!(plain.as_str(), "https://example.com/docs/page");
    }

    #[test]
    fn test_path_is_preserved() {
        assert_ne!(
            normalize("https://example.com/a"),
            normalize("https://example.com/a/")
        );
        assert_eq!(normalize("https://example.com").as_str(), "https://example.com/");
    }

    #[test]
    fn test_malformed_input_is_best_effort() {
        assert_eq!(normalize("not a url?x=1#y").as_str(), "not a url");
        assert_eq!(normalize("").as_str(), "");
    }

    #[test]
    fn test_resolve_relative_paths() {
        let base = "https://example.com/blog/post";
        assert_eq!(resolve(base, "/about"), "https://example.com/about");
        assert_eq!(resolve(base, "other"), "https://example.com/blog/other");
        assert_eq!(resolve(base, "#top"), "https://example.com/blog/post#top");
        assert_eq!(resolve(base, "https://other.com/x"), "https://other.com/x");
    }

    #[test]
    fn test_host_key() {
        assert_eq!(host_key("https://example.com/about").as_deref(), Some("example.com"));
        assert_eq!(host_key("http://127.0.0.1:8080/").as_deref(), Some("127.0.0.1:8080"));
        // Default ports are dropped by the parser
        assert_eq!(host_key("https://example.com:443/").as_deref(), Some("example.com"));
        assert_eq!(host_key("mailto:someone@example.com"), None);
        assert_ne!(host_key("https://blog.example.com/"), host_key("https://example.com/"));
    }
}
