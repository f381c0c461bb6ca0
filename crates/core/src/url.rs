//! URL normalization for request identity.

use url::Url;

/// Schemes owned by browser extensions. Requests to them parse, but are never
/// intercepted.
pub const EXTENSION_SCHEMES: &[&str] = &["chrome-extension", "moz-extension", "safari-web-extension"];

/// Error type for URL normalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Normalize a request URL so equal resources share one cache key.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve root-relative or relative input against `origin`
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn normalize(input: &str, origin: &Url) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
        }
        Err(e) => return Err(UrlError::InvalidUrl(e.to_string())),
    };

    match parsed.scheme() {
        "http" | "https" => {}
        scheme if EXTENSION_SCHEMES.contains(&scheme) => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host {
            parsed
                .set_host(Some(&lowered))
                .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
        }
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Whether the URL belongs to a browser extension.
pub fn is_extension_url(url: &Url) -> bool {
    EXTENSION_SCHEMES.contains(&url.scheme())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://folio.example").unwrap()
    }

    #[test]
    fn test_normalize_root_relative() {
        let url = normalize("/offline.html", &origin()).unwrap();
        assert_eq!(url.as_str(), "https://folio.example/offline.html");
    }

    #[test]
    fn test_normalize_root() {
        let url = normalize("/", &origin()).unwrap();
        assert_eq!(url.as_str(), "https://folio.example/");
    }

    #[test]
    fn test_normalize_absolute_other_origin() {
        let url = normalize("https://fonts.googleapis.com/css2?family=Inter", &origin()).unwrap();
        assert_eq!(url.host_str(), Some("fonts.googleapis.com"));
        assert_eq!(url.query(), Some("family=Inter"));
    }

    #[test]
    fn test_normalize_lowercase_host() {
        let url = normalize("https://FOLIO.Example/About", &origin()).unwrap();
        assert_eq!(url.host_str(), Some("folio.example"));
        assert_eq!(url.path(), "/About");
    }

    #[test]
    fn test_normalize_remove_fragment() {
        let url = normalize("/index.html#projects", &origin()).unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/index.html");
    }

    #[test]
    fn test_normalize_extension_scheme_accepted() {
        let url = normalize("chrome-extension://abcdef/content.js", &origin()).unwrap();
        assert!(is_extension_url(&url));
    }

    #[test]
    fn test_normalize_unsupported_scheme() {
        let result = normalize("file:///etc/passwd", &origin());
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_normalize_empty() {
        assert!(matches!(normalize("   ", &origin()), Err(UrlError::Empty)));
    }
}
