use crate::url::site::is_same_site;
use crate::UrlError;
use url::Url;

/// Link prefixes that never point at a mirrorable resource
const UNSUPPORTED_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Normalizes a raw link found on a page into a canonical, same-site URL
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace; reject empty links
/// 2. Reject `javascript:`, `mailto:`, `tel:` and `data:` links
/// 3. Resolve relative references against `base`
/// 4. Reject anything that is not HTTP(S) after resolution
/// 5. Enforce the same-site policy against the host of `base`
/// 6. Strip query and fragment (see [`canonicalize`])
///
/// # Arguments
///
/// * `raw` - The attribute value exactly as it appeared in the document
/// * `base` - The URL relative references resolve against
///
/// # Returns
///
/// * `Ok(Url)` - Canonical absolute URL on the same site
/// * `Err(UrlError::External)` - The link leaves the site (filtered, not fatal)
/// * `Err(UrlError)` - The link is unusable
///
/// # Examples
///
/// ```
/// use site_mirror::url::normalize_link;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/docs/").unwrap();
/// let url = normalize_link("intro?lang=en#top", &base).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs/intro");
///
/// assert!(normalize_link("https://evil.com/x", &base).is_err());
/// ```
pub fn normalize_link(raw: &str, base: &Url) -> Result<Url, UrlError> {
    let site_host = base.host_str().ok_or(UrlError::MissingHost)?;
    normalize_within(raw, base, site_host)
}

/// Same as [`normalize_link`] but checks same-site against an explicit host
///
/// Relative references still resolve against `base`; only the site check
/// uses `site_host`. This lets links found on `cdn.example.com` be judged
/// against the crawl's own site rather than the page they were found on.
pub(crate) fn normalize_within(raw: &str, base: &Url, site_host: &str) -> Result<Url, UrlError> {
    let raw = raw.trim();

    if raw.is_empty() {
        return Err(UrlError::Empty);
    }

    let lowered = raw.to_ascii_lowercase();
    if let Some(prefix) = UNSUPPORTED_PREFIXES
        .iter()
        .find(|prefix| lowered.starts_with(*prefix))
    {
        return Err(UrlError::UnsupportedScheme(
            prefix.trim_end_matches(':').to_string(),
        ));
    }

    let resolved = base
        .join(raw)
        .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return Err(UrlError::UnsupportedScheme(resolved.scheme().to_string()));
    }

    let host = resolved.host_str().ok_or(UrlError::MissingHost)?;
    if !is_same_site(host, site_host) {
        return Err(UrlError::External(host.to_string()));
    }

    Ok(canonicalize(&resolved))
}

/// Strips query and fragment so logically identical resources share identity
///
/// # Examples
///
/// ```
/// use site_mirror::url::canonicalize;
/// use url::Url;
///
/// let url = Url::parse("http://x.com/a?y=1#z").unwrap();
/// assert_eq!(canonicalize(&url).as_str(), "http://x.com/a");
/// ```
pub fn canonicalize(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// Returns the store key of a URL: its canonical form as a string
pub fn canonical_key(url: &Url) -> String {
    canonicalize(url).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com").unwrap()
    }

    #[test]
    fn test_simple_relative() {
        let result = normalize_link("/about", &base_url()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/about");
    }

    #[test]
    fn test_relative_path_against_page() {
        let base = Url::parse("https://example.com/blog/post").unwrap();
        let result = normalize_link("other", &base).unwrap();
        assert_eq!(result.as_str(), "https://example.com/blog/other");
    }

    #[test]
    fn test_strips_query_and_fragment() {
        let result = normalize_link("/path?foo=bar#section", &base_url()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/path");
        assert!(result.query().is_none());
        assert!(result.fragment().is_none());
    }

    #[test]
    fn test_never_returns_query_or_fragment() {
        let links = [
            "/a?x=1",
            "/b#frag",
            "c?x=1#frag",
            "https://example.com/d?e=f",
            "https://sub.example.com/g#h",
            "?only=query",
            "#only-fragment",
        ];

        for link in links {
            let result = normalize_link(link, &base_url()).unwrap();
            assert!(result.query().is_none(), "query kept for {}", link);
            assert!(result.fragment().is_none(), "fragment kept for {}", link);
        }
    }

    #[test]
    fn test_external_rejected() {
        let result = normalize_link("https://evil.com/x", &base_url());
        assert!(matches!(result, Err(UrlError::External(_))));
    }

    #[test]
    fn test_subdomain_accepted() {
        let result = normalize_link("https://sub.example.com/x", &base_url()).unwrap();
        assert_eq!(result.as_str(), "https://sub.example.com/x");
    }

    #[test]
    fn test_suffix_lookalike_rejected() {
        let result = normalize_link("https://notexample.com/x", &base_url());
        assert!(matches!(result, Err(UrlError::External(_))));
    }

    #[test]
    fn test_parent_domain_rejected_from_subdomain_base() {
        let base = Url::parse("https://blog.example.com/").unwrap();
        let result = normalize_link("https://example.com/", &base);
        assert!(matches!(result, Err(UrlError::External(_))));
    }

    #[test]
    fn test_unsupported_schemes() {
        for link in [
            "javascript:void(0)",
            "mailto:test@example.com",
            "tel:+1234567890",
            "data:text/html,<h1>x</h1>",
            "JavaScript:alert(1)",
        ] {
            let result = normalize_link(link, &base_url());
            assert!(
                matches!(result, Err(UrlError::UnsupportedScheme(_))),
                "{} should be unsupported",
                link
            );
        }
    }

    #[test]
    fn test_non_http_after_resolution() {
        let result = normalize_link("ftp://example.com/file", &base_url());
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_empty_link() {
        assert!(matches!(
            normalize_link("   ", &base_url()),
            Err(UrlError::Empty)
        ));
    }

    #[test]
    fn test_protocol_relative() {
        let result = normalize_link("//cdn.example.com/lib.js", &base_url()).unwrap();
        assert_eq!(result.as_str(), "https://cdn.example.com/lib.js");
    }

    #[test]
    fn test_dot_segments_resolved() {
        let base = Url::parse("https://example.com/a/b/").unwrap();
        let result = normalize_link("../c/./d", &base).unwrap();
        assert_eq!(result.as_str(), "https://example.com/a/c/d");
    }

    #[test]
    fn test_normalize_within_uses_site_host() {
        let page = Url::parse("https://cdn.example.com/page").unwrap();
        let result = normalize_within("https://www.example.com/x", &page, "example.com");
        assert!(result.is_ok());

        let result = normalize_link("https://www.example.com/x", &page);
        assert!(matches!(result, Err(UrlError::External(_))));
    }

    #[test]
    fn test_canonical_key_collides() {
        let a = Url::parse("http://x.com/a?y#z").unwrap();
        let b = Url::parse("http://x.com/a").unwrap();
        assert_eq!(canonical_key(&a), canonical_key(&b));
    }
}
