use crate::url::domain::{base_domain, extract_domain};
use crate::url::normalize::normalize_within;
use crate::UrlError;
use serde::Deserialize;
use url::Url;

/// Checks whether a host belongs to the crawl's site
///
/// A host is on the site when it equals the site host or is any subdomain
/// of it:
///
/// - `example.com` matches `example.com`
/// - `blog.example.com` and `api.v2.example.com` match `example.com`
/// - `notexample.com` does not
///
/// # Examples
///
/// ```
/// use site_mirror::url::is_same_site;
///
/// assert!(is_same_site("example.com", "example.com"));
/// assert!(is_same_site("cdn.example.com", "example.com"));
/// assert!(!is_same_site("evil.com", "example.com"));
/// ```
pub fn is_same_site(host: &str, site_host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let site_host = site_host.trim_end_matches('.').to_ascii_lowercase();

    host == site_host || host.ends_with(&format!(".{}", site_host))
}

/// How wide the same-site boundary is drawn around the seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteScope {
    /// The seed host and its subdomains
    #[default]
    Host,
    /// Everything under the seed's registrable domain
    Domain,
}

/// The same-site policy of one crawl
///
/// Built once from the seed and shared by every worker. Links are resolved
/// against the page they were found on but judged against `site_host`.
#[derive(Debug, Clone)]
pub struct LinkPolicy {
    site_host: String,
}

impl LinkPolicy {
    /// Creates a policy that accepts `site_host` and its subdomains
    pub fn new(site_host: impl Into<String>) -> Self {
        Self {
            site_host: site_host.into().to_lowercase(),
        }
    }

    /// Builds the policy for a crawl starting at `seed`
    ///
    /// With [`SiteScope::Domain`] the boundary is the seed's registrable
    /// domain, so a crawl seeded at `www.example.com` also follows
    /// `cdn.example.com`.
    pub fn for_seed(seed: &Url, scope: SiteScope) -> Result<Self, UrlError> {
        let site_host = match scope {
            SiteScope::Host => extract_domain(seed).ok_or(UrlError::MissingHost)?,
            SiteScope::Domain => base_domain(seed)?,
        };

        Ok(Self::new(site_host))
    }

    /// The host every accepted link must equal or be a subdomain of
    pub fn site_host(&self) -> &str {
        &self.site_host
    }

    /// Normalizes a link found on `page` under this policy
    pub fn normalize(&self, raw: &str, page: &Url) -> Result<Url, UrlError> {
        normalize_within(raw, page, &self.site_host)
    }
}
