//! URL handling module for Site-Mirror
//!
//! This module provides the crawl's URL policy: seed validation, registrable
//! domain lookup, link normalization and the same-site check.
//!
//! Every URL that reaches the resource store goes through [`canonicalize`],
//! so `http://x/a?y#z` and `http://x/a` share one identity.

mod domain;
mod normalize;
mod site;
mod validate;

// Re-export main functions
pub use domain::{base_domain, extract_domain};
pub use normalize::{canonical_key, canonicalize, normalize_link};
pub use site::{is_same_site, LinkPolicy, SiteScope};
pub use validate::{validate_url, MAX_URL_LENGTH};

use crate::UrlError;
use url::Url;

/// Validates a seed and returns it in canonical form
///
/// This is the entry gate for a crawl: the raw string must pass
/// [`validate_url`], after which query and fragment are dropped so the seed
/// is stored under the same key any later link to it would produce.
///
/// # Examples
///
/// ```
/// use site_mirror::url::prepare_seed;
///
/// let seed = prepare_seed("https://example.com/start?ref=x#top").unwrap();
/// assert_eq!(seed.as_str(), "https://example.com/start");
/// ```
pub fn prepare_seed(raw: &str) -> Result<Url, UrlError> {
    let url = validate_url(raw.trim())?;
    Ok(canonicalize(&url))
}
