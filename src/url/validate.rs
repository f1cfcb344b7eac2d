use crate::UrlError;
use url::Url;

/// Longest raw URL accepted as a crawl seed
pub const MAX_URL_LENGTH: usize = 2000;

/// Characters that must never appear in a host we hand to the transport
const FORBIDDEN_HOST_CHARS: &[char] = &[' ', '<', '>', '"', '\'', '{', '}', '|', '\\', '^', '`'];

/// Validates a raw seed URL
///
/// # Validation Steps
///
/// 1. Reject empty input
/// 2. Reject input longer than 2000 characters
/// 3. Parse the URL; reject if malformed (this includes scheme-less input)
/// 4. Reject hosts containing whitespace or shell-unsafe characters
/// 5. Reject any scheme other than `http` and `https`
/// 6. Reject URLs without a host
///
/// # Arguments
///
/// * `raw` - The URL string to validate
///
/// # Returns
///
/// * `Ok(Url)` - The parsed URL, untouched otherwise
/// * `Err(UrlError)` - The first rule the input violates
///
/// # Examples
///
/// ```
/// use site_mirror::url::validate_url;
///
/// assert!(validate_url("https://example.com/path").is_ok());
/// assert!(validate_url("ftp://example.com").is_err());
/// assert!(validate_url("").is_err());
/// ```
pub fn validate_url(raw: &str) -> Result<Url, UrlError> {
    if raw.is_empty() {
        return Err(UrlError::Empty);
    }

    if raw.len() > MAX_URL_LENGTH {
        return Err(UrlError::TooLong {
            length: raw.len(),
            limit: MAX_URL_LENGTH,
        });
    }

    // The parser strips tabs and newlines and rejects some host characters
    // as IDNA failures, so the raw authority is checked first.
    if let Some(authority) = raw_authority(raw) {
        if authority.contains(FORBIDDEN_HOST_CHARS) || authority.contains(char::is_control) {
            return Err(UrlError::InvalidHost(authority.to_string()));
        }
    }
    if raw.contains(char::is_control) {
        return Err(UrlError::Parse("invalid control character in URL".to_string()));
    }

    let url = Url::parse(raw).map_err(|e| match e {
        url::ParseError::InvalidDomainCharacter | url::ParseError::IdnaError => {
            UrlError::InvalidHost(raw.to_string())
        }
        url::ParseError::EmptyHost => UrlError::MissingHost,
        other => UrlError::Parse(other.to_string()),
    })?;

    if let Some(host) = url.host_str() {
        if host.contains(FORBIDDEN_HOST_CHARS) {
            return Err(UrlError::InvalidHost(host.to_string()));
        }
    }

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::UnsupportedScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlError::MissingHost),
    }
}

/// Authority part of `scheme://authority/...`, without any userinfo
fn raw_authority(raw: &str) -> Option<&str> {
    let (_, rest) = raw.split_once("://")?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    Some(authority.rsplit_once('@').map_or(authority, |(_, host)| host))
}
