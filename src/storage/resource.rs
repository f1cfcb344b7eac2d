//! The unit of mirroring: one downloaded resource per canonical URL

use crate::storage::local_path::local_path;
use crate::url::{canonical_key, canonicalize};
use std::path::PathBuf;
use url::Url;

/// A downloaded resource
///
/// Resources are created once per canonical URL by the downloader and never
/// mutated afterwards; the store hands them out as `Arc<Resource>`.
/// Outgoing links are not stored here but in the store's link table, keyed
/// by URL, so cyclic sites never form cyclic object graphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Canonical URL (no query, no fragment)
    pub url: Url,

    /// Path relative to the mirror root
    pub local_path: PathBuf,

    /// Content-Type header value as received
    pub content_type: String,

    /// Response body
    pub content: Vec<u8>,

    /// Whether the content is an HTML document
    pub is_html: bool,
}

impl Resource {
    /// Creates a resource, deriving its canonical URL and mirror path
    pub fn new(url: &Url, content: Vec<u8>, content_type: impl Into<String>) -> Self {
        let url = canonicalize(url);
        let content_type = content_type.into();

        Self {
            local_path: local_path(&url),
            is_html: is_html_content_type(&content_type),
            url,
            content_type,
            content,
        }
    }

    /// The key this resource is stored under
    pub fn key(&self) -> String {
        canonical_key(&self.url)
    }

    /// Size of the body in bytes
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Returns true if a Content-Type header denotes an HTML document
pub fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    mime == "text/html" || mime == "application/xhtml+xml"
}
