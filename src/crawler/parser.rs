//! HTML link extraction
//!
//! This module turns a downloaded HTML document into the list of same-site
//! URLs the crawl should follow:
//! - `LinkScanner` pulls raw attribute values out of the markup
//! - `LinkExtractor` normalizes them under the crawl's `LinkPolicy`

use crate::url::{canonical_key, LinkPolicy};
use crate::MirrorError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// Link-bearing attributes per element
///
/// Stylesheets, scripts and media are followed as well as anchors, so the
/// mirror is browsable offline.
const LINK_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("a", &["href"]),
    ("link", &["href"]),
    ("area", &["href"]),
    ("img", &["src", "data-src", "srcset"]),
    ("script", &["src"]),
    ("iframe", &["src"]),
    ("frame", &["src"]),
    ("embed", &["src"]),
    ("source", &["src", "srcset"]),
    ("form", &["action"]),
    ("object", &["data"]),
    ("video", &["src", "poster"]),
    ("audio", &["src"]),
    ("track", &["src"]),
];

/// How many leading bytes are checked for binary content
const BINARY_SNIFF_LEN: usize = 1024;

/// Extracts raw link strings from a document
pub trait LinkScanner: Send + Sync {
    /// Returns every link-bearing attribute value in document order
    ///
    /// Fails only if the input cannot be treated as HTML at all.
    fn extract_raw_links(&self, html: &[u8]) -> Result<Vec<String>, String>;
}

/// `LinkScanner` backed by scraper's HTML5 parser
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlLinkScanner;

impl HtmlLinkScanner {
    pub fn new() -> Self {
        Self
    }
}

impl LinkScanner for HtmlLinkScanner {
    fn extract_raw_links(&self, html: &[u8]) -> Result<Vec<String>, String> {
        if html.iter().take(BINARY_SNIFF_LEN).any(|&b| b == 0) {
            return Err("document contains binary data".to_string());
        }

        let text = String::from_utf8_lossy(html);
        let document = Html::parse_document(&text);
        let all = Selector::parse("*").map_err(|e| format!("{:?}", e))?;

        let mut links = Vec::new();
        for element in document.select(&all) {
            let element = element.value();
            let Some((_, attrs)) = LINK_ATTRIBUTES
                .iter()
                .find(|(tag, _)| element.name().eq_ignore_ascii_case(tag))
            else {
                continue;
            };

            for attr in attrs.iter() {
                let Some(value) = element.attr(attr) else {
                    continue;
                };

                if *attr == "srcset" {
                    links.extend(split_srcset(value));
                } else {
                    links.push(value.to_string());
                }
            }
        }

        Ok(links)
    }
}

/// Splits a `srcset` value into its candidate URLs
///
/// `"a.png 1x, b.png 2x"` yields `a.png` and `b.png`.
fn split_srcset(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .filter_map(|candidate| candidate.split_whitespace().next())
        .map(str::to_string)
}

/// Turns documents into the same-site links to crawl next
pub struct LinkExtractor {
    scanner: Arc<dyn LinkScanner>,
    policy: LinkPolicy,
}

impl LinkExtractor {
    pub fn new(scanner: Arc<dyn LinkScanner>, policy: LinkPolicy) -> Self {
        Self { scanner, policy }
    }

    pub fn policy(&self) -> &LinkPolicy {
        &self.policy
    }

    /// Extracts the links of `page_url` worth following
    ///
    /// Every raw link is resolved against `page_url` and normalized. Links
    /// that are external, malformed or not http(s) are skipped, as are links
    /// back to the page itself. The result is deduplicated and keeps
    /// first-seen order.
    ///
    /// # Arguments
    ///
    /// * `html` - The document body
    /// * `page_url` - URL the document was downloaded from
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Url>)` - Canonical same-site URLs
    /// * `Err(MirrorError::HtmlParse)` - The scanner rejected the document
    pub fn extract(&self, html: &[u8], page_url: &Url) -> Result<Vec<Url>, MirrorError> {
        let raw_links =
            self.scanner
                .extract_raw_links(html)
                .map_err(|message| MirrorError::HtmlParse {
                    url: page_url.to_string(),
                    message,
                })?;

        let page_key = canonical_key(page_url);
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for raw in &raw_links {
            match self.policy.normalize(raw, page_url) {
                Ok(url) => {
                    let key = canonical_key(&url);
                    if key != page_key && seen.insert(key) {
                        links.push(url);
                    }
                }
                Err(e) => {
                    tracing::debug!("Skipping link {:?} on {}: {}", raw, page_url, e);
                }
            }
        }

        tracing::debug!(
            "Extracted {} links ({} raw) from {}",
            links.len(),
            raw_links.len(),
            page_url
        );

        Ok(links)
    }
}
