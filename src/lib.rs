//! Site-Mirror: a bounded-depth concurrent site mirroring crawler
//!
//! This crate downloads a seed URL, follows same-site links up to a depth
//! limit, and writes every resource it fetches into a local mirror directory,
//! never downloading the same canonical URL twice.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Main error type for Site-Mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("Task queue full, link dropped: {url}")]
    QueueFull { url: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Crawl deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("Crawl cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MirrorError {
    /// Classifies the error into one of the crawl error kinds
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Url(e) => e.kind(),
            Self::Fetch { .. } | Self::HttpStatus { .. } | Self::Reqwest(_) => {
                ErrorKind::FetchFailed
            }
            Self::HtmlParse { .. } => ErrorKind::ParseFailed,
            Self::QueueFull { .. } => ErrorKind::QueueFull,
            Self::Storage(_) | Self::Io(_) => ErrorKind::StorageWriteFailed,
            Self::DeadlineExceeded(_) => ErrorKind::DeadlineExceeded,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Returns true for errors that end the whole crawl rather than one task
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::DeadlineExceeded(_) | Self::Cancelled)
    }
}

/// Coarse classification of everything that can go wrong during a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    InvalidUrl,
    UnsupportedScheme,
    ExternalLink,
    HostLookupFailed,
    FetchFailed,
    ParseFailed,
    QueueFull,
    StorageWriteFailed,
    DeadlineExceeded,
    Cancelled,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::UnsupportedScheme => "unsupported_scheme",
            Self::ExternalLink => "external_link",
            Self::HostLookupFailed => "host_lookup_failed",
            Self::FetchFailed => "fetch_failed",
            Self::ParseFailed => "parse_failed",
            Self::QueueFull => "queue_full",
            Self::StorageWriteFailed => "storage_write_failed",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Cancelled => "cancelled",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("URL is empty")]
    Empty,

    #[error("URL is {length} characters long, limit is {limit}")]
    TooLong { length: usize, limit: usize },

    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid characters in host: {0}")]
    InvalidHost(String),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("External link: {0}")]
    External(String),

    #[error("Failed to determine base domain of {0}")]
    HostLookup(String),
}

impl UrlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Empty
            | Self::TooLong { .. }
            | Self::Parse(_)
            | Self::InvalidHost(_)
            | Self::MissingHost => ErrorKind::InvalidUrl,
            Self::UnsupportedScheme(_) => ErrorKind::UnsupportedScheme,
            Self::External(_) => ErrorKind::ExternalLink,
            Self::HostLookup(_) => ErrorKind::HostLookupFailed,
        }
    }
}

/// Result type alias for Site-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{mirror, CrawlReport};
pub use state::{CrawlPhase, TaskState};
pub use storage::{Resource, ResourceStore};
pub use url::{base_domain, normalize_link, validate_url, LinkPolicy, SiteScope};
