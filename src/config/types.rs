use crate::url::SiteScope;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Site-Mirror
///
/// Every section and key is optional; missing values fall back to the
/// defaults below, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub fetch: FetchConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of concurrent workers
    pub workers: usize,

    /// Capacity of the task queue; links discovered while it is full are dropped
    pub queue_capacity: usize,

    /// Capacity of the error report channel
    pub error_buffer: usize,

    /// Wall-clock limit for the whole crawl (seconds)
    pub timeout_secs: u64,

    /// Cancel the whole crawl on the first task error
    pub fail_fast: bool,

    /// Whether subdomains of the seed's registrable domain count as same-site
    pub scope: SiteScope,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            queue_capacity: 100,
            error_buffer: 100,
            timeout_secs: 60,
            fail_fast: true,
            scope: SiteScope::Host,
        }
    }
}

impl CrawlerConfig {
    /// The crawl deadline as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// TCP/TLS connect timeout (seconds)
    pub connect_timeout_secs: u64,

    /// Maximum redirects followed per request
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_redirects: 10,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "site-mirror".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(url) => format!("{}/{} (+{})", self.crawler_name, self.crawler_version, url),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Root directory of the mirror
    pub mirror_dir: PathBuf,

    /// Where to write the markdown manifest, if anywhere
    pub manifest_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mirror_dir: PathBuf::from("./downloads"),
            manifest_path: None,
        }
    }
}
