//! Crawler module for mirroring a site
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `Fetcher` capability
//! - Download-or-reuse against the resource store
//! - HTML link extraction under the site policy
//! - The bounded task queue, worker pool and in-flight accounting
//! - Overall crawl coordination, deadline and cancellation

mod coordinator;
mod downloader;
mod fetcher;
mod inflight;
mod parser;
mod scheduler;

pub use coordinator::{mirror, Coordinator, CrawlReport};
pub use downloader::{Download, Downloader};
pub use fetcher::{build_http_client, Fetched, Fetcher, HttpFetcher};
pub use inflight::{InFlight, InFlightGuard};
pub use parser::{HtmlLinkScanner, LinkExtractor, LinkScanner};
pub use scheduler::{CrawlCounters, Scheduler, SchedulerSettings, Task};
