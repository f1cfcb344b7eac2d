//! Output module for reporting on a finished crawl
//!
//! This module handles:
//! - Summarizing crawl counters into `CrawlStatistics`
//! - Printing statistics to the terminal
//! - Writing a markdown manifest of the mirror

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_manifest, generate_markdown_manifest, RunInfo};
pub use stats::{print_statistics, CrawlStatistics};
