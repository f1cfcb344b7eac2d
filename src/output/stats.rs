//! Statistics of a finished crawl
//!
//! This module collects the workers' running counters and the coordinator's
//! error tally into one summary, and prints it.

use crate::crawler::CrawlCounters;
use crate::ErrorKind;
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Resources downloaded and written by this run
    pub resources_saved: usize,

    /// Tasks answered from the store without a fetch
    pub cache_hits: usize,

    /// Total body bytes of saved resources
    pub bytes_downloaded: usize,

    /// Same-site links found on expanded pages
    pub links_discovered: usize,

    /// Links dropped because the queue was full
    pub links_dropped: usize,

    /// Tasks that finished without error
    pub tasks_completed: usize,

    /// Tasks that ended in an error (including cancelled ones)
    pub tasks_failed: usize,

    /// Reported errors by kind
    pub errors_by_kind: BTreeMap<ErrorKind, usize>,

    /// Wall-clock duration of the crawl
    pub elapsed: Duration,
}

impl CrawlStatistics {
    /// Snapshots the workers' counters
    pub fn from_counters(
        counters: &CrawlCounters,
        errors_by_kind: BTreeMap<ErrorKind, usize>,
        elapsed: Duration,
    ) -> Self {
        let load = |counter: &std::sync::atomic::AtomicUsize| counter.load(Ordering::Relaxed);

        Self {
            resources_saved: load(&counters.resources_saved),
            cache_hits: load(&counters.cache_hits),
            bytes_downloaded: load(&counters.bytes_downloaded),
            links_discovered: load(&counters.links_discovered),
            links_dropped: load(&counters.links_dropped),
            tasks_completed: load(&counters.tasks_completed),
            tasks_failed: load(&counters.tasks_failed),
            errors_by_kind,
            elapsed,
        }
    }

    /// Total number of reported errors
    pub fn total_errors(&self) -> usize {
        self.errors_by_kind.values().sum()
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Mirror Statistics ===\n");

    println!("Overview:");
    println!("  Resources saved: {}", stats.resources_saved);
    println!("  Bytes downloaded: {}", stats.bytes_downloaded);
    println!("  Cache hits: {}", stats.cache_hits);
    println!("  Links discovered: {}", stats.links_discovered);
    println!("  Links dropped (queue full): {}", stats.links_dropped);
    println!("  Elapsed: {:.2}s", stats.elapsed.as_secs_f64());
    println!();

    let tasks = stats.tasks_completed + stats.tasks_failed;
    if tasks > 0 {
        let percentage = (stats.tasks_completed as f64 / tasks as f64) * 100.0;
        println!(
            "Tasks: {} completed, {} failed ({:.1}% ok)",
            stats.tasks_completed, stats.tasks_failed, percentage
        );
        println!();
    }

    if !stats.errors_by_kind.is_empty() {
        println!("Error Summary:");
        let mut error_counts: Vec<_> = stats.errors_by_kind.iter().collect();
        error_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (kind, count) in error_counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }
}
