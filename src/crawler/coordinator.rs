//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the driver loop that coordinates a crawl:
//! - Seeding the queue and starting the workers and warden
//! - Collecting task errors and applying the fail-fast policy
//! - Enforcing the crawl deadline and external cancellation
//! - Settling workers and summarizing the run

use crate::config::{Config, CrawlerConfig};
use crate::crawler::downloader::Downloader;
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::parser::{HtmlLinkScanner, LinkExtractor, LinkScanner};
use crate::crawler::scheduler::{Scheduler, SchedulerSettings};
use crate::output::CrawlStatistics;
use crate::state::CrawlPhase;
use crate::storage::ResourceStore;
use crate::url::{prepare_seed, LinkPolicy};
use crate::{ErrorKind, MirrorError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Outcome of a crawl
///
/// A crawl always produces a report, even when it fails: the mirror written
/// so far is kept and its statistics are still meaningful.
#[derive(Debug)]
pub struct CrawlReport {
    /// The first error observed, if any
    pub first_error: Option<MirrorError>,
    /// Total errors observed, including ones drained after cancellation
    pub error_count: usize,
    pub stats: CrawlStatistics,
    pub phase: CrawlPhase,
}

impl CrawlReport {
    pub fn is_success(&self) -> bool {
        self.first_error.is_none()
    }

    /// Turns the report into the crawl's result: the first error, or the
    /// statistics of a clean run
    pub fn into_result(self) -> Result<CrawlStatistics, MirrorError> {
        match self.first_error {
            Some(error) => Err(error),
            None => Ok(self.stats),
        }
    }
}

/// Error bookkeeping of the driver loop
#[derive(Debug, Default)]
struct ErrorTally {
    first: Option<MirrorError>,
    count: usize,
    by_kind: BTreeMap<ErrorKind, usize>,
}

impl ErrorTally {
    /// Records an error; returns true if it was the first one
    fn record(&mut self, error: MirrorError) -> bool {
        self.count += 1;
        *self.by_kind.entry(error.kind()).or_insert(0) += 1;

        if error.is_terminal() {
            tracing::debug!("Crawl ended: {}", error);
        } else {
            tracing::warn!("Error processing URL: {}", error);
        }

        if self.first.is_none() {
            self.first = Some(error);
            true
        } else {
            false
        }
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    seed: Url,
    max_depth: u32,
    workers: usize,
    settings: SchedulerSettings,
    deadline: Duration,
    fail_fast: bool,
    policy: LinkPolicy,
    store: Arc<ResourceStore>,
    fetcher: Arc<dyn Fetcher>,
    scanner: Arc<dyn LinkScanner>,
    phase: CrawlPhase,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `seed` - The validated, canonical seed URL
    /// * `max_depth` - Link depth limit; 0 downloads only the seed
    /// * `config` - Crawler behavior settings
    /// * `store` - Where resources are recorded and written
    /// * `fetcher` - Network access
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(MirrorError)` - The seed's site boundary could not be determined
    pub fn new(
        seed: Url,
        max_depth: u32,
        config: &CrawlerConfig,
        store: Arc<ResourceStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, MirrorError> {
        let policy = LinkPolicy::for_seed(&seed, config.scope)?;

        Ok(Self {
            seed,
            max_depth,
            workers: config.workers.max(1),
            settings: SchedulerSettings {
                max_depth,
                queue_capacity: config.queue_capacity,
                error_buffer: config.error_buffer,
            },
            deadline: config.timeout(),
            fail_fast: config.fail_fast,
            policy,
            store,
            fetcher,
            scanner: Arc::new(HtmlLinkScanner::new()),
            phase: CrawlPhase::Running,
        })
    }

    /// Replaces the HTML link scanner
    pub fn with_scanner(mut self, scanner: Arc<dyn LinkScanner>) -> Self {
        self.scanner = scanner;
        self
    }

    /// Overrides the crawl deadline from the configuration
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Runs the crawl to completion
    ///
    /// Returns once every worker has exited. The crawl ends when all tasks
    /// are done, on the first error under fail-fast, when the deadline
    /// passes, or when `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) -> CrawlReport {
        let started = Instant::now();
        let token = cancel.child_token();

        tracing::info!(
            "Mirroring {} (max depth {}, {} workers, site {})",
            self.seed,
            self.max_depth,
            self.workers,
            self.policy.site_host()
        );

        let downloader = Downloader::new(self.store.clone(), self.fetcher.clone());
        let extractor = LinkExtractor::new(self.scanner.clone(), self.policy.clone());
        let (mut scheduler, mut errors) =
            Scheduler::new(downloader, extractor, self.settings, token.clone());

        let mut tally = ErrorTally::default();

        if let Err(e) = scheduler.seed(self.seed.clone()) {
            tally.record(e);
            token.cancel();
        }

        let mut all_done = scheduler.spawn_warden();
        scheduler.spawn_workers(self.workers);

        let deadline = tokio::time::sleep(self.deadline);
        tokio::pin!(deadline);

        if !token.is_cancelled() {
            loop {
                tokio::select! {
                    biased;
                    Some(error) = errors.recv() => {
                        if tally.record(error) && self.fail_fast {
                            tracing::info!("Cancelling crawl after first error");
                            self.transition(CrawlPhase::Draining);
                            break;
                        }
                    }
                    _ = cancel.cancelled() => {
                        tracing::info!("Crawl cancelled, draining workers");
                        tally.record_terminal(MirrorError::Cancelled);
                        self.transition(CrawlPhase::Draining);
                        break;
                    }
                    _ = &mut deadline => {
                        tracing::warn!("Crawl deadline of {:?} exceeded", self.deadline);
                        tally.record_terminal(MirrorError::DeadlineExceeded(self.deadline));
                        self.transition(CrawlPhase::Draining);
                        break;
                    }
                    result = &mut all_done => {
                        if result.is_ok() {
                            tracing::debug!("All tasks processed");
                        }
                        break;
                    }
                }
            }
        }

        // Settle: stop workers, then collect whatever they reported meanwhile
        token.cancel();
        scheduler.join().await;
        while let Ok(error) = errors.try_recv() {
            tally.record(error);
        }

        let stats = CrawlStatistics::from_counters(
            &scheduler.counters(),
            std::mem::take(&mut tally.by_kind),
            started.elapsed(),
        );
        // Releases tasks still sitting in the queue
        drop(scheduler);
        self.transition(CrawlPhase::Finished);

        if tally.count > 0 {
            tracing::info!("Completed with {} errors", tally.count);
        }
        tracing::info!(
            "Mirrored {} resources ({} bytes) in {:.2}s",
            stats.resources_saved,
            stats.bytes_downloaded,
            stats.elapsed.as_secs_f64()
        );

        CrawlReport {
            first_error: tally.first,
            error_count: tally.count,
            stats,
            phase: self.phase,
        }
    }

    fn transition(&mut self, next: CrawlPhase) {
        if self.phase.can_transition_to(next) {
            tracing::debug!("Crawl phase {} -> {}", self.phase, next);
            self.phase = next;
        }
    }
}

impl ErrorTally {
    /// Records a crawl-ending condition, unless an error came first
    fn record_terminal(&mut self, error: MirrorError) {
        if self.first.is_none() {
            self.record(error);
        }
    }
}

/// Mirrors a site into the configured directory
///
/// This is the main entry point for a crawl. It will:
/// 1. Validate and canonicalize the seed
/// 2. Open the mirror directory
/// 3. Build the HTTP client
/// 4. Run the coordinator until the crawl ends
///
/// # Arguments
///
/// * `seed` - The URL to start from
/// * `max_depth` - Link depth limit; 0 downloads only the seed
/// * `config` - The crawler configuration
/// * `cancel` - Cancels the crawl when fired
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The crawl ran; check `first_error` for its outcome
/// * `Err(MirrorError)` - The crawl could not start
pub async fn mirror(
    seed: &str,
    max_depth: u32,
    config: &Config,
    cancel: CancellationToken,
) -> Result<CrawlReport, MirrorError> {
    let seed = prepare_seed(seed)?;
    let store = Arc::new(ResourceStore::open(&config.output.mirror_dir)?);
    let fetcher = Arc::new(HttpFetcher::from_config(&config.fetch, &config.user_agent)?);

    let coordinator = Coordinator::new(seed, max_depth, &config.crawler, store, fetcher)?;
    Ok(coordinator.run(cancel).await)
}
