//! Scheduler for the crawl's task queue and worker pool
//!
//! This module handles:
//! - The bounded task queue shared by all workers
//! - Spawning workers and the idle warden
//! - Per-task processing: download, depth check, link extraction, enqueue
//! - Reporting task errors to the coordinator
//!
//! Links discovered while the queue is full are dropped and reported as
//! `QueueFull`; a worker never blocks on enqueue.

use crate::crawler::downloader::Downloader;
use crate::crawler::inflight::{InFlight, InFlightGuard};
use crate::crawler::parser::LinkExtractor;
use crate::state::TaskState;
use crate::url::canonical_key;
use crate::MirrorError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A URL waiting to be processed, at its distance from the seed
#[derive(Debug)]
pub struct Task {
    pub url: Url,
    pub depth: u32,
    _guard: InFlightGuard,
}

/// Running totals updated by the workers
#[derive(Debug, Default)]
pub struct CrawlCounters {
    pub resources_saved: AtomicUsize,
    pub cache_hits: AtomicUsize,
    pub bytes_downloaded: AtomicUsize,
    pub links_discovered: AtomicUsize,
    pub links_dropped: AtomicUsize,
    pub tasks_completed: AtomicUsize,
    pub tasks_failed: AtomicUsize,
}

impl CrawlCounters {
    fn bump(counter: &AtomicUsize, by: usize) {
        counter.fetch_add(by, Ordering::Relaxed);
    }
}

/// Queue and channel sizes of one crawl
#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    pub max_depth: u32,
    pub queue_capacity: usize,
    pub error_buffer: usize,
}

/// State shared by every worker
struct Shared {
    downloader: Downloader,
    extractor: LinkExtractor,
    queue_tx: mpsc::Sender<Task>,
    queue_rx: Mutex<mpsc::Receiver<Task>>,
    errors: mpsc::Sender<MirrorError>,
    in_flight: Arc<InFlight>,
    cancel: CancellationToken,
    max_depth: u32,
    counters: Arc<CrawlCounters>,
}

/// Owns the task queue and the worker pool
pub struct Scheduler {
    shared: Arc<Shared>,
    workers: JoinSet<()>,
}

impl Scheduler {
    /// Creates a scheduler and the receiving end of its error channel
    ///
    /// # Arguments
    ///
    /// * `downloader` - Download-or-reuse over the shared store
    /// * `extractor` - Link extraction under the crawl's site policy
    /// * `settings` - Depth limit and channel capacities
    /// * `cancel` - Token that stops every worker when cancelled
    pub fn new(
        downloader: Downloader,
        extractor: LinkExtractor,
        settings: SchedulerSettings,
        cancel: CancellationToken,
    ) -> (Self, mpsc::Receiver<MirrorError>) {
        let (queue_tx, queue_rx) = mpsc::channel(settings.queue_capacity.max(1));
        let (errors_tx, errors_rx) = mpsc::channel(settings.error_buffer.max(1));

        let shared = Arc::new(Shared {
            downloader,
            extractor,
            queue_tx,
            queue_rx: Mutex::new(queue_rx),
            errors: errors_tx,
            in_flight: InFlight::new(),
            cancel,
            max_depth: settings.max_depth,
            counters: Arc::new(CrawlCounters::default()),
        });

        (
            Self {
                shared,
                workers: JoinSet::new(),
            },
            errors_rx,
        )
    }

    /// Queues the seed at depth 0
    ///
    /// Must be called before the workers start so the in-flight counter is
    /// non-zero by the time anyone waits on it.
    pub fn seed(&self, url: Url) -> Result<(), MirrorError> {
        let task = Task {
            url,
            depth: 0,
            _guard: self.shared.in_flight.track(),
        };

        self.shared.queue_tx.try_send(task).map_err(|e| {
            let task = e.into_inner();
            MirrorError::QueueFull {
                url: task.url.to_string(),
            }
        })
    }

    /// Starts `count` workers
    pub fn spawn_workers(&mut self, count: usize) {
        for id in 0..count {
            let shared = self.shared.clone();
            self.workers.spawn(worker_loop(shared, id));
        }
        tracing::debug!("Spawned {} workers", count);
    }

    /// Starts the warden, which fires once every task has been processed
    ///
    /// The returned receiver never fires if the crawl is cancelled first.
    pub fn spawn_warden(&mut self) -> oneshot::Receiver<()> {
        let (done_tx, done_rx) = oneshot::channel();
        let in_flight = self.shared.in_flight.clone();
        let cancel = self.shared.cancel.clone();

        self.workers.spawn(async move {
            tokio::select! {
                _ = in_flight.wait_idle() => {
                    let _ = done_tx.send(());
                }
                _ = cancel.cancelled() => {}
            }
        });

        done_rx
    }

    /// The in-flight task counter
    pub fn in_flight(&self) -> &Arc<InFlight> {
        &self.shared.in_flight
    }

    pub fn counters(&self) -> Arc<CrawlCounters> {
        self.shared.counters.clone()
    }

    /// Waits for every worker and the warden to exit
    ///
    /// Only returns once the token has been cancelled or the queue closed.
    /// Dropping the scheduler afterwards releases the tasks still queued.
    pub async fn join(&mut self) {
        while let Some(result) = self.workers.join_next().await {
            if let Err(e) = result {
                tracing::warn!("Worker exited abnormally: {}", e);
            }
        }
    }
}

async fn worker_loop(shared: Arc<Shared>, id: usize) {
    tracing::trace!("Worker {} started", id);

    loop {
        let next = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => None,
            task = async { shared.queue_rx.lock().await.recv().await } => task,
        };

        match next {
            Some(task) => shared.process(task).await,
            None => break,
        }
    }

    tracing::trace!("Worker {} stopped", id);
}

impl Shared {
    /// Processes one task to completion
    ///
    /// The task's guard is held until this returns, which is after every
    /// child has been tracked or dropped.
    async fn process(&self, task: Task) {
        let mut state = TaskState::Queued;
        advance(&task, &mut state, TaskState::Fetching);

        let download = match self.downloader.download(&task.url, &self.cancel).await {
            Ok(download) => download,
            Err(e) => {
                self.fail(&task, &mut state, e).await;
                return;
            }
        };

        if download.from_cache {
            CrawlCounters::bump(&self.counters.cache_hits, 1);
            self.finish(&task, &mut state);
            return;
        }

        let resource = download.resource;
        CrawlCounters::bump(&self.counters.resources_saved, 1);
        CrawlCounters::bump(&self.counters.bytes_downloaded, resource.size());

        if task.depth >= self.max_depth || !resource.is_html {
            self.finish(&task, &mut state);
            return;
        }

        advance(&task, &mut state, TaskState::Extracting);
        let links = match self.extractor.extract(&resource.content, &resource.url) {
            Ok(links) => links,
            Err(e) => {
                self.fail(&task, &mut state, e).await;
                return;
            }
        };

        self.downloader
            .store()
            .record_links(&resource.key(), links.iter().map(canonical_key).collect());
        CrawlCounters::bump(&self.counters.links_discovered, links.len());

        advance(&task, &mut state, TaskState::Enqueuing);
        for link in links {
            let child = Task {
                url: link,
                depth: task.depth + 1,
                _guard: self.in_flight.track(),
            };

            // The receiver lives as long as `self`, so the queue never closes
            if let Err(TrySendError::Full(child)) = self.queue_tx.try_send(child) {
                let url = child.url.to_string();
                drop(child);
                CrawlCounters::bump(&self.counters.links_dropped, 1);
                tracing::warn!("Queue full, skipping URL: {}", url);
                self.report(MirrorError::QueueFull { url }).await;
            }
        }

        self.finish(&task, &mut state);
    }

    fn finish(&self, task: &Task, state: &mut TaskState) {
        advance(task, state, TaskState::Done);
        CrawlCounters::bump(&self.counters.tasks_completed, 1);
    }

    async fn fail(&self, task: &Task, state: &mut TaskState, error: MirrorError) {
        advance(task, state, TaskState::Failed);
        CrawlCounters::bump(&self.counters.tasks_failed, 1);

        // The coordinator already knows about its own cancellation
        if matches!(error, MirrorError::Cancelled) {
            return;
        }

        tracing::debug!("Task {} failed: {}", task.url, error);
        self.report(error).await;
    }

    /// Sends an error to the coordinator unless the crawl is shutting down
    async fn report(&self, error: MirrorError) {
        if self.cancel.is_cancelled() {
            tracing::debug!("Dropping error after cancellation: {}", error);
            return;
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {}
            result = self.errors.send(error) => {
                if let Err(e) = result {
                    tracing::debug!("Error channel closed: {}", e.0);
                }
            }
        }
    }
}

fn advance(task: &Task, state: &mut TaskState, next: TaskState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal task transition {} -> {}",
        state,
        next
    );
    tracing::trace!("[depth {}] {} {} -> {}", task.depth, task.url, state, next);
    *state = next;
}
