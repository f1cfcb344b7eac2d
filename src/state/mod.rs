//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TaskState`: Tracks a single task through a worker (queued, fetching, extracting, ...)
//! - `CrawlPhase`: Tracks the whole run (running, draining, finished)

mod crawl_phase;
mod task_state;

// Re-export main types
pub use crawl_phase::CrawlPhase;
pub use task_state::TaskState;
