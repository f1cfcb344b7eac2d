/// Task state definitions for tracking a single crawl task
///
/// A task is one `(url, depth)` pair taken from the queue by a worker.
use std::fmt;

/// Represents the current state of a task in a worker
///
/// ```text
/// Queued -> Fetching -> Extracting -> Enqueuing -> Done
///                   \-> Done   (cache hit, depth limit, non-HTML)
///           any active state -> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    // ===== Active States =====
    /// Task is waiting in the queue
    Queued,

    /// Task is being downloaded (or served from the store)
    Fetching,

    /// Links are being extracted from the downloaded document
    Extracting,

    /// Child tasks are being pushed onto the queue
    Enqueuing,

    // ===== Terminal States =====
    /// Task finished; any children have been accounted for
    Done,

    /// Task failed; the error was reported
    Failed,
}

impl TaskState {
    /// Returns true if no further processing will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if the task is still being processed or waiting
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if moving from `self` to `next` is a legal step
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::*;

        match (self, next) {
            (Queued, Fetching) => true,
            (Fetching, Extracting) | (Fetching, Done) => true,
            (Extracting, Enqueuing) | (Extracting, Done) => true,
            (Enqueuing, Done) => true,
            (state, Failed) => state.is_active(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Enqueuing => "enqueuing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible task states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Queued,
            Self::Fetching,
            Self::Extracting,
            Self::Enqueuing,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
