/// Global phase of a crawl run
use std::fmt;

/// Represents where a crawl run is in its lifecycle
///
/// `Running` accepts and produces new tasks. `Draining` is entered when
/// cancellation has been requested (first error under fail-fast, deadline,
/// or an external signal): no new work is picked up and in-flight tasks are
/// allowed to settle. `Finished` is reached once all workers have exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CrawlPhase {
    #[default]
    Running,
    Draining,
    Finished,
}

impl CrawlPhase {
    /// Returns true if moving from `self` to `next` is a legal step
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::Running, Self::Draining)
                | (Self::Running, Self::Finished)
                | (Self::Draining, Self::Finished)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
