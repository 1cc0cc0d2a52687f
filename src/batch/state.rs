use std::time::Duration;

use super::failure::{ChunkFailure, RetryDecision};

/// Lifecycle of one batch chunk as seen by the scheduler
///
/// `Running -> Done` on success, `Running -> Failed` on a terminal failure,
/// `Running -> Pending(delay) -> Running` on a retryable failure while the
/// retry budget lasts, and `Running -> Failed` once it is spent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkState {
    /// Being processed; `retries` requeues happened before this run
    Running { retries: u32 },
    /// Waiting to be picked up again after `delay`
    Pending { retries: u32, delay: Duration },
    Done,
    Failed { reason: String },
}

impl Default for ChunkState {
    fn default() -> Self {
        ChunkState::Running { retries: 0 }
    }
}

impl ChunkState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The chunk finished all of its targets
    pub fn succeed(self) -> Self {
        match self {
            ChunkState::Running { .. } => ChunkState::Done,
            other => other,
        }
    }

    /// Apply a classified failure to a running chunk
    pub fn fail(self, failure: &ChunkFailure) -> Self {
        let retries = match self {
            ChunkState::Running { retries } => retries,
            other => return other,
        };

        match failure.decide(retries) {
            RetryDecision::Requeue { delay, .. } => ChunkState::Pending {
                retries: retries + 1,
                delay,
            },
            RetryDecision::Fail => ChunkState::Failed {
                reason: failure.to_string(),
            },
        }
    }

    /// The scheduler picked the chunk up again after its delay
    pub fn resume(self) -> Self {
        match self {
            ChunkState::Pending { retries, .. } => ChunkState::Running { retries },
            other => other,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, ChunkState::Done | ChunkState::Failed { .. })
    }

    /// Delay the scheduler must wait before resuming, if pending
    pub fn pending_delay(&self) -> Option<Duration> {
        match self {
            ChunkState::Pending { delay, .. } => Some(*delay),
            _ => None,
        }
    }
}
