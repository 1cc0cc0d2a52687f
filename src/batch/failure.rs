/*!
 * Failure taxonomy for background batch chunks.
 *
 * A chunk failure always carries the targets that were already processed,
 * so a requeued chunk only redoes the remaining work. Whether the chunk is
 * requeued is decided by the failure kind:
 * - `FailureKind::Terminal`: the chunk is failed for good
 * - `FailureKind::Retryable`: the chunk is requeued with exponential backoff
 *   until the policy's retry budget is spent
 */

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

/// Exponential backoff settings attached to a retryable failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay before the first requeue, in milliseconds
    pub delay_ms: u64,
    /// Multiplier applied to the delay for every further requeue
    pub increase_factor: u32,
    /// Requeues allowed before the failure becomes terminal
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(100, 10, 3)
    }
}

impl RetryPolicy {
    pub fn new(delay_ms: u64, increase_factor: u32, max_retries: u32) -> Self {
        Self {
            delay_ms,
            increase_factor,
            max_retries,
        }
    }

    /// Delay for the 0-indexed requeue `attempt`, `None` once the budget is spent
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }

        let factor = (self.increase_factor as u64).saturating_pow(attempt);
        Some(Duration::from_millis(self.delay_ms.saturating_mul(factor)))
    }

    /// Every delay this policy will ever hand out, in milliseconds
    pub fn delays_ms(&self) -> Vec<u64> {
        (0..self.max_retries)
            .filter_map(|attempt| self.delay_for_attempt(attempt))
            .map(|delay| delay.as_millis() as u64)
            .collect()
    }
}

/// Whether a failed chunk may be requeued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Must not be retried
    Terminal,
    /// May be retried according to the policy
    Retryable(RetryPolicy),
}

/// What the scheduler should do with a chunk after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Requeue after `delay`; `attempt` is the 0-indexed requeue number
    Requeue { delay: Duration, attempt: u32 },
    /// Give up on the chunk
    Fail,
}

/// A classified failure of one batch chunk
#[derive(Error, Debug)]
#[error("Chunk failed ({} targets already processed): {cause}", .successful_targets.len())]
pub struct ChunkFailure {
    /// Targets (key ids) that completed before the failure
    pub successful_targets: Vec<i64>,
    /// The error that stopped the chunk
    #[source]
    pub cause: Box<dyn StdError + Send + Sync + 'static>,
    pub kind: FailureKind,
}

impl ChunkFailure {
    pub fn terminal(
        successful_targets: Vec<i64>,
        cause: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            successful_targets,
            cause: cause.into(),
            kind: FailureKind::Terminal,
        }
    }

    pub fn retryable(
        successful_targets: Vec<i64>,
        cause: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            successful_targets,
            cause: cause.into(),
            kind: FailureKind::Retryable(policy),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, FailureKind::Retryable(_))
    }

    /// Decide the outcome given how many times the chunk was already requeued
    pub fn decide(&self, retries_so_far: u32) -> RetryDecision {
        match self.kind {
            FailureKind::Terminal => RetryDecision::Fail,
            FailureKind::Retryable(policy) => match policy.delay_for_attempt(retries_so_far) {
                Some(delay) => RetryDecision::Requeue {
                    delay,
                    attempt: retries_so_far,
                },
                None => RetryDecision::Fail,
            },
        }
    }
}
