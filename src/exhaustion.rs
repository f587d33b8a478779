//! Exhaustion policies: what a caller experiences when nothing is available

use std::time::{Duration, Instant};

/// Behaviour of an acquisition that finds the pool empty and cannot allocate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExhaustionPolicy {
    /// Fail immediately with `PoolError::PoolExhausted`
    #[default]
    Raise,

    /// Wait for a release. `None` (or a zero timeout) waits indefinitely.
    Block { timeout: Option<Duration> },
}

impl ExhaustionPolicy {
    pub(crate) fn resolve(block_on_exhaustion: bool, default_timeout: Option<Duration>) -> Self {
        if block_on_exhaustion {
            ExhaustionPolicy::Block {
                timeout: default_timeout,
            }
        } else {
            ExhaustionPolicy::Raise
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, ExhaustionPolicy::Block { .. })
    }

    /// Wait plan for a call that does not name its own timeout
    pub(crate) fn plan(&self, start: Instant) -> WaitPlan {
        match self {
            ExhaustionPolicy::Raise => WaitPlan::Fail,
            ExhaustionPolicy::Block { timeout } => WaitPlan::block(*timeout, start),
        }
    }
}

/// How a single acquisition reacts to exhaustion, fixed at call entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitPlan {
    Fail,
    Forever,
    Until(Instant),
}

impl WaitPlan {
    /// Blocking plan for an explicit timeout; zero means no deadline
    pub fn block(timeout: Option<Duration>, start: Instant) -> Self {
        match timeout {
            None => WaitPlan::Forever,
            Some(timeout) if timeout.is_zero() => WaitPlan::Forever,
            Some(timeout) => match start.checked_add(timeout) {
                Some(deadline) => WaitPlan::Until(deadline),
                None => WaitPlan::Forever,
            },
        }
    }
}
