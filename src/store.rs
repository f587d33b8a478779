//! Idle resource storage

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// An idle resource together with the moment it was last returned
#[derive(Debug)]
pub(crate) struct IdleEntry<R> {
    pub resource: R,
    pub returned_at: Instant,
}

impl<R> IdleEntry<R> {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.returned_at)
    }
}

/// Idle resources ordered by return time.
///
/// The front holds the least recently returned entry, the back the most
/// recent one. Acquisition takes from the back (MRU), eviction from the front.
#[derive(Debug)]
pub(crate) struct SlotStore<R> {
    entries: VecDeque<IdleEntry<R>>,
}

impl<R> SlotStore<R> {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Seed the store so that `resources[0]` is the first one handed out
    pub fn seed(resources: Vec<R>, now: Instant) -> Self {
        let entries = resources
            .into_iter()
            .rev()
            .map(|resource| IdleEntry {
                resource,
                returned_at: now,
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, resource: R, returned_at: Instant) {
        self.entries.push_back(IdleEntry {
            resource,
            returned_at,
        });
    }

    /// Place a resource behind everything already stored so it is handed out last
    pub fn push_oldest(&mut self, resource: R, returned_at: Instant) {
        self.entries.push_front(IdleEntry {
            resource,
            returned_at,
        });
    }

    /// Take the most recently returned resource
    pub fn pop_newest(&mut self) -> Option<R> {
        self.entries.pop_back().map(|entry| entry.resource)
    }

    pub fn oldest(&self) -> Option<&IdleEntry<R>> {
        self.entries.front()
    }

    pub fn pop_oldest(&mut self) -> Option<R> {
        self.entries.pop_front().map(|entry| entry.resource)
    }

    /// Remove every entry, oldest first
    pub fn drain(&mut self) -> impl Iterator<Item = R> + '_ {
        self.entries.drain(..).map(|entry| entry.resource)
    }
}

impl<R> Default for SlotStore<R> {
    fn default() -> Self {
        Self::new()
    }
}
