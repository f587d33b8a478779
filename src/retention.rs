//! Retention policies deciding which idle resources are evicted

use crate::store::SlotStore;

use std::time::{Duration, Instant};

/// Retention policy for idle resources
///
/// Eviction only ever touches idle resources and always removes the least
/// recently returned ones first.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{PoolConfiguration, ResourcePool, RetentionPolicy};
///
/// let config = PoolConfiguration::new()
///     .with_factory(|| 0u32)
///     .with_max_idle_size(10)
///     .with_min_idle_size(2);
///
/// let pool = ResourcePool::new(Vec::new(), config).unwrap();
/// assert_eq!(
///     pool.retention_policy(),
///     RetentionPolicy::Sized { max_idle_size: 10, min_idle_size: 2 }
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// Keep idle resources for the pool's lifetime
    #[default]
    Indefinite,

    /// Evict idle resources not returned within `max_idle_age`
    Timed {
        max_idle_age: Duration,
        min_idle_size: usize,
    },

    /// Once the store grows past `max_idle_size`, shrink it to `min_idle_size`
    Sized {
        max_idle_size: usize,
        min_idle_size: usize,
    },

    /// Size sweep followed by an age sweep, both bounded by `min_idle_size`.
    ///
    /// Without a `min_idle_size` the size sweep trims back to `max_idle_size`
    /// and the age sweep may empty the store.
    Combined {
        max_idle_age: Duration,
        max_idle_size: usize,
        min_idle_size: Option<usize>,
    },
}

impl RetentionPolicy {
    pub(crate) fn resolve(
        max_idle_size: Option<usize>,
        min_idle_size: Option<usize>,
        max_idle_age: Option<Duration>,
    ) -> Self {
        match (max_idle_size, max_idle_age) {
            (None, None) => RetentionPolicy::Indefinite,
            (None, Some(max_idle_age)) => RetentionPolicy::Timed {
                max_idle_age,
                min_idle_size: min_idle_size.unwrap_or(0),
            },
            (Some(max_idle_size), None) => RetentionPolicy::Sized {
                max_idle_size,
                min_idle_size: min_idle_size.unwrap_or(max_idle_size),
            },
            (Some(max_idle_size), Some(max_idle_age)) => RetentionPolicy::Combined {
                max_idle_age,
                max_idle_size,
                min_idle_size,
            },
        }
    }

    pub fn is_indefinite(&self) -> bool {
        matches!(self, RetentionPolicy::Indefinite)
    }

    /// Lower bound on the idle count that eviction respects
    pub fn min_idle_size(&self) -> usize {
        match self {
            RetentionPolicy::Indefinite => 0,
            RetentionPolicy::Timed { min_idle_size, .. }
            | RetentionPolicy::Sized { min_idle_size, .. } => *min_idle_size,
            RetentionPolicy::Combined { min_idle_size, .. } => min_idle_size.unwrap_or(0),
        }
    }

    /// Remove the resources this policy no longer retains, oldest first
    pub(crate) fn sweep<R>(&self, store: &mut SlotStore<R>, now: Instant) -> Vec<R> {
        let mut evicted = Vec::new();

        match *self {
            RetentionPolicy::Indefinite => {}
            RetentionPolicy::Timed {
                max_idle_age,
                min_idle_size,
            } => {
                evict_expired(store, now, max_idle_age, min_idle_size, &mut evicted);
            }
            RetentionPolicy::Sized {
                max_idle_size,
                min_idle_size,
            } => {
                evict_surplus(store, max_idle_size, min_idle_size, &mut evicted);
            }
            RetentionPolicy::Combined {
                max_idle_age,
                max_idle_size,
                min_idle_size,
            } => {
                let target = min_idle_size.unwrap_or(max_idle_size);
                evict_surplus(store, max_idle_size, target, &mut evicted);
                evict_expired(store, now, max_idle_age, min_idle_size.unwrap_or(0), &mut evicted);
            }
        }

        evicted
    }
}

fn evict_surplus<R>(
    store: &mut SlotStore<R>,
    max_idle_size: usize,
    min_idle_size: usize,
    evicted: &mut Vec<R>,
) {
    if store.len() <= max_idle_size {
        return;
    }

    while store.len() > min_idle_size {
        match store.pop_oldest() {
            Some(resource) => evicted.push(resource),
            None => break,
        }
    }
}

// Entries are ordered by return time, so once the oldest is young enough
// every other entry is too.
fn evict_expired<R>(
    store: &mut SlotStore<R>,
    now: Instant,
    max_idle_age: Duration,
    min_idle_size: usize,
    evicted: &mut Vec<R>,
) {
    while store.len() > min_idle_size {
        let expired = store
            .oldest()
            .is_some_and(|entry| entry.age(now) > max_idle_age);
        if !expired {
            break;
        }
        if let Some(resource) = store.pop_oldest() {
            evicted.push(resource);
        }
    }
}
