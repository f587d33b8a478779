//! Pool configuration options

use crate::allocation::AllocationPolicy;
use crate::errors::{PoolError, PoolResult};
use crate::exhaustion::ExhaustionPolicy;
use crate::lifecycle::{Allocator, AlwaysAlive, Deallocator, DropDeallocator, LivenessCheck};
use crate::retention::RetentionPolicy;

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for resource pool behavior
///
/// Everything is optional. Without an allocator the pool is fixed to its
/// initial resources; without thresholds idle resources are kept forever.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::PoolConfiguration;
/// use std::time::Duration;
///
/// let config = PoolConfiguration::<Vec<u8>>::new()
///     .with_factory(|| Vec::with_capacity(4096))
///     .with_max_total_size(32)
///     .with_max_idle_size(8)
///     .with_min_idle_size(2)
///     .with_max_idle_age(Duration::from_secs(300))
///     .with_blocking(Some(Duration::from_secs(5)));
///
/// assert_eq!(config.max_total_size, Some(32));
/// assert!(config.block_on_exhaustion);
/// ```
pub struct PoolConfiguration<R> {
    /// Creates resources when the idle store is empty
    pub allocator: Option<Arc<dyn Allocator<R>>>,

    /// Tears down evicted or dead resources
    pub deallocator: Arc<dyn Deallocator<R>>,

    /// Checked on every idle resource before it is handed out
    pub liveness_check: Arc<dyn LivenessCheck<R>>,

    /// Ceiling on idle + outstanding resources
    pub max_total_size: Option<usize>,

    /// Idle count above which a release shrinks the store
    pub max_idle_size: Option<usize>,

    /// Idle count the store is shrunk to, and the floor for age-based eviction
    pub min_idle_size: Option<usize>,

    /// Idle resources not returned within this duration are evicted on release
    pub max_idle_age: Option<Duration>,

    /// Block instead of failing when the pool is exhausted
    pub block_on_exhaustion: bool,

    /// Timeout for blocking acquisitions that do not pass their own
    pub default_timeout: Option<Duration>,
}

impl<R> Default for PoolConfiguration<R> {
    fn default() -> Self {
        Self {
            allocator: None,
            deallocator: Arc::new(DropDeallocator),
            liveness_check: Arc::new(AlwaysAlive),
            max_total_size: None,
            max_idle_size: None,
            min_idle_size: None,
            max_idle_age: None,
            block_on_exhaustion: false,
            default_timeout: None,
        }
    }
}

impl<R> Clone for PoolConfiguration<R> {
    fn clone(&self) -> Self {
        Self {
            allocator: self.allocator.clone(),
            deallocator: Arc::clone(&self.deallocator),
            liveness_check: Arc::clone(&self.liveness_check),
            max_total_size: self.max_total_size,
            max_idle_size: self.max_idle_size,
            min_idle_size: self.min_idle_size,
            max_idle_age: self.max_idle_age,
            block_on_exhaustion: self.block_on_exhaustion,
            default_timeout: self.default_timeout,
        }
    }
}

impl<R> fmt::Debug for PoolConfiguration<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfiguration")
            .field("allocator", &self.allocator.is_some())
            .field("max_total_size", &self.max_total_size)
            .field("max_idle_size", &self.max_idle_size)
            .field("min_idle_size", &self.min_idle_size)
            .field("max_idle_age", &self.max_idle_age)
            .field("block_on_exhaustion", &self.block_on_exhaustion)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

impl<R: 'static> PoolConfiguration<R> {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a fallible allocator
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_resourcepool::PoolConfiguration;
    /// use std::net::SocketAddr;
    ///
    /// let config = PoolConfiguration::<SocketAddr>::new()
    ///     .with_allocator(|| "127.0.0.1:80".parse::<SocketAddr>());
    ///
    /// assert!(config.allocator.is_some());
    /// ```
    pub fn with_allocator<A>(mut self, allocator: A) -> Self
    where
        A: Allocator<R> + 'static,
    {
        self.allocator = Some(Arc::new(allocator));
        self
    }

    /// Set an allocator that cannot fail
    pub fn with_factory<F>(self, factory: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
    {
        self.with_allocator(move || Ok::<R, Infallible>(factory()))
    }

    /// Set a fallible deallocator. Its failures are logged, never returned.
    pub fn with_deallocator<D>(mut self, deallocator: D) -> Self
    where
        D: Deallocator<R> + 'static,
    {
        self.deallocator = Arc::new(deallocator);
        self
    }

    /// Set a teardown function that cannot fail
    pub fn with_teardown<F>(self, teardown: F) -> Self
    where
        F: Fn(R) + Send + Sync + 'static,
    {
        self.with_deallocator(move |resource: R| {
            teardown(resource);
            Ok::<(), Infallible>(())
        })
    }

    /// Set the liveness check run before a pooled resource is handed out
    pub fn with_liveness_check<L>(mut self, check: L) -> Self
    where
        L: LivenessCheck<R> + 'static,
    {
        self.liveness_check = Arc::new(check);
        self
    }

    /// Set the ceiling on idle + outstanding resources
    pub fn with_max_total_size(mut self, size: usize) -> Self {
        self.max_total_size = Some(size);
        self
    }

    /// Set the idle count above which a release shrinks the store
    pub fn with_max_idle_size(mut self, size: usize) -> Self {
        self.max_idle_size = Some(size);
        self
    }

    /// Set the idle floor for eviction and pre-population
    pub fn with_min_idle_size(mut self, size: usize) -> Self {
        self.min_idle_size = Some(size);
        self
    }

    /// Set both idle thresholds at once
    pub fn with_idle_size(self, min: usize, max: usize) -> Self {
        self.with_min_idle_size(min).with_max_idle_size(max)
    }

    /// Evict idle resources not returned within `age`
    pub fn with_max_idle_age(mut self, age: Duration) -> Self {
        self.max_idle_age = Some(age);
        self
    }

    /// Block on exhaustion, optionally bounded by a default timeout
    ///
    /// A zero timeout blocks indefinitely.
    pub fn with_blocking(mut self, default_timeout: Option<Duration>) -> Self {
        self.block_on_exhaustion = true;
        self.default_timeout = default_timeout;
        self
    }
}

impl<R> PoolConfiguration<R> {
    pub fn allocation_policy(&self) -> AllocationPolicy {
        AllocationPolicy::resolve(self.allocator.is_some(), self.max_total_size)
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy::resolve(self.max_idle_size, self.min_idle_size, self.max_idle_age)
    }

    pub fn exhaustion_policy(&self) -> ExhaustionPolicy {
        ExhaustionPolicy::resolve(self.block_on_exhaustion, self.default_timeout)
    }

    /// Reject combinations the pool cannot honour
    pub(crate) fn validate(&self, initial_count: usize) -> PoolResult<()> {
        if self.allocation_policy().is_fixed()
            && (self.max_idle_size.is_some()
                || self.min_idle_size.is_some()
                || self.max_idle_age.is_some())
        {
            return Err(PoolError::configuration(
                "a fixed pool keeps its resources indefinitely; idle size and age limits need an allocator",
            ));
        }

        if let (Some(min), Some(max)) = (self.min_idle_size, self.max_idle_size)
            && min > max
        {
            return Err(PoolError::configuration(format!(
                "min_idle_size ({min}) exceeds max_idle_size ({max})"
            )));
        }

        if self.max_idle_age.is_some_and(|age| age.is_zero()) {
            return Err(PoolError::configuration("max_idle_age must be greater than zero"));
        }

        if let Some(max_total) = self.max_total_size
            && self.allocator.is_some()
            && max_total > 0
        {
            if initial_count > max_total {
                return Err(PoolError::configuration(format!(
                    "{initial_count} initial resources exceed max_total_size ({max_total})"
                )));
            }
            if let Some(min) = self.min_idle_size
                && min > max_total
            {
                return Err(PoolError::configuration(format!(
                    "min_idle_size ({min}) exceeds max_total_size ({max_total})"
                )));
            }
        }

        Ok(())
    }
}
