//! Core resource pool implementation

use crate::allocation::{Allocation, AllocationPolicy, AllocationStrategy};
use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};
use crate::exhaustion::{ExhaustionPolicy, WaitPlan};
use crate::health::HealthStatus;
use crate::lifecycle::{Deallocator, LivenessCheck};
use crate::metrics::{MetricsTracker, PoolMetrics};
use crate::retention::RetentionPolicy;
use crate::store::SlotStore;

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// A pooled resource that is released back to the pool when dropped
pub struct PooledResource<R> {
    resource: Option<R>,
    pool: Arc<Shared<R>>,
}

impl<R> PooledResource<R> {
    fn new(resource: R, pool: Arc<Shared<R>>) -> Self {
        Self {
            resource: Some(resource),
            pool,
        }
    }

    /// Take the resource out of the guard without releasing it.
    ///
    /// The pool still counts it as outstanding; hand it back with
    /// [`ResourcePool::release`] when done.
    pub fn detach(mut self) -> R {
        self.resource.take().expect("Resource already taken")
    }
}

impl<R> Deref for PooledResource<R> {
    type Target = R;

    fn deref(&self) -> &Self::Target {
        self.resource.as_ref().expect("Resource already taken")
    }
}

impl<R> DerefMut for PooledResource<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.resource.as_mut().expect("Resource already taken")
    }
}

impl<R> Drop for PooledResource<R> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            self.pool.release(resource);
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for PooledResource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PooledResource").field(&self.resource).finish()
    }
}

struct PoolState<R> {
    idle: SlotStore<R>,
    outstanding: usize,
}

impl<R> PoolState<R> {
    fn total(&self) -> usize {
        self.idle.len() + self.outstanding
    }
}

/// State shared by every pool handle and outstanding guard.
///
/// `state` is the single synchronization domain; allocator, deallocator
/// and liveness callbacks all run while it is held.
struct Shared<R> {
    state: Mutex<PoolState<R>>,
    available: Condvar,
    available_async: Notify,
    allocation: AllocationStrategy<R>,
    retention: RetentionPolicy,
    exhaustion: ExhaustionPolicy,
    deallocator: Arc<dyn Deallocator<R>>,
    liveness: Arc<dyn LivenessCheck<R>>,
    metrics: MetricsTracker,
}

impl<R> Shared<R> {
    /// Hand out an idle or freshly allocated resource, `None` when exhausted
    fn try_take(&self, state: &mut PoolState<R>) -> PoolResult<Option<R>> {
        while let Some(resource) = state.idle.pop_newest() {
            if self.is_alive(&resource) {
                state.outstanding += 1;
                MetricsTracker::incr(&self.metrics.acquired);
                tracing::trace!(
                    idle = state.idle.len(),
                    outstanding = state.outstanding,
                    "Acquired pooled resource"
                );
                return Ok(Some(resource));
            }

            MetricsTracker::incr(&self.metrics.dead_discarded);
            tracing::debug!(
                idle = state.idle.len(),
                "Discarding resource that failed its liveness check"
            );
            self.deallocate(resource);
        }

        match self.allocation.try_allocate(state.total()) {
            Allocation::Created(resource) => {
                state.outstanding += 1;
                MetricsTracker::incr(&self.metrics.allocated);
                MetricsTracker::incr(&self.metrics.acquired);
                Ok(Some(resource))
            }
            Allocation::Failed(err) => {
                MetricsTracker::incr(&self.metrics.allocation_failures);
                Err(PoolError::AllocationFailed(err))
            }
            Allocation::CeilingReached | Allocation::NoAllocator => Ok(None),
        }
    }

    fn acquire_blocking(&self, plan: WaitPlan) -> PoolResult<R> {
        let mut state = self.state.lock();

        loop {
            if let Some(resource) = self.try_take(&mut state)? {
                return Ok(resource);
            }

            match plan {
                WaitPlan::Fail => return Err(self.exhausted(false)),
                WaitPlan::Forever => self.available.wait(&mut state),
                WaitPlan::Until(deadline) => {
                    if self.available.wait_until(&mut state, deadline).timed_out() {
                        // a release racing the deadline is still claimed here
                        return match self.try_take(&mut state)? {
                            Some(resource) => Ok(resource),
                            None => Err(self.exhausted(true)),
                        };
                    }
                }
            }
        }
    }

    async fn acquire_async(&self, plan: WaitPlan) -> PoolResult<R> {
        loop {
            let notified = self.available_async.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if let Some(resource) = self.try_take(&mut state)? {
                    return Ok(resource);
                }
            }

            match plan {
                WaitPlan::Fail => return Err(self.exhausted(false)),
                WaitPlan::Forever => notified.await,
                WaitPlan::Until(deadline) => {
                    let deadline = tokio::time::Instant::from_std(deadline);
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        let mut state = self.state.lock();
                        return match self.try_take(&mut state)? {
                            Some(resource) => Ok(resource),
                            None => Err(self.exhausted(true)),
                        };
                    }
                }
            }
        }
    }

    fn release(&self, resource: R) {
        let now = Instant::now();
        let mut state = self.state.lock();

        state.outstanding = state.outstanding.saturating_sub(1);
        state.idle.push(resource, now);
        MetricsTracker::incr(&self.metrics.released);
        tracing::trace!(
            idle = state.idle.len(),
            outstanding = state.outstanding,
            "Released resource"
        );

        self.evict(&mut state, now);
        drop(state);

        self.available.notify_all();
        self.available_async.notify_waiters();
    }

    fn evict(&self, state: &mut PoolState<R>, now: Instant) -> usize {
        let evicted = self.retention.sweep(&mut state.idle, now);
        let count = evicted.len();
        if count > 0 {
            MetricsTracker::add(&self.metrics.evicted, count);
            tracing::debug!(evicted = count, idle = state.idle.len(), "Evicted idle resources");
        }
        for resource in evicted {
            self.deallocate(resource);
        }
        count
    }

    /// A panicking liveness check counts as a failed one
    fn is_alive(&self, resource: &R) -> bool {
        let liveness = &self.liveness;
        panic::catch_unwind(AssertUnwindSafe(|| liveness.is_alive(resource))).unwrap_or_else(
            |_| {
                tracing::warn!("Liveness check panicked, treating resource as dead");
                false
            },
        )
    }

    /// Run the deallocator, swallowing failures and panics
    fn deallocate(&self, resource: R) {
        let deallocator = &self.deallocator;
        match panic::catch_unwind(AssertUnwindSafe(move || deallocator.deallocate(resource))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                MetricsTracker::incr(&self.metrics.deallocation_failures);
                tracing::warn!(error = %err, "Failed to deallocate resource");
            }
            Err(_) => {
                MetricsTracker::incr(&self.metrics.deallocation_failures);
                tracing::warn!("Deallocator panicked, resource dropped");
            }
        }
    }

    fn exhausted(&self, waited: bool) -> PoolError {
        MetricsTracker::incr(&self.metrics.exhausted);
        if waited {
            tracing::warn!("Timed out waiting for a pooled resource");
        } else {
            tracing::debug!("Pool exhausted");
        }
        PoolError::PoolExhausted
    }

    fn capacity(&self, state: &PoolState<R>) -> Option<usize> {
        match self.allocation.policy() {
            AllocationPolicy::Fixed => Some(state.total()),
            AllocationPolicy::Bounded { max_total_size } => Some(max_total_size),
            AllocationPolicy::Unbounded => None,
        }
    }
}

impl<R> Drop for Shared<R> {
    fn drop(&mut self) {
        let idle: Vec<R> = self.state.get_mut().idle.drain().collect();
        if !idle.is_empty() {
            tracing::debug!(count = idle.len(), "Deallocating idle resources on teardown");
        }
        for resource in idle {
            self.deallocate(resource);
        }
    }
}

/// Thread-safe resource pool
///
/// The pool is a cheap, cloneable handle; every clone refers to the same
/// resources. Idle resources are deallocated once the last handle and the
/// last outstanding [`PooledResource`] are gone.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{PoolConfiguration, ResourcePool};
///
/// let pool = ResourcePool::new(Vec::new(), PoolConfiguration::new().with_factory(|| vec![0u8; 16]))
///     .unwrap();
/// {
///     let mut buf = pool.scoped().unwrap();
///     buf[0] = 1;
/// }
/// assert_eq!(pool.len(), 1);
/// assert_eq!(pool.acquire().unwrap()[0], 1);
/// ```
pub struct ResourcePool<R> {
    shared: Arc<Shared<R>>,
}

impl<R> Clone for ResourcePool<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R> fmt::Debug for ResourcePool<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ResourcePool")
            .field("idle", &state.idle.len())
            .field("outstanding", &state.outstanding)
            .field("allocation", &self.shared.allocation.policy())
            .field("retention", &self.shared.retention)
            .field("exhaustion", &self.shared.exhaustion)
            .finish()
    }
}

impl<R> ResourcePool<R> {
    /// Create a pool seeded with `initial` resources.
    ///
    /// The first element of `initial` is the first one handed out. With an
    /// allocator and a `min_idle_size`, the store is topped up to that size
    /// before the pool is returned.
    pub fn new(initial: Vec<R>, config: PoolConfiguration<R>) -> PoolResult<Self> {
        config.validate(initial.len())?;

        let now = Instant::now();
        let retention = config.retention_policy();
        let exhaustion = config.exhaustion_policy();
        let min_idle_size = config.min_idle_size.unwrap_or(0);

        let pool = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState {
                    idle: SlotStore::seed(initial, now),
                    outstanding: 0,
                }),
                available: Condvar::new(),
                available_async: Notify::new(),
                allocation: AllocationStrategy::new(config.allocator, config.max_total_size),
                retention,
                exhaustion,
                deallocator: config.deallocator,
                liveness: config.liveness_check,
                metrics: MetricsTracker::new(),
            }),
        };

        pool.prepopulate(min_idle_size, now)?;

        tracing::debug!(
            idle = pool.len(),
            allocation = ?pool.allocation_policy(),
            retention = ?retention,
            exhaustion = ?exhaustion,
            "Created resource pool"
        );
        Ok(pool)
    }

    fn prepopulate(&self, min_idle_size: usize, now: Instant) -> PoolResult<()> {
        let shared = &self.shared;
        let mut state = shared.state.lock();

        while state.idle.len() < min_idle_size {
            match shared.allocation.try_allocate(state.total()) {
                Allocation::Created(resource) => {
                    MetricsTracker::incr(&shared.metrics.allocated);
                    state.idle.push_oldest(resource, now);
                }
                Allocation::Failed(err) => {
                    MetricsTracker::incr(&shared.metrics.allocation_failures);
                    return Err(PoolError::AllocationFailed(err));
                }
                Allocation::CeilingReached | Allocation::NoAllocator => break,
            }
        }
        Ok(())
    }

    /// Acquire a resource following the configured exhaustion policy.
    ///
    /// The caller owns the returned resource and should hand it back with
    /// [`release`](Self::release).
    pub fn acquire(&self) -> PoolResult<R> {
        let plan = self.shared.exhaustion.plan(Instant::now());
        self.shared.acquire_blocking(plan)
    }

    /// Acquire a resource, waiting up to `timeout` when the pool is exhausted.
    ///
    /// Waits regardless of the configured exhaustion policy. A zero timeout
    /// waits indefinitely.
    pub fn acquire_timeout(&self, timeout: Duration) -> PoolResult<R> {
        self.shared
            .acquire_blocking(WaitPlan::block(Some(timeout), Instant::now()))
    }

    /// Acquire a resource without ever waiting
    pub fn try_acquire(&self) -> PoolResult<R> {
        self.shared.acquire_blocking(WaitPlan::Fail)
    }

    /// Acquire a resource without blocking the async runtime.
    ///
    /// `Some(timeout)` always waits (zero meaning indefinitely); `None`
    /// follows the configured exhaustion policy. Dropping the future stops
    /// the wait.
    pub async fn acquire_async(&self, timeout: Option<Duration>) -> PoolResult<R> {
        let now = Instant::now();
        let plan = match timeout {
            Some(timeout) => WaitPlan::block(Some(timeout), now),
            None => self.shared.exhaustion.plan(now),
        };
        self.shared.acquire_async(plan).await
    }

    /// Return a resource to the pool. Never fails.
    ///
    /// The resource becomes the next one handed out, unless the retention
    /// policy evicts it first.
    pub fn release(&self, resource: R) {
        self.shared.release(resource);
    }

    /// Acquire a resource that is released automatically when dropped
    pub fn scoped(&self) -> PoolResult<PooledResource<R>> {
        self.acquire().map(|resource| self.guard(resource))
    }

    /// Like [`scoped`](Self::scoped), waiting up to `timeout`
    pub fn scoped_timeout(&self, timeout: Duration) -> PoolResult<PooledResource<R>> {
        self.acquire_timeout(timeout)
            .map(|resource| self.guard(resource))
    }

    /// Async counterpart of [`scoped`](Self::scoped)
    pub async fn scoped_async(&self, timeout: Option<Duration>) -> PoolResult<PooledResource<R>> {
        self.acquire_async(timeout)
            .await
            .map(|resource| self.guard(resource))
    }

    fn guard(&self, resource: R) -> PooledResource<R> {
        PooledResource::new(resource, Arc::clone(&self.shared))
    }

    /// Apply the retention policy now, returning how many resources were evicted
    pub fn sweep(&self) -> usize {
        let mut state = self.shared.state.lock();
        let evicted = self.shared.evict(&mut state, Instant::now());
        drop(state);

        // freed capacity lets bounded waiters allocate
        if evicted > 0 {
            self.shared.available.notify_all();
            self.shared.available_async.notify_waiters();
        }
        evicted
    }

    /// Number of idle resources
    pub fn len(&self) -> usize {
        self.shared.state.lock().idle.len()
    }

    /// Whether the store holds no idle resources
    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().idle.is_empty()
    }

    /// Number of resources currently checked out
    pub fn outstanding(&self) -> usize {
        self.shared.state.lock().outstanding
    }

    pub fn allocation_policy(&self) -> AllocationPolicy {
        self.shared.allocation.policy()
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        self.shared.retention
    }

    pub fn exhaustion_policy(&self) -> ExhaustionPolicy {
        self.shared.exhaustion
    }

    /// Get pool metrics
    pub fn metrics(&self) -> PoolMetrics {
        let state = self.shared.state.lock();
        let capacity = self.shared.capacity(&state);
        self.shared
            .metrics
            .snapshot(state.idle.len(), state.outstanding, capacity)
    }

    /// Get health status
    pub fn health(&self) -> HealthStatus {
        let state = self.shared.state.lock();
        HealthStatus::new(
            state.idle.len(),
            state.outstanding,
            self.shared.capacity(&state),
        )
    }
}
