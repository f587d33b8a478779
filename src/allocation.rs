//! Allocation policies deciding when new resources may be created

use crate::errors::BoxError;
use crate::lifecycle::Allocator;

use std::fmt;
use std::sync::Arc;

/// How a pool obtains resources beyond its idle store
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{AllocationPolicy, PoolConfiguration, ResourcePool};
///
/// let fixed = ResourcePool::new(vec![1, 2, 3], PoolConfiguration::new()).unwrap();
/// assert_eq!(fixed.allocation_policy(), AllocationPolicy::Fixed);
///
/// let bounded = ResourcePool::new(
///     Vec::new(),
///     PoolConfiguration::new().with_factory(|| 0u8).with_max_total_size(4),
/// )
/// .unwrap();
/// assert_eq!(bounded.allocation_policy(), AllocationPolicy::Bounded { max_total_size: 4 });
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationPolicy {
    /// Only the initial resources exist; nothing is ever allocated
    Fixed,

    /// Allocate while idle + outstanding stays below the ceiling
    Bounded { max_total_size: usize },

    /// Allocate whenever the idle store is empty
    Unbounded,
}

impl AllocationPolicy {
    pub(crate) fn resolve(has_allocator: bool, max_total_size: Option<usize>) -> Self {
        match (has_allocator, max_total_size) {
            (false, _) | (true, Some(0)) => AllocationPolicy::Fixed,
            (true, Some(max_total_size)) => AllocationPolicy::Bounded { max_total_size },
            (true, None) => AllocationPolicy::Unbounded,
        }
    }

    /// Whether a pool holding `total` resources may create one more
    pub fn permits(&self, total: usize) -> bool {
        match self {
            AllocationPolicy::Fixed => false,
            AllocationPolicy::Bounded { max_total_size } => total < *max_total_size,
            AllocationPolicy::Unbounded => true,
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, AllocationPolicy::Fixed)
    }
}

/// Result of asking the strategy for a fresh resource
pub(crate) enum Allocation<R> {
    Created(R),
    CeilingReached,
    NoAllocator,
    Failed(BoxError),
}

impl<R> fmt::Debug for Allocation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Allocation::Created(_) => f.write_str("Created(..)"),
            Allocation::CeilingReached => f.write_str("CeilingReached"),
            Allocation::NoAllocator => f.write_str("NoAllocator"),
            Allocation::Failed(err) => write!(f, "Failed({err})"),
        }
    }
}

pub(crate) struct AllocationStrategy<R> {
    policy: AllocationPolicy,
    allocator: Option<Arc<dyn Allocator<R>>>,
}

impl<R> AllocationStrategy<R> {
    pub fn new(allocator: Option<Arc<dyn Allocator<R>>>, max_total_size: Option<usize>) -> Self {
        let policy = AllocationPolicy::resolve(allocator.is_some(), max_total_size);
        Self { policy, allocator }
    }

    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    pub fn try_allocate(&self, total: usize) -> Allocation<R> {
        let Some(ref allocator) = self.allocator else {
            return Allocation::NoAllocator;
        };

        if !self.policy.permits(total) {
            return Allocation::CeilingReached;
        }

        match allocator.allocate() {
            Ok(resource) => {
                tracing::debug!(total = total + 1, "Allocated new resource");
                Allocation::Created(resource)
            }
            Err(err) => {
                tracing::debug!(error = %err, "Allocator failed");
                Allocation::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_allocator(counter: Arc<AtomicUsize>) -> Arc<dyn Allocator<usize>> {
        Arc::new(move || Ok::<_, Infallible>(counter.fetch_add(1, Ordering::Relaxed)))
    }

    #[test]
    fn test_resolve_policy() {
        assert_eq!(AllocationPolicy::resolve(false, None), AllocationPolicy::Fixed);
        assert_eq!(AllocationPolicy::resolve(false, Some(5)), AllocationPolicy::Fixed);
        assert_eq!(AllocationPolicy::resolve(true, Some(0)), AllocationPolicy::Fixed);
        assert_eq!(
            AllocationPolicy::resolve(true, Some(5)),
            AllocationPolicy::Bounded { max_total_size: 5 }
        );
        assert_eq!(AllocationPolicy::resolve(true, None), AllocationPolicy::Unbounded);
    }

    #[test]
    fn test_bounded_stops_at_ceiling() {
        let counter = Arc::new(AtomicUsize::new(0));
        let strategy = AllocationStrategy::new(Some(counting_allocator(counter.clone())), Some(2));

        assert!(matches!(strategy.try_allocate(0), Allocation::Created(0)));
        assert!(matches!(strategy.try_allocate(1), Allocation::Created(1)));
        assert!(matches!(strategy.try_allocate(2), Allocation::CeilingReached));
        assert_eq!(counter.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_unbounded_always_allocates() {
        let counter = Arc::new(AtomicUsize::new(0));
        let strategy = AllocationStrategy::new(Some(counting_allocator(counter)), None);

        assert!(matches!(strategy.try_allocate(10_000), Allocation::Created(0)));
    }

    #[test]
    fn test_without_allocator() {
        let strategy: AllocationStrategy<u8> = AllocationStrategy::new(None, None);
        assert!(matches!(strategy.try_allocate(0), Allocation::NoAllocator));
        assert!(strategy.policy().is_fixed());
    }

    #[test]
    fn test_allocator_failure_is_reported() {
        let failing: Arc<dyn Allocator<u8>> = Arc::new(|| Err::<u8, _>("disk full"));
        let strategy = AllocationStrategy::new(Some(failing), None);

        match strategy.try_allocate(0) {
            Allocation::Failed(err) => assert_eq!(err.to_string(), "disk full"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
