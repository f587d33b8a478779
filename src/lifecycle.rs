//! Lifecycle hooks supplied by the pool's owner
//!
//! Each hook is a single-method capability. Closures with a matching
//! signature implement the traits directly, so most callers never name them.

use crate::errors::BoxError;

/// Creates new resources on demand
///
/// # Examples
///
/// ```
/// use esox_resourcepool::Allocator;
///
/// let alloc = || -> Result<String, std::io::Error> { Ok("conn".to_string()) };
/// assert_eq!(alloc.allocate().unwrap(), "conn");
/// ```
pub trait Allocator<R>: Send + Sync {
    fn allocate(&self) -> Result<R, BoxError>;
}

impl<R, E, F> Allocator<R> for F
where
    F: Fn() -> Result<R, E> + Send + Sync,
    E: Into<BoxError>,
{
    fn allocate(&self) -> Result<R, BoxError> {
        self().map_err(Into::into)
    }
}

/// Tears down resources the pool no longer keeps
pub trait Deallocator<R>: Send + Sync {
    fn deallocate(&self, resource: R) -> Result<(), BoxError>;
}

impl<R, E, F> Deallocator<R> for F
where
    F: Fn(R) -> Result<(), E> + Send + Sync,
    E: Into<BoxError>,
{
    fn deallocate(&self, resource: R) -> Result<(), BoxError> {
        self(resource).map_err(Into::into)
    }
}

/// Decides whether an idle resource can still be handed out
pub trait LivenessCheck<R>: Send + Sync {
    fn is_alive(&self, resource: &R) -> bool;
}

impl<R, F> LivenessCheck<R> for F
where
    F: Fn(&R) -> bool + Send + Sync,
{
    fn is_alive(&self, resource: &R) -> bool {
        self(resource)
    }
}

/// Default teardown: the resource is simply dropped
#[derive(Debug, Default, Clone, Copy)]
pub struct DropDeallocator;

impl<R> Deallocator<R> for DropDeallocator {
    fn deallocate(&self, resource: R) -> Result<(), BoxError> {
        drop(resource);
        Ok(())
    }
}

/// Default liveness check: every resource is alive
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysAlive;

impl<R> LivenessCheck<R> for AlwaysAlive {
    fn is_alive(&self, _resource: &R) -> bool {
        true
    }
}
