//! # EsoxSolutions.ResourcePool
//!
//! Thread-safe pool for resources that are expensive to create, with
//! independent policies for allocation, retention and exhaustion.
//!
//! ## Features
//!
//! - Fixed, bounded or unbounded allocation through a caller-supplied allocator
//! - Size- and age-based eviction of idle resources, triggered on release
//! - Fail-fast or blocking acquisition with optional timeouts
//! - Liveness checks that transparently discard dead resources
//! - Automatic release via RAII (Drop trait)
//! - Async acquisition that never blocks the runtime
//! - Metrics, health status and Prometheus export
//!
//! ## Quick Start
//!
//! ```rust
//! use esox_resourcepool::{PoolConfiguration, ResourcePool};
//!
//! let pool = ResourcePool::new(vec![1, 2, 3], PoolConfiguration::default()).unwrap();
//! {
//!     let res = pool.scoped().unwrap();
//!     println!("Got: {}", *res);
//!     // Resource automatically released when `res` goes out of scope
//! }
//! assert_eq!(pool.len(), 3);
//! ```
//!
//! Idle resources are handed out most-recently-returned first and evicted
//! least-recently-returned first.

mod allocation;
mod config;
mod errors;
mod exhaustion;
mod health;
mod lifecycle;
mod metrics;
mod pool;
mod retention;
mod store;

pub use allocation::AllocationPolicy;
pub use config::PoolConfiguration;
pub use errors::{BoxError, PoolError, PoolResult};
pub use exhaustion::ExhaustionPolicy;
pub use health::HealthStatus;
pub use lifecycle::{Allocator, AlwaysAlive, Deallocator, DropDeallocator, LivenessCheck};
#[cfg(feature = "metrics")]
pub use metrics::MetricsExporter;
pub use metrics::PoolMetrics;
pub use pool::{PooledResource, ResourcePool};
pub use retention::RetentionPolicy;
