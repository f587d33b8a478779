//! Metrics collection and export for resource pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Metrics data for a pool
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{PoolConfiguration, ResourcePool};
///
/// let pool = ResourcePool::new(vec![1, 2, 3], PoolConfiguration::default()).unwrap();
///
/// {
///     let _res = pool.scoped().unwrap();
///     let metrics = pool.metrics();
///     assert_eq!(metrics.total_acquired, 1);
///     assert_eq!(metrics.outstanding_resources, 1);
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Resources handed out to callers
    pub total_acquired: usize,

    /// Resources released back into the pool
    pub total_released: usize,

    /// Resources created by the allocator
    pub total_allocated: usize,

    /// Allocator calls that failed
    pub allocation_failures: usize,

    /// Idle resources removed by the retention policy
    pub total_evicted: usize,

    /// Idle resources discarded by the liveness check
    pub dead_discarded: usize,

    /// Deallocator calls that failed or panicked
    pub deallocation_failures: usize,

    /// Acquisitions that ended with `PoolExhausted`
    pub exhausted_events: usize,

    /// Current idle resources
    pub idle_resources: usize,

    /// Current checked-out resources
    pub outstanding_resources: usize,

    /// Outstanding share of the allocation ceiling (0.0 to 1.0), zero without a ceiling
    pub utilization: f64,

    /// Allocation ceiling, when one exists
    pub max_capacity: Option<usize>,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_acquired".to_string(), self.total_acquired.to_string());
        metrics.insert("total_released".to_string(), self.total_released.to_string());
        metrics.insert("total_allocated".to_string(), self.total_allocated.to_string());
        metrics.insert("allocation_failures".to_string(), self.allocation_failures.to_string());
        metrics.insert("total_evicted".to_string(), self.total_evicted.to_string());
        metrics.insert("dead_discarded".to_string(), self.dead_discarded.to_string());
        metrics.insert("deallocation_failures".to_string(), self.deallocation_failures.to_string());
        metrics.insert("exhausted_events".to_string(), self.exhausted_events.to_string());
        metrics.insert("idle_resources".to_string(), self.idle_resources.to_string());
        metrics.insert("outstanding_resources".to_string(), self.outstanding_resources.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        if let Some(max) = self.max_capacity {
            metrics.insert("max_capacity".to_string(), max.to_string());
        }
        metrics
    }
}

/// Metrics exporter for Prometheus format
#[cfg(feature = "metrics")]
pub struct MetricsExporter;

#[cfg(feature = "metrics")]
impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_resourcepool::{MetricsExporter, PoolConfiguration, ResourcePool};
    /// use std::collections::HashMap;
    ///
    /// let pool = ResourcePool::new(vec![1, 2, 3], PoolConfiguration::default()).unwrap();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = MetricsExporter::export_prometheus(&pool.metrics(), "my_pool", Some(&tags))
    ///     .unwrap();
    /// assert!(output.contains("resourcepool_resources_idle"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> Result<String, prometheus::Error> {
        use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};

        let mut labels = HashMap::new();
        labels.insert("pool".to_string(), pool_name.to_string());
        if let Some(tags) = tags {
            labels.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let registry = Registry::new();
        let opts = |name: &str, help: &str| Opts::new(name, help).const_labels(labels.clone());

        let gauges = [
            ("resourcepool_resources_idle", "Current idle resources", metrics.idle_resources),
            (
                "resourcepool_resources_outstanding",
                "Current checked-out resources",
                metrics.outstanding_resources,
            ),
        ];
        for (name, help, value) in gauges {
            let gauge = IntGauge::with_opts(opts(name, help))?;
            gauge.set(value as i64);
            registry.register(Box::new(gauge))?;
        }

        let counters = [
            ("resourcepool_acquired_total", "Total resources acquired", metrics.total_acquired),
            ("resourcepool_released_total", "Total resources released", metrics.total_released),
            ("resourcepool_allocated_total", "Total resources allocated", metrics.total_allocated),
            (
                "resourcepool_allocation_failures_total",
                "Allocator failures",
                metrics.allocation_failures,
            ),
            ("resourcepool_evicted_total", "Idle resources evicted", metrics.total_evicted),
            (
                "resourcepool_dead_discarded_total",
                "Resources discarded by the liveness check",
                metrics.dead_discarded,
            ),
            (
                "resourcepool_deallocation_failures_total",
                "Deallocator failures",
                metrics.deallocation_failures,
            ),
            ("resourcepool_exhausted_total", "Pool exhausted events", metrics.exhausted_events),
        ];
        for (name, help, value) in counters {
            let counter = IntCounter::with_opts(opts(name, help))?;
            counter.inc_by(value as u64);
            registry.register(Box::new(counter))?;
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Internal metrics tracker
#[derive(Debug, Default)]
pub(crate) struct MetricsTracker {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub allocated: AtomicUsize,
    pub allocation_failures: AtomicUsize,
    pub evicted: AtomicUsize,
    pub dead_discarded: AtomicUsize,
    pub deallocation_failures: AtomicUsize,
    pub exhausted: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicUsize, n: usize) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self, idle: usize, outstanding: usize, capacity: Option<usize>) -> PoolMetrics {
        let utilization = match capacity {
            Some(capacity) if capacity > 0 => outstanding as f64 / capacity as f64,
            _ => 0.0,
        };

        PoolMetrics {
            total_acquired: self.acquired.load(Ordering::Relaxed),
            total_released: self.released.load(Ordering::Relaxed),
            total_allocated: self.allocated.load(Ordering::Relaxed),
            allocation_failures: self.allocation_failures.load(Ordering::Relaxed),
            total_evicted: self.evicted.load(Ordering::Relaxed),
            dead_discarded: self.dead_discarded.load(Ordering::Relaxed),
            deallocation_failures: self.deallocation_failures.load(Ordering::Relaxed),
            exhausted_events: self.exhausted.load(Ordering::Relaxed),
            idle_resources: idle,
            outstanding_resources: outstanding,
            utilization,
            max_capacity: capacity,
        }
    }
}
