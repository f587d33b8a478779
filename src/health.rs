//! Health monitoring for resource pools

/// Health status of a resource pool
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{PoolConfiguration, ResourcePool};
///
/// let pool = ResourcePool::new(vec![1, 2, 3], PoolConfiguration::default()).unwrap();
///
/// let health = pool.health();
/// assert!(health.is_healthy());
/// assert_eq!(health.idle_resources, 3);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HealthStatus {
    /// Whether the pool is healthy
    pub is_healthy: bool,

    /// Number of warnings detected
    pub warning_count: usize,

    /// Outstanding share of the total capacity (0.0 to 1.0)
    pub utilization: f64,

    /// Idle resources count
    pub idle_resources: usize,

    /// Checked-out resources count
    pub outstanding_resources: usize,

    /// Total capacity, `None` for unbounded pools
    pub total_capacity: Option<usize>,

    /// Warning messages
    pub warnings: Vec<String>,
}

impl HealthStatus {
    /// Create a new health status
    ///
    /// A fixed pool's capacity is the number of resources it holds.
    pub fn new(idle: usize, outstanding: usize, capacity: Option<usize>) -> Self {
        let utilization = match capacity {
            Some(capacity) if capacity > 0 => outstanding as f64 / capacity as f64,
            _ => 0.0,
        };

        let mut warnings = Vec::new();
        let mut is_healthy = true;

        if utilization > 0.9 {
            warnings.push(format!("High utilization: {:.1}%", utilization * 100.0));
            is_healthy = false;
        }

        if idle == 0 && capacity.is_some_and(|c| outstanding >= c) {
            warnings.push("Pool is exhausted".to_string());
        }

        Self {
            is_healthy,
            warning_count: warnings.len(),
            utilization,
            idle_resources: idle,
            outstanding_resources: outstanding,
            total_capacity: capacity,
            warnings,
        }
    }

    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}
