//! Basic usage examples for ResourcePool

use esox_resourcepool::{PoolConfiguration, ResourcePool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== EsoxSolutions.ResourcePool - Basic Examples ===\n");

    // Example 1: Fixed pool
    fixed_pool();

    // Example 2: Dynamic pool with retention
    dynamic_pool();

    // Example 3: Blocking acquisition
    blocking_pool();

    // Example 4: Metrics and health
    metrics_and_health();
}

fn fixed_pool() {
    println!("1. Fixed Pool:");
    let pool = ResourcePool::new(vec![1, 2, 3], PoolConfiguration::default()).unwrap();

    {
        let res = pool.scoped().unwrap();
        println!("   Got resource: {}", *res);
        // Resource automatically released when dropped
    }

    println!("   Idle after release: {}\n", pool.len());
}

fn dynamic_pool() {
    println!("2. Dynamic Pool:");
    let next_id = AtomicUsize::new(0);

    let config = PoolConfiguration::new()
        .with_factory(move || format!("conn-{}", next_id.fetch_add(1, Ordering::Relaxed)))
        .with_teardown(|conn| println!("   closing {conn}"))
        .with_max_total_size(8)
        .with_idle_size(1, 2);

    let pool = ResourcePool::new(Vec::new(), config).unwrap();
    let held: Vec<_> = (0..4).map(|_| pool.acquire().unwrap()).collect();
    println!("   Outstanding: {}", pool.outstanding());

    for conn in held {
        pool.release(conn);
    }
    println!("   Idle after retention sweep: {}\n", pool.len());
}

fn blocking_pool() {
    println!("3. Blocking Acquisition:");
    let pool = ResourcePool::new(vec![42], PoolConfiguration::new()).unwrap();

    let res = pool.acquire().unwrap();
    match pool.acquire_timeout(Duration::from_millis(100)) {
        Ok(_) => println!("   Unexpectedly got a resource"),
        Err(e) => println!("   Error: {}", e),
    }

    let releaser = pool.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        releaser.release(res);
    });
    println!("   Waited and got: {}\n", pool.acquire_timeout(Duration::from_secs(1)).unwrap());
    handle.join().unwrap();
}

fn metrics_and_health() {
    println!("4. Metrics and Health:");
    let pool = ResourcePool::new(vec![1, 2, 3, 4, 5], PoolConfiguration::default()).unwrap();

    {
        let _res1 = pool.scoped().unwrap();
        let _res2 = pool.scoped().unwrap();

        let health = pool.health();
        println!("   Health: {}", if health.is_healthy { "Healthy" } else { "Unhealthy" });
        println!("   Utilization: {:.1}%", health.utilization * 100.0);
        println!("   Outstanding: {}, Idle: {}", health.outstanding_resources, health.idle_resources);
    }

    println!("\n   Metrics:");
    for (key, value) in pool.metrics().export() {
        println!("     {}: {}", key, value);
    }
}
