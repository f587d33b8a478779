//! Async usage examples

use esox_resourcepool::{MetricsExporter, PoolConfiguration, ResourcePool};
use std::time::Duration;
use tokio::time::sleep;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== EsoxSolutions.ResourcePool - Async Examples ===\n");

    // Example 1: Async acquire
    async_acquire().await;

    // Example 2: Async with timeout
    async_with_timeout().await;

    // Example 3: Concurrent access
    concurrent_access().await;
}

async fn async_acquire() {
    println!("1. Async Acquire:");
    let pool = ResourcePool::new(vec![1, 2, 3], PoolConfiguration::default()).unwrap();

    {
        let res = pool.scoped_async(None).await.unwrap();
        println!("   Got resource asynchronously: {}", *res);
    }

    println!();
}

async fn async_with_timeout() {
    println!("2. Async with Timeout:");
    let pool = ResourcePool::new(vec![42], PoolConfiguration::new()).unwrap();

    let _res = pool.scoped().unwrap();

    match pool.acquire_async(Some(Duration::from_millis(100))).await {
        Ok(_) => println!("   Got resource"),
        Err(e) => println!("   Error: {}", e),
    }

    println!();
}

async fn concurrent_access() {
    println!("3. Concurrent Access:");
    let pool = ResourcePool::new(
        Vec::new(),
        PoolConfiguration::new()
            .with_factory(|| Vec::<u8>::with_capacity(1024))
            .with_max_total_size(4)
            .with_blocking(Some(Duration::from_secs(5))),
    )
    .unwrap();

    let mut handles = vec![];
    for i in 0..10 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            let mut buf = pool.scoped_async(None).await.unwrap();
            buf.push(i);
            sleep(Duration::from_millis(10)).await;
            buf.clear();
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    println!("   Idle buffers: {}", pool.len());
    print!(
        "{}",
        MetricsExporter::export_prometheus(&pool.metrics(), "buffers", None).unwrap()
    );
}
