use esox_resourcepool::{PoolConfiguration, PoolError, ResourcePool};

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Resource {
    id: usize,
    alive: AtomicBool,
}

impl Resource {
    fn new(id: usize) -> Self {
        Self {
            id,
            alive: AtomicBool::new(true),
        }
    }

    fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

#[test]
fn fixed_pool_never_exceeds_capacity() {
    let pool = ResourcePool::new((0..4).collect::<Vec<usize>>(), PoolConfiguration::new()).unwrap();
    let in_use = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);

    crossbeam::scope(|s| {
        for _ in 0..16 {
            s.spawn(|_| {
                for _ in 0..100 {
                    let res = pool.scoped_timeout(Duration::from_secs(10)).unwrap();
                    let now = in_use.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    assert!(*res < 4);
                    in_use.fetch_sub(1, Ordering::SeqCst);
                }
            });
        }
    })
    .unwrap();

    assert!(peak.load(Ordering::SeqCst) <= 4);
    assert_eq!(pool.len(), 4);
    assert_eq!(pool.outstanding(), 0);
    assert_eq!(pool.metrics().total_acquired, 1600);
}

#[test]
fn raising_pool_fails_the_extra_acquire() {
    let pool = ResourcePool::new(vec!['a', 'b'], PoolConfiguration::new()).unwrap();

    let held = crossbeam::scope(|s| {
        let handles: Vec<_> = (0..2).map(|_| s.spawn(|_| pool.acquire().unwrap())).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
    })
    .unwrap();

    assert_eq!(held.len(), 2);
    assert!(matches!(pool.acquire(), Err(PoolError::PoolExhausted)));
}

#[test]
fn single_resource_serves_many_waiters() {
    let pool = ResourcePool::new(vec![Resource::new(0)], PoolConfiguration::new()).unwrap();
    let served = AtomicUsize::new(0);

    crossbeam::scope(|s| {
        for _ in 0..10 {
            s.spawn(|_| {
                let res = pool.scoped_timeout(Duration::from_secs(10)).unwrap();
                assert_eq!(res.id, 0);
                served.fetch_add(1, Ordering::SeqCst);
            });
        }
    })
    .unwrap();

    assert_eq!(served.load(Ordering::SeqCst), 10);
}

#[test]
fn waiters_skip_dead_resource_and_share_live_one() {
    let pool = ResourcePool::new(
        Vec::new(),
        PoolConfiguration::new().with_liveness_check(|r: &Resource| r.alive.load(Ordering::SeqCst)),
    )
    .unwrap();
    let dead = Resource::new(0);
    dead.close();

    crossbeam::scope(|s| {
        let waiters: Vec<_> = (0..10)
            .map(|i| {
                let pool = &pool;
                s.spawn(move |_| {
                    let res = pool.scoped_timeout(Duration::from_secs(10)).unwrap();
                    thread::sleep(Duration::from_millis(10));
                    assert_eq!(res.id, 1);
                    i
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        pool.release(dead);
        thread::sleep(Duration::from_millis(50));
        pool.release(Resource::new(1));

        let mut done: Vec<_> = waiters.into_iter().map(|h| h.join().unwrap()).collect();
        done.sort_unstable();
        assert_eq!(done, (0..10).collect::<Vec<_>>());
    })
    .unwrap();

    assert_eq!(pool.metrics().dead_discarded, 1);
}

#[test]
fn waiters_time_out_when_only_dead_resources_arrive() {
    let pool = ResourcePool::new(
        Vec::new(),
        PoolConfiguration::new().with_liveness_check(|r: &Resource| r.alive.load(Ordering::SeqCst)),
    )
    .unwrap();
    let timeout = Duration::from_millis(300);
    let start = Instant::now();

    crossbeam::scope(|s| {
        let waiters: Vec<_> = (0..5)
            .map(|_| s.spawn(|_| pool.acquire_timeout(timeout)))
            .collect();

        thread::sleep(Duration::from_millis(50));
        let dead = Resource::new(0);
        dead.close();
        pool.release(dead);

        for waiter in waiters {
            assert!(matches!(waiter.join().unwrap(), Err(PoolError::PoolExhausted)));
        }
    })
    .unwrap();

    assert!(start.elapsed() >= timeout);
    assert!(pool.is_empty());
}

#[test]
fn release_from_another_thread_wakes_blocked_acquire() {
    let pool: ResourcePool<u64> =
        ResourcePool::new(Vec::new(), PoolConfiguration::new().with_blocking(None)).unwrap();
    let (tx, rx) = crossbeam::channel::bounded::<u64>(1);
    let releaser = pool.clone();

    let handle = thread::spawn(move || {
        let value = rx.recv().unwrap();
        releaser.release(value);
    });

    thread::sleep(Duration::from_millis(20));
    tx.send(42).unwrap();
    assert_eq!(pool.acquire().unwrap(), 42);
    handle.join().unwrap();
}

#[test]
fn broadcast_wakes_every_waiter() {
    let pool: ResourcePool<usize> = ResourcePool::new(Vec::new(), PoolConfiguration::new()).unwrap();
    let (tx, rx) = crossbeam::channel::unbounded();

    crossbeam::scope(|s| {
        for _ in 0..8 {
            let tx = tx.clone();
            let pool = &pool;
            s.spawn(move |_| {
                // holds its resource so every waiter needs its own release
                let res = pool.acquire_timeout(Duration::from_secs(10)).unwrap();
                tx.send(res).unwrap();
            });
        }

        thread::sleep(Duration::from_millis(50));
        for id in 0..8 {
            pool.release(id);
        }
    })
    .unwrap();
    drop(tx);

    let mut got: Vec<_> = rx.iter().collect();
    got.sort_unstable();
    assert_eq!(got, (0..8).collect::<Vec<_>>());
}

#[test]
fn sized_retention_keeps_the_most_recent() {
    let counter = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(Mutex::new(Vec::new()));
    let factory_counter = Arc::clone(&counter);
    let log = Arc::clone(&closed);

    let pool = ResourcePool::new(
        Vec::new(),
        PoolConfiguration::new()
            .with_factory(move || factory_counter.fetch_add(1, Ordering::SeqCst))
            .with_teardown(move |r| log.lock().push(r))
            .with_idle_size(3, 100),
    )
    .unwrap();

    let held: Vec<_> = (0..101).map(|_| pool.acquire().unwrap()).collect();
    assert_eq!(held, (0..101).collect::<Vec<_>>());

    for r in held {
        pool.release(r);
    }

    assert_eq!(pool.len(), 3);
    assert_eq!(*closed.lock(), (0..98).collect::<Vec<_>>());
    let survivors: Vec<_> = (0..3).map(|_| pool.acquire().unwrap()).collect();
    assert_eq!(survivors, vec![100, 99, 98]);
}

#[test]
fn identical_configuration_behaves_identically() {
    fn run() -> Vec<Result<u32, String>> {
        let pool = ResourcePool::new(
            vec![10, 20, 30],
            PoolConfiguration::new().with_liveness_check(|r: &u32| *r != 20),
        )
        .unwrap();

        let mut trace = Vec::new();
        let a = pool.acquire().unwrap();
        trace.push(Ok(a));
        let b = pool.acquire().unwrap();
        trace.push(Ok(b));
        trace.push(pool.acquire().map_err(|e| e.to_string()));
        pool.release(b);
        pool.release(a);
        trace.push(pool.acquire().map_err(|e| e.to_string()));
        trace.push(pool.acquire().map_err(|e| e.to_string()));
        trace
    }

    let first = run();
    assert_eq!(first, run());
    assert_eq!(
        first,
        vec![
            Ok(10),
            Ok(30),
            Err("Pool exhausted - no resource available".to_string()),
            Ok(10),
            Ok(30)
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn async_acquirers_share_a_small_pool() {
    let pool = ResourcePool::new(vec![0u8, 1, 2], PoolConfiguration::new()).unwrap();

    let tasks: Vec<_> = (0..12)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move {
                let res = pool.scoped_async(Some(Duration::from_secs(10))).await.unwrap();
                tokio::time::sleep(Duration::from_millis(10)).await;
                *res
            })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap() < 3);
    }
    assert_eq!(pool.len(), 3);
    assert_eq!(pool.outstanding(), 0);
}

#[tokio::test]
async fn cancelled_async_acquire_leaves_pool_usable() {
    let pool: ResourcePool<u8> = ResourcePool::new(Vec::new(), PoolConfiguration::new()).unwrap();

    let cancelled = tokio::time::timeout(Duration::from_millis(20), pool.acquire_async(Some(Duration::ZERO))).await;
    assert!(cancelled.is_err());

    pool.release(5);
    assert_eq!(pool.acquire_async(None).await.unwrap(), 5);
}
