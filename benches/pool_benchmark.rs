use criterion::{Criterion, black_box, criterion_group, criterion_main};
use esox_resourcepool::{PoolConfiguration, ResourcePool};
use std::time::Duration;

fn acquire_release(c: &mut Criterion) {
    let pool = ResourcePool::new((0..16).collect::<Vec<u64>>(), PoolConfiguration::new()).unwrap();

    c.bench_function("acquire_release", |b| {
        b.iter(|| {
            let res = pool.acquire().unwrap();
            pool.release(black_box(res));
        })
    });

    c.bench_function("scoped", |b| {
        b.iter(|| {
            let res = pool.scoped().unwrap();
            black_box(*res);
        })
    });
}

fn retention_sweep(c: &mut Criterion) {
    let pool = ResourcePool::new(
        Vec::new(),
        PoolConfiguration::new()
            .with_factory(|| vec![0u8; 64])
            .with_idle_size(4, 32)
            .with_max_idle_age(Duration::from_secs(60)),
    )
    .unwrap();

    c.bench_function("release_with_retention", |b| {
        b.iter(|| {
            let held: Vec<_> = (0..40).map(|_| pool.acquire().unwrap()).collect();
            for res in held {
                pool.release(res);
            }
        })
    });
}

criterion_group!(benches, acquire_release, retention_sweep);
criterion_main!(benches);
