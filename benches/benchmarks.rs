use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use engage_core::cache::{ContentCache, MemoryContentCache};
use engage_core::sync::{AsyncValue, ObserverRegistry, Retention, SingleFlight};

trait Listener: Send + Sync {
    fn changed(&self, value: usize);
}

struct Counter(AtomicUsize);

impl Listener for Counter {
    fn changed(&self, value: usize) {
        self.0.fetch_add(value, Ordering::Relaxed);
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Hit and insert paths of the in-memory content cache
fn benchmark_content_cache(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("content_cache");

    let cache = MemoryContentCache::new();
    rt.block_on(cache.set("https://cdn.example.com/a.png", Bytes::from(vec![0; 4096])));
    group.bench_function("get_hit", |b| {
        b.iter(|| rt.block_on(cache.get(black_box("https://cdn.example.com/a.png"))))
    });

    let bounded = MemoryContentCache::with_limits(64 * 1024, 16);
    let payload = Bytes::from(vec![0; 4096]);
    let mut n = 0usize;
    group.bench_function("set_with_eviction", |b| {
        b.iter(|| {
            n += 1;
            rt.block_on(bounded.set(&format!("k{}", n % 64), payload.clone()))
        })
    });

    group.finish();
}

/// Fan-out cost of the weak observer registry
fn benchmark_observers(c: &mut Criterion) {
    let mut group = c.benchmark_group("observers");

    for size in [1usize, 16, 256] {
        let registry: ObserverRegistry<dyn Listener> = ObserverRegistry::new();
        let subscribers: Vec<Arc<dyn Listener>> = (0..size)
            .map(|_| Arc::new(Counter(AtomicUsize::new(0))) as Arc<dyn Listener>)
            .collect();
        for subscriber in &subscribers {
            registry.add(subscriber);
        }

        group.bench_with_input(BenchmarkId::new("publish", size), &size, |b, _| {
            b.iter(|| registry.publish(|listener| listener.changed(black_box(1))))
        });
    }

    group.finish();
}

/// Lookups of values that already settled
fn benchmark_single_flight(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("single_flight");

    let value: AsyncValue<u64> = AsyncValue::new();
    value.set(42);
    group.bench_function("settled_value", |b| {
        b.iter(|| rt.block_on(value.get_or_resolve(|| async { Ok(0) })))
    });

    let flights: SingleFlight<String, u64> = SingleFlight::new(Retention::KeepValue);
    for i in 0..1000u64 {
        flights.set(format!("key-{i}"), i);
    }
    group.bench_function("settled_keyed", |b| {
        b.iter(|| {
            rt.block_on(flights.resolve(black_box("key-500".to_string()), || async { Ok(0) }))
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_content_cache,
    benchmark_observers,
    benchmark_single_flight
);
criterion_main!(benches);
