//! Benchmarks for offline queue persistence.
//!
//! Measures the cost of mirroring queues of growing depth to the shipped
//! stores, since `set` runs after every enqueue while disconnected.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use ws_lifeline::{FileStore, MemoryStore, QueueStore};

/// Builds a JSON queue snapshot of `depth` payloads, as the client
/// serializes it.
fn queue_json(depth: usize) -> String {
    let items: Vec<String> = (0..depth).map(|i| format!("payload-{i}")).collect();
    serde_json::to_string(&items).expect("serialize")
}

fn bench_memory_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_store_set");

    for depth in [1usize, 16, 256, 1024] {
        let json = queue_json(depth);
        let store = MemoryStore::new();

        group.bench_with_input(BenchmarkId::from_parameter(depth), &json, |b, json| {
            b.iter(|| {
                store
                    .set(black_box("outbound-queue:ws://bench"), black_box(json))
                    .expect("set");
            });
        });
    }

    group.finish();
}

fn bench_file_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_store_set");
    group.sample_size(20);

    let dir = tempfile::tempdir().expect("tempdir");

    for depth in [1usize, 16, 256] {
        let json = queue_json(depth);
        let store = FileStore::new(dir.path().join(format!("queue-{depth}.json")));

        group.bench_with_input(BenchmarkId::from_parameter(depth), &json, |b, json| {
            b.iter(|| {
                store
                    .set(black_box("outbound-queue:ws://bench"), black_box(json))
                    .expect("set");
            });
        });
    }

    group.finish();
}

fn bench_store_get(c: &mut Criterion) {
    let store = MemoryStore::new();
    store
        .set("outbound-queue:ws://bench", &queue_json(256))
        .expect("set");

    c.bench_function("memory_store_get_256", |b| {
        b.iter(|| {
            let value = store.get(black_box("outbound-queue:ws://bench")).expect("get");
            black_box(value);
        });
    });
}

criterion_group!(benches, bench_memory_store, bench_file_store, bench_store_get);
criterion_main!(benches);
