//! Benchmarks for the tas store
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use tas::ingest::Command;
use tas::query::Query;
use tas::storage::{ManualClock, PathTree, RetentionPolicy, Store, Timestamp, Value};

const T0: i64 = 1_700_000_000;

fn create_store() -> Store {
    let clock = Arc::new(ManualClock::new(Timestamp::new(T0)));
    Store::with_clock(RetentionPolicy::default(), clock)
}

fn keys(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("cart.c{}.basket{}.item{}", i % 10, i % 7, i))
        .collect()
}

fn bench_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree");
    let keys = keys(1000);

    group.throughput(Throughput::Elements(keys.len() as u64));
    group.bench_function("upsert_1000", |b| {
        b.iter(|| {
            let mut tree = PathTree::new();
            for key in &keys {
                let segments: Vec<&str> = key.split('.').collect();
                let node = tree.ensure_path(&segments).unwrap();
                tree.upsert_sample(node, key, Timestamp::new(T0), Value::counter(1))
                    .unwrap();
            }
            black_box(tree.len())
        })
    });

    group.finish();
}

fn bench_command(c: &mut Criterion) {
    let mut group = c.benchmark_group("command");

    group.bench_function("parse_incr", |b| {
        b.iter(|| Command::parse(black_box("INCR 1700000000 cart.veg.basket1.item1 3")).unwrap())
    });

    group.bench_function("parse_append", |b| {
        b.iter(|| {
            Command::parse(black_box(r#"APPEND 1700000000 feed.posts ["a", 1, {"b": 2}]"#))
                .unwrap()
        })
    });

    group.finish();
}

fn bench_store(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("store");

    group.bench_function("write_single", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let store = create_store();
                let start = std::time::Instant::now();

                for _ in 0..iters {
                    store
                        .write("bench.hits", Timestamp::new(T0), Value::counter(1))
                        .await
                        .unwrap();
                }

                start.elapsed()
            })
        });
    });

    group.bench_function("query_wildcard_1000", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let store = create_store();
                for (i, key) in keys(1000).iter().enumerate() {
                    let ts = Timestamp::new(T0 - (i as i64 % 12) * 5);
                    store.write(key, ts, Value::counter(1)).await.unwrap();
                }
                let query = Query::parse("cart.*.basket3").unwrap();

                let start = std::time::Instant::now();

                for _ in 0..iters {
                    let _ = store.query(black_box(&query)).await.unwrap();
                }

                start.elapsed()
            })
        });
    });

    group.bench_function("evict_bucket_1000", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let store = create_store();
                let keys = keys(1000);
                let mut elapsed = std::time::Duration::ZERO;

                for _ in 0..iters {
                    for key in &keys {
                        store
                            .write(key, Timestamp::new(T0), Value::counter(1))
                            .await
                            .unwrap();
                    }
                    let start = std::time::Instant::now();
                    store.evict(black_box(Timestamp::new(T0))).await;
                    elapsed += start.elapsed();
                }

                elapsed
            })
        });
    });

    group.finish();
}

criterion_group!(benches, bench_tree, bench_command, bench_store);
criterion_main!(benches);
