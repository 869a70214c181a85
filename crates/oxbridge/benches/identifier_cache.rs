// Identifier cache benchmarks for oxbridge
//
// These benchmarks measure selector and class resolution through the
// call-site caches and the sharded name-keyed table, and compare hash
// functions for shard selection (DefaultHasher, FxHash, AHash).

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use oxbridge::cache::{CachedSel, IdentifierCache};
use oxbridge::{Sel, sel};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::thread;

/// Call-site cache hit: one atomic load.
fn bench_call_site_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("call_site");

    group.bench_function("sel_macro", |b| {
        b.iter(|| black_box(sel!(objectAtIndex:)));
    });

    group.bench_function("cached_sel", |b| {
        let cached = CachedSel::new();
        b.iter(|| black_box(cached.get("insertObject:atIndex:\0")));
    });

    group.bench_function("runtime_register", |b| {
        b.iter(|| black_box(Sel::register(black_box("objectAtIndex:"))));
    });

    group.finish();
}

/// Name-keyed table hits for selectors and classes.
fn bench_table_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_hit");
    let table = IdentifierCache::new();
    table.resolve("setObject:forKey:").unwrap();
    table.resolve_class("NSObject").unwrap();

    group.bench_function("selector", |b| {
        b.iter(|| black_box(table.resolve(black_box("setObject:forKey:"))));
    });
    group.bench_function("class", |b| {
        b.iter(|| black_box(table.resolve_class(black_box("NSObject"))));
    });

    group.finish();
}

/// Hash functions over typical selector lengths.
fn bench_hash_computation(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_computation");
    let names = ["init", "objectAtIndex:", "initWithContentsOfURL:options:error:"];

    for name in &names {
        let length = name.len();

        group.bench_with_input(BenchmarkId::new("DefaultHasher", length), name, |b, s| {
            b.iter(|| {
                let mut hasher = DefaultHasher::new();
                black_box(s).hash(&mut hasher);
                hasher.finish()
            });
        });

        group.bench_with_input(BenchmarkId::new("FxHash", length), name, |b, s| {
            b.iter(|| {
                let mut hasher = fxhash::FxHasher::default();
                black_box(s).hash(&mut hasher);
                hasher.finish()
            });
        });

        group.bench_with_input(BenchmarkId::new("AHash", length), name, |b, s| {
            b.iter(|| {
                let mut hasher = ahash::AHasher::default();
                black_box(s).hash(&mut hasher);
                hasher.finish()
            });
        });
    }

    group.finish();
}

/// Concurrent readers on the sharded table.
fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");
    group.sample_size(20);

    for threads in [1usize, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            let table = Arc::new(IdentifierCache::new());
            let names: Vec<String> = (0..64).map(|i| format!("contended{i}:")).collect();
            for name in &names {
                table.resolve(name).unwrap();
            }
            let names = Arc::new(names);

            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|t| {
                        let table = Arc::clone(&table);
                        let names = Arc::clone(&names);
                        thread::spawn(move || {
                            for i in 0..1000 {
                                let name = &names[(i + t) % names.len()];
                                black_box(table.resolve(name).unwrap());
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_call_site_hit,
    bench_table_hit,
    bench_hash_computation,
    bench_contention
);
criterion_main!(benches);
