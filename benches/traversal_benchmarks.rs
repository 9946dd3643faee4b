#![allow(missing_docs)]
use std::hint::black_box;
use std::time::Duration;

use catalog_core::lineage::{Direction, InMemoryLineageStore, LineageStore};
use catalog_core::mrn::Mrn;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn mrn(i: usize) -> Mrn {
    Mrn::build("table", "bigquery", "bench", &format!("t{i}"))
}

/// A straight chain `t0 -> t1 -> ... -> t(n-1)`, the worst case for a BFS
/// bound by `depth` since every node sits on the single path.
fn build_chain(n: usize) -> InMemoryLineageStore {
    let store = InMemoryLineageStore::new();
    for i in 0..n.saturating_sub(1) {
        store.create_edge(&mrn(i), &mrn(i + 1), "lineage").expect("edge creation does not fail");
    }
    store
}

fn bench_traverse_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("traverse_chain");
    group.sample_size(30);
    group.warm_up_time(Duration::from_secs(2));
    for &n in &[10usize, 100, 1_000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let store = build_chain(n);
            let start = mrn(0);
            b.iter(|| {
                let traversal = store.traverse(&start, n, Direction::Downstream).expect("traverse");
                black_box(traversal.nodes.len());
            });
        });
    }
    group.finish();
}

/// A fan-out hub: one root feeding `n` direct downstream children, the
/// worst case for per-level frontier width rather than depth.
fn build_fanout(n: usize) -> InMemoryLineageStore {
    let store = InMemoryLineageStore::new();
    let root = mrn(0);
    for i in 1..n {
        store.create_edge(&root, &mrn(i), "lineage").expect("edge creation does not fail");
    }
    store
}

fn bench_traverse_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("traverse_fanout");
    group.sample_size(30);
    group.warm_up_time(Duration::from_secs(2));
    for &n in &[10usize, 100, 1_000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let store = build_fanout(n);
            let root = mrn(0);
            b.iter(|| {
                let traversal = store.traverse(&root, n, Direction::Downstream).expect("traverse");
                black_box(traversal.nodes.len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_traverse_chain, bench_traverse_fanout);
criterion_main!(benches);
