//! End-to-end IHCI Tree benchmarks: insert throughput and query latency at a
//! range of tree sizes, plus the effect of `leaf_neighbor_count` on search.

use std::hint::black_box;

use ballast_core::{IhciConfig, IhciTree, Metric, VectorStore};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DIMS: usize = 64;

fn random_vectors(seed: u64, count: usize) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..DIMS).map(|_| rng.random_range(-1.0..1.0)).collect())
        .collect()
}

fn bench_insert_by_tree_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("ihci_insert_by_tree_size");
    group.sample_size(20);

    for size in [100, 1_000, 5_000] {
        group.throughput(Throughput::Elements(1));
        let preload = random_vectors(1, size);

        group.bench_with_input(BenchmarkId::new("nodes", size), &size, |b, _| {
            b.iter_batched(
                || {
                    let mut store = VectorStore::new(DIMS).unwrap();
                    let mut tree = IhciTree::new(DIMS, Metric::SquaredEuclidean, IhciConfig::default());
                    for v in &preload {
                        let id = store.append(v).unwrap();
                        tree.insert(&store, id).unwrap();
                    }
                    let fresh = random_vectors(2, 1).pop().unwrap();
                    (store, tree, fresh)
                },
                |(mut store, mut tree, v)| {
                    let id = store.append(&v).unwrap();
                    black_box(tree.insert(&store, id).unwrap())
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_query_by_visit_budget(c: &mut Criterion) {
    let mut group = c.benchmark_group("ihci_query_by_visit_budget");
    group.sample_size(30);

    let vectors = random_vectors(3, 2_000);
    let mut store = VectorStore::new(DIMS).unwrap();
    let mut tree = IhciTree::new(DIMS, Metric::SquaredEuclidean, IhciConfig::default());
    for v in &vectors {
        let id = store.append(v).unwrap();
        tree.insert(&store, id).unwrap();
    }
    tree.repair_all(&store);
    let query = vectors[0].clone();

    for budget in [2, 4, 8, 16] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("visit_budget", budget), &budget, |b, &budget_val| {
            b.iter(|| black_box(tree.query(&store, &query, 10, budget_val).unwrap()));
        });
    }

    group.finish();
}

fn bench_query_by_k(c: &mut Criterion) {
    let mut group = c.benchmark_group("ihci_query_by_k");
    group.sample_size(30);

    let vectors = random_vectors(4, 2_000);
    let mut store = VectorStore::new(DIMS).unwrap();
    let mut tree = IhciTree::new(DIMS, Metric::SquaredEuclidean, IhciConfig::default());
    for v in &vectors {
        let id = store.append(v).unwrap();
        tree.insert(&store, id).unwrap();
    }
    tree.repair_all(&store);
    let query = vectors[0].clone();

    for k in [1, 10, 50, 100] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("k", k), &k, |b, &k_val| {
            b.iter(|| black_box(tree.query(&store, &query, k_val, 8).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_by_tree_size,
    bench_query_by_visit_budget,
    bench_query_by_k,
);
criterion_main!(benches);
