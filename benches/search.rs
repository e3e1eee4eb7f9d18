use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rag_console::store::{Collection, Filter, SearchOptions, VectorRecord};
use std::hint::black_box;

const DIMENSION: usize = 1536;

/// Cheap deterministic pseudo-random vector so runs are comparable
fn vector(seed: u64) -> Vec<f32> {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    (0..DIMENSION)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            ((state >> 33) as f32 / u32::MAX as f32) - 0.25
        })
        .collect()
}

fn collection(size: u64) -> Collection {
    let mut collection = Collection::new("bench", DIMENSION);
    for id in 0..size {
        collection
            .upsert(VectorRecord {
                id,
                value: format!("fact {id}"),
                vector: vector(id),
                product_id: (id % 3 == 0).then_some(1),
            })
            .expect("can upsert");
    }
    collection
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let query = vector(u64::MAX);
    let mut group = c.benchmark_group("search");

    for size in [6_u64, 100, 1_000] {
        let collection = collection(size);
        let options = SearchOptions {
            top_k: 5,
            filter: Some(Filter::ProductIdEquals(None)),
            include_vectors: true,
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), &collection, |b, c| {
            b.iter(|| c.search(black_box(&query), black_box(&options)))
        });
    }

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
