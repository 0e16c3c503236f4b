//! Performance benchmarks for kmx
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use kmx::index::{IndexConfig, KmerIndex, MultiKIndex, StorePolicy, SuffixArray};
use kmx::utils::{Alphabet, SequenceGenerator};
use std::sync::Arc;

const TEXT_LEN: usize = 200_000;

/// Random DNA text plus a generator positioned after it
fn fixture(seed: u64) -> (Arc<Alphabet>, SequenceGenerator, Vec<u8>) {
    let alphabet = Arc::new(Alphabet::dna());
    let mut generator = SequenceGenerator::new(alphabet.clone(), seed);
    let text = generator.sequence(TEXT_LEN);
    (alphabet, generator, text)
}

fn bench_build(c: &mut Criterion) {
    let (alphabet, _, text) = fixture(1);

    let mut group = c.benchmark_group("build");
    group.sample_size(10);
    for (name, policy) in [("direct", StorePolicy::Direct), ("hashed", StorePolicy::Hashed)] {
        let config = IndexConfig::default().with_store(policy);
        group.bench_with_input(BenchmarkId::new(name, 8), &config, |b, config| {
            b.iter(|| KmerIndex::build(black_box(&text), 8, alphabet.clone(), config))
        });
    }

    let config = IndexConfig::default();
    group.bench_function("multi_k_4_8_12", |b| {
        b.iter(|| MultiKIndex::build(black_box(&text), &[4, 8, 12], alphabet.clone(), &config))
    });
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let (alphabet, mut generator, text) = fixture(2);
    let index = KmerIndex::build(&text, 8, alphabet, &IndexConfig::default())
        .expect("Failed to build index");

    let mut group = c.benchmark_group("search");
    for (name, len) in [("sub_k", 5), ("exact", 8), ("tiled", 21)] {
        let queries: Vec<Vec<u8>> = (0..64)
            .map(|_| generator.substring_query(&text, len))
            .collect();
        group.bench_with_input(BenchmarkId::new(name, len), &queries, |b, queries| {
            b.iter(|| {
                for q in queries {
                    black_box(index.search(q).map(|view| view.size()).ok());
                }
            })
        });
    }
    group.finish();
}

fn bench_materialize(c: &mut Criterion) {
    let (alphabet, mut generator, text) = fixture(3);
    let index = KmerIndex::build(&text, 8, alphabet, &IndexConfig::default())
        .expect("Failed to build index");
    let query = generator.substring_query(&text, 3);

    c.bench_function("materialize_sorted", |b| {
        b.iter(|| {
            let view = index.search(black_box(&query)).expect("query is valid");
            view.to_vector(true)
        })
    });
}

fn bench_baseline(c: &mut Criterion) {
    let (alphabet, mut generator, text) = fixture(4);
    let index = MultiKIndex::build(&text, &[4, 8, 12], alphabet, &IndexConfig::default())
        .expect("Failed to build index");
    let baseline = SuffixArray::build(&text);
    let lens: Vec<usize> = (4..=24).collect();
    let queries = generator.queries(&text, 128, &lens);

    let mut group = c.benchmark_group("baseline");
    group.bench_function("kmx", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(index.search(q).map(|view| view.to_vector(true)).ok());
            }
        })
    });
    group.bench_function("suffix_array", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(baseline.search_positions(q));
            }
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_build,
    bench_search,
    bench_materialize,
    bench_baseline,
);

criterion_main!(benches);
