//! # Layout Benchmark
//!
//! Schema parsing and layout computation. Both run once per schema, so
//! this only guards against pathological regressions.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use packstruct_core::{Layout, Schema, TypeCache};

fn wide_pairs() -> Vec<(String, String)> {
    let specs = ["bool", "u4", "i7", "u8", "i16/100", "f16", "u12", "f32", "sid", "f64"];
    let mut pairs = vec![("handle".to_owned(), "sid".to_owned())];
    pairs.extend((0..64).map(|i| (format!("f{i}"), specs[i % specs.len()].to_owned())));
    pairs
}

fn bench_schema_parse(c: &mut Criterion) {
    let pairs = wide_pairs();
    c.bench_function("schema_parse_65_fields", |b| {
        b.iter(|| black_box(Schema::from_pairs(pairs.iter().map(|(n, s)| (n, s))).unwrap()));
    });
}

fn bench_layout_compute(c: &mut Criterion) {
    let schema = Schema::from_pairs(wide_pairs()).unwrap();
    c.bench_function("layout_compute_65_fields", |b| {
        b.iter(|| black_box(Layout::compute(black_box(&schema)).stride_bytes()));
    });
}

fn bench_type_cache_hit(c: &mut Criterion) {
    let schema = Schema::from_pairs(wide_pairs()).unwrap();
    let cache = TypeCache::new();
    let _ = cache.get(&schema);
    c.bench_function("type_cache_hit", |b| {
        b.iter(|| black_box(cache.get(&schema).stride_words()));
    });
}

criterion_group!(benches, bench_schema_parse, bench_layout_compute, bench_type_cache_hit);
criterion_main!(benches);
