//! Benchmarks for image loading.
//!
//! Measures the full pipeline on synthesized PE32 and PE32+ images:
//! - Header loading and region resolution only
//! - Full load with section materialization and all directory resolvers
//! - Bounded-string validation on a loaded image

extern crate readpe;

#[path = "../src/test/builders.rs"]
mod builders;

use builders::PeBuilder;
use criterion::{criterion_group, criterion_main, Criterion};
use readpe::{Context, LoadConfig};
use std::hint::black_box;

/// Benchmark a full PE32 load.
fn bench_load_pe32(c: &mut Criterion) {
    let data = PeBuilder::sample32().build();

    c.bench_function("load_pe32", |b| {
        b.iter(|| {
            let context = Context::from_mem(black_box(data.clone())).unwrap();
            black_box(context)
        });
    });
}

/// Benchmark a full PE32+ load.
fn bench_load_pe64(c: &mut Criterion) {
    let data = PeBuilder::sample64().build();

    c.bench_function("load_pe64", |b| {
        b.iter(|| {
            let context = Context::from_mem(black_box(data.clone())).unwrap();
            black_box(context)
        });
    });
}

/// Benchmark loading with every directory resolver disabled.
fn bench_load_headers_only(c: &mut Criterion) {
    let data = PeBuilder::sample64().build();
    let config = LoadConfig::headers_only();

    c.bench_function("load_headers_only", |b| {
        b.iter(|| {
            let context = Context::from_mem_with(black_box(data.clone()), &config).unwrap();
            black_box(context)
        });
    });
}

fn bench_string_validation(c: &mut Criterion) {
    let context = Context::from_mem(PeBuilder::sample32().build()).unwrap();
    let image = context.image();
    let len = image.len() as u64;

    c.bench_function("is_valid_string_sweep", |b| {
        b.iter(|| {
            let mut valid = 0usize;
            for rva in (0..len).step_by(16) {
                if image.is_valid_string(black_box(rva)) {
                    valid += 1;
                }
            }
            black_box(valid)
        });
    });
}

criterion_group!(
    benches,
    bench_load_pe32,
    bench_load_pe64,
    bench_load_headers_only,
    bench_string_validation,
);
criterion_main!(benches);
