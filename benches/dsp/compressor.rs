//! Benchmarks for the soft-knee compressor.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use stepfx::dsp::compressor::Compressor;

use crate::{test_signal, BLOCK_SIZES};

pub fn bench_compressor(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/compressor");

    for &size in BLOCK_SIZES {
        let input = test_signal(size);
        let mut comp = Compressor::new(48_000.0);
        group.bench_with_input(BenchmarkId::new("default", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for &sample in &input {
                    sum += comp.process(black_box(sample));
                }
                sum
            })
        });
    }

    group.finish();
}
