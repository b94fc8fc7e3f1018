//! Benchmarks for the delay line.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use stepfx::dsp::delay::DelayLine;

use crate::{test_signal, BLOCK_SIZES};

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    for &size in BLOCK_SIZES {
        let input = test_signal(size);

        let mut line = DelayLine::new(96_000);
        group.bench_with_input(BenchmarkId::new("integer", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for &sample in &input {
                    sum += line.next_sample(black_box(sample), 12_000);
                }
                sum
            })
        });

        let mut line = DelayLine::new(96_000);
        group.bench_with_input(BenchmarkId::new("interpolated_feedback", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for &sample in &input {
                    let delayed = line.read_interpolated(black_box(12_000.5));
                    line.write(sample + delayed * 0.4);
                    sum += delayed;
                }
                sum
            })
        });
    }

    group.finish();
}
