//! Benchmarks for the oversampled waveshaper.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use stepfx::dsp::distortion::{soft_clip, WaveShaper};

use crate::{test_signal, BLOCK_SIZES};

pub fn bench_distortion(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/distortion");

    for &size in BLOCK_SIZES {
        let input = test_signal(size);

        let mut shaper = WaveShaper::new(40.0);
        group.bench_with_input(BenchmarkId::new("waveshaper_4x", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for &sample in &input {
                    sum += shaper.process(black_box(sample));
                }
                sum
            })
        });

        group.bench_with_input(BenchmarkId::new("soft_clip", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for &sample in &input {
                    sum += soft_clip(black_box(sample), 2.0);
                }
                sum
            })
        });
    }

    group.finish();
}
