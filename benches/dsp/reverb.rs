//! Benchmarks for partitioned convolution.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use stepfx::dsp::reverb::{generate_impulse, Convolver};

use crate::{test_signal, BLOCK_SIZES};

pub fn bench_reverb(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/reverb");
    let sample_rate = 48_000.0;

    for &size in BLOCK_SIZES {
        let input = test_signal(size);

        for (name, seconds) in [("short_tail", 0.3), ("long_tail", 2.5)] {
            let impulse = generate_impulse(sample_rate, seconds, 3.0, 7);
            let mut convolver = Convolver::new(&impulse);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    let mut sum = 0.0f32;
                    for &sample in &input {
                        sum += convolver.process(black_box(sample));
                    }
                    sum
                })
            });
        }
    }

    group.finish();
}
