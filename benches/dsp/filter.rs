//! Benchmarks for the state-variable filter.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use stepfx::dsp::filter::SVFilter;

use crate::{test_signal, BLOCK_SIZES};

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        let input = test_signal(size);
        let mut buffer = input.clone();

        let mut filter = SVFilter::lowpass(1_200.0, 48_000.0);
        group.bench_with_input(BenchmarkId::new("lowpass", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                filter.render(black_box(&mut buffer));
            })
        });

        // Cutoff moving every block, as the modulation loop does
        let mut filter = SVFilter::lowpass(1_200.0, 48_000.0);
        let mut cutoff = 100.0f32;
        group.bench_with_input(BenchmarkId::new("modulated", size), &size, |b, _| {
            b.iter(|| {
                cutoff = if cutoff > 5_000.0 { 100.0 } else { cutoff + 37.0 };
                filter.set_cutoff(cutoff);
                buffer.copy_from_slice(&input);
                filter.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
