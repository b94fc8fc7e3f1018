//! Benchmarks for look-ahead scheduling.

use std::hint::black_box;

use criterion::Criterion;
use stepfx::{
    sequencing::{Note, RowConfig, ScaleTable, Song, StepScheduler, StepTrigger, VoiceSink},
    voices::VoiceKind,
    DispatchError, EngineConfig,
};

struct CountingSink(usize);

impl VoiceSink for CountingSink {
    fn trigger(&mut self, trigger: &StepTrigger) -> Result<(), DispatchError> {
        self.0 += black_box(trigger.row) + 1;
        Ok(())
    }
}

/// Eight tracks of eight rows, every cell filled.
fn busy_song() -> (Song, ScaleTable) {
    let mut song = Song::empty(4, 8, 8, 16, "full");
    for pattern in 0..4 {
        for track in 0..8 {
            if let Some(grid) = song.grid_mut(pattern, track) {
                for row in 0..8 {
                    for step in 0..16 {
                        grid.set(row, step, Note::new(1 + (step % 3) as u32));
                    }
                }
            }
        }
    }
    let rows = (0..8)
        .map(|i| {
            let kind = if i < 4 { VoiceKind::Hat } else { VoiceKind::Synth };
            RowConfig::new(kind, 110.0 * (i + 1) as f32, 0.5)
        })
        .collect();
    (song, ScaleTable::new().with_scale("full", rows))
}

pub fn bench_scheduler(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/scheduler");
    let (song, rows) = busy_song();
    let config = EngineConfig {
        track_count: 8,
        ..EngineConfig::default()
    };

    group.bench_function("tick_busy_song", |b| {
        let mut scheduler = StepScheduler::new(&config);
        let mut sink = CountingSink(0);
        let mut now = 0.0;
        scheduler.start(now);
        b.iter(|| {
            now += 0.025;
            scheduler.tick(black_box(now), &song, &rows, &mut sink)
        })
    });

    group.finish();
}
