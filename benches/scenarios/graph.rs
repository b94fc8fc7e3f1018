//! Benchmarks for rendering through a signal graph.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion};
use stepfx::{
    graph::{Connection, FxGraph, FxNode, NodeKind, SourceOutput, OUTPUT_ID, SOURCE_ID},
    sequencing::{Note, RowConfig, ScaleTable, Song},
    voices::VoiceKind,
    Engine, EngineConfig,
};

use crate::BLOCK_SIZES;

fn effect_chain() -> FxGraph {
    FxGraph::new(
        vec![
            FxNode::new(SOURCE_ID, NodeKind::Source),
            FxNode::new("eq", NodeKind::ParametricEq).with_param("lowGain", 0.7),
            FxNode::new("drive", NodeKind::Distortion).with_param("drive", 0.3),
            FxNode::new("filter", NodeKind::Filter),
            FxNode::new("echo", NodeKind::Delay),
            FxNode::new("room", NodeKind::Reverb),
            FxNode::new("glue", NodeKind::Compressor),
            FxNode::new("lfo", NodeKind::Lfo).with_param("normalize", 1.0),
            FxNode::new(OUTPUT_ID, NodeKind::Output),
        ],
        vec![
            Connection::from_source_output(SourceOutput::Mix, "eq"),
            Connection::audio("eq", "drive"),
            Connection::audio("drive", "filter"),
            Connection::audio("filter", "echo"),
            Connection::audio("echo", "room"),
            Connection::audio("room", "glue"),
            Connection::audio("glue", OUTPUT_ID),
            Connection::param("lfo", "filter", "cutoff"),
        ],
    )
}

fn playing_engine(graph: FxGraph) -> Engine {
    let mut engine = Engine::init(EngineConfig {
        track_count: 2,
        ..EngineConfig::default()
    })
    .expect("default config is valid");

    let mut song = Song::empty(1, 2, 2, 16, "kit");
    if let Some(grid) = song.grid_mut(0, 0) {
        for step in 0..16 {
            grid.set(step % 2, step, Note::new(1));
        }
    }
    if let Some(grid) = song.grid_mut(0, 1) {
        grid.set(1, 0, Note::new(8));
    }
    engine.set_song(Arc::new(song));
    engine.set_row_source(Box::new(ScaleTable::new().with_scale(
        "kit",
        vec![
            RowConfig::new(VoiceKind::Kick, 0.0, 0.8),
            RowConfig::new(VoiceKind::Synth, 220.0, 0.4),
        ],
    )));
    engine.set_graph(graph);
    engine.play().expect("engine is running");
    engine
}

pub fn bench_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/graph");

    for &size in BLOCK_SIZES {
        let mut out = vec![0.0f32; size];

        let mut engine = playing_engine(FxGraph::default());
        group.bench_with_input(BenchmarkId::new("default_routing", size), &size, |b, _| {
            b.iter(|| engine.render(black_box(&mut out)))
        });

        let mut engine = playing_engine(effect_chain());
        group.bench_with_input(BenchmarkId::new("full_chain", size), &size, |b, _| {
            b.iter(|| engine.render(black_box(&mut out)))
        });
    }

    group.finish();
}
