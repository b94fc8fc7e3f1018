use std::sync::Arc;

use stepfx::{
    graph::{
        Connection, FxGraph, FxNode, NodeKind, SourceOutput, UpdateOutcome, OUTPUT_ID, SOURCE_ID,
    },
    io::AudioOutput,
    sequencing::{Note, RowConfig, ScaleTable, Song},
    voices::VoiceKind,
    Engine, EngineConfig,
};

const SR: f32 = 48_000.0;

fn peak(buffer: &[f32]) -> f32 {
    buffer.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
}

/// Two tracks; a kick on every beat of track 0, track 1 empty.
fn engine_with_kicks() -> Engine {
    let mut engine = Engine::init(EngineConfig {
        sample_rate: SR,
        track_count: 2,
        ..EngineConfig::default()
    })
    .unwrap();

    let mut song = Song::empty(1, 2, 1, 16, "kit");
    for step in (0..16).step_by(4) {
        song.grid_mut(0, 0).unwrap().set(0, step, Note::new(1));
    }
    engine.set_song(Arc::new(song));
    engine.set_row_source(Box::new(
        ScaleTable::new().with_scale("kit", vec![RowConfig::new(VoiceKind::Kick, 0.0, 1.0)]),
    ));
    engine
}

/// Track 1 is explicitly routed through a mixer; track 0 is left implicit.
fn routed_graph(mix_reaches_output: bool) -> FxGraph {
    let mut connections = vec![
        Connection::from_source_output(SourceOutput::Track(1), "m"),
        Connection::audio("m", OUTPUT_ID),
    ];
    if mix_reaches_output {
        connections.push(Connection::from_source_output(SourceOutput::Mix, OUTPUT_ID));
    }
    FxGraph::new(
        vec![
            FxNode::new(SOURCE_ID, NodeKind::Source),
            FxNode::new("m", NodeKind::Mixer),
            FxNode::new(OUTPUT_ID, NodeKind::Output),
        ],
        connections,
    )
}

fn render_seconds(engine: &mut Engine, seconds: f32) -> Vec<f32> {
    let mut out = vec![0.0; (seconds * SR) as usize];
    for chunk in out.chunks_mut(512) {
        engine.render(chunk);
    }
    out
}

#[test]
fn empty_graph_routes_mix_to_master() {
    let mut engine = engine_with_kicks();
    engine.play().unwrap();
    let out = render_seconds(&mut engine, 0.5);
    assert!(peak(&out) > 0.1);
    assert!(out.iter().all(|s| s.is_finite() && s.abs() < 1.0));
}

#[test]
fn implicit_track_reaches_output_through_declared_mix_path() {
    let mut engine = engine_with_kicks();
    engine.set_graph(routed_graph(true));
    engine.play().unwrap();
    let out = render_seconds(&mut engine, 0.5);
    assert!(peak(&out) > 0.1);
}

#[test]
fn implicit_track_is_silent_without_mix_path() {
    let mut engine = engine_with_kicks();
    engine.set_graph(routed_graph(false));
    engine.play().unwrap();
    let out = render_seconds(&mut engine, 0.5);
    assert_eq!(peak(&out), 0.0);
    assert_eq!(engine.graph().mix_tracks(), &[0]);
}

#[test]
fn kick_starts_on_the_frame_playback_started() {
    let mut engine = engine_with_kicks();
    render_seconds(&mut engine, 0.25);
    let start = engine.clock().frame();
    engine.play().unwrap();

    let out = render_seconds(&mut engine, 0.1);
    // The kick's sine starts at phase 0, so the first frame is exactly 0
    assert_eq!(out[0], 0.0);
    assert!(out[1].abs() > 0.0);
    assert_eq!(engine.voices().voices()[0].start_frame(), start);
}

#[test]
fn param_only_change_does_not_rebuild() {
    let mut engine = engine_with_kicks();
    let mut graph = FxGraph::default_chain();
    graph.nodes.insert(1, FxNode::new("echo", NodeKind::Delay).with_param("mix", 0.2));
    graph.connections = vec![
        Connection::audio(SOURCE_ID, "echo"),
        Connection::audio("echo", OUTPUT_ID),
    ];
    assert_eq!(engine.set_graph(graph.clone()), UpdateOutcome::Rebuilt);
    let serial = engine.graph().unit("echo").unwrap().serial;
    let before = engine.graph_stats();

    graph.nodes[1].params.insert("mix".into(), 0.6);
    assert_eq!(
        engine.set_graph(graph.clone()),
        UpdateOutcome::ParamsUpdated { pushed: 1 }
    );
    let after = engine.graph_stats();
    assert_eq!(after.rebuilds, before.rebuilds);
    assert_eq!(after.disconnects, before.disconnects);
    assert_eq!(engine.graph().unit("echo").unwrap().serial, serial);

    assert_eq!(engine.set_graph(graph), UpdateOutcome::Unchanged);
}

#[test]
fn added_node_retopologizes() {
    let mut engine = engine_with_kicks();
    let graph = routed_graph(true);
    engine.set_graph(graph.clone());
    let disconnects = engine.graph_stats().disconnects;

    let mut bigger = graph;
    bigger.nodes.push(FxNode::new("crush", NodeKind::Distortion));
    assert_eq!(engine.set_graph(bigger), UpdateOutcome::Rebuilt);

    assert_eq!(engine.graph_stats().disconnects, disconnects + 3);
    assert_eq!(engine.graph().unit_ids(), vec!["crush", "m", "out", "src"]);
}

#[test]
fn tempo_change_retimes_delay() {
    let mut engine = engine_with_kicks();
    let graph = FxGraph::new(
        vec![
            FxNode::new(SOURCE_ID, NodeKind::Source),
            FxNode::new("echo", NodeKind::Delay).with_param("time", 0.5),
            FxNode::new(OUTPUT_ID, NodeKind::Output),
        ],
        vec![
            Connection::audio(SOURCE_ID, "echo"),
            Connection::audio("echo", OUTPUT_ID),
        ],
    );
    engine.set_graph(graph);
    let at_120 = engine.graph().unit("echo").unwrap().delay_secs().unwrap();
    engine.set_bpm(60);
    let at_60 = engine.graph().unit("echo").unwrap().delay_secs().unwrap();
    assert!((at_60 - 2.0 * at_120).abs() < 1e-4);
}

#[test]
fn stereo_block_renders_identical_channels() {
    let mut engine = engine_with_kicks();
    engine.play().unwrap();
    let mut output = AudioOutput::new(2, 1_024);
    engine.process_block(&mut output);
    assert_eq!(output.buffers[0], output.buffers[1]);
    assert!(output.buffers[0].iter().all(|s| s.abs() <= 1.0));
}

#[cfg(feature = "serde")]
#[test]
fn graph_json_round_trip_is_lossless() {
    use stepfx::graph::ColorChannel;

    let graph = FxGraph::new(
        vec![
            FxNode::new(SOURCE_ID, NodeKind::Source),
            FxNode::new("eq", NodeKind::ParametricEq)
                .with_param("midGain", 0.8)
                .with_modulation("midGain", ColorChannel::Bright),
            FxNode::new("l", NodeKind::Lfo).with_param("rate", 2.0),
            FxNode::new(OUTPUT_ID, NodeKind::Output),
        ],
        vec![
            Connection::from_source_output(SourceOutput::Track(0), "eq"),
            Connection::audio("eq", OUTPUT_ID),
            Connection::param("l", "eq", "midFreq"),
        ],
    );
    let json = graph.to_json().unwrap();
    assert!(json.contains("parametricEQ"));
    assert_eq!(FxGraph::from_json(&json).unwrap(), graph);
}
