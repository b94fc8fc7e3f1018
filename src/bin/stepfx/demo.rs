//! Built-in song and effect graph for the demo.

use stepfx::{
    graph::{
        ColorChannel, Connection, FxGraph, FxNode, NodeKind, SourceOutput, OUTPUT_ID, SOURCE_ID,
    },
    sequencing::{Note, RowConfig, ScaleTable, Song},
    voices::VoiceKind,
};

pub const TRACKS: [&str; 4] = ["kick", "snare", "hats", "lead"];
pub const PATTERNS: usize = 4;
pub const STEPS: usize = 16;

const LEAD_ROOT: f32 = 220.0;
/// Minor pentatonic, in semitones above the root.
const LEAD_SCALE: [i32; 5] = [0, 3, 5, 7, 10];

/// Row configs for every scale the demo uses.
pub fn scales() -> ScaleTable {
    let lead = LEAD_SCALE
        .iter()
        .map(|&semi| {
            let freq = LEAD_ROOT * 2.0_f32.powf(semi as f32 / 12.0);
            RowConfig::new(VoiceKind::Synth, freq, 0.35)
        })
        .collect();

    ScaleTable::new()
        .with_scale("kick", vec![RowConfig::new(VoiceKind::Kick, 0.0, 0.9).with_color("#ff2020")])
        .with_scale("snare", vec![RowConfig::new(VoiceKind::Snare, 0.0, 0.6).with_color("#20ff20")])
        .with_scale(
            "hats",
            vec![
                RowConfig::new(VoiceKind::Hat, 0.0, 0.3).with_color("#2020ff"),
                RowConfig::new(VoiceKind::Hat, 0.0, 0.15),
            ],
        )
        .with_scale("lead", lead)
}

/// Four patterns of four tracks; pattern `p` grows busier with `p`.
pub fn song() -> Song {
    let mut song = Song::empty(PATTERNS, TRACKS.len(), 5, STEPS, "lead");
    for pattern in 0..PATTERNS {
        for (track, name) in TRACKS.iter().enumerate() {
            song.set_scale(pattern, track, *name);
        }

        if let Some(kick) = song.grid_mut(pattern, 0) {
            for step in (0..STEPS).step_by(4) {
                kick.set(0, step, Note::new(1));
            }
            if pattern >= 2 {
                kick.set(0, 14, Note::new(1));
            }
        }
        if let Some(snare) = song.grid_mut(pattern, 1) {
            snare.set(0, 4, Note::new(1));
            snare.set(0, 12, Note::new(1));
            if pattern == PATTERNS - 1 {
                snare.set(0, 14, Note::new(2));
            }
        }
        if let Some(hats) = song.grid_mut(pattern, 2) {
            for step in (2..STEPS).step_by(4) {
                hats.set(0, step, Note::new(1));
            }
            if pattern >= 1 {
                for step in (1..STEPS).step_by(2) {
                    hats.set(1, step, Note::new(1));
                }
            }
        }
        if let Some(lead) = song.grid_mut(pattern, 3) {
            let phrase = [(0, 0, 2), (3, 2, 1), (6, 3, 2), (10, 4, 1), (12, 1, 3)];
            for (step, row, len) in phrase {
                let row = (row + pattern) % LEAD_SCALE.len();
                lead.set(row, step, Note::new(len).with_color("#ffd040"));
            }
            if pattern % 2 == 1 {
                lead.set(0, 14, Note::new(2).with_octave(1));
            }
        }
    }
    song
}

/// Drums straight to a compressor, the lead through a filter swept by an
/// LFO, everything into a shared delay and reverb.
pub fn fx_graph() -> FxGraph {
    let nodes = vec![
        FxNode::new(SOURCE_ID, NodeKind::Source),
        FxNode::new("lead-filter", NodeKind::Filter)
            .with_param("cutoff", 0.4)
            .with_param("resonance", 0.3),
        FxNode::new("sweep", NodeKind::Lfo)
            .with_param("rate", 0.25)
            .with_param("amp", 0.8)
            .with_param("normalize", 1.0),
        FxNode::new("sweep-range", NodeKind::SetRange)
            .with_param("oldMin", 0.0)
            .with_param("oldMax", 1.0)
            .with_param("newMin", 0.2)
            .with_param("newMax", 0.9),
        FxNode::new("echo", NodeKind::Delay)
            .with_param("time", 0.75)
            .with_param("feedback", 0.35)
            .with_param("mix", 0.25)
            .with_modulation("mix", ColorChannel::Blue),
        FxNode::new("room", NodeKind::Reverb)
            .with_param("time", 0.3)
            .with_param("decay", 0.4)
            .with_param("mix", 0.2),
        FxNode::new("glue", NodeKind::Compressor),
        FxNode::new(OUTPUT_ID, NodeKind::Output),
    ];
    let connections = vec![
        Connection::from_source_output(SourceOutput::Track(3), "lead-filter"),
        Connection::from_source_output(SourceOutput::Mix, "glue"),
        Connection::audio("lead-filter", "echo"),
        Connection::audio("glue", "echo"),
        Connection::audio("echo", "room"),
        Connection::audio("room", OUTPUT_ID),
        Connection::audio("sweep", "sweep-range"),
        Connection::param("sweep-range", "lead-filter", "cutoff"),
    ];
    FxGraph::new(nodes, connections)
}
