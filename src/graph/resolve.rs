//! Modulation value resolver.
//!
//! `resolve` answers "what scalar does this control node produce at time
//! `t`?". It is a pure function of `(graph, node, time, lfo_epoch)`: the
//! modulation loop and any presentation layer calling it for the same inputs
//! get the same answer.
//!
//! | kind       | value                                                     |
//! | ---------- | --------------------------------------------------------- |
//! | `float`    | stored `value`                                            |
//! | `int`      | stored `value`, rounded                                   |
//! | `lfo`      | waveform at `(max(0, t − epoch) · rate) + phase`, × `amp` |
//! | `setRange` | upstream value remapped `[oldMin, oldMax] → [newMin, newMax]` |
//! | other      | 0                                                         |
//!
//! Chains are resolved recursively. A chain that loops back on itself, or
//! runs deeper than [`MAX_DEPTH`], resolves to 0 at the point of the repeat.

use crate::dsp::lfo::lfo_value;
use crate::dsp::oscillator::OscillatorWaveform;
use crate::graph::model::{FxGraph, FxNode, NodeKind};

/// Longest modulation chain followed before giving up.
pub const MAX_DEPTH: usize = 32;

/// Input ranges narrower than this are treated as degenerate.
const RANGE_EPSILON: f32 = 1.0e-9;

pub fn resolve(graph: &FxGraph, node: &FxNode, time: f64, lfo_epoch: f64) -> f32 {
    let mut visiting = Vec::with_capacity(4);
    let value = resolve_inner(graph, node, time, lfo_epoch, &mut visiting);
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn resolve_inner<'g>(
    graph: &'g FxGraph,
    node: &'g FxNode,
    time: f64,
    lfo_epoch: f64,
    visiting: &mut Vec<&'g str>,
) -> f32 {
    if visiting.len() >= MAX_DEPTH || visiting.contains(&node.id.as_str()) {
        tracing::trace!(node = %node.id, "modulation chain cycle, resolving to 0");
        return 0.0;
    }

    match node.kind {
        NodeKind::Float => node.param("value"),
        NodeKind::Int => node.param("value").round(),
        NodeKind::Lfo => lfo_value(
            OscillatorWaveform::from_index(node.param("type")),
            time,
            lfo_epoch,
            node.param("rate"),
            node.param("phase"),
            node.param("amp"),
            node.param("normalize") >= 0.5,
        ),
        NodeKind::SetRange => {
            let input = match graph.unnamed_input_of(&node.id) {
                Some(upstream) => {
                    visiting.push(&node.id);
                    let v = resolve_inner(graph, upstream, time, lfo_epoch, visiting);
                    visiting.pop();
                    v
                }
                None => 0.0,
            };
            map_range(
                input,
                node.param("oldMin"),
                node.param("oldMax"),
                node.param("newMin"),
                node.param("newMax"),
            )
        }
        NodeKind::Source
        | NodeKind::Output
        | NodeKind::Delay
        | NodeKind::Filter
        | NodeKind::Distortion
        | NodeKind::Reverb
        | NodeKind::Compressor
        | NodeKind::Mixer
        | NodeKind::ParametricEq => 0.0,
    }
}

/// Linear remap; a zero-width input range maps everything to 0.
pub fn map_range(value: f32, old_min: f32, old_max: f32, new_min: f32, new_max: f32) -> f32 {
    let span = old_max - old_min;
    if span.abs() < RANGE_EPSILON || !value.is_finite() {
        return 0.0;
    }
    new_min + (value - old_min) / span * (new_max - new_min)
}
