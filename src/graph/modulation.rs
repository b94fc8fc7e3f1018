//! Continuous modulation loop.
//!
//! Runs once per animation frame whether or not the transport is playing.
//! Two independent mechanisms push values into live units:
//!
//! 1. **Connections** carrying a target parameter: the source node is
//!    resolved at `time`, clamped to `[0, 1]`, and pushed.
//! 2. **Color mappings** declared on a node parameter: the node's stored
//!    value is blended with the matching channel of the current average note
//!    color and pushed.
//!
//! Connections are evaluated first and color mappings second, so when both
//! target the same parameter in the same frame the color value is the one
//! that sticks.

use crate::error::GraphError;
use crate::graph::builder::SignalGraph;
use crate::graph::model::{ColorSample, FxGraph};
use crate::graph::params;
use crate::graph::resolve::resolve;

/// Weight of the color channel in a color-modulated parameter.
pub const COLOR_BLEND: f32 = 0.5;

/// Anything that accepts per-parameter pushes by node id.
pub trait ParamTarget {
    fn push_param(&mut self, node: &str, param: &str, value: f32) -> Result<(), GraphError>;
}

impl ParamTarget for SignalGraph {
    fn push_param(&mut self, node: &str, param: &str, value: f32) -> Result<(), GraphError> {
        SignalGraph::push_param(self, node, param, value)
    }
}

/// Values pushed in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModulationReport {
    pub connection_pushes: usize,
    pub color_pushes: usize,
    /// Pushes rejected by the target (stale node ids).
    pub skipped: usize,
}

/// `base · (1 − COLOR_BLEND) + channel · COLOR_BLEND`
#[inline]
pub fn blend_color(base: f32, channel: f32) -> f32 {
    base * (1.0 - COLOR_BLEND) + channel * COLOR_BLEND
}

/// Run one modulation frame against `target`.
pub fn run_modulation<T: ParamTarget + ?Sized>(
    graph: &FxGraph,
    target: &mut T,
    time: f64,
    lfo_epoch: f64,
    color: &ColorSample,
) -> ModulationReport {
    let mut report = ModulationReport::default();

    for connection in &graph.connections {
        let Some(param) = connection.target_param.as_deref() else {
            continue;
        };
        let Some(source) = graph.node(&connection.source) else {
            report.skipped += 1;
            continue;
        };
        let value = resolve(graph, source, time, lfo_epoch).clamp(0.0, 1.0);
        match target.push_param(&connection.target, param, value) {
            Ok(()) => report.connection_pushes += 1,
            Err(e) => {
                tracing::trace!(error = %e, "modulation push skipped");
                report.skipped += 1;
            }
        }
    }

    for node in &graph.nodes {
        for (param, channel) in &node.modulations {
            let Some(channel_value) = color.channel(*channel) else {
                continue;
            };
            let blended = blend_color(node.param(param), channel_value);
            let value = match params::spec(node.kind, param) {
                Some(spec) => spec.clamp(blended),
                None => blended,
            };
            match target.push_param(&node.id, param, value) {
                Ok(()) => report.color_pushes += 1,
                Err(e) => {
                    tracing::trace!(error = %e, "color push skipped");
                    report.skipped += 1;
                }
            }
        }
    }

    report
}
