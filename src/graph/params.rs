//! Per-node-type parameter schema.
//!
//! One table answers "which parameters does this node have, what range do
//! they live in, and what is the default" for every consumer: the model's
//! clamped lookups, the effect units, and the color blender. Effect controls
//! are normalized to `[0, 1]`; each unit maps them to a natural range.

use crate::graph::model::NodeKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParamSpec {
    const fn new(name: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self {
            name,
            min,
            max,
            default,
        }
    }

    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(self.min, self.max)
        }
    }
}

/// Bound for free-valued control nodes.
pub const CONTROL_LIMIT: f32 = 1.0e6;

const DELAY: &[ParamSpec] = &[
    ParamSpec::new("time", 0.0, 1.0, 0.5),
    ParamSpec::new("feedback", 0.0, 1.0, 0.4),
    ParamSpec::new("mix", 0.0, 1.0, 0.3),
];

const FILTER: &[ParamSpec] = &[
    ParamSpec::new("cutoff", 0.0, 1.0, 0.5),
    ParamSpec::new("resonance", 0.0, 1.0, 0.1),
];

const DISTORTION: &[ParamSpec] = &[ParamSpec::new("drive", 0.0, 1.0, 0.2)];

const REVERB: &[ParamSpec] = &[
    ParamSpec::new("time", 0.0, 1.0, 0.4),
    ParamSpec::new("decay", 0.0, 1.0, 0.3),
    ParamSpec::new("mix", 0.0, 1.0, 0.3),
];

const COMPRESSOR: &[ParamSpec] = &[
    ParamSpec::new("threshold", 0.0, 1.0, 0.76),
    ParamSpec::new("knee", 0.0, 1.0, 0.75),
    ParamSpec::new("ratio", 0.0, 1.0, 0.58),
    ParamSpec::new("attack", 0.0, 1.0, 0.003),
    ParamSpec::new("release", 0.0, 1.0, 0.25),
];

const MIXER: &[ParamSpec] = &[ParamSpec::new("gain", 0.0, 2.0, 1.0)];

const PARAMETRIC_EQ: &[ParamSpec] = &[
    ParamSpec::new("lowFreq", 0.0, 1.0, 0.2),
    ParamSpec::new("lowGain", 0.0, 1.0, 0.5),
    ParamSpec::new("midFreq", 0.0, 1.0, 0.5),
    ParamSpec::new("midGain", 0.0, 1.0, 0.5),
    ParamSpec::new("midQ", 0.0, 1.0, 0.1),
    ParamSpec::new("highFreq", 0.0, 1.0, 0.5),
    ParamSpec::new("highGain", 0.0, 1.0, 0.5),
];

const CONSTANT: &[ParamSpec] = &[ParamSpec::new("value", -CONTROL_LIMIT, CONTROL_LIMIT, 0.0)];

const LFO: &[ParamSpec] = &[
    ParamSpec::new("rate", 0.0, 50.0, 1.0),
    ParamSpec::new("type", 0.0, 3.0, 0.0),
    ParamSpec::new("amp", 0.0, CONTROL_LIMIT, 1.0),
    ParamSpec::new("phase", 0.0, 1.0, 0.0),
    ParamSpec::new("normalize", 0.0, 1.0, 0.0),
];

const SET_RANGE: &[ParamSpec] = &[
    ParamSpec::new("oldMin", -CONTROL_LIMIT, CONTROL_LIMIT, -1.0),
    ParamSpec::new("oldMax", -CONTROL_LIMIT, CONTROL_LIMIT, 1.0),
    ParamSpec::new("newMin", -CONTROL_LIMIT, CONTROL_LIMIT, 0.0),
    ParamSpec::new("newMax", -CONTROL_LIMIT, CONTROL_LIMIT, 1.0),
];

/// Every parameter a node of `kind` understands.
pub fn schema(kind: NodeKind) -> &'static [ParamSpec] {
    match kind {
        NodeKind::Source | NodeKind::Output => &[],
        NodeKind::Delay => DELAY,
        NodeKind::Filter => FILTER,
        NodeKind::Distortion => DISTORTION,
        NodeKind::Reverb => REVERB,
        NodeKind::Compressor => COMPRESSOR,
        NodeKind::Mixer => MIXER,
        NodeKind::ParametricEq => PARAMETRIC_EQ,
        NodeKind::Float | NodeKind::Int => CONSTANT,
        NodeKind::Lfo => LFO,
        NodeKind::SetRange => SET_RANGE,
    }
}

pub fn spec(kind: NodeKind, name: &str) -> Option<&'static ParamSpec> {
    schema(kind).iter().find(|p| p.name == name)
}
