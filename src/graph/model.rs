//! Declarative effect graph: the only routing state the engine reads.
//!
//! An [`FxGraph`] is an immutable snapshot handed to the engine by whatever
//! edits it. The builder realizes it into live units; the resolver and the
//! modulation loop read it directly. Nothing in the engine mutates a graph
//! it has been given.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::graph::params;

/// Reserved id of the sequencer output node.
pub const SOURCE_ID: &str = "src";
/// Reserved id of the final mix destination.
pub const OUTPUT_ID: &str = "out";

/// Closed vocabulary of node types.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Source,
    Output,
    Delay,
    Filter,
    Distortion,
    Reverb,
    Compressor,
    Mixer,
    #[cfg_attr(feature = "serde", serde(rename = "parametricEQ"))]
    ParametricEq,
    Float,
    Int,
    Lfo,
    SetRange,
}

impl NodeKind {
    pub const ALL: [NodeKind; 13] = [
        NodeKind::Source,
        NodeKind::Output,
        NodeKind::Delay,
        NodeKind::Filter,
        NodeKind::Distortion,
        NodeKind::Reverb,
        NodeKind::Compressor,
        NodeKind::Mixer,
        NodeKind::ParametricEq,
        NodeKind::Float,
        NodeKind::Int,
        NodeKind::Lfo,
        NodeKind::SetRange,
    ];

    /// Nodes that process audio (everything except endpoints and controls).
    pub fn is_effect(self) -> bool {
        matches!(
            self,
            NodeKind::Delay
                | NodeKind::Filter
                | NodeKind::Distortion
                | NodeKind::Reverb
                | NodeKind::Compressor
                | NodeKind::Mixer
                | NodeKind::ParametricEq
        )
    }

    /// Modulation sources: produce a scalar, never audio.
    pub fn is_control(self) -> bool {
        matches!(
            self,
            NodeKind::Float | NodeKind::Int | NodeKind::Lfo | NodeKind::SetRange
        )
    }

    pub fn has_audio_input(self) -> bool {
        self.is_effect() || self == NodeKind::Output
    }

    pub fn has_audio_output(self) -> bool {
        self.is_effect() || self == NodeKind::Source
    }
}

/// Which note-color channel drives a parameter.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorChannel {
    Red,
    Green,
    Blue,
    Bright,
    #[default]
    None,
}

/// Average color of the currently sounding notes, every channel in `[0, 1]`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColorSample {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub brightness: f32,
}

impl ColorSample {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        let (r, g, b) = (r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0));
        Self {
            r,
            g,
            b,
            brightness: (r + g + b) / 3.0,
        }
    }

    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        let (r, g, b) = (channel(0)?, channel(2)?, channel(4)?);
        Some(Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
        ))
    }

    /// Mean of several samples; black when there are none.
    pub fn average<I: IntoIterator<Item = ColorSample>>(samples: I) -> Self {
        let mut sum = ColorSample::default();
        let mut count = 0usize;
        for s in samples {
            sum.r += s.r;
            sum.g += s.g;
            sum.b += s.b;
            sum.brightness += s.brightness;
            count += 1;
        }
        if count == 0 {
            return sum;
        }
        let n = count as f32;
        ColorSample {
            r: sum.r / n,
            g: sum.g / n,
            b: sum.b / n,
            brightness: sum.brightness / n,
        }
    }

    pub fn channel(&self, channel: ColorChannel) -> Option<f32> {
        match channel {
            ColorChannel::Red => Some(self.r),
            ColorChannel::Green => Some(self.g),
            ColorChannel::Blue => Some(self.b),
            ColorChannel::Bright => Some(self.brightness),
            ColorChannel::None => None,
        }
    }
}

/// Editor position; has no effect on audio.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FxNode {
    pub id: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: NodeKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub params: BTreeMap<String, f32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub position: Position,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "BTreeMap::is_empty")
    )]
    pub modulations: BTreeMap<String, ColorChannel>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub bypass: bool,
}

impl FxNode {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            params: BTreeMap::new(),
            position: Position::default(),
            modulations: BTreeMap::new(),
            bypass: false,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: f32) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn with_modulation(mut self, param: impl Into<String>, channel: ColorChannel) -> Self {
        self.modulations.insert(param.into(), channel);
        self
    }

    pub fn bypassed(mut self) -> Self {
        self.bypass = true;
        self
    }

    /// Stored value of `name`, or the schema default, clamped to the schema
    /// range. Names outside the schema return the raw stored value (or 0).
    pub fn param(&self, name: &str) -> f32 {
        let stored = self.params.get(name).copied();
        match params::spec(self.kind, name) {
            Some(spec) => spec.clamp(stored.unwrap_or(spec.default)),
            None => stored.filter(|v| v.is_finite()).unwrap_or(0.0),
        }
    }
}

/// Where on the source node a connection taps audio from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOutput {
    /// The shared mix of every track not wired explicitly.
    Mix,
    Track(usize),
}

impl SourceOutput {
    /// `None`, `"mix"` and `"main"` name the mix bus; `"trackN"` names the
    /// output bus of track `N` (zero-based).
    pub fn parse(name: Option<&str>) -> Result<Self, GraphError> {
        match name {
            None | Some("mix") | Some("main") => Ok(SourceOutput::Mix),
            Some(other) => other
                .strip_prefix("track")
                .and_then(|n| n.parse::<usize>().ok())
                .map(SourceOutput::Track)
                .ok_or_else(|| GraphError::UnknownSubOutput(other.to_string())),
        }
    }

    pub fn name(self) -> String {
        match self {
            SourceOutput::Mix => "mix".to_string(),
            SourceOutput::Track(n) => format!("track{n}"),
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    pub source: String,
    pub target: String,
    /// Present: drives a control parameter. Absent: audio into the main input.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub target_param: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub source_output: Option<String>,
}

impl Connection {
    pub fn audio(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            target_param: None,
            source_output: None,
        }
    }

    pub fn from_source_output(output: SourceOutput, target: impl Into<String>) -> Self {
        Self {
            source: SOURCE_ID.to_string(),
            target: target.into(),
            target_param: None,
            source_output: Some(output.name()),
        }
    }

    pub fn param(
        source: impl Into<String>,
        target: impl Into<String>,
        param: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            target_param: Some(param.into()),
            source_output: None,
        }
    }

    pub fn is_modulation(&self) -> bool {
        self.target_param.is_some()
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FxGraph {
    #[cfg_attr(feature = "serde", serde(default))]
    pub nodes: Vec<FxNode>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub connections: Vec<Connection>,
}

impl FxGraph {
    pub fn new(nodes: Vec<FxNode>, connections: Vec<Connection>) -> Self {
        Self { nodes, connections }
    }

    /// The two permanent endpoints wired straight through.
    pub fn default_chain() -> Self {
        Self {
            nodes: vec![
                FxNode::new(SOURCE_ID, NodeKind::Source),
                FxNode::new(OUTPUT_ID, NodeKind::Output),
            ],
            connections: vec![Connection::audio(SOURCE_ID, OUTPUT_ID)],
        }
    }

    pub fn node(&self, id: &str) -> Option<&FxNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Upstream node feeding `target`'s unnamed (parameter-less) input.
    pub fn unnamed_input_of(&self, target: &str) -> Option<&FxNode> {
        self.connections
            .iter()
            .find(|c| c.target == target && c.target_param.is_none())
            .and_then(|c| self.node(&c.source))
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> crate::error::Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::error::EngineError::Serialization(e.to_string()))
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| crate::error::EngineError::Serialization(e.to_string()))
    }
}
