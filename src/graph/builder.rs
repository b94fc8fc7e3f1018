//! Signal graph builder: keeps the live routing congruent with the latest
//! [`FxGraph`] snapshot.
//!
//! # Update Paths
//!
//! ```text
//!   structure signature   (id, type, bypass) of every node + every connection
//!   parameter signature   (id, params) of every node
//!
//!   structure same, params same     → nothing
//!   structure same, params changed  → push changed params into live units
//!   structure changed               → disconnect everything, rebuild, replay
//! ```
//!
//! The parameter path never touches topology, so editing a knob never drops
//! a delay tail or a reverb.
//!
//! # Buses
//!
//! ```text
//!   track 0 ─┐ (explicit)  src:track0 ──→ [unit] ──→ ...
//!   track 1 ─┼─┐
//!   track 2 ─┘ └─→ mix bus  src:mix ──→ [unit] ──→ ... ──→ out ──→ master
//! ```
//!
//! Every track without an explicit outbound connection is summed into the
//! mix bus. The mix bus only reaches the master bus through a declared path;
//! nothing forces one. A graph with no nodes at all routes mix → master.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::{Hash, Hasher};

use crate::dsp::mix::sum_in_place;
use crate::error::GraphError;
use crate::graph::model::{Connection, FxGraph, NodeKind, SourceOutput};
use crate::graph::params;
use crate::graph::unit::{ProcessingUnit, UnitContext};

/// Counters describing which update paths have run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphStats {
    pub rebuilds: u64,
    /// Parameter values pushed by the parameter-only update path.
    pub param_pushes: u64,
    /// Units disconnected by rebuilds.
    pub disconnects: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Unchanged,
    ParamsUpdated { pushed: usize },
    Rebuilt,
}

/// Where a unit's input is tapped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tap {
    Track(usize),
    Mix,
    Unit(usize),
}

pub struct SignalGraph {
    ctx: UnitContext,
    units: Vec<ProcessingUnit>,
    index: HashMap<String, usize>,
    inbound: Vec<Vec<Tap>>,
    order: Vec<usize>,
    output: Option<usize>,
    track_buses: Vec<Vec<f32>>,
    mix_bus: Vec<f32>,
    mix_tracks: Vec<usize>,
    default_routing: bool,
    structure_sig: Option<u64>,
    param_sig: Option<u64>,
    last_params: HashMap<String, BTreeMap<String, f32>>,
    next_serial: u64,
    stats: GraphStats,
}

impl SignalGraph {
    /// An empty graph (default mix → master routing) with `track_count`
    /// track buses of `ctx.block_size` frames each.
    pub fn new(ctx: UnitContext, track_count: usize) -> Self {
        Self {
            ctx,
            units: Vec::new(),
            index: HashMap::new(),
            inbound: Vec::new(),
            order: Vec::new(),
            output: None,
            track_buses: vec![vec![0.0; ctx.block_size]; track_count],
            mix_bus: vec![0.0; ctx.block_size],
            mix_tracks: (0..track_count).collect(),
            default_routing: true,
            structure_sig: None,
            param_sig: None,
            last_params: HashMap::new(),
            next_serial: 0,
            stats: GraphStats::default(),
        }
    }

    pub fn stats(&self) -> GraphStats {
        self.stats
    }

    pub fn track_count(&self) -> usize {
        self.track_buses.len()
    }

    pub fn unit(&self, id: &str) -> Option<&ProcessingUnit> {
        self.index.get(id).map(|&i| &self.units[i])
    }

    /// Ids of every live unit, sorted.
    pub fn unit_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.index.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Tracks currently summed into the mix bus.
    pub fn mix_tracks(&self) -> &[usize] {
        &self.mix_tracks
    }

    pub fn bpm(&self) -> f32 {
        self.ctx.bpm
    }

    /// Apply a new snapshot, choosing the least disruptive update path.
    pub fn update(&mut self, graph: &FxGraph) -> UpdateOutcome {
        let structure = structure_signature(graph);
        let params = param_signature(graph);

        if self.structure_sig == Some(structure) {
            if self.param_sig == Some(params) {
                return UpdateOutcome::Unchanged;
            }
            let pushed = self.push_changed_params(graph);
            self.param_sig = Some(params);
            tracing::debug!(pushed, "graph params updated in place");
            return UpdateOutcome::ParamsUpdated { pushed };
        }

        self.rebuild(graph);
        self.structure_sig = Some(structure);
        self.param_sig = Some(params);
        UpdateOutcome::Rebuilt
    }

    fn push_changed_params(&mut self, graph: &FxGraph) -> usize {
        let mut pushed = 0;
        for node in &graph.nodes {
            let Some(&idx) = self.index.get(&node.id) else {
                continue;
            };
            let previous = self.last_params.get(&node.id);
            for spec in params::schema(node.kind) {
                let old = previous.and_then(|p| p.get(spec.name)).copied();
                let new = node.params.get(spec.name).copied();
                if old.map(f32::to_bits) == new.map(f32::to_bits) {
                    continue;
                }
                self.units[idx].set_param(spec.name, node.param(spec.name), self.ctx.bpm);
                pushed += 1;
            }
            self.last_params.insert(node.id.clone(), node.params.clone());
        }
        self.stats.param_pushes += pushed as u64;
        pushed
    }

    fn rebuild(&mut self, graph: &FxGraph) {
        for unit in self.units.iter_mut() {
            unit.disconnect();
            self.stats.disconnects += 1;
        }
        self.units.clear();
        self.index.clear();
        self.inbound.clear();
        self.order.clear();
        self.output = None;
        self.last_params.clear();
        self.mix_tracks.clear();

        for node in &graph.nodes {
            if self.index.contains_key(&node.id) {
                tracing::debug!(node = %node.id, "duplicate node id skipped");
                continue;
            }
            let unit = ProcessingUnit::build(node, &self.ctx, self.next_serial);
            self.next_serial += 1;
            self.index.insert(node.id.clone(), self.units.len());
            self.units.push(unit);
            self.inbound.push(Vec::new());
            self.last_params.insert(node.id.clone(), node.params.clone());
            if node.kind == NodeKind::Output && self.output.is_none() {
                self.output = self.index.get(&node.id).copied();
            }
        }

        let mut explicit_tracks = vec![false; self.track_buses.len()];
        let mut wired = 0usize;
        for connection in &graph.connections {
            if connection.is_modulation() {
                continue;
            }
            match self.wire(connection) {
                Ok(tap) => {
                    if let Tap::Track(n) = tap {
                        explicit_tracks[n] = true;
                    }
                    wired += 1;
                }
                Err(e) => tracing::debug!(error = %e, "skipping connection"),
            }
        }

        self.mix_tracks = explicit_tracks
            .iter()
            .enumerate()
            .filter(|(_, explicit)| !**explicit)
            .map(|(n, _)| n)
            .collect();
        self.default_routing = graph.nodes.is_empty();
        self.order = self.topological_order();
        self.stats.rebuilds += 1;

        tracing::debug!(
            units = self.units.len(),
            wired,
            mix_tracks = ?self.mix_tracks,
            "graph rebuilt"
        );
    }

    fn wire(&mut self, connection: &Connection) -> Result<Tap, GraphError> {
        let &source = self
            .index
            .get(&connection.source)
            .ok_or_else(|| GraphError::UnknownNode(connection.source.clone()))?;
        let &target = self
            .index
            .get(&connection.target)
            .ok_or_else(|| GraphError::UnknownNode(connection.target.clone()))?;

        if !self.units[target].has_audio_input() {
            return Err(GraphError::NoAudioInput(connection.target.clone()));
        }

        let tap = if self.units[source].node_kind == NodeKind::Source {
            match SourceOutput::parse(connection.source_output.as_deref())? {
                SourceOutput::Mix => Tap::Mix,
                SourceOutput::Track(n) if n < self.track_buses.len() => Tap::Track(n),
                SourceOutput::Track(n) => return Err(GraphError::MissingTrackBus(n)),
            }
        } else {
            if !self.units[source].has_audio_output() {
                return Err(GraphError::NoAudioOutput(connection.source.clone()));
            }
            if self.reaches(target, source) {
                return Err(GraphError::Cycle(connection.source.clone()));
            }
            Tap::Unit(source)
        };

        self.inbound[target].push(tap);
        Ok(tap)
    }

    /// Whether audio already flows from unit `from` to unit `to`.
    fn reaches(&self, from: usize, to: usize) -> bool {
        let mut stack = vec![from];
        let mut seen = vec![false; self.units.len()];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if std::mem::replace(&mut seen[current], true) {
                continue;
            }
            for (next, taps) in self.inbound.iter().enumerate() {
                if taps.contains(&Tap::Unit(current)) {
                    stack.push(next);
                }
            }
        }
        false
    }

    fn topological_order(&self) -> Vec<usize> {
        let n = self.units.len();
        let mut indegree = vec![0usize; n];
        let mut outgoing = vec![Vec::new(); n];
        for (target, taps) in self.inbound.iter().enumerate() {
            for tap in taps {
                if let Tap::Unit(source) = *tap {
                    indegree[target] += 1;
                    outgoing[source].push(target);
                }
            }
        }

        let mut ready: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = ready.pop_front() {
            order.push(i);
            for &next in &outgoing[i] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    ready.push_back(next);
                }
            }
        }
        order
    }

    /// Parameter-update hook for the modulation loop. Never touches topology.
    pub fn push_param(&mut self, id: &str, param: &str, value: f32) -> Result<(), GraphError> {
        let &idx = self
            .index
            .get(id)
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))?;
        self.units[idx].set_param(param, value, self.ctx.bpm);
        Ok(())
    }

    /// Tempo change: every tempo-relative unit is retimed in place.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.ctx.bpm = bpm;
        for unit in self.units.iter_mut() {
            unit.retime(bpm);
        }
    }

    /// Track buses for the voice pool to render into.
    pub fn track_buses_mut(&mut self) -> &mut [Vec<f32>] {
        &mut self.track_buses
    }

    pub fn clear_track_buses(&mut self, frames: usize) {
        for bus in self.track_buses.iter_mut() {
            bus[..frames].fill(0.0);
        }
    }

    /// Push the current track buses through the graph, adding the result to
    /// `master`.
    pub fn render(&mut self, frames: usize, master: &mut [f32]) {
        let frames = frames.min(self.ctx.block_size).min(master.len());

        self.mix_bus[..frames].fill(0.0);
        for &track in &self.mix_tracks {
            sum_in_place(&mut self.mix_bus[..frames], &self.track_buses[track][..frames]);
        }

        for &idx in &self.order {
            self.units[idx].input[..frames].fill(0.0);
            for tap in &self.inbound[idx] {
                match *tap {
                    Tap::Track(n) => sum_in_place(
                        &mut self.units[idx].input[..frames],
                        &self.track_buses[n][..frames],
                    ),
                    Tap::Mix => sum_in_place(
                        &mut self.units[idx].input[..frames],
                        &self.mix_bus[..frames],
                    ),
                    Tap::Unit(source) => {
                        let (dst, src) = pair_mut(&mut self.units, idx, source);
                        sum_in_place(&mut dst.input[..frames], &src.output[..frames]);
                    }
                }
            }
            self.units[idx].process(frames);
        }

        if self.default_routing {
            sum_in_place(&mut master[..frames], &self.mix_bus[..frames]);
        } else if let Some(out) = self.output {
            sum_in_place(&mut master[..frames], &self.units[out].output[..frames]);
        }
    }
}

fn pair_mut(
    units: &mut [ProcessingUnit],
    dst: usize,
    src: usize,
) -> (&mut ProcessingUnit, &ProcessingUnit) {
    debug_assert_ne!(dst, src);
    if dst < src {
        let (head, tail) = units.split_at_mut(src);
        (&mut head[dst], &tail[0])
    } else {
        let (head, tail) = units.split_at_mut(dst);
        (&mut tail[0], &head[src])
    }
}

fn structure_signature(graph: &FxGraph) -> u64 {
    let mut hasher = DefaultHasher::new();
    graph.nodes.len().hash(&mut hasher);
    for node in &graph.nodes {
        node.id.hash(&mut hasher);
        node.kind.hash(&mut hasher);
        node.bypass.hash(&mut hasher);
    }
    graph.connections.hash(&mut hasher);
    hasher.finish()
}

fn param_signature(graph: &FxGraph) -> u64 {
    let mut hasher = DefaultHasher::new();
    for node in &graph.nodes {
        node.id.hash(&mut hasher);
        for (name, value) in &node.params {
            name.hash(&mut hasher);
            value.to_bits().hash(&mut hasher);
        }
    }
    hasher.finish()
}
