//! Effect node factory: live processing units built from [`FxNode`]s.
//!
//! Each unit owns an input and an output block buffer and its own internal
//! dry/wet/feedback topology. The builder sums upstream audio into `input`,
//! calls [`ProcessingUnit::process`], and reads `output`.
//!
//! ```text
//! delay       in ─┬──────────────────────── dry ──┐
//!                 └─→ [line] ─┬─ wet ────────────(+)─→ out
//!                      ↑      │
//!                      └─ fb ─┘
//!
//! reverb      in ─┬────────────── dry ──┐
//!                 └─→ [convolver] ─ wet (+)─→ out
//! ```
//!
//! All controls arrive normalized through [`ProcessingUnit::set_param`] and
//! are mapped to natural units here.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Q_BUTTERWORTH_F32};

use crate::dsp::compressor::Compressor;
use crate::dsp::delay::DelayLine;
use crate::dsp::distortion::WaveShaper;
use crate::dsp::filter::SVFilter;
use crate::dsp::mix::blend_dry_wet;
use crate::dsp::reverb::{generate_impulse, Convolver};
use crate::graph::model::{FxNode, NodeKind};
use crate::graph::params;

/// Fixed seed so the same reverb settings always yield the same tail.
const REVERB_SEED: u64 = 0x5eed;

/// Settings every unit is built against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitContext {
    pub sample_rate: f32,
    pub bpm: f32,
    pub max_delay_secs: f32,
    pub block_size: usize,
}

pub struct DelayUnit {
    line: DelayLine,
    sample_rate: f32,
    beat_fraction: f32,
    delay_samples: f32,
    feedback: f32,
    mix: f32,
}

impl DelayUnit {
    fn new(ctx: &UnitContext) -> Self {
        let capacity = ((ctx.max_delay_secs * ctx.sample_rate) as usize).saturating_add(2);
        Self {
            line: DelayLine::new(capacity),
            sample_rate: ctx.sample_rate,
            beat_fraction: 0.0,
            delay_samples: 1.0,
            feedback: 0.0,
            mix: 0.0,
        }
    }

    fn retime(&mut self, bpm: f32) {
        let beat = 60.0 / bpm.max(1.0);
        let max = (self.line.capacity() - 1) as f32;
        self.delay_samples = (self.beat_fraction * beat * self.sample_rate).clamp(1.0, max);
    }

    /// Current delay time in seconds.
    pub fn delay_secs(&self) -> f32 {
        self.delay_samples / self.sample_rate
    }

    fn process(&mut self, input: &[f32], output: &mut [f32]) {
        for (out, &x) in output.iter_mut().zip(input) {
            let delayed = self.line.read_interpolated(self.delay_samples);
            self.line.write(x + delayed * self.feedback);
            *out = blend_dry_wet(x, delayed, self.mix);
        }
    }
}

pub struct ReverbUnit {
    convolver: Convolver,
    sample_rate: f32,
    time: f32,
    decay: f32,
    mix: f32,
}

impl ReverbUnit {
    fn new(ctx: &UnitContext, time: f32, decay: f32) -> Self {
        let impulse = generate_impulse(
            ctx.sample_rate,
            reverb_seconds(time),
            reverb_exponent(decay),
            REVERB_SEED,
        );
        Self {
            convolver: Convolver::new(&impulse),
            sample_rate: ctx.sample_rate,
            time,
            decay,
            mix: 0.0,
        }
    }

    /// Regenerates the impulse synchronously; the running tail is dropped.
    fn regenerate(&mut self) {
        let impulse = generate_impulse(
            self.sample_rate,
            reverb_seconds(self.time),
            reverb_exponent(self.decay),
            REVERB_SEED,
        );
        self.convolver.set_impulse(&impulse);
    }

    pub fn impulse_partitions(&self) -> usize {
        self.convolver.partition_count()
    }

    fn process(&mut self, input: &[f32], output: &mut [f32]) {
        for (out, &x) in output.iter_mut().zip(input) {
            let wet = self.convolver.process(x);
            *out = blend_dry_wet(x, wet, self.mix);
        }
    }
}

fn reverb_seconds(time: f32) -> f32 {
    0.1 + time * 3.9
}

fn reverb_exponent(decay: f32) -> f32 {
    1.0 + decay * 9.0
}

pub struct EqUnit {
    sample_rate: f32,
    bands: [DirectForm2Transposed<f32>; 3],
    low: (f32, f32),
    mid: (f32, f32, f32),
    high: (f32, f32),
}

impl EqUnit {
    fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            bands: Self::flat_bands(),
            low: (0.2, 0.5),
            mid: (0.5, 0.5, 0.1),
            high: (0.5, 0.5),
        }
    }

    fn flat_bands() -> [DirectForm2Transposed<f32>; 3] {
        let flat = || Coefficients {
            a1: 0.0,
            a2: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
        };
        [
            DirectForm2Transposed::<f32>::new(flat()),
            DirectForm2Transposed::<f32>::new(flat()),
            DirectForm2Transposed::<f32>::new(flat()),
        ]
    }

    /// Fresh filter state with coefficients for the current settings.
    fn rebuild(&mut self) {
        self.bands = Self::flat_bands();
        for band in 0..3 {
            self.update_band(band);
        }
    }

    fn eq_gain_db(v: f32) -> f32 {
        (v - 0.5) * 48.0
    }

    fn update_band(&mut self, band: usize) {
        let fs = self.sample_rate;
        let (kind, freq, q) = match band {
            0 => (
                biquad::Type::LowShelf(Self::eq_gain_db(self.low.1)),
                20.0 + self.low.0 * 480.0,
                Q_BUTTERWORTH_F32,
            ),
            1 => (
                biquad::Type::PeakingEQ(Self::eq_gain_db(self.mid.1)),
                200.0 * 25.0_f32.powf(self.mid.0),
                0.1 + self.mid.2 * 9.9,
            ),
            _ => (
                biquad::Type::HighShelf(Self::eq_gain_db(self.high.1)),
                2_000.0 + self.high.0 * 14_000.0,
                Q_BUTTERWORTH_F32,
            ),
        };
        // Out-of-range frequencies keep the previous coefficients
        match Coefficients::<f32>::from_params(kind, fs.hz(), freq.min(fs * 0.49).hz(), q) {
            Ok(coeffs) => self.bands[band].update_coefficients(coeffs),
            Err(e) => tracing::debug!(?e, band, "eq coefficients rejected"),
        }
    }

    fn process(&mut self, input: &[f32], output: &mut [f32]) {
        for (out, &x) in output.iter_mut().zip(input) {
            let mut y = x;
            for band in self.bands.iter_mut() {
                y = band.run(y);
            }
            *out = y;
        }
    }
}

/// The realized processing for one node type.
pub enum UnitKind {
    /// Reserved source endpoint; the builder feeds it from track buses.
    Source,
    /// Reserved output endpoint; the builder sums it into the master bus.
    Output,
    /// Disabled node: unity pass-through.
    Bypass,
    /// Modulation source with no audio path.
    Control,
    Delay(Box<DelayUnit>),
    Filter(SVFilter),
    Distortion(WaveShaper),
    Reverb(Box<ReverbUnit>),
    Compressor(Compressor),
    Mixer { gain: f32 },
    Eq(Box<EqUnit>),
}

pub struct ProcessingUnit {
    pub id: String,
    pub node_kind: NodeKind,
    /// Increments every time a unit is built; tells rebuilt units apart.
    pub serial: u64,
    pub input: Vec<f32>,
    pub output: Vec<f32>,
    kind: UnitKind,
    connected: bool,
}

impl ProcessingUnit {
    /// Build the live unit for `node`, primed with its current params.
    pub fn build(node: &FxNode, ctx: &UnitContext, serial: u64) -> Self {
        let kind = if node.bypass && node.kind.is_effect() {
            UnitKind::Bypass
        } else {
            match node.kind {
                NodeKind::Source => UnitKind::Source,
                NodeKind::Output => UnitKind::Output,
                NodeKind::Float | NodeKind::Int | NodeKind::Lfo | NodeKind::SetRange => {
                    UnitKind::Control
                }
                NodeKind::Delay => UnitKind::Delay(Box::new(DelayUnit::new(ctx))),
                NodeKind::Filter => UnitKind::Filter(SVFilter::lowpass(2_600.0, ctx.sample_rate)),
                NodeKind::Distortion => UnitKind::Distortion(WaveShaper::new(0.0)),
                NodeKind::Reverb => UnitKind::Reverb(Box::new(ReverbUnit::new(
                    ctx,
                    node.param("time"),
                    node.param("decay"),
                ))),
                NodeKind::Compressor => UnitKind::Compressor(Compressor::new(ctx.sample_rate)),
                NodeKind::Mixer => UnitKind::Mixer { gain: 1.0 },
                NodeKind::ParametricEq => UnitKind::Eq(Box::new(EqUnit::new(ctx.sample_rate))),
            }
        };

        let mut unit = Self {
            id: node.id.clone(),
            node_kind: node.kind,
            serial,
            input: vec![0.0; ctx.block_size],
            output: vec![0.0; ctx.block_size],
            kind,
            connected: true,
        };
        for spec in params::schema(node.kind) {
            unit.apply(spec.name, node.param(spec.name), ctx.bpm);
        }
        if let UnitKind::Eq(eq) = &mut unit.kind {
            eq.rebuild();
        }
        unit
    }

    pub fn kind(&self) -> &UnitKind {
        &self.kind
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_bypassed(&self) -> bool {
        matches!(self.kind, UnitKind::Bypass)
    }

    pub fn has_audio_input(&self) -> bool {
        !matches!(self.kind, UnitKind::Control | UnitKind::Source)
    }

    pub fn has_audio_output(&self) -> bool {
        !matches!(self.kind, UnitKind::Control | UnitKind::Output)
    }

    /// Parameter-update hook. `value` is clamped to the node's schema range;
    /// unknown names are ignored.
    pub fn set_param(&mut self, name: &str, value: f32, bpm: f32) {
        let Some(spec) = params::spec(self.node_kind, name) else {
            return;
        };
        let value = spec.clamp(value);
        self.apply(spec.name, value, bpm);
        if let UnitKind::Eq(eq) = &mut self.kind {
            let band = match name {
                "lowFreq" | "lowGain" => 0,
                "midFreq" | "midGain" | "midQ" => 1,
                _ => 2,
            };
            eq.update_band(band);
        }
    }

    fn apply(&mut self, name: &str, value: f32, bpm: f32) {
        match (&mut self.kind, name) {
            (UnitKind::Delay(d), "time") => {
                d.beat_fraction = value;
                d.retime(bpm);
            }
            (UnitKind::Delay(d), "feedback") => d.feedback = value * 0.95,
            (UnitKind::Delay(d), "mix") => d.mix = value,

            (UnitKind::Filter(f), "cutoff") => f.set_cutoff(100.0 + value * 5_000.0),
            (UnitKind::Filter(f), "resonance") => f.set_resonance_db(value * 20.0),

            (UnitKind::Distortion(s), "drive") => s.set_drive(value * 100.0),

            (UnitKind::Reverb(r), "time") => {
                if r.time != value {
                    r.time = value;
                    r.regenerate();
                }
            }
            (UnitKind::Reverb(r), "decay") => {
                if r.decay != value {
                    r.decay = value;
                    r.regenerate();
                }
            }
            (UnitKind::Reverb(r), "mix") => r.mix = value,

            (UnitKind::Compressor(c), "threshold") => c.set_threshold(-100.0 + value * 100.0),
            (UnitKind::Compressor(c), "knee") => c.set_knee(value * 40.0),
            (UnitKind::Compressor(c), "ratio") => c.set_ratio(1.0 + value * 19.0),
            (UnitKind::Compressor(c), "attack") => c.set_attack(value),
            (UnitKind::Compressor(c), "release") => c.set_release(value),

            (UnitKind::Mixer { gain }, "gain") => *gain = value,

            (UnitKind::Eq(eq), "lowFreq") => eq.low.0 = value,
            (UnitKind::Eq(eq), "lowGain") => eq.low.1 = value,
            (UnitKind::Eq(eq), "midFreq") => eq.mid.0 = value,
            (UnitKind::Eq(eq), "midGain") => eq.mid.1 = value,
            (UnitKind::Eq(eq), "midQ") => eq.mid.2 = value,
            (UnitKind::Eq(eq), "highFreq") => eq.high.0 = value,
            (UnitKind::Eq(eq), "highGain") => eq.high.1 = value,

            _ => {}
        }
    }

    /// Recompute tempo-relative state after a bpm change.
    pub fn retime(&mut self, bpm: f32) {
        if let UnitKind::Delay(d) = &mut self.kind {
            d.retime(bpm);
        }
    }

    /// Current delay time in seconds, for delay units.
    pub fn delay_secs(&self) -> Option<f32> {
        match &self.kind {
            UnitKind::Delay(d) => Some(d.delay_secs()),
            _ => None,
        }
    }

    /// Render the first `frames` samples of `input` into `output`.
    pub fn process(&mut self, frames: usize) {
        let (input, output) = (&self.input[..frames], &mut self.output[..frames]);
        match &mut self.kind {
            UnitKind::Control => output.fill(0.0),
            UnitKind::Source | UnitKind::Output | UnitKind::Bypass => {
                output.copy_from_slice(input)
            }
            UnitKind::Delay(d) => d.process(input, output),
            UnitKind::Filter(f) => {
                for (out, &x) in output.iter_mut().zip(input) {
                    *out = f.process(x);
                }
            }
            UnitKind::Distortion(s) => {
                for (out, &x) in output.iter_mut().zip(input) {
                    *out = s.process(x);
                }
            }
            UnitKind::Reverb(r) => r.process(input, output),
            UnitKind::Compressor(c) => {
                for (out, &x) in output.iter_mut().zip(input) {
                    *out = c.process(x);
                }
            }
            UnitKind::Mixer { gain } => {
                for (out, &x) in output.iter_mut().zip(input) {
                    *out = x * *gain;
                }
            }
            UnitKind::Eq(eq) => eq.process(input, output),
        }
    }

    /// Sever the unit: internal state is cleared and it no longer accepts
    /// connections. Must be called before the unit is discarded.
    pub fn disconnect(&mut self) {
        self.connected = false;
        self.input.fill(0.0);
        self.output.fill(0.0);
        match &mut self.kind {
            UnitKind::Delay(d) => d.line.reset(),
            UnitKind::Filter(f) => f.reset(),
            UnitKind::Distortion(s) => s.reset(),
            UnitKind::Reverb(r) => r.convolver.reset(),
            UnitKind::Compressor(c) => c.reset(),
            UnitKind::Eq(eq) => eq.rebuild(),
            UnitKind::Source
            | UnitKind::Output
            | UnitKind::Bypass
            | UnitKind::Control
            | UnitKind::Mixer { .. } => {}
        }
    }
}
