use std::f32::consts::TAU;

use rand::{rngs::StdRng, Rng, SeedableRng};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Waveforms
=========

All periodic shapes are evaluated from a normalized phase in [0, 1) and start
at zero crossing heading upward, so an oscillator (or LFO) started at phase 0
produces 0.0 on its first sample:

  sine      sin(2π·p)
  square    +1 for the first half cycle, -1 for the second
  sawtooth  rises from 0 to +1, snaps to -1, rises back to 0
  triangle  0 → +1 → -1 → 0 with constant slope

Noise is not periodic and lives in its own `NoiseSource`.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OscillatorWaveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl OscillatorWaveform {
    /// Map a numeric selector (as stored in node params) to a waveform.
    ///
    /// 0 = sine, 1 = triangle, 2 = sawtooth, 3 = square. Out-of-range values
    /// are clamped to the nearest valid selector.
    pub fn from_index(index: f32) -> Self {
        match index.round().clamp(0.0, 3.0) as u8 {
            0 => OscillatorWaveform::Sine,
            1 => OscillatorWaveform::Triangle,
            2 => OscillatorWaveform::Sawtooth,
            _ => OscillatorWaveform::Square,
        }
    }

    /// Bipolar value of this waveform at `phase` (fractional part is used).
    #[inline]
    pub fn sample(self, phase: f32) -> f32 {
        let p = phase - phase.floor();
        match self {
            OscillatorWaveform::Sine => (TAU * p).sin(),
            OscillatorWaveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            OscillatorWaveform::Sawtooth => {
                let shifted = p + 0.5;
                2.0 * (shifted - shifted.floor()) - 1.0
            }
            OscillatorWaveform::Triangle => {
                if p < 0.25 {
                    4.0 * p
                } else if p < 0.75 {
                    2.0 - 4.0 * p
                } else {
                    4.0 * p - 4.0
                }
            }
        }
    }
}

/// Phase-accumulating oscillator. Frequency is supplied per sample so it can
/// follow an automation curve (pitch sweeps on kicks, glides on synths).
pub struct Oscillator {
    waveform: OscillatorWaveform,
    phase: f32,
}

impl Oscillator {
    pub fn new(waveform: OscillatorWaveform) -> Self {
        Self { waveform, phase: 0.0 }
    }

    #[inline]
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let out = self.waveform.sample(self.phase);
        self.phase += frequency / sample_rate;
        self.phase -= self.phase.floor();
        out
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// Uniform white noise in [-1, 1].
///
/// Seeded explicitly so renders are reproducible; voices derive the seed from
/// their start frame.
pub struct NoiseSource {
    rng: StdRng,
}

impl NoiseSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        self.rng.gen_range(-1.0..=1.0)
    }
}
