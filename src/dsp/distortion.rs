//! Distortion / Waveshaping
//!
//! Distortion adds harmonics by reshaping the waveform. A waveshaper applies
//! a transfer curve to each sample:
//!
//!   output = curve(input)
//!
//! # The Drive Curve
//!
//! The effect unit uses the classic sigmoid family
//!
//! ```text
//!   curve(x) = (3 + k) · x · 20° / (π + k · |x|)
//! ```
//!
//! where `k` is the drive amount and 20° is expressed in radians. At `k = 0`
//! the curve is a gentle linear attenuation; as `k` grows the knee sharpens
//! toward a hard clip. The curve is sampled into a lookup table whenever drive
//! changes, so per-sample cost is one interpolated table read.
//!
//! # Oversampling
//!
//! Shaping creates harmonics above Nyquist that fold back as aliasing. The
//! shaper runs at 4× the sample rate: each input sample is linearly
//! interpolated into four sub-samples, each sub-sample is shaped, and the
//! four results are averaged back down.
//!
//! # Soft Clip
//!
//! `soft_clip` (x / (1 + |x|)) is kept as a cheap safety saturator for the
//! master bus.

use std::f32::consts::PI;

/// Soft clipping using x / (1 + |x|) transfer function.
///
/// This produces warm, tube-like saturation that gradually
/// compresses peaks without harsh artifacts.
#[inline]
pub fn soft_clip(sample: f32, drive: f32) -> f32 {
    let x = sample * drive;
    x / (1.0 + x.abs())
}

/// Number of points in a generated shaping curve.
pub const CURVE_SIZE: usize = 4096;
/// Oversampling factor used by [`WaveShaper`].
pub const OVERSAMPLE: usize = 4;

/// Fill `curve` with the drive curve for amount `k`.
pub fn fill_drive_curve(curve: &mut [f32], k: f32) {
    let n = curve.len();
    if n < 2 {
        return;
    }
    let deg = PI / 180.0;
    for (i, point) in curve.iter_mut().enumerate() {
        let x = i as f32 * 2.0 / (n - 1) as f32 - 1.0;
        *point = (3.0 + k) * x * 20.0 * deg / (PI + k * x.abs());
    }
}

/// Lookup-table waveshaper with 4× oversampling.
pub struct WaveShaper {
    curve: Vec<f32>,
    previous_input: f32,
}

impl WaveShaper {
    pub fn new(drive_amount: f32) -> Self {
        let mut shaper = Self {
            curve: vec![0.0; CURVE_SIZE],
            previous_input: 0.0,
        };
        shaper.set_drive(drive_amount);
        shaper
    }

    /// Regenerate the curve for a new drive amount.
    pub fn set_drive(&mut self, drive_amount: f32) {
        fill_drive_curve(&mut self.curve, drive_amount.max(0.0));
    }

    #[inline]
    fn shape(&self, x: f32) -> f32 {
        let n = self.curve.len();
        let pos = (x.clamp(-1.0, 1.0) + 1.0) * 0.5 * (n - 1) as f32;
        let idx = (pos.floor() as usize).min(n - 2);
        let frac = pos - idx as f32;
        let a = self.curve[idx];
        let b = self.curve[idx + 1];
        a + (b - a) * frac
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let start = self.previous_input;
        let mut acc = 0.0;
        for step in 1..=OVERSAMPLE {
            let t = step as f32 / OVERSAMPLE as f32;
            acc += self.shape(start + (input - start) * t);
        }
        self.previous_input = input;
        acc / OVERSAMPLE as f32
    }

    pub fn reset(&mut self) {
        self.previous_input = 0.0;
    }
}
