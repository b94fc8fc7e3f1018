//! Sound voice synthesizers.
//!
//! Each factory schedules one self-terminating voice starting at an absolute
//! audio-clock time. Every envelope and pitch sweep is written up front as
//! [`Automation`](crate::dsp::Automation) events, and rendering evaluates
//! them at the exact clock time of each sample, so a voice starts on sample
//! `round(time × sample_rate)` no matter when the scheduler created it.
//!
//! | voice   | source                        | shape                          |
//! | ------- | ----------------------------- | ------------------------------ |
//! | kick    | sine with falling pitch       | exponential decay              |
//! | snare   | high-passed noise + triangle  | two exponential decays         |
//! | hat     | high-passed noise             | very short exponential decay   |
//! | synth   | oscillator → low-pass         | linear attack, linear release  |
//!
//! Voices keep ringing after the transport stops; a decaying drum is never
//! hard-cut.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::OscillatorWaveform;
use crate::graph::model::ColorSample;

mod hihat;
mod kick;
mod snare;
mod synth;

pub use hihat::HiHat;
pub use kick::Kick;
pub use snare::Snare;
pub use synth::SynthVoice;

/// Level exponential decays end on; geometric ramps cannot reach zero.
pub(crate) const DECAY_FLOOR: f32 = 0.01;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceKind {
    Kick,
    Snare,
    Hat,
    /// Tonal voice pitched by its row.
    Synth,
}

impl VoiceKind {
    pub fn is_percussive(self) -> bool {
        !matches!(self, VoiceKind::Synth)
    }
}

/// Per-voice sound settings. Not every field matters to every voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceConfig {
    pub frequency: f32,
    pub decay: f32,
    pub cutoff: f32,
    /// Noise share for the snare.
    pub mix: f32,
    pub waveform: OscillatorWaveform,
    pub attack: f32,
    pub release: f32,
}

impl VoiceConfig {
    pub fn for_kind(kind: VoiceKind) -> Self {
        match kind {
            VoiceKind::Kick => Self {
                frequency: 150.0,
                decay: 0.5,
                cutoff: 20_000.0,
                mix: 0.0,
                waveform: OscillatorWaveform::Sine,
                attack: 0.0,
                release: 0.0,
            },
            VoiceKind::Snare => Self {
                frequency: 100.0,
                decay: 0.2,
                cutoff: 1_000.0,
                mix: 0.6,
                waveform: OscillatorWaveform::Triangle,
                attack: 0.0,
                release: 0.0,
            },
            VoiceKind::Hat => Self {
                frequency: 0.0,
                decay: 0.05,
                cutoff: 7_000.0,
                mix: 1.0,
                waveform: OscillatorWaveform::Sine,
                attack: 0.0,
                release: 0.0,
            },
            VoiceKind::Synth => Self {
                frequency: 440.0,
                decay: 0.0,
                cutoff: 2_000.0,
                mix: 0.0,
                waveform: OscillatorWaveform::Sawtooth,
                attack: 0.01,
                release: 0.3,
            },
        }
    }

    /// Apply free-form per-note overrides. Unknown keys and non-finite
    /// values are ignored; times and frequencies are kept non-negative.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, f32>) -> Self {
        for (key, &value) in overrides {
            if !value.is_finite() {
                continue;
            }
            match key.as_str() {
                "frequency" => self.frequency = value.max(0.0),
                "decay" => self.decay = value.max(0.0),
                "cutoff" => self.cutoff = value.max(0.0),
                "mix" => self.mix = value.clamp(0.0, 1.0),
                "waveform" => self.waveform = OscillatorWaveform::from_index(value),
                "attack" => self.attack = value.max(0.0),
                "release" => self.release = value.max(0.0),
                _ => {}
            }
        }
        self
    }
}

/// Audio settings voices are built against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceContext {
    pub sample_rate: f32,
    pub bpm: f32,
}

impl VoiceContext {
    /// Seconds per sixteenth-note step at the current tempo.
    pub fn seconds_per_step(&self) -> f64 {
        60.0 / self.bpm.max(1.0) as f64 / 4.0
    }

    pub fn frame_at(&self, time: f64) -> u64 {
        (time.max(0.0) * self.sample_rate as f64).round() as u64
    }
}

enum Body {
    Kick(Kick),
    Snare(Snare),
    Hat(HiHat),
    Synth(SynthVoice),
}

/// A scheduled voice bound to one track bus.
pub struct Voice {
    pub kind: VoiceKind,
    pub track: usize,
    pub color: Option<ColorSample>,
    start_frame: u64,
    stop_frame: u64,
    body: Body,
}

impl Voice {
    fn new(
        ctx: &VoiceContext,
        kind: VoiceKind,
        track: usize,
        time: f64,
        stop_time: f64,
        body: Body,
    ) -> Self {
        Self {
            kind,
            track,
            color: None,
            start_frame: ctx.frame_at(time),
            stop_frame: ctx.frame_at(stop_time),
            body,
        }
    }

    pub fn with_color(mut self, color: Option<ColorSample>) -> Self {
        self.color = color;
        self
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn stop_frame(&self) -> u64 {
        self.stop_frame
    }

    /// Audible at `frame`.
    pub fn is_sounding(&self, frame: u64) -> bool {
        self.start_frame <= frame && frame < self.stop_frame
    }

    pub fn is_finished(&self, frame: u64) -> bool {
        frame >= self.stop_frame
    }

    /// Add this voice into `out`, whose first sample is at clock frame
    /// `block_start`.
    pub fn render(&mut self, out: &mut [f32], block_start: u64, sample_rate: f32) {
        let sr = sample_rate as f64;
        for (i, sample) in out.iter_mut().enumerate() {
            let frame = block_start + i as u64;
            if frame < self.start_frame {
                continue;
            }
            if frame >= self.stop_frame {
                break;
            }
            let t = frame as f64 / sr;
            *sample += match &mut self.body {
                Body::Kick(v) => v.sample(t, sample_rate),
                Body::Snare(v) => v.sample(t, sample_rate),
                Body::Hat(v) => v.sample(t),
                Body::Synth(v) => v.sample(t, sample_rate),
            };
        }
    }
}

fn noise_seed(ctx: &VoiceContext, time: f64, salt: u64) -> u64 {
    ctx.frame_at(time).wrapping_mul(0x9e37_79b9_7f4a_7c15) ^ salt
}

pub fn create_kick(
    ctx: &VoiceContext,
    time: f64,
    gain: f32,
    config: Option<&VoiceConfig>,
    track: usize,
) -> Voice {
    let config = config.copied().unwrap_or(VoiceConfig::for_kind(VoiceKind::Kick));
    let (kick, stop) = Kick::new(time, gain, &config);
    Voice::new(ctx, VoiceKind::Kick, track, time, stop, Body::Kick(kick))
}

pub fn create_snare(
    ctx: &VoiceContext,
    time: f64,
    gain: f32,
    config: Option<&VoiceConfig>,
    track: usize,
) -> Voice {
    let config = config.copied().unwrap_or(VoiceConfig::for_kind(VoiceKind::Snare));
    let (snare, stop) = Snare::new(ctx, time, gain, &config, noise_seed(ctx, time, 1));
    Voice::new(ctx, VoiceKind::Snare, track, time, stop, Body::Snare(snare))
}

pub fn create_hihat(
    ctx: &VoiceContext,
    time: f64,
    gain: f32,
    config: Option<&VoiceConfig>,
    track: usize,
) -> Voice {
    let config = config.copied().unwrap_or(VoiceConfig::for_kind(VoiceKind::Hat));
    let (hat, stop) = HiHat::new(ctx, time, gain, &config, noise_seed(ctx, time, 2));
    Voice::new(ctx, VoiceKind::Hat, track, time, stop, Body::Hat(hat))
}

/// A tonal note of `duration_steps` steps at the context tempo. The release
/// ramp starts at `time + duration` and the voice stops at
/// `time + duration + release`.
pub fn create_synth(
    ctx: &VoiceContext,
    time: f64,
    gain: f32,
    duration_steps: u32,
    config: Option<&VoiceConfig>,
    track: usize,
) -> Voice {
    let config = config.copied().unwrap_or(VoiceConfig::for_kind(VoiceKind::Synth));
    let duration = duration_steps.max(1) as f64 * ctx.seconds_per_step();
    let (synth, stop) = SynthVoice::new(ctx, time, gain, duration, &config);
    Voice::new(ctx, VoiceKind::Synth, track, time, stop, Body::Synth(synth))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTX: VoiceContext = VoiceContext {
        sample_rate: 48_000.0,
        bpm: 120.0,
    };

    fn render_all(voice: &mut Voice, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        for (i, chunk) in out.chunks_mut(128).enumerate() {
            voice.render(chunk, (i * 128) as u64, CTX.sample_rate);
        }
        out
    }

    fn first_nonzero(buffer: &[f32]) -> Option<usize> {
        buffer.iter().position(|&s| s != 0.0)
    }

    #[test]
    fn test_seconds_per_step() {
        assert!((CTX.seconds_per_step() - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_kick_starts_on_exact_frame() {
        // 0.01 s is frame 480; the sine's first sample is 0, so sound appears
        // one frame later
        let mut kick = create_kick(&CTX, 0.01, 1.0, None, 0);
        assert_eq!(kick.start_frame(), 480);
        let out = render_all(&mut kick, 2_000);
        assert!(out[..480].iter().all(|&s| s == 0.0));
        assert_eq!(first_nonzero(&out), Some(481));
    }

    #[test]
    fn test_kick_stops_after_decay() {
        let mut kick = create_kick(&CTX, 0.0, 1.0, None, 0);
        assert_eq!(kick.stop_frame(), 24_000);
        let out = render_all(&mut kick, 30_000);
        assert!(out[24_000..].iter().all(|&s| s == 0.0));
        assert!(kick.is_finished(24_000));
    }

    #[test]
    fn test_hat_is_short() {
        let hat = create_hihat(&CTX, 1.0, 1.0, None, 2);
        assert_eq!(hat.stop_frame() - hat.start_frame(), 2_400);
        assert_eq!(hat.track, 2);
    }

    #[test]
    fn test_snare_is_audible_and_bounded() {
        let mut snare = create_snare(&CTX, 0.0, 1.0, None, 0);
        let out = render_all(&mut snare, 9_600);
        let peak = out.iter().fold(0.0f32, |a, &s| a.max(s.abs()));
        assert!(peak > 0.05 && peak < 3.0, "peak {}", peak);
    }

    #[test]
    fn test_synth_stops_after_duration_plus_release() {
        let config = VoiceConfig {
            release: 0.25,
            ..VoiceConfig::for_kind(VoiceKind::Synth)
        };
        // 2 steps at 120 bpm = 0.25 s, plus 0.25 s release
        let synth = create_synth(&CTX, 1.0, 0.8, 2, Some(&config), 1);
        assert_eq!(synth.start_frame(), 48_000);
        assert_eq!(synth.stop_frame(), 72_000);
    }

    #[test]
    fn test_overrides_apply_known_keys_only() {
        let mut overrides = BTreeMap::new();
        overrides.insert("decay".to_string(), 0.9);
        overrides.insert("waveform".to_string(), 3.0);
        overrides.insert("mix".to_string(), 4.0);
        overrides.insert("bogus".to_string(), 1.0);
        overrides.insert("cutoff".to_string(), f32::NAN);
        let c = VoiceConfig::for_kind(VoiceKind::Snare).with_overrides(&overrides);
        assert_eq!(c.decay, 0.9);
        assert_eq!(c.waveform, OscillatorWaveform::Square);
        assert_eq!(c.mix, 1.0);
        assert_eq!(c.cutoff, 1_000.0);
    }

    #[test]
    fn test_sounding_window() {
        let kick = create_kick(&CTX, 0.5, 1.0, None, 0);
        assert!(!kick.is_sounding(23_999));
        assert!(kick.is_sounding(24_000));
        assert!(kick.is_sounding(47_999));
        assert!(!kick.is_sounding(48_000));
    }
}
