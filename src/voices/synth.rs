//! Tonal synth voice.
//!
//! An oscillator through a low-pass filter with a linear attack and a
//! linear release that starts exactly at note-off:
//!
//! ```text
//!  gain ┤    ┌──────────────┐
//!       │   ╱                ╲
//!     0 ┼──┘                  └──
//!       time  +attack   +duration  +release (stop)
//! ```
//!
//! The level at note-off is pinned before the release ramp, so a note
//! shorter than its attack releases from wherever the attack had reached.

use crate::dsp::filter::SVFilter;
use crate::dsp::oscillator::Oscillator;
use crate::dsp::Automation;
use crate::voices::{VoiceConfig, VoiceContext};

pub struct SynthVoice {
    osc: Oscillator,
    lowpass: SVFilter,
    frequency: f32,
    amplitude: Automation,
}

impl SynthVoice {
    pub(crate) fn new(
        ctx: &VoiceContext,
        time: f64,
        gain: f32,
        duration: f64,
        config: &VoiceConfig,
    ) -> (Self, f64) {
        let note_off = time + duration;
        let stop = note_off + config.release as f64;

        let mut amplitude = Automation::new(0.0);
        amplitude
            .set_value_at(0.0, time)
            .linear_ramp_to(gain, time + config.attack as f64);
        let held = amplitude.value_at(note_off);
        amplitude
            .set_value_at(held, note_off)
            .linear_ramp_to(0.0, stop);

        let voice = Self {
            osc: Oscillator::new(config.waveform),
            lowpass: SVFilter::lowpass(config.cutoff, ctx.sample_rate),
            frequency: config.frequency,
            amplitude,
        };
        (voice, stop)
    }

    #[inline]
    pub(crate) fn sample(&mut self, t: f64, sample_rate: f32) -> f32 {
        let raw = self.osc.next_sample(self.frequency, sample_rate);
        self.lowpass.process(raw) * self.amplitude.value_at(t)
    }
}
