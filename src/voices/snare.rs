//! Snare drum voice.
//!
//! Two layers: high-passed noise for the rattle of the wires and a triangle
//! tone for the body of the shell. `mix` sets the noise share; the tone
//! decays twice as fast as the noise.
//!
//! ```text
//! noise ──→ [HPF cutoff] ──→ gain·mix      ╲____ (decay)
//! tri   ──────────────────→ gain·(1−mix)  ╲__   (decay / 2)
//! ```

use crate::dsp::filter::SVFilter;
use crate::dsp::oscillator::{NoiseSource, Oscillator};
use crate::dsp::Automation;
use crate::voices::{VoiceConfig, VoiceContext, DECAY_FLOOR};

pub struct Snare {
    noise: NoiseSource,
    highpass: SVFilter,
    noise_level: Automation,
    tone: Oscillator,
    tone_frequency: f32,
    tone_level: Automation,
}

impl Snare {
    pub(crate) fn new(
        ctx: &VoiceContext,
        time: f64,
        gain: f32,
        config: &VoiceConfig,
        seed: u64,
    ) -> (Self, f64) {
        let end = time + config.decay as f64;
        let tone_end = time + config.decay as f64 * 0.5;

        let mut noise_level = Automation::new(0.0);
        noise_level
            .set_value_at(gain * config.mix, time)
            .exponential_ramp_to(DECAY_FLOOR, end);

        let mut tone_level = Automation::new(0.0);
        tone_level
            .set_value_at(gain * (1.0 - config.mix), time)
            .exponential_ramp_to(DECAY_FLOOR, tone_end)
            .set_value_at(0.0, tone_end);

        let snare = Self {
            noise: NoiseSource::new(seed),
            highpass: SVFilter::highpass(config.cutoff, ctx.sample_rate),
            noise_level,
            tone: Oscillator::new(config.waveform),
            tone_frequency: config.frequency,
            tone_level,
        };
        (snare, end)
    }

    #[inline]
    pub(crate) fn sample(&mut self, t: f64, sample_rate: f32) -> f32 {
        let rattle = self.highpass.process(self.noise.next_sample()) * self.noise_level.value_at(t);
        let body =
            self.tone.next_sample(self.tone_frequency, sample_rate) * self.tone_level.value_at(t);
        rattle + body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voices::VoiceKind;

    #[test]
    fn test_tone_is_silent_after_half_decay() {
        let ctx = VoiceContext {
            sample_rate: 48_000.0,
            bpm: 120.0,
        };
        let config = VoiceConfig::for_kind(VoiceKind::Snare);
        let (snare, end) = Snare::new(&ctx, 0.0, 1.0, &config, 3);
        assert!((end - 0.2).abs() < 1e-6);
        assert_eq!(snare.tone_level.value_at(0.15), 0.0);
        assert!(snare.noise_level.value_at(0.15) > 0.0);
    }
}
