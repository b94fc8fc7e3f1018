//! Hi-hat voice.
//!
//! White noise through a high-pass filter with a very short exponential
//! decay. Only the sizzle above the cutoff survives, which reads as metal.

use crate::dsp::filter::SVFilter;
use crate::dsp::oscillator::NoiseSource;
use crate::dsp::Automation;
use crate::voices::{VoiceConfig, VoiceContext, DECAY_FLOOR};

pub struct HiHat {
    noise: NoiseSource,
    highpass: SVFilter,
    amplitude: Automation,
}

impl HiHat {
    pub(crate) fn new(
        ctx: &VoiceContext,
        time: f64,
        gain: f32,
        config: &VoiceConfig,
        seed: u64,
    ) -> (Self, f64) {
        let end = time + config.decay as f64;
        let mut amplitude = Automation::new(0.0);
        amplitude
            .set_value_at(gain, time)
            .exponential_ramp_to(DECAY_FLOOR, end);

        let hat = Self {
            noise: NoiseSource::new(seed),
            highpass: SVFilter::highpass(config.cutoff, ctx.sample_rate),
            amplitude,
        };
        (hat, end)
    }

    #[inline]
    pub(crate) fn sample(&mut self, t: f64) -> f32 {
        self.highpass.process(self.noise.next_sample()) * self.amplitude.value_at(t)
    }
}
