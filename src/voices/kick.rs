//! Kick drum voice.
//!
//! A sine wave whose pitch falls exponentially from the configured frequency
//! toward zero while its amplitude decays exponentially over the same span.
//! The fast pitch drop is what gives an electronic kick its "punch".
//!
//! ```text
//! freq   150 Hz ╲___________  → 0.01 Hz at time + decay
//! gain   gain   ╲___________  → 0.01    at time + decay
//! ```

use crate::dsp::oscillator::{Oscillator, OscillatorWaveform};
use crate::dsp::Automation;
use crate::voices::{VoiceConfig, DECAY_FLOOR};

pub struct Kick {
    osc: Oscillator,
    frequency: Automation,
    amplitude: Automation,
}

impl Kick {
    /// Returns the voice and its stop time.
    pub(crate) fn new(time: f64, gain: f32, config: &VoiceConfig) -> (Self, f64) {
        let end = time + config.decay as f64;

        let mut frequency = Automation::new(config.frequency);
        frequency
            .set_value_at(config.frequency, time)
            .exponential_ramp_to(DECAY_FLOOR, end);

        let mut amplitude = Automation::new(0.0);
        amplitude
            .set_value_at(gain, time)
            .exponential_ramp_to(DECAY_FLOOR, end);

        let kick = Self {
            osc: Oscillator::new(OscillatorWaveform::Sine),
            frequency,
            amplitude,
        };
        (kick, end)
    }

    #[inline]
    pub(crate) fn sample(&mut self, t: f64, sample_rate: f32) -> f32 {
        let freq = self.frequency.value_at(t);
        self.osc.next_sample(freq, sample_rate) * self.amplitude.value_at(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voices::VoiceKind;

    #[test]
    fn test_pitch_and_level_fall() {
        let config = VoiceConfig::for_kind(VoiceKind::Kick);
        let (kick, end) = Kick::new(1.0, 1.0, &config);
        assert!((end - 1.5).abs() < 1e-12);
        assert!((kick.frequency.value_at(1.0) - 150.0).abs() < 1e-3);
        assert!(kick.frequency.value_at(1.25) < 5.0);
        assert!((kick.amplitude.value_at(1.0) - 1.0).abs() < 1e-6);
        assert!((kick.amplitude.value_at(1.5) - DECAY_FLOOR).abs() < 1e-6);
    }
}
