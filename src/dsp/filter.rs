use std::f32::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
| type              | constructed by       | passes          | rejects      |
| ----------------- | -------------------- | --------------- | ------------ |
| low-pass          | LPF                  | below cutoff    | above cutoff |
| high-pass         | HPF                  | above cutoff    | below cutoff |
| band-pass         | LPF ∘ HPF (series)   | between cutoffs | outside      |
| notch / band-stop | LPF + HPF (parallel) | outside         | between      |

Topology-preserving-transform SVF (Zavalishin / Simper). `g` is the
prewarped integrator gain, `k = 1/Q` is the damping. Both are recomputed only
when cutoff, Q or sample rate change, so per-sample cost is a handful of
multiplies.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

pub struct FilterOutputs {
    pub lowpass: f32,
    pub bandpass: f32,
    pub highpass: f32,
    pub notch: f32,
}

/// Butterworth Q, the flat-response default.
pub const DEFAULT_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    cutoff_hz: f32,
    q: f32,
    sample_rate: f32,
    g: f32,
    k: f32,
    filter_type: FilterType,
}

impl SVFilter {
    pub fn new(filter_type: FilterType, cutoff_hz: f32, sample_rate: f32) -> Self {
        let mut filter = Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            cutoff_hz,
            q: DEFAULT_Q,
            sample_rate,
            g: 0.0,
            k: 1.0 / DEFAULT_Q,
            filter_type,
        };
        filter.update_coefficients();
        filter
    }

    pub fn lowpass(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self::new(FilterType::LowPass, cutoff_hz, sample_rate)
    }

    pub fn highpass(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self::new(FilterType::HighPass, cutoff_hz, sample_rate)
    }

    pub fn bandpass(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self::new(FilterType::BandPass, cutoff_hz, sample_rate)
    }

    fn update_coefficients(&mut self) {
        // Keep the cutoff strictly below Nyquist; tan() blows up at fs/2
        let nyquist = self.sample_rate * 0.5;
        let cutoff = self.cutoff_hz.clamp(10.0, nyquist * 0.99);
        self.g = (PI * cutoff / self.sample_rate).tan();
        self.k = 1.0 / self.q.max(0.05);
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn q(&self) -> f32 {
        self.q
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        if cutoff_hz != self.cutoff_hz {
            self.cutoff_hz = cutoff_hz;
            self.update_coefficients();
        }
    }

    pub fn set_q(&mut self, q: f32) {
        if q != self.q {
            self.q = q;
            self.update_coefficients();
        }
    }

    /// Set resonance the way audio-graph biquads express it: a peak gain in
    /// dB above the Butterworth response (0 dB = flat).
    pub fn set_resonance_db(&mut self, resonance_db: f32) {
        self.set_q(DEFAULT_Q * 10.0_f32.powf(resonance_db / 20.0));
    }

    #[inline]
    pub fn tick(&mut self, sample: f32) -> FilterOutputs {
        let (g, k) = (self.g, self.k);
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        FilterOutputs {
            lowpass: v2,
            bandpass: v1,
            highpass: sample - k * v1 - v2,
            notch: sample - k * v1,
        }
    }

    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        let outputs = self.tick(sample);
        match self.filter_type {
            FilterType::LowPass => outputs.lowpass,
            FilterType::HighPass => outputs.highpass,
            FilterType::BandPass => outputs.bandpass,
            FilterType::Notch => outputs.notch,
        }
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::{Oscillator, OscillatorWaveform};

    const SR: f32 = 48_000.0;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        let mut osc = Oscillator::new(OscillatorWaveform::Sine);
        (0..len).map(|_| osc.next_sample(freq, SR)).collect()
    }

    fn peak_after_transient(buffer: &[f32]) -> f32 {
        let skip = buffer.len().min(64);
        buffer[skip..].iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let mut filter = SVFilter::lowpass(500.0, SR);
        let mut buffer = vec![1.0; 512];
        filter.render(&mut buffer);
        assert!(buffer[511] > 0.99, "got {}", buffer[511]);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let mut filter = SVFilter::highpass(500.0, SR);
        let mut buffer = vec![1.0; 512];
        filter.render(&mut buffer);
        assert!(buffer[511].abs() < 0.01, "got {}", buffer[511]);
    }

    #[test]
    fn test_lowpass_filters_high_freq() {
        let mut filter = SVFilter::lowpass(500.0, SR);
        let mut buffer = sine(5_000.0, 1024);
        filter.render(&mut buffer);
        let peak = peak_after_transient(&buffer);
        assert!(peak < 0.3, "Expected high freq attenuation, got peak: {}", peak);
    }

    #[test]
    fn test_set_cutoff_affects_filtering() {
        let mut filter = SVFilter::lowpass(200.0, SR);
        let mut low = sine(1_000.0, 1024);
        filter.render(&mut low);

        filter.reset();
        filter.set_cutoff(5_000.0);
        let mut high = sine(1_000.0, 1024);
        filter.render(&mut high);

        assert!(
            peak_after_transient(&high) > peak_after_transient(&low) * 2.0,
            "raising cutoff should pass more signal"
        );
    }

    #[test]
    fn test_resonance_boosts_cutoff_region() {
        let mut flat = SVFilter::lowpass(1_000.0, SR);
        flat.set_resonance_db(0.0);
        let mut a = sine(1_000.0, 2048);
        flat.render(&mut a);

        let mut peaky = SVFilter::lowpass(1_000.0, SR);
        peaky.set_resonance_db(12.0);
        let mut b = sine(1_000.0, 2048);
        peaky.render(&mut b);

        assert!(peak_after_transient(&b) > peak_after_transient(&a) * 1.5);
    }

    #[test]
    fn test_extreme_cutoff_stays_stable() {
        let mut filter = SVFilter::lowpass(1.0e9, SR);
        let mut buffer = sine(440.0, 512);
        filter.render(&mut buffer);
        assert!(buffer.iter().all(|s| s.is_finite()));
    }
}
