use crate::dsp::oscillator::OscillatorWaveform;

/*
LFO (Low Frequency Oscillator)
==============================

An LFO is an oscillator that runs at sub-audio rates to move parameters over
time. Unlike the audio oscillators in `dsp/oscillator.rs` it is not rendered
sample by sample: the modulation loop asks for its value at an absolute time
once per animation frame, so an LFO here is a pure function of time.

Phase
-----

    phase = max(0, time − epoch) × rate + phase_offset

`epoch` is the shared downbeat anchor, reset whenever playback starts. All
LFOs measure from the same anchor, so two LFOs with equal rate and offset are
always in lockstep, and every LFO restarts on the downbeat when the
transport starts.

Waveforms
---------

  SINE       Smooth, natural sweep (most common)
  TRIANGLE   Constant rate of change, "linear" feel
  SAWTOOTH   Gradual rise, instant reset (rhythmic)
  SQUARE     Instant jumps between min/max (gating)

Bipolar to Unipolar Conversion
------------------------------

Many parameters want unipolar (0 to 1) rather than bipolar (-1 to +1):

    unipolar = (bipolar + 1.0) * 0.5

    bipolar   unipolar
    -1.0      0.0
     0.0      0.5
    +1.0      1.0
*/

/// Convert bipolar signal (-1.0 to +1.0) to unipolar (0.0 to 1.0).
#[inline]
pub fn bipolar_to_unipolar(bipolar: f32) -> f32 {
    (bipolar + 1.0) * 0.5
}

/// Phase (in cycles) of an LFO at `time`, measured from `epoch`.
///
/// Times before the epoch are treated as the epoch itself.
#[inline]
pub fn phase_at(time: f64, epoch: f64, rate_hz: f32, phase_offset: f32) -> f64 {
    (time - epoch).max(0.0) * rate_hz as f64 + phase_offset as f64
}

/// Evaluate an LFO at `time`.
///
/// The waveform is sampled at the fractional phase; `normalize` remaps the
/// bipolar result to unipolar before `amplitude` scales it.
pub fn lfo_value(
    waveform: OscillatorWaveform,
    time: f64,
    epoch: f64,
    rate_hz: f32,
    phase_offset: f32,
    amplitude: f32,
    normalize: bool,
) -> f32 {
    let phase = phase_at(time, epoch, rate_hz, phase_offset);
    // Reduce in f64 first so long sessions keep full phase precision
    let fractional = (phase - phase.floor()) as f32;
    let raw = waveform.sample(fractional);
    let shaped = if normalize {
        bipolar_to_unipolar(raw)
    } else {
        raw
    };
    shaped * amplitude
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    #[test]
    fn test_bipolar_to_unipolar() {
        assert!((bipolar_to_unipolar(-1.0) - 0.0).abs() < 1e-6);
        assert!((bipolar_to_unipolar(0.0) - 0.5).abs() < 1e-6);
        assert!((bipolar_to_unipolar(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sine_lfo_matches_closed_form() {
        let epoch = 3.0;
        for i in 0..50 {
            let t = epoch + i as f64 * 0.0137;
            let got = lfo_value(OscillatorWaveform::Sine, t, epoch, 1.0, 0.0, 1.0, false);
            let expected = (TAU * (t - epoch)).sin() as f32;
            assert!((got - expected).abs() < 1e-4, "t={} got={} expected={}", t, got, expected);
        }
    }

    #[test]
    fn test_value_at_epoch_is_zero() {
        let v = lfo_value(OscillatorWaveform::Sine, 10.0, 10.0, 1.0, 0.0, 1.0, false);
        assert!(v.abs() < 1e-6);
    }

    #[test]
    fn test_before_epoch_clamps_to_epoch() {
        let before = lfo_value(OscillatorWaveform::Triangle, 1.0, 5.0, 2.0, 0.1, 1.0, false);
        let at = lfo_value(OscillatorWaveform::Triangle, 5.0, 5.0, 2.0, 0.1, 1.0, false);
        assert_eq!(before, at);
    }

    #[test]
    fn test_normalize_and_amplitude() {
        // Quarter cycle of a sine is the positive peak
        let v = lfo_value(OscillatorWaveform::Sine, 0.25, 0.0, 1.0, 0.0, 2.0, true);
        assert!((v - 2.0).abs() < 1e-5);
        let trough = lfo_value(OscillatorWaveform::Sine, 0.75, 0.0, 1.0, 0.0, 2.0, true);
        assert!(trough.abs() < 1e-5);
    }

    #[test]
    fn test_phase_offset_shifts_waveform() {
        let shifted = lfo_value(OscillatorWaveform::Sine, 0.0, 0.0, 1.0, 0.25, 1.0, false);
        assert!((shifted - 1.0).abs() < 1e-5);
    }
}
