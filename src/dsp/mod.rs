//! Low-level DSP primitives used by voices and effect units.
//!
//! These components are allocation-free once constructed, making them safe to
//! embed directly inside voices and live processing units. They stay focused
//! on the signal-processing math; scheduling and routing live in `voices`,
//! `graph` and `engine`.

/// Sample-clock parameter automation (set / linear / exponential ramps).
pub mod automation;
/// Feed-forward dynamics compressor.
pub mod compressor;
/// Time-domain delay line with optional interpolation.
pub mod delay;
/// Waveshaping curves and clipping.
pub mod distortion;
/// State-variable filter implementation with multiple responses.
pub mod filter;
/// LFO waveform math and polarity helpers.
pub mod lfo;
/// Buffer summing and dry/wet helpers.
pub mod mix;
/// Oscillator waveforms and noise sources.
pub mod oscillator;
/// Procedural impulse responses and partitioned FFT convolution.
pub mod reverb;

pub use automation::Automation;
pub use oscillator::OscillatorWaveform;
