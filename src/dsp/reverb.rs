//! Reverb - Convolution with a Procedural Impulse
//!
//! A convolution reverb plays every input sample through a recorded (or here,
//! generated) "impulse response" of a room. The impulse is the room's answer
//! to a single click; convolving with it reproduces the whole tail.
//!
//! # The Impulse
//!
//! No rooms are recorded. The impulse is white noise under a power-law decay:
//!
//! ```text
//! h[i] = noise[i] · (1 − i / len)^decay
//! ```
//!
//! `len` comes from the reverb "time" control and `decay` from its "decay"
//! control. Higher exponents die away faster and sound smaller. The result is
//! normalized to unit energy so long tails do not get louder than short ones.
//!
//! # Uniformly Partitioned Convolution
//!
//! Direct convolution with a two-second impulse is ~100k multiplies per
//! sample. Instead the impulse is cut into partitions of `BLOCK` samples, each
//! transformed once with an FFT of size `2 · BLOCK`:
//!
//! ```text
//! input blocks   x0  x1  x2  x3 ...
//!                 │   │   │   │
//!              FFT(prev ‖ current)  → frequency delay line
//!
//! Y = Σ_p  X[k − p] · H[p]          (one complex multiply-add per bin)
//! y = last BLOCK samples of IFFT(Y)  (overlap-save)
//! ```
//!
//! Per-sample processing buffers one block, so the wet path carries `BLOCK`
//! samples of latency.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Partition length of the convolver.
pub const BLOCK: usize = 256;

/// Generate an exponentially-shaped noise impulse.
///
/// The same `seed` always yields the same impulse.
pub fn generate_impulse(sample_rate: f32, seconds: f32, decay: f32, seed: u64) -> Vec<f32> {
    let len = ((sample_rate * seconds.max(0.0)) as usize).max(1);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut impulse: Vec<f32> = (0..len)
        .map(|i| {
            let noise: f32 = rng.gen_range(-1.0..=1.0);
            noise * (1.0 - i as f32 / len as f32).powf(decay.max(0.0))
        })
        .collect();

    let energy: f32 = impulse.iter().map(|s| s * s).sum();
    if energy > f32::EPSILON {
        let norm = energy.sqrt().recip();
        for sample in impulse.iter_mut() {
            *sample *= norm;
        }
    }
    impulse
}

/// Streaming FFT convolver (uniformly partitioned overlap-save).
pub struct Convolver {
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    partitions: Vec<Vec<Complex<f32>>>,
    spectra: Vec<Vec<Complex<f32>>>,
    newest: usize,
    window: Vec<f32>,
    output: Vec<f32>,
    pos: usize,
    work: Vec<Complex<f32>>,
    accum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Convolver {
    pub fn new(impulse: &[f32]) -> Self {
        let fft_size = BLOCK * 2;
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let ifft = planner.plan_fft_inverse(fft_size);
        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());

        let mut convolver = Self {
            fft,
            ifft,
            partitions: Vec::new(),
            spectra: Vec::new(),
            newest: 0,
            window: vec![0.0; fft_size],
            output: vec![0.0; BLOCK],
            pos: 0,
            work: vec![Complex::default(); fft_size],
            accum: vec![Complex::default(); fft_size],
            scratch: vec![Complex::default(); scratch_len],
        };
        convolver.set_impulse(impulse);
        convolver
    }

    /// Replace the impulse response. Clears all convolution history.
    pub fn set_impulse(&mut self, impulse: &[f32]) {
        let fft_size = BLOCK * 2;
        let count = impulse.len().div_ceil(BLOCK).max(1);

        self.partitions.clear();
        for p in 0..count {
            let mut spectrum = vec![Complex::default(); fft_size];
            let start = p * BLOCK;
            let end = (start + BLOCK).min(impulse.len());
            if start < end {
                for (bin, &h) in spectrum.iter_mut().zip(&impulse[start..end]) {
                    bin.re = h;
                }
            }
            self.fft.process_with_scratch(&mut spectrum, &mut self.scratch);
            self.partitions.push(spectrum);
        }

        self.spectra = vec![vec![Complex::default(); fft_size]; count];
        self.reset();
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Latency of the wet signal in samples.
    pub fn latency(&self) -> usize {
        BLOCK
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let out = self.output[self.pos];
        self.window[BLOCK + self.pos] = input;
        self.pos += 1;
        if self.pos == BLOCK {
            self.process_block();
            self.pos = 0;
        }
        out
    }

    fn process_block(&mut self) {
        let count = self.partitions.len();
        self.newest = (self.newest + 1) % count;

        for (bin, &x) in self.work.iter_mut().zip(self.window.iter()) {
            *bin = Complex::new(x, 0.0);
        }
        self.fft.process_with_scratch(&mut self.work, &mut self.scratch);
        self.spectra[self.newest].copy_from_slice(&self.work);

        self.accum.fill(Complex::default());
        for (p, partition) in self.partitions.iter().enumerate() {
            let spectrum = &self.spectra[(self.newest + count - p) % count];
            for ((acc, &x), &h) in self.accum.iter_mut().zip(spectrum).zip(partition) {
                *acc += x * h;
            }
        }

        self.ifft.process_with_scratch(&mut self.accum, &mut self.scratch);
        let scale = 1.0 / (BLOCK * 2) as f32;
        for (out, bin) in self.output.iter_mut().zip(&self.accum[BLOCK..]) {
            *out = bin.re * scale;
        }

        // Slide: current block becomes the previous half of the next window
        self.window.copy_within(BLOCK.., 0);
    }

    pub fn reset(&mut self) {
        for spectrum in self.spectra.iter_mut() {
            spectrum.fill(Complex::default());
        }
        self.window.fill(0.0);
        self.output.fill(0.0);
        self.pos = 0;
        self.newest = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct_convolution(input: &[f32], impulse: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0; input.len()];
        for n in 0..input.len() {
            for (k, &h) in impulse.iter().enumerate() {
                if k <= n {
                    out[n] += h * input[n - k];
                }
            }
        }
        out
    }

    #[test]
    fn test_impulse_is_deterministic_and_normalized() {
        let a = generate_impulse(48_000.0, 0.5, 2.0, 7);
        let b = generate_impulse(48_000.0, 0.5, 2.0, 7);
        assert_eq!(a, b);
        assert_eq!(a.len(), 24_000);

        let energy: f32 = a.iter().map(|s| s * s).sum();
        assert!((energy - 1.0).abs() < 1e-3, "energy {}", energy);
    }

    #[test]
    fn test_impulse_decays() {
        let ir = generate_impulse(48_000.0, 1.0, 3.0, 1);
        let head: f32 = ir[..4800].iter().map(|s| s.abs()).sum();
        let tail: f32 = ir[ir.len() - 4800..].iter().map(|s| s.abs()).sum();
        assert!(head > tail * 10.0);
    }

    #[test]
    fn test_zero_length_impulse_is_safe() {
        let ir = generate_impulse(48_000.0, 0.0, 2.0, 1);
        assert_eq!(ir.len(), 1);
        let mut conv = Convolver::new(&[]);
        assert_eq!(conv.partition_count(), 1);
        for _ in 0..1000 {
            assert_eq!(conv.process(1.0), 0.0);
        }
    }

    #[test]
    fn test_matches_direct_convolution_after_latency() {
        let impulse: Vec<f32> = (0..700).map(|i| ((i as f32) * 0.31).sin() * 0.01).collect();
        let input: Vec<f32> = (0..2048).map(|i| ((i as f32) * 0.07).cos()).collect();

        let mut conv = Convolver::new(&impulse);
        let streamed: Vec<f32> = input.iter().map(|&x| conv.process(x)).collect();
        let expected = direct_convolution(&input, &impulse);

        let latency = conv.latency();
        for n in 0..(input.len() - latency) {
            assert!(
                (streamed[n + latency] - expected[n]).abs() < 1e-3,
                "n={} got={} expected={}",
                n,
                streamed[n + latency],
                expected[n]
            );
        }
    }

    #[test]
    fn test_reset_clears_tail() {
        let impulse = generate_impulse(48_000.0, 0.1, 1.0, 3);
        let mut conv = Convolver::new(&impulse);
        for _ in 0..1024 {
            conv.process(1.0);
        }
        conv.reset();
        for _ in 0..1024 {
            assert_eq!(conv.process(0.0), 0.0);
        }
    }
}
