//! Benchmarks for effect primitives.

mod compressor;
mod delay;
mod distortion;
mod filter;
mod reverb;

pub use compressor::bench_compressor;
pub use delay::bench_delay;
pub use distortion::bench_distortion;
pub use filter::bench_filter;
pub use reverb::bench_reverb;
