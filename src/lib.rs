pub mod config;
pub mod dsp;
pub mod engine; // Clock, periodic sources and the engine context
pub mod error;
pub mod graph; // Declarative effect graph and its live realization
pub mod io;
pub mod sequencing; // Song data and look-ahead scheduling
pub mod synth; // Voice pool and control messages
pub mod voices;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{DispatchError, EngineError, GraphError};

/// Largest block a host callback is expected to hand the engine.
pub const MAX_BLOCK_SIZE: usize = 2048;
