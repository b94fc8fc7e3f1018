use thiserror::Error;

/// Lifecycle and configuration failures of the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    #[error("engine has been shut down")]
    ShutDown,

    #[error("failed to parse config: {0}")]
    ConfigParse(String),

    #[error("failed to (de)serialize graph: {0}")]
    Serialization(String),
}

/// A single edge that could not be wired during a graph rebuild.
///
/// These never abort a rebuild; the builder logs them and moves on to the
/// next connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("connection references unknown node `{0}`")]
    UnknownNode(String),

    #[error("source has no sub-output named `{0}`")]
    UnknownSubOutput(String),

    #[error("track bus {0} does not exist")]
    MissingTrackBus(usize),

    #[error("node `{0}` has no audio input")]
    NoAudioInput(String),

    #[error("node `{0}` has no audio output")]
    NoAudioOutput(String),

    #[error("connection from `{0}` would create an audio cycle")]
    Cycle(String),
}

/// Failure to start one scheduled voice.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispatchError {
    #[error("trigger time {0} is not a finite, non-negative clock time")]
    InvalidTime(f64),

    #[error("trigger gain {0} is not finite")]
    InvalidGain(f32),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
