//! Song data and the look-ahead step scheduler.

pub mod scheduler;
pub mod song;

pub use scheduler::{
    seconds_per_step, PlaybackPosition, StepScheduler, StepTrigger, TickReport, TransportState,
    VoiceSink,
};
pub use song::{Grid, Note, RowConfig, RowConfigSource, ScaleTable, Song};
