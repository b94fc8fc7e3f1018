// Purpose: live voice bookkeeping and control messages
// This layer sits between the scheduler and the track buses of the graph

pub mod message;
pub mod pool;

pub use message::{EngineMessage, MessageReceiver};
pub use pool::VoicePool;
