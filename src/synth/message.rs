use std::collections::VecDeque;
use std::sync::Arc;

#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use crate::graph::model::FxGraph;
use crate::sequencing::song::{ScaleTable, Song};

/// Control messages from the UI thread to the engine that owns the audio
/// callback. Large payloads travel boxed so the ring buffer slots stay small.
#[derive(Debug, Clone)]
pub enum EngineMessage {
    Play,
    Stop,
    TogglePlayback,
    SetBpm(u32),
    SetGraph(Box<FxGraph>),
    SetSong(Arc<Song>),
    SetScales(Box<ScaleTable>),
    SetLoopRange {
        track: usize,
        range: Option<(usize, usize)>,
    },
    QueuePattern(Option<usize>),
    SetFollow(bool),
    SetEditingPattern(usize),
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<EngineMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<EngineMessage> {
    fn pop(&mut self) -> Option<EngineMessage> {
        Consumer::pop(self).ok()
    }
}

impl MessageReceiver for VecDeque<EngineMessage> {
    fn pop(&mut self) -> Option<EngineMessage> {
        self.pop_front()
    }
}
