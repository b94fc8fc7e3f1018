//! Terminal UI: transport bar, step grid with playhead, oscilloscope.

mod grid;
mod transport;
mod waveform;

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use rtrb::{Consumer, Producer};
use stepfx::{
    graph::ColorSample,
    sequencing::{PlaybackPosition, Song},
    synth::EngineMessage,
    Engine,
};

use grid::render_grid;
use transport::render_transport;
use waveform::render_waveform;

const VIS_BUFFER_SIZE: usize = 1024;
const BPM_STEP: u32 = 4;

/// Snapshot published by the audio callback once per buffer. `Copy`, so
/// pushing it never allocates on the audio thread.
#[derive(Debug, Clone, Copy)]
pub struct StatusUpdate {
    pub position: PlaybackPosition,
    pub bpm: u32,
    pub peak: f32,
    pub voices: usize,
    pub color: ColorSample,
    pub queued: Option<usize>,
    pub follow: bool,
}

impl StatusUpdate {
    pub fn from_engine(engine: &Engine, peak: f32) -> Self {
        Self {
            position: engine.position(),
            bpm: engine.bpm(),
            peak,
            voices: engine.voices().len(),
            color: engine.last_color(),
            queued: engine.scheduler().queued_pattern(),
            follow: engine.scheduler().follow(),
        }
    }
}

pub struct UiApp {
    control_tx: Producer<EngineMessage>,
    status_rx: Consumer<StatusUpdate>,
    scope_rx: Consumer<f32>,
    song: Arc<Song>,
    status: StatusUpdate,
    scope: Vec<f32>,
    /// Track whose loop range the number keys edit.
    selected_track: usize,
    loops: Vec<Option<(usize, usize)>>,
    should_quit: bool,
}

impl UiApp {
    pub fn new(
        control_tx: Producer<EngineMessage>,
        status_rx: Consumer<StatusUpdate>,
        scope_rx: Consumer<f32>,
        song: Arc<Song>,
        initial: StatusUpdate,
    ) -> Self {
        let tracks = song.track_count();
        Self {
            control_tx,
            status_rx,
            scope_rx,
            song,
            status: initial,
            scope: vec![0.0; VIS_BUFFER_SIZE],
            selected_track: 0,
            loops: vec![None; tracks],
            should_quit: false,
        }
    }

    pub fn run(&mut self, mut terminal: DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_scope();
            while let Ok(status) = self.status_rx.pop() {
                self.status = status;
            }

            terminal.draw(|frame| self.render(frame))?;

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }
        Ok(())
    }

    fn poll_scope(&mut self) {
        while let Ok(sample) = self.scope_rx.pop() {
            self.scope.push(sample);
        }
        if self.scope.len() > VIS_BUFFER_SIZE {
            let excess = self.scope.len() - VIS_BUFFER_SIZE;
            self.scope.drain(0..excess);
        }
    }

    fn send(&mut self, message: EngineMessage) {
        if self.control_tx.push(message).is_err() {
            tracing::warn!("control ring full, message dropped");
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(' ') => self.send(EngineMessage::TogglePlayback),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.send(EngineMessage::SetBpm(self.status.bpm + BPM_STEP))
            }
            KeyCode::Char('-') => {
                self.send(EngineMessage::SetBpm(self.status.bpm.saturating_sub(BPM_STEP).max(20)))
            }
            KeyCode::Char('f') => self.send(EngineMessage::SetFollow(!self.status.follow)),
            KeyCode::Char(c @ '1'..='9') => {
                let pattern = c as usize - '1' as usize;
                if pattern < self.song.pattern_count() {
                    self.send(EngineMessage::QueuePattern(Some(pattern)));
                }
            }
            KeyCode::Tab => {
                self.selected_track = (self.selected_track + 1) % self.loops.len().max(1);
            }
            KeyCode::Char('l') => {
                let track = self.selected_track;
                let Some(slot) = self.loops.get_mut(track) else {
                    return;
                };
                // Cycle: none → loop current pattern → loop first two → none
                let current = self.status.position.pattern;
                *slot = match *slot {
                    None => Some((current, current)),
                    Some((a, b)) if a == b && self.song.pattern_count() > 1 => {
                        Some((0, 1))
                    }
                    Some(_) => None,
                };
                let range = *slot;
                self.send(EngineMessage::SetLoopRange { track, range });
            }
            _ => {}
        }
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(8),
                Constraint::Length(1),
            ])
            .split(frame.area());

        render_transport(frame, chunks[0], &self.status);
        render_grid(
            frame,
            chunks[1],
            &self.song,
            &self.status,
            self.selected_track,
            &self.loops,
        );
        render_waveform(frame, chunks[2], &self.scope);

        let help = Paragraph::new(
            " [Q] Quit  [Space] Play/Stop  [+/-] Tempo  [F] Follow  [1-9] Queue  [Tab] Track  [L] Loop",
        )
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[3]);
    }
}
