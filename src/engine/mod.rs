//! The explicit engine context.
//!
//! An [`Engine`] owns everything the sequencer needs at runtime: the audio
//! clock, the step scheduler, the voice pool, the live signal graph and the
//! latest song and graph snapshots. There is no global state; the owner (in
//! the demo binary, the audio callback) calls into it.
//!
//! # Rendering
//!
//! ```text
//!   render(out)
//!     └── per 128-frame quantum
//!           ├── tick source due?   → scheduler tick (notes → voice pool)
//!           ├── frame source due?  → modulation frame (graph params)
//!           ├── voice pool         → track buses
//!           ├── signal graph       → master
//!           └── master gain + soft clip, clock += 128
//! ```
//!
//! Both periodic sources run on audio time, so a note placed at time `t`
//! sounds on frame `round(t × sample_rate)` regardless of host jitter.

pub mod clock;

use std::sync::Arc;

pub use clock::{AudioClock, PeriodicSource};

use crate::config::EngineConfig;
use crate::dsp::distortion::soft_clip;
use crate::error::{EngineError, Result};
use crate::graph::builder::{GraphStats, SignalGraph, UpdateOutcome};
use crate::graph::model::{ColorSample, FxGraph};
use crate::graph::modulation::{run_modulation, ModulationReport};
use crate::graph::unit::UnitContext;
use crate::io::AudioOutput;
use crate::sequencing::scheduler::{PlaybackPosition, StepScheduler, TickReport};
use crate::sequencing::song::{RowConfigSource, ScaleTable, Song};
use crate::synth::message::{EngineMessage, MessageReceiver};
use crate::synth::pool::VoicePool;

/// Frames rendered between checks of the tick and frame sources.
pub const RENDER_QUANTUM: usize = 128;

pub struct Engine {
    config: EngineConfig,
    clock: AudioClock,
    scheduler: StepScheduler,
    pool: VoicePool,
    graph: SignalGraph,
    fx: FxGraph,
    song: Arc<Song>,
    rows: Box<dyn RowConfigSource + Send>,
    lfo_epoch: f64,
    tick_source: PeriodicSource,
    frame_source: PeriodicSource,
    color: ColorSample,
    shut_down: bool,
}

impl Engine {
    /// Validate `config` and build an idle engine with an empty song and an
    /// empty graph.
    pub fn init(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let ctx = UnitContext {
            sample_rate: config.sample_rate,
            bpm: config.initial_bpm as f32,
            max_delay_secs: config.max_delay_secs,
            block_size: RENDER_QUANTUM,
        };
        let song = Song::empty(
            1,
            config.track_count,
            0,
            config.steps_per_pattern,
            "default",
        );

        tracing::debug!(
            sample_rate = config.sample_rate,
            tracks = config.track_count,
            "engine initialized"
        );

        Ok(Self {
            clock: AudioClock::new(config.sample_rate),
            scheduler: StepScheduler::new(&config),
            pool: VoicePool::new(config.sample_rate, config.max_voices, config.track_count),
            graph: SignalGraph::new(ctx, config.track_count),
            fx: FxGraph::default(),
            song: Arc::new(song),
            rows: Box::new(ScaleTable::new()),
            lfo_epoch: 0.0,
            tick_source: PeriodicSource::new(config.tick_interval_secs),
            frame_source: PeriodicSource::new(config.frame_interval_secs),
            color: ColorSample::default(),
            shut_down: false,
            config,
        })
    }

    /// Stop the transport, silence every voice and drop the live graph.
    /// Rendering afterwards yields silence.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.scheduler.stop();
        self.pool.clear();
        self.fx = FxGraph::default();
        self.graph.update(&self.fx);
        self.shut_down = true;
        tracing::debug!("engine shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current output-clock time in seconds.
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn clock(&self) -> &AudioClock {
        &self.clock
    }

    pub fn lfo_epoch(&self) -> f64 {
        self.lfo_epoch
    }

    pub fn scheduler(&self) -> &StepScheduler {
        &self.scheduler
    }

    pub fn voices(&self) -> &VoicePool {
        &self.pool
    }

    pub fn graph(&self) -> &SignalGraph {
        &self.graph
    }

    pub fn fx_graph(&self) -> &FxGraph {
        &self.fx
    }

    pub fn graph_stats(&self) -> GraphStats {
        self.graph.stats()
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Start playback at the current clock time. The LFO epoch moves to now
    /// and the first tick runs immediately, so a note on the first step
    /// starts exactly now.
    pub fn play(&mut self) -> Result<()> {
        if self.shut_down {
            return Err(EngineError::ShutDown);
        }
        let now = self.clock.now();
        if self.scheduler.start(now) {
            self.lfo_epoch = now;
            self.tick_source.reset(now);
            self.frame_source.reset(now);
            if self.tick_source.poll(now) {
                self.tick();
            }
        }
        Ok(())
    }

    /// Stop scheduling. Voices already scheduled ring out.
    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    pub fn toggle_playback(&mut self) -> Result<()> {
        if self.scheduler.is_running() {
            self.stop();
            Ok(())
        } else {
            self.play()
        }
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn bpm(&self) -> u32 {
        self.scheduler.bpm()
    }

    /// Change tempo; tempo-relative units are retimed immediately.
    pub fn set_bpm(&mut self, bpm: u32) {
        let bpm = bpm.max(1);
        self.scheduler.set_bpm(bpm);
        self.graph.set_bpm(bpm as f32);
    }

    /// Hand the engine a new graph snapshot.
    pub fn set_graph(&mut self, graph: FxGraph) -> UpdateOutcome {
        let outcome = self.graph.update(&graph);
        self.fx = graph;
        outcome
    }

    pub fn set_song(&mut self, song: Arc<Song>) {
        self.song = song;
    }

    pub fn set_row_source(&mut self, rows: Box<dyn RowConfigSource + Send>) {
        self.rows = rows;
    }

    pub fn set_loop_range(&mut self, track: usize, range: Option<(usize, usize)>) {
        self.scheduler.set_loop_range(track, range);
    }

    pub fn queue_pattern(&mut self, pattern: Option<usize>) {
        self.scheduler.queue_pattern(pattern);
    }

    pub fn set_follow(&mut self, follow: bool) {
        self.scheduler.set_follow(follow);
    }

    pub fn set_editing_pattern(&mut self, pattern: usize) {
        self.scheduler.set_editing_pattern(pattern);
    }

    /// One scheduler tick at the current clock time.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        let report = self
            .scheduler
            .tick(now, &self.song, self.rows.as_ref(), &mut self.pool);
        if report.steps > 0 {
            tracing::trace!(now, steps = report.steps, dispatched = report.dispatched, "tick");
        }
        report
    }

    /// One modulation frame at `time` with the given note color.
    pub fn modulate(&mut self, time: f64, color: &ColorSample) -> ModulationReport {
        run_modulation(&self.fx, &mut self.graph, time, self.lfo_epoch, color)
    }

    /// Average color of the notes sounding right now.
    pub fn current_color(&self) -> ColorSample {
        ColorSample::average(self.pool.sounding_colors(self.clock.frame()))
    }

    /// Color used by the most recent modulation frame.
    pub fn last_color(&self) -> ColorSample {
        self.color
    }

    /// What is audible now, for UI highlighting.
    pub fn position(&self) -> PlaybackPosition {
        self.scheduler.position_at(self.clock.now())
    }

    /// Render mono master output into `out`, advancing the clock.
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        if self.shut_down {
            self.clock.advance(out.len());
            return;
        }

        let gain = self.config.master_gain;
        for chunk in out.chunks_mut(RENDER_QUANTUM) {
            let frames = chunk.len();
            let now = self.clock.now();

            if self.scheduler.is_running() && self.tick_source.poll(now) {
                self.tick();
            }
            if self.frame_source.poll(now) {
                self.color = self.current_color();
                let color = self.color;
                self.modulate(now, &color);
            }

            self.graph.clear_track_buses(frames);
            self.pool
                .render(self.graph.track_buses_mut(), self.clock.frame(), frames);
            self.graph.render(frames, chunk);

            for sample in chunk.iter_mut() {
                *sample = soft_clip(*sample * gain, 1.0);
            }
            self.clock.advance(frames);
        }
    }

    /// Render into every channel of `output`; channel 0 is rendered and the
    /// rest are copies.
    pub fn process_block(&mut self, output: &mut AudioOutput) {
        let Some((first, rest)) = output.buffers.split_first_mut() else {
            return;
        };
        self.render(first);
        for channel in rest {
            let n = channel.len().min(first.len());
            channel[..n].copy_from_slice(&first[..n]);
        }
    }

    pub fn handle_message(&mut self, message: EngineMessage) -> Result<()> {
        match message {
            EngineMessage::Play => self.play()?,
            EngineMessage::Stop => self.stop(),
            EngineMessage::TogglePlayback => self.toggle_playback()?,
            EngineMessage::SetBpm(bpm) => self.set_bpm(bpm),
            EngineMessage::SetGraph(graph) => {
                self.set_graph(*graph);
            }
            EngineMessage::SetSong(song) => self.set_song(song),
            EngineMessage::SetScales(table) => self.set_row_source(table),
            EngineMessage::SetLoopRange { track, range } => self.set_loop_range(track, range),
            EngineMessage::QueuePattern(pattern) => self.queue_pattern(pattern),
            EngineMessage::SetFollow(follow) => self.set_follow(follow),
            EngineMessage::SetEditingPattern(pattern) => self.set_editing_pattern(pattern),
        }
        Ok(())
    }

    /// Apply every pending message. Returns how many were handled.
    pub fn drain_messages<R: MessageReceiver + ?Sized>(&mut self, rx: &mut R) -> usize {
        let mut handled = 0;
        while let Some(message) = rx.pop() {
            if let Err(e) = self.handle_message(message) {
                tracing::warn!(error = %e, "engine message rejected");
            }
            handled += 1;
        }
        handled
    }
}
