/*
Look-Ahead Step Scheduler
=========================

The tick source fires every ~25 ms; audio needs sample-exact note starts.
The scheduler bridges the two by scheduling slightly ahead of the audio
clock: each tick it walks forward over every step whose start time falls
inside the look-ahead window and hands those notes to voices with their
exact clock time.

    audio clock now
         │◄──────── lookahead (100 ms) ────────►│
    ─────┼────┬────┬────┬─────────────────────── time
         │    s5   s6   s7 ← scheduled this tick
         next_note_time advances one step per scheduled step

Guarantees:

- A tick schedules at most `max_steps_per_tick` steps, so a long stall never
  turns into an unbounded catch-up loop.
- A step is never scheduled before the audio clock: a stale anchor is pulled
  forward to "now" before and after the loop, so a suspended app resumes on
  time instead of firing a burst of past notes.
- A failing voice is logged and skipped; the anchor still advances.

Pattern Selection
-----------------

Every track resolves its own pattern per step:

    no loop range     → global pattern counter
    loop [start, end] → start + (global mod (end − start + 1))

    global:        0 1 2 3 4 5 6
    loop [2, 4]:   2 3 4 2 3 4 2

On wraparound a queued pattern (one shot) replaces the global counter;
otherwise the counter advances modulo the pattern count. Follow mode moves
the editing pattern along with playback.
*/

use std::collections::VecDeque;

use crate::config::EngineConfig;
use crate::error::DispatchError;
use crate::graph::model::ColorSample;
use crate::sequencing::song::{Note, RowConfig, RowConfigSource, Song};
use crate::voices::{VoiceConfig, VoiceKind};

/// Markers kept for position lookups.
const MAX_MARKERS: usize = 64;

/// Seconds per sixteenth-note step.
#[inline]
pub fn seconds_per_step(bpm: u32) -> f64 {
    60.0 / bpm.max(1) as f64 / 4.0
}

/// Everything a voice needs to sound one note.
#[derive(Debug, Clone, PartialEq)]
pub struct StepTrigger {
    /// Absolute audio-clock start time.
    pub time: f64,
    pub track: usize,
    pub row: usize,
    pub kind: VoiceKind,
    pub gain: f32,
    pub duration_steps: u32,
    pub bpm: u32,
    pub config: VoiceConfig,
    pub color: Option<ColorSample>,
}

/// Receives scheduled notes.
pub trait VoiceSink {
    fn trigger(&mut self, trigger: &StepTrigger) -> Result<(), DispatchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Running,
}

/// What is audible now, for UI highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackPosition {
    pub step: usize,
    pub pattern: usize,
    pub playing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct StepMarker {
    time: f64,
    step: usize,
    pattern: usize,
}

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub steps: usize,
    pub dispatched: usize,
    pub failed: usize,
}

pub struct StepScheduler {
    state: TransportState,
    steps_per_pattern: usize,
    lookahead: f64,
    max_steps_per_tick: usize,
    bpm: u32,
    current_step: usize,
    next_note_time: f64,
    global_pattern: usize,
    queued_pattern: Option<usize>,
    editing_pattern: usize,
    follow: bool,
    loop_ranges: Vec<Option<(usize, usize)>>,
    markers: VecDeque<StepMarker>,
}

impl StepScheduler {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: TransportState::Stopped,
            steps_per_pattern: config.steps_per_pattern.max(1),
            lookahead: config.lookahead_secs,
            max_steps_per_tick: config.max_steps_per_tick.max(1),
            bpm: config.initial_bpm.max(1),
            current_step: 0,
            next_note_time: 0.0,
            global_pattern: 0,
            queued_pattern: None,
            editing_pattern: 0,
            follow: false,
            loop_ranges: vec![None; config.track_count],
            markers: VecDeque::with_capacity(MAX_MARKERS),
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TransportState::Running
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn set_bpm(&mut self, bpm: u32) {
        self.bpm = bpm.max(1);
    }

    pub fn seconds_per_step(&self) -> f64 {
        seconds_per_step(self.bpm)
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn next_note_time(&self) -> f64 {
        self.next_note_time
    }

    pub fn global_pattern(&self) -> usize {
        self.global_pattern
    }

    pub fn editing_pattern(&self) -> usize {
        self.editing_pattern
    }

    pub fn set_editing_pattern(&mut self, pattern: usize) {
        self.editing_pattern = pattern;
    }

    pub fn queued_pattern(&self) -> Option<usize> {
        self.queued_pattern
    }

    /// Queue a one-shot pattern switch for the next wraparound.
    pub fn queue_pattern(&mut self, pattern: Option<usize>) {
        self.queued_pattern = pattern;
    }

    pub fn follow(&self) -> bool {
        self.follow
    }

    pub fn set_follow(&mut self, follow: bool) {
        self.follow = follow;
    }

    pub fn loop_range(&self, track: usize) -> Option<(usize, usize)> {
        self.loop_ranges.get(track).copied().flatten()
    }

    /// Loop `track` over patterns `start..=end`, or clear with `None`.
    pub fn set_loop_range(&mut self, track: usize, range: Option<(usize, usize)>) {
        if self.loop_ranges.len() <= track {
            self.loop_ranges.resize(track + 1, None);
        }
        self.loop_ranges[track] = range.map(|(a, b)| (a.min(b), a.max(b)));
    }

    /// Pattern `track` plays for global counter value `global`.
    pub fn pattern_for_track(&self, track: usize, global: usize) -> usize {
        match self.loop_range(track) {
            Some((start, end)) => match (end - start).checked_add(1) {
                Some(len) => start + global % len,
                None => global,
            },
            None => global,
        }
    }

    /// Stopped → Running. Returns `false` if already running.
    pub fn start(&mut self, now: f64) -> bool {
        if self.is_running() {
            return false;
        }
        self.state = TransportState::Running;
        self.next_note_time = now;
        if self.current_step == 0 {
            self.global_pattern = self.editing_pattern;
        }
        self.markers.clear();
        tracing::debug!(now, pattern = self.global_pattern, "transport started");
        true
    }

    /// Running → Stopped; the step position returns to 0.
    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.current_step = 0;
        self.markers.clear();
        tracing::debug!("transport stopped");
    }

    /// One tick of the look-ahead loop at audio-clock time `now`.
    pub fn tick(
        &mut self,
        now: f64,
        song: &Song,
        rows: &dyn RowConfigSource,
        sink: &mut dyn VoiceSink,
    ) -> TickReport {
        let mut report = TickReport::default();
        if !self.is_running() {
            return report;
        }

        if self.next_note_time < now {
            self.next_note_time = now;
        }

        while self.next_note_time < now + self.lookahead && report.steps < self.max_steps_per_tick
        {
            self.schedule_step(self.next_note_time, song, rows, sink, &mut report);
            self.advance(song.pattern_count());
            report.steps += 1;
        }

        if self.next_note_time < now {
            self.next_note_time = now;
        }

        while self.markers.len() >= 2 && self.markers[1].time <= now {
            self.markers.pop_front();
        }

        report
    }

    fn schedule_step(
        &mut self,
        time: f64,
        song: &Song,
        rows: &dyn RowConfigSource,
        sink: &mut dyn VoiceSink,
        report: &mut TickReport,
    ) {
        let step = self.current_step;
        for track in 0..song.track_count() {
            let pattern = self.pattern_for_track(track, self.global_pattern);
            let Some(grid) = song.grid(pattern, track) else {
                continue;
            };
            let scale = song.scale_for(pattern, track);
            let Some(configs) = rows.rows(scale) else {
                tracing::trace!(track, scale, "no row configs for scale");
                continue;
            };

            for row in 0..grid.rows() {
                let Some(note) = grid.note(row, step) else {
                    continue;
                };
                let Some(row_config) = configs.get(row) else {
                    tracing::trace!(track, row, "row without config skipped");
                    continue;
                };

                let gain = row_config.gain * song.track_gain(track);
                for trigger in self.expand(time, track, row, note, row_config, gain) {
                    match sink.trigger(&trigger) {
                        Ok(()) => report.dispatched += 1,
                        Err(e) => {
                            tracing::warn!(error = %e, track, row, step, "voice dispatch failed");
                            report.failed += 1;
                        }
                    }
                }
            }
        }

        if self.markers.len() == MAX_MARKERS {
            self.markers.pop_front();
        }
        self.markers.push_back(StepMarker {
            time,
            step,
            pattern: self.global_pattern,
        });
    }

    /// Triggers for one note. Percussive notes longer than one step become
    /// a roll: the main hit, then two half-step sub-hits per extra step,
    /// gain rising from 40% to 100%.
    fn expand(
        &self,
        time: f64,
        track: usize,
        row: usize,
        note: &Note,
        row_config: &RowConfig,
        gain: f32,
    ) -> Vec<StepTrigger> {
        let kind = row_config.role;
        let mut config = VoiceConfig::for_kind(kind);
        if kind == VoiceKind::Synth {
            config.frequency = row_config.frequency * 2.0_f32.powi(note.octave);
        }
        let config = config.with_overrides(&note.overrides);
        let color = note
            .color
            .as_deref()
            .or(row_config.color.as_deref())
            .and_then(ColorSample::from_hex);

        let base = StepTrigger {
            time,
            track,
            row,
            kind,
            gain,
            duration_steps: note.duration.max(1),
            bpm: self.bpm,
            config,
            color,
        };

        if !kind.is_percussive() || note.duration <= 1 {
            return vec![base];
        }

        let step = self.seconds_per_step();
        let sub_hits = 2 * (note.duration as usize - 1);
        let mut triggers = Vec::with_capacity(sub_hits + 1);
        triggers.push(base.clone());
        for k in 0..sub_hits {
            let ramp = if sub_hits > 1 {
                k as f32 / (sub_hits - 1) as f32
            } else {
                1.0
            };
            triggers.push(StepTrigger {
                time: time + step + k as f64 * step * 0.5,
                gain: gain * (0.4 + 0.6 * ramp),
                duration_steps: 1,
                ..base.clone()
            });
        }
        triggers
    }

    fn advance(&mut self, pattern_count: usize) {
        self.next_note_time += self.seconds_per_step();
        self.current_step += 1;
        if self.current_step < self.steps_per_pattern {
            return;
        }

        self.current_step = 0;
        match self.queued_pattern.take() {
            Some(queued) if queued < pattern_count.max(1) => self.global_pattern = queued,
            Some(queued) => {
                tracing::debug!(queued, pattern_count, "queued pattern out of range");
                self.global_pattern = (self.global_pattern + 1) % pattern_count.max(1);
            }
            None => self.global_pattern = (self.global_pattern + 1) % pattern_count.max(1),
        }
        if self.follow {
            self.editing_pattern = self.global_pattern;
        }
    }

    /// Step and pattern audible at `now` (the last scheduled step whose time
    /// has passed), rather than the look-ahead cursor.
    pub fn position_at(&self, now: f64) -> PlaybackPosition {
        let marker = self.markers.iter().rev().find(|m| m.time <= now);
        match marker {
            Some(m) if self.is_running() => PlaybackPosition {
                step: m.step,
                pattern: m.pattern,
                playing: true,
            },
            _ => PlaybackPosition {
                step: self.current_step,
                pattern: self.global_pattern,
                playing: self.is_running(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencing::song::{Grid, ScaleTable};

    #[derive(Default)]
    struct Recorder {
        triggers: Vec<StepTrigger>,
        fail_rows: Vec<usize>,
    }

    impl VoiceSink for Recorder {
        fn trigger(&mut self, trigger: &StepTrigger) -> Result<(), DispatchError> {
            if self.fail_rows.contains(&trigger.row) {
                return Err(DispatchError::InvalidGain(f32::NAN));
            }
            self.triggers.push(trigger.clone());
            Ok(())
        }
    }

    fn drum_rows() -> ScaleTable {
        ScaleTable::new().with_scale(
            "drums",
            vec![
                RowConfig::new(VoiceKind::Kick, 0.0, 1.0),
                RowConfig::new(VoiceKind::Snare, 0.0, 0.8),
                RowConfig::new(VoiceKind::Synth, 220.0, 0.5),
            ],
        )
    }

    fn one_track_song(patterns: usize) -> Song {
        Song::empty(patterns, 1, 3, 16, "drums")
    }

    fn scheduler() -> StepScheduler {
        StepScheduler::new(&EngineConfig {
            track_count: 1,
            ..EngineConfig::default()
        })
    }

    #[test]
    fn test_seconds_per_step() {
        assert!((seconds_per_step(120) - 0.125).abs() < 1e-12);
        assert!((seconds_per_step(60) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_loop_range_resolution() {
        let mut s = scheduler();
        s.set_loop_range(0, Some((2, 4)));
        let seq: Vec<usize> = (0..7).map(|g| s.pattern_for_track(0, g)).collect();
        assert_eq!(seq, vec![2, 3, 4, 2, 3, 4, 2]);
        assert_eq!(s.pattern_for_track(5, 6), 6);
    }

    #[test]
    fn test_unbounded_loop_range_does_not_overflow() {
        let mut s = scheduler();
        s.set_loop_range(0, Some((0, usize::MAX)));
        assert_eq!(s.pattern_for_track(0, 5), 5);
        s.set_loop_range(0, Some((usize::MAX, 3)));
        assert_eq!(s.pattern_for_track(0, 2), 5);
    }

    #[test]
    fn test_stopped_scheduler_does_nothing() {
        let mut s = scheduler();
        let mut rec = Recorder::default();
        let report = s.tick(1.0, &one_track_song(1), &drum_rows(), &mut rec);
        assert_eq!(report, TickReport::default());
    }

    #[test]
    fn test_schedules_only_inside_lookahead() {
        let mut song = one_track_song(1);
        let grid = song.grid_mut(0, 0).unwrap();
        for step in 0..16 {
            grid.set(0, step, Note::new(1));
        }
        let mut s = scheduler();
        let mut rec = Recorder::default();
        s.start(10.0);

        let mut now = 10.0;
        for _ in 0..200 {
            let before = rec.triggers.len();
            s.tick(now, &song, &drum_rows(), &mut rec);
            for t in &rec.triggers[before..] {
                assert!(t.time >= now - 1e-9, "scheduled in the past");
                assert!(t.time < now + 0.1 + 1e-9, "scheduled beyond lookahead");
            }
            now += 0.025;
        }
        // 5 s of ticks at 8 steps per second, plus the look-ahead
        assert!(rec.triggers.len() >= 40);
    }

    #[test]
    fn test_anchor_catches_up_after_stall() {
        let song = one_track_song(1);
        let mut s = scheduler();
        let mut rec = Recorder::default();
        s.start(0.0);
        s.tick(0.0, &song, &drum_rows(), &mut rec);
        let report = s.tick(100.0, &song, &drum_rows(), &mut rec);
        assert!(report.steps <= 16);
        assert!(s.next_note_time() >= 100.0);
    }

    #[test]
    fn test_bounded_steps_per_tick() {
        let song = one_track_song(1);
        let mut s = StepScheduler::new(&EngineConfig {
            track_count: 1,
            lookahead_secs: 100.0,
            max_steps_per_tick: 5,
            ..EngineConfig::default()
        });
        let mut rec = Recorder::default();
        s.start(0.0);
        let report = s.tick(0.0, &song, &drum_rows(), &mut rec);
        assert_eq!(report.steps, 5);
    }

    #[test]
    fn test_wraparound_advances_and_consumes_queue() {
        let song = one_track_song(3);
        let mut s = scheduler();
        let mut rec = Recorder::default();
        s.start(0.0);
        let mut now = 0.0;
        while s.global_pattern() == 0 {
            s.tick(now, &song, &drum_rows(), &mut rec);
            now += 0.025;
        }
        assert_eq!(s.global_pattern(), 1);
        assert_eq!(s.current_step(), 0);

        s.queue_pattern(Some(0));
        while s.global_pattern() == 1 {
            s.tick(now, &song, &drum_rows(), &mut rec);
            now += 0.025;
        }
        assert_eq!(s.global_pattern(), 0);
        assert_eq!(s.queued_pattern(), None);
    }

    #[test]
    fn test_follow_moves_editing_pattern() {
        let song = one_track_song(2);
        let mut s = scheduler();
        s.set_follow(true);
        let mut rec = Recorder::default();
        s.start(0.0);
        let mut now = 0.0;
        while s.global_pattern() == 0 {
            s.tick(now, &song, &drum_rows(), &mut rec);
            now += 0.025;
        }
        assert_eq!(s.editing_pattern(), 1);
    }

    #[test]
    fn test_fresh_start_snaps_to_editing_pattern() {
        let mut s = scheduler();
        s.set_editing_pattern(3);
        s.start(0.0);
        assert_eq!(s.global_pattern(), 3);
        s.stop();
        assert_eq!(s.current_step(), 0);
        assert!(!s.is_running());
    }

    #[test]
    fn test_percussive_roll_expansion() {
        let mut song = one_track_song(1);
        song.grid_mut(0, 0).unwrap().set(1, 0, Note::new(3));
        let mut s = scheduler();
        let mut rec = Recorder::default();
        s.start(0.0);
        s.tick(0.0, &song, &drum_rows(), &mut rec);

        let hits: Vec<&StepTrigger> = rec.triggers.iter().filter(|t| t.row == 1).collect();
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[0].time, 0.0);
        assert!((hits[0].gain - 0.8).abs() < 1e-6);
        assert!((hits[1].time - 0.125).abs() < 1e-9);
        assert!((hits[1].gain - 0.8 * 0.4).abs() < 1e-6);
        assert!((hits[2].time - 0.1875).abs() < 1e-9);
        assert!((hits[4].gain - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_roll_sub_hits_are_never_in_the_past() {
        let mut song = one_track_song(1);
        song.grid_mut(0, 0).unwrap().set(1, 2, Note::new(8));
        let mut s = scheduler();
        let mut rec = Recorder::default();
        s.start(0.0);

        let mut now = 0.0;
        for _ in 0..8 {
            let before = rec.triggers.len();
            s.tick(now, &song, &drum_rows(), &mut rec);
            for t in &rec.triggers[before..] {
                assert!(t.time >= now - 1e-9, "scheduled in the past");
            }
            now += 0.025;
        }

        let hits: Vec<&StepTrigger> = rec.triggers.iter().filter(|t| t.row == 1).collect();
        assert_eq!(hits.len(), 15);
        // Main hit at step 2, sub-hits from step 3 at half-step spacing
        assert!((hits[0].time - 0.25).abs() < 1e-9);
        assert!((hits[1].time - 0.375).abs() < 1e-9);
        assert!((hits[14].time - 1.1875).abs() < 1e-9);
        assert!(hits.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn test_dispatch_uses_scale_of_each_pattern() {
        let rows = ScaleTable::new()
            .with_scale("a", vec![RowConfig::new(VoiceKind::Synth, 100.0, 1.0)])
            .with_scale("b", vec![RowConfig::new(VoiceKind::Synth, 300.0, 1.0)]);
        let mut song = Song::empty(2, 1, 1, 16, "a");
        song.grid_mut(0, 0).unwrap().set(0, 0, Note::new(1));
        song.grid_mut(1, 0).unwrap().set(0, 0, Note::new(1));
        song.set_scale(1, 0, "b");

        let mut s = scheduler();
        let mut rec = Recorder::default();
        s.start(0.0);
        let mut now = 0.0;
        while now < 4.1 {
            s.tick(now, &song, &rows, &mut rec);
            now += 0.025;
        }

        let freqs: Vec<f32> = rec.triggers.iter().map(|t| t.config.frequency).collect();
        assert_eq!(freqs, vec![100.0, 300.0, 100.0]);
        assert_eq!(rec.triggers[1].time, 2.0);
    }

    #[test]
    fn test_synth_pitch_and_duration() {
        let mut song = one_track_song(1);
        song.grid_mut(0, 0)
            .unwrap()
            .set(2, 0, Note::new(4).with_octave(1).with_color("#00ff00"));
        let mut s = scheduler();
        let mut rec = Recorder::default();
        s.start(0.0);
        s.tick(0.0, &song, &drum_rows(), &mut rec);

        assert_eq!(rec.triggers.len(), 1);
        let t = &rec.triggers[0];
        assert_eq!(t.kind, VoiceKind::Synth);
        assert_eq!(t.duration_steps, 4);
        assert!((t.config.frequency - 440.0).abs() < 1e-3);
        assert_eq!(t.color.map(|c| c.g), Some(1.0));
    }

    #[test]
    fn test_missing_row_config_is_skipped() {
        let mut song = one_track_song(1);
        let mut grid = Grid::new(5, 16);
        grid.set(4, 0, Note::new(1));
        grid.set(0, 0, Note::new(1));
        song.patterns[0][0] = grid;
        let mut s = scheduler();
        let mut rec = Recorder::default();
        s.start(0.0);
        let report = s.tick(0.0, &song, &drum_rows(), &mut rec);
        assert_eq!(report.dispatched, 1);
    }

    #[test]
    fn test_dispatch_failure_does_not_stall() {
        let mut song = one_track_song(1);
        song.grid_mut(0, 0).unwrap().set(0, 0, Note::new(1));
        let mut s = scheduler();
        let mut rec = Recorder {
            fail_rows: vec![0],
            ..Recorder::default()
        };
        s.start(0.0);
        let report = s.tick(0.0, &song, &drum_rows(), &mut rec);
        assert_eq!(report.failed, 1);
        assert!(s.next_note_time() > 0.0);
        assert_eq!(s.current_step(), report.steps);
    }

    #[test]
    fn test_position_reports_audible_step() {
        let song = one_track_song(1);
        let mut s = scheduler();
        let mut rec = Recorder::default();
        s.start(0.0);
        s.tick(0.0, &song, &drum_rows(), &mut rec);
        // Look-ahead has already moved the cursor past step 0
        assert!(s.current_step() > 0);
        assert_eq!(s.position_at(0.05).step, 0);
        assert!(s.position_at(0.05).playing);
    }
}
