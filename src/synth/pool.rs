use crate::error::DispatchError;
use crate::graph::model::ColorSample;
use crate::sequencing::scheduler::{StepTrigger, VoiceSink};
use crate::voices::{self, Voice, VoiceContext, VoiceKind};

/// Every voice currently scheduled or ringing, rendered onto track buses.
pub struct VoicePool {
    voices: Vec<Voice>,
    max_voices: usize,
    track_count: usize,
    sample_rate: f32,
    stolen: u64,
}

impl VoicePool {
    pub fn new(sample_rate: f32, max_voices: usize, track_count: usize) -> Self {
        Self {
            voices: Vec::with_capacity(max_voices),
            max_voices: max_voices.max(1),
            track_count,
            sample_rate,
            stolen: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Voices dropped to make room since creation.
    pub fn stolen(&self) -> u64 {
        self.stolen
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Add a voice, stealing the earliest-starting one when full.
    pub fn push(&mut self, voice: Voice) {
        if self.voices.len() >= self.max_voices {
            let oldest = self
                .voices
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| v.start_frame())
                .map(|(idx, _)| idx);
            if let Some(idx) = oldest {
                self.voices.swap_remove(idx);
                self.stolen += 1;
            }
        }
        self.voices.push(voice);
    }

    /// Mix every voice into its track bus for the block starting at clock
    /// frame `block_start`, then drop voices that have finished.
    pub fn render(&mut self, buses: &mut [Vec<f32>], block_start: u64, frames: usize) {
        for voice in &mut self.voices {
            let Some(bus) = buses.get_mut(voice.track) else {
                continue;
            };
            let frames = frames.min(bus.len());
            voice.render(&mut bus[..frames], block_start, self.sample_rate);
        }

        let block_end = block_start + frames as u64;
        self.voices.retain(|v| !v.is_finished(block_end));
    }

    /// Colors of the voices audible at `frame`.
    pub fn sounding_colors(&self, frame: u64) -> impl Iterator<Item = ColorSample> + '_ {
        self.voices
            .iter()
            .filter(move |v| v.is_sounding(frame))
            .filter_map(|v| v.color)
    }

    /// Silence everything immediately.
    pub fn clear(&mut self) {
        self.voices.clear();
    }
}

impl VoiceSink for VoicePool {
    fn trigger(&mut self, trigger: &StepTrigger) -> Result<(), DispatchError> {
        if !trigger.time.is_finite() || trigger.time < 0.0 {
            return Err(DispatchError::InvalidTime(trigger.time));
        }
        if !trigger.gain.is_finite() {
            return Err(DispatchError::InvalidGain(trigger.gain));
        }
        if trigger.track >= self.track_count {
            tracing::trace!(track = trigger.track, "trigger for missing track dropped");
            return Ok(());
        }

        let ctx = VoiceContext {
            sample_rate: self.sample_rate,
            bpm: trigger.bpm as f32,
        };
        let config = Some(&trigger.config);
        let voice = match trigger.kind {
            VoiceKind::Kick => {
                voices::create_kick(&ctx, trigger.time, trigger.gain, config, trigger.track)
            }
            VoiceKind::Snare => {
                voices::create_snare(&ctx, trigger.time, trigger.gain, config, trigger.track)
            }
            VoiceKind::Hat => {
                voices::create_hihat(&ctx, trigger.time, trigger.gain, config, trigger.track)
            }
            VoiceKind::Synth => voices::create_synth(
                &ctx,
                trigger.time,
                trigger.gain,
                trigger.duration_steps,
                config,
                trigger.track,
            ),
        };
        self.push(voice.with_color(trigger.color));
        Ok(())
    }
}
