// Purpose - buffers handed between the engine and the audio host

/// Deinterleaved output channels, one `Vec` per channel.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AudioOutput {
    pub buffers: Vec<Vec<f32>>,
}

impl AudioOutput {
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            buffers: vec![vec![0.0; frames]; channels],
        }
    }

    pub fn channels(&self) -> usize {
        self.buffers.len()
    }

    pub fn frames(&self) -> usize {
        self.buffers.first().map_or(0, Vec::len)
    }

    /// Write the channels interleaved into `out`, stopping at whichever runs
    /// out first.
    pub fn interleave_into(&self, out: &mut [f32]) {
        let channels = self.channels();
        if channels == 0 {
            return;
        }
        for (frame, slot) in out.chunks_mut(channels).enumerate() {
            if frame >= self.frames() {
                break;
            }
            for (ch, sample) in slot.iter_mut().enumerate() {
                *sample = self.buffers[ch][frame];
            }
        }
    }
}
