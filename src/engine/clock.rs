/// Counts rendered frames. Output time is `frames / sample_rate`; every
/// scheduled start time is a point on this clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioClock {
    sample_rate: f32,
    frames: u64,
}

impl AudioClock {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            frames: 0,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn frame(&self) -> u64 {
        self.frames
    }

    /// Current output time in seconds.
    pub fn now(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    pub fn advance(&mut self, frames: usize) {
        self.frames += frames as u64;
    }
}

/// A fixed-period event source driven by audio time rather than wall time.
///
/// After a stall the source fires once and re-anchors to `now`; it never
/// fires a burst to catch up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicSource {
    interval: f64,
    next_due: f64,
}

impl PeriodicSource {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            next_due: 0.0,
        }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Fire at `now` and every interval after.
    pub fn reset(&mut self, now: f64) {
        self.next_due = now;
    }

    /// Whether the source fires at `now`.
    pub fn poll(&mut self, now: f64) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.interval;
        if self.next_due <= now {
            self.next_due = now + self.interval;
        }
        true
    }
}
