/// Circular delay buffer.
///
/// Capacity is fixed at construction (sized from the longest delay the owner
/// will ever ask for), so reads and writes never allocate.
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(2)],
            write_pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Write one sample and return the sample written `delay_samples` ago.
    pub fn next_sample(&mut self, sample: f32, delay_samples: usize) -> f32 {
        let len = self.buffer.len();
        let delay_samples = delay_samples.min(len - 1);

        self.buffer[self.write_pos] = sample;
        let read_pos = (self.write_pos + len - delay_samples) % len;
        let delayed = self.buffer[read_pos];
        self.write_pos = (self.write_pos + 1) % len;

        delayed
    }

    /// Push a sample without reading.
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Read `delay` samples behind the most recent write, linearly
    /// interpolating between neighbours for fractional delays.
    ///
    /// A delay of 1.0 returns the most recently written sample.
    pub fn read_interpolated(&self, delay: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay.clamp(1.0, (len - 1) as f32);
        let whole = delay.floor() as usize;
        let frac = delay - whole as f32;

        let a = self.buffer[(self.write_pos + len - whole) % len];
        let b = self.buffer[(self.write_pos + len - whole - 1) % len];
        a + (b - a) * frac
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
