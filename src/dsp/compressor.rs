//! Compressor - Dynamic Range Control
//!
//! A compressor turns loud passages down. Whenever the level rises above the
//! threshold, everything above it is scaled by `1/ratio`:
//!
//! ```text
//! output dB
//!    │            ╱  ratio 1:1
//!    │          ╱
//!    │        ╱ ─────  ratio 4:1
//!    │      ●────
//!    │    ╱ threshold
//!    │  ╱
//!    └──────────────── input dB
//! ```
//!
//! # Soft Knee
//!
//! Within `knee` dB around the threshold the curve bends gradually instead of
//! switching ratios abruptly:
//!
//! ```text
//! over = level − threshold
//! over ≤ −knee/2        reduction = 0
//! over ≥ +knee/2        reduction = over · (1 − 1/ratio)
//! otherwise             reduction = (1 − 1/ratio) · (over + knee/2)² / (2 · knee)
//! ```
//!
//! # Envelope
//!
//! Gain reduction is smoothed with a one-pole follower: it moves toward more
//! reduction with the attack coefficient and back toward none with the
//! release coefficient.
//!
//! ```text
//! coeff = exp(−1 / (time · sample_rate))
//! ```

/// Levels below this are treated as silence when converting to dB.
const SILENCE_DB: f32 = -120.0;

#[inline]
pub fn linear_to_db(x: f32) -> f32 {
    if x <= 1.0e-6 {
        SILENCE_DB
    } else {
        20.0 * x.log10()
    }
}

#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Static gain reduction in dB (positive = turn down) for a level in dB.
pub fn gain_reduction_db(level_db: f32, threshold_db: f32, knee_db: f32, ratio: f32) -> f32 {
    let slope = 1.0 - 1.0 / ratio.max(1.0);
    let over = level_db - threshold_db;
    let half_knee = knee_db.max(0.0) * 0.5;

    if knee_db > 0.0 && over.abs() < half_knee {
        let x = over + half_knee;
        slope * x * x / (2.0 * knee_db)
    } else if over > 0.0 {
        slope * over
    } else {
        0.0
    }
}

fn time_coefficient(seconds: f32, sample_rate: f32) -> f32 {
    let samples = seconds * sample_rate;
    if samples < 1.0 {
        0.0
    } else {
        (-1.0 / samples).exp()
    }
}

pub struct Compressor {
    sample_rate: f32,
    threshold_db: f32,
    knee_db: f32,
    ratio: f32,
    attack_coeff: f32,
    release_coeff: f32,
    reduction_db: f32,
}

impl Compressor {
    pub fn new(sample_rate: f32) -> Self {
        let mut comp = Self {
            sample_rate,
            threshold_db: -24.0,
            knee_db: 30.0,
            ratio: 12.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            reduction_db: 0.0,
        };
        comp.set_attack(0.003);
        comp.set_release(0.25);
        comp
    }

    pub fn set_threshold(&mut self, threshold_db: f32) {
        self.threshold_db = threshold_db;
    }

    pub fn set_knee(&mut self, knee_db: f32) {
        self.knee_db = knee_db.max(0.0);
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = ratio.max(1.0);
    }

    pub fn set_attack(&mut self, seconds: f32) {
        self.attack_coeff = time_coefficient(seconds, self.sample_rate);
    }

    pub fn set_release(&mut self, seconds: f32) {
        self.release_coeff = time_coefficient(seconds, self.sample_rate);
    }

    /// Current smoothed gain reduction in dB.
    pub fn reduction_db(&self) -> f32 {
        self.reduction_db
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let level = linear_to_db(input.abs());
        let target = gain_reduction_db(level, self.threshold_db, self.knee_db, self.ratio);

        let coeff = if target > self.reduction_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.reduction_db = coeff * self.reduction_db + (1.0 - coeff) * target;

        input * db_to_linear(-self.reduction_db)
    }

    pub fn reset(&mut self) {
        self.reduction_db = 0.0;
    }
}
