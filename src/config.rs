#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Longest delay buffer a config may ask for.
pub const MAX_DELAY_SECS: f32 = 60.0;

/// Static engine settings. Everything here is fixed for the life of an
/// [`Engine`](crate::engine::Engine); tempo and routing change through the
/// engine's own setters.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    pub track_count: usize,
    pub steps_per_pattern: usize,
    /// How far ahead of the audio clock the scheduler places notes.
    pub lookahead_secs: f64,
    /// Period of the scheduler tick source, in audio-clock seconds.
    pub tick_interval_secs: f64,
    /// Period of the modulation frame source, in audio-clock seconds.
    pub frame_interval_secs: f64,
    /// Upper bound on steps scheduled by a single tick.
    pub max_steps_per_tick: usize,
    pub master_gain: f32,
    /// Capacity of every delay unit's buffer.
    pub max_delay_secs: f32,
    /// Voices beyond this are stolen oldest-first.
    pub max_voices: usize,
    pub initial_bpm: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            track_count: 4,
            steps_per_pattern: 16,
            lookahead_secs: 0.1,
            tick_interval_secs: 0.025,
            frame_interval_secs: 1.0 / 60.0,
            max_steps_per_tick: 16,
            master_gain: 0.8,
            max_delay_secs: 2.0,
            max_voices: 64,
            initial_bpm: 120,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document. Missing keys take their default.
    #[cfg(feature = "serde")]
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f64) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(EngineError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )))
            }
        }

        positive("sample_rate", self.sample_rate as f64)?;
        positive("lookahead_secs", self.lookahead_secs)?;
        positive("tick_interval_secs", self.tick_interval_secs)?;
        positive("frame_interval_secs", self.frame_interval_secs)?;
        positive("max_delay_secs", self.max_delay_secs as f64)?;
        if self.max_delay_secs > MAX_DELAY_SECS {
            return Err(EngineError::InvalidConfig(format!(
                "max_delay_secs must be at most {MAX_DELAY_SECS}, got {}",
                self.max_delay_secs
            )));
        }
        positive("initial_bpm", self.initial_bpm as f64)?;

        if self.steps_per_pattern == 0 {
            return Err(EngineError::InvalidConfig(
                "steps_per_pattern must be at least 1".into(),
            ));
        }
        if self.max_steps_per_tick == 0 {
            return Err(EngineError::InvalidConfig(
                "max_steps_per_tick must be at least 1".into(),
            ));
        }
        if !self.master_gain.is_finite() || self.master_gain < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "master_gain must be non-negative, got {}",
                self.master_gain
            )));
        }
        Ok(())
    }
}
