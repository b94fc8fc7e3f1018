/*
Song Data
=========

The scheduler reads a song snapshot; it never edits one.

    Song
    ├── patterns[pattern][track] : Grid
    ├── scales[pattern][track]   : scale name (falls back to default_scale)
    └── track_gains[track]

    Grid (rows × steps)
             step 0   1   2   3  ...  15
    row 0  [  ·   ·   ·   N   ...   · ]
    row 1  [  N   ·   ·   ·   ...   · ]
    ...

Rows of a grid line up 1:1 with the RowConfig list of the scale active for
that track and pattern. Row configs come from a `RowConfigSource`; tuning and
scale construction live outside the engine.
*/

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::voices::VoiceKind;

/// One event in a grid cell.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Length in steps, at least 1.
    pub duration: u32,
    /// Octave offset applied to tonal rows.
    #[cfg_attr(feature = "serde", serde(default))]
    pub octave: i32,
    /// Color tag (`#rrggbb`) for color-driven modulation.
    #[cfg_attr(feature = "serde", serde(default))]
    pub color: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub overrides: BTreeMap<String, f32>,
}

impl Note {
    pub fn new(duration: u32) -> Self {
        Self {
            duration: duration.max(1),
            octave: 0,
            color: None,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_octave(mut self, octave: i32) -> Self {
        self.octave = octave;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_override(mut self, key: impl Into<String>, value: f32) -> Self {
        self.overrides.insert(key.into(), value);
        self
    }
}

/// Static description of one grid row.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RowConfig {
    pub role: VoiceKind,
    /// Base pitch in Hz (tonal rows).
    pub frequency: f32,
    pub gain: f32,
    pub color: Option<String>,
}

impl RowConfig {
    pub fn new(role: VoiceKind, frequency: f32, gain: f32) -> Self {
        Self {
            role,
            frequency,
            gain,
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    steps: usize,
    cells: Vec<Vec<Option<Note>>>,
}

impl Grid {
    pub fn new(rows: usize, steps: usize) -> Self {
        Self {
            steps,
            cells: vec![vec![None; steps]; rows],
        }
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Place a note; out-of-range cells are ignored.
    pub fn set(&mut self, row: usize, step: usize, note: Note) {
        if let Some(cell) = self.cells.get_mut(row).and_then(|r| r.get_mut(step)) {
            *cell = Some(note);
        }
    }

    pub fn clear(&mut self, row: usize, step: usize) {
        if let Some(cell) = self.cells.get_mut(row).and_then(|r| r.get_mut(step)) {
            *cell = None;
        }
    }

    pub fn note(&self, row: usize, step: usize) -> Option<&Note> {
        self.cells.get(row)?.get(step)?.as_ref()
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    /// `patterns[pattern][track]`
    pub patterns: Vec<Vec<Grid>>,
    /// `scales[pattern][track]`; missing entries use `default_scale`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub scales: Vec<Vec<String>>,
    pub default_scale: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub track_gains: Vec<f32>,
}

impl Song {
    /// `pattern_count` patterns of `track_count` empty grids each.
    pub fn empty(
        pattern_count: usize,
        track_count: usize,
        rows: usize,
        steps: usize,
        default_scale: impl Into<String>,
    ) -> Self {
        Self {
            patterns: vec![vec![Grid::new(rows, steps); track_count]; pattern_count],
            scales: Vec::new(),
            default_scale: default_scale.into(),
            track_gains: vec![1.0; track_count],
        }
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn track_count(&self) -> usize {
        self.patterns.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn grid(&self, pattern: usize, track: usize) -> Option<&Grid> {
        self.patterns.get(pattern)?.get(track)
    }

    pub fn grid_mut(&mut self, pattern: usize, track: usize) -> Option<&mut Grid> {
        self.patterns.get_mut(pattern)?.get_mut(track)
    }

    pub fn scale_for(&self, pattern: usize, track: usize) -> &str {
        self.scales
            .get(pattern)
            .and_then(|p| p.get(track))
            .map(String::as_str)
            .unwrap_or(&self.default_scale)
    }

    pub fn set_scale(&mut self, pattern: usize, track: usize, scale: impl Into<String>) {
        if self.scales.len() <= pattern {
            self.scales.resize(pattern + 1, Vec::new());
        }
        let tracks = &mut self.scales[pattern];
        if tracks.len() <= track {
            tracks.resize(track + 1, self.default_scale.clone());
        }
        tracks[track] = scale.into();
    }

    pub fn track_gain(&self, track: usize) -> f32 {
        self.track_gains.get(track).copied().unwrap_or(1.0)
    }
}

/// Resolves a scale name to the row configs of a grid.
pub trait RowConfigSource {
    fn rows(&self, scale: &str) -> Option<Cow<'_, [RowConfig]>>;
}

/// Any `Fn(&str) -> Option<Vec<RowConfig>>` works as a source.
impl<F> RowConfigSource for F
where
    F: Fn(&str) -> Option<Vec<RowConfig>>,
{
    fn rows(&self, scale: &str) -> Option<Cow<'_, [RowConfig]>> {
        self(scale).map(Cow::Owned)
    }
}

/// Precomputed row configs by scale name.
#[derive(Debug, Clone, Default)]
pub struct ScaleTable {
    scales: HashMap<String, Vec<RowConfig>>,
}

impl ScaleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, rows: Vec<RowConfig>) {
        self.scales.insert(name.into(), rows);
    }

    pub fn with_scale(mut self, name: impl Into<String>, rows: Vec<RowConfig>) -> Self {
        self.insert(name, rows);
        self
    }
}

impl RowConfigSource for ScaleTable {
    fn rows(&self, scale: &str) -> Option<Cow<'_, [RowConfig]>> {
        self.scales.get(scale).map(|rows| Cow::Borrowed(rows.as_slice()))
    }
}
