use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub const STEPS_PER_BAR: u64 = 16;
pub const DEFAULT_DIVISION: u32 = 16;

/// Slack added before flooring so `k * unit / unit` lands on `k`.
const INDEX_EPSILON: f64 = 1e-9;

/// Tempo grid. Bars are always 16 steps regardless of division.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Grid {
    bpm: f64,
    division: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GridLineKind {
    Bar,
    Beat,
    Step,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GridLine {
    pub time: f64,
    pub step: u64,
    pub bar: u64,
    pub kind: GridLineKind,
}

impl Grid {
    pub fn new(bpm: f64, division: u32) -> Result<Self, EngineError> {
        if !bpm.is_finite() || bpm <= 0.0 || division == 0 {
            return Err(EngineError::InvalidGridParameter { bpm, division });
        }
        Ok(Self { bpm, division })
    }

    #[must_use]
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    #[must_use]
    pub fn division(&self) -> u32 {
        self.division
    }

    #[must_use]
    pub fn beat_duration(&self) -> f64 {
        60.0 / self.bpm
    }

    #[must_use]
    pub fn step_duration(&self) -> f64 {
        self.beat_duration() / (f64::from(self.division) / 4.0)
    }

    #[must_use]
    pub fn bar_duration(&self) -> f64 {
        self.step_duration() * STEPS_PER_BAR as f64
    }

    #[must_use]
    pub fn time_to_step(&self, seconds: f64) -> u64 {
        floor_index(seconds, self.step_duration())
    }

    #[must_use]
    pub fn step_to_time(&self, step: u64) -> f64 {
        step as f64 * self.step_duration()
    }

    #[must_use]
    pub fn time_to_bar(&self, seconds: f64) -> u64 {
        floor_index(seconds, self.bar_duration()) + 1
    }

    /// Start of a 1-indexed bar. Bar 0 is treated as bar 1.
    #[must_use]
    pub fn bar_to_time(&self, bar: u64) -> f64 {
        bar.saturating_sub(1) as f64 * self.bar_duration()
    }

    #[must_use]
    pub fn snap(&self, seconds: f64, enabled: bool) -> f64 {
        if !enabled {
            return seconds;
        }
        let step = self.step_duration();
        (seconds / step).round() * step
    }

    /// Rounds `steps / 4` to the nearest integer, so loops that are not an
    /// exact number of bars drift by up to half a bar.
    #[must_use]
    pub fn bar_count(&self, duration_seconds: f64) -> u64 {
        ((duration_seconds.max(0.0) / self.step_duration()) / 4.0).round() as u64
    }

    /// `(current, total)` bar numbers for the bar tracker label.
    #[must_use]
    pub fn bar_position(&self, seconds: f64, duration_seconds: f64) -> (u64, u64) {
        let total = self.bar_count(duration_seconds).max(1);
        (self.time_to_bar(seconds).min(total), total)
    }

    #[must_use]
    pub fn steps_per_beat(&self) -> u64 {
        (u64::from(self.division) / 4).max(1)
    }

    /// Every step boundary in `[0, duration]`, tagged bar/beat/step.
    #[must_use]
    pub fn grid_lines(&self, duration_seconds: f64) -> Vec<GridLine> {
        if duration_seconds <= 0.0 || !duration_seconds.is_finite() {
            return Vec::new();
        }

        let step_duration = self.step_duration();
        let last_step = floor_index(duration_seconds, step_duration);
        let steps_per_beat = self.steps_per_beat();

        (0..=last_step)
            .map(|step| {
                let kind = if step % STEPS_PER_BAR == 0 {
                    GridLineKind::Bar
                } else if step % steps_per_beat == 0 {
                    GridLineKind::Beat
                } else {
                    GridLineKind::Step
                };
                GridLine {
                    time: self.step_to_time(step),
                    step,
                    bar: step / STEPS_PER_BAR + 1,
                    kind,
                }
            })
            .collect()
    }

    /// Beat boundaries (`60 / bpm` apart) strictly inside `(0, duration)`.
    #[must_use]
    pub fn beat_times(&self, duration_seconds: f64) -> Vec<f64> {
        let beat = self.beat_duration();
        (1..)
            .map(|index| f64::from(index) * beat)
            .take_while(|time| *time < duration_seconds)
            .collect()
    }
}

fn floor_index(seconds: f64, unit: f64) -> u64 {
    (seconds.max(0.0) / unit + INDEX_EPSILON).floor() as u64
}
