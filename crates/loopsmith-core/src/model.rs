use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_MARKER_CATEGORY: &str = "General";
pub const BAR_TRACKER_CATEGORY: &str = "Bar Tracker";
pub const BUILTIN_MARKER_CATEGORIES: [&str; 6] =
    ["General", "Kick", "Snare", "Hi-Hat", "Vocal", "FX"];
pub const REGION_COLORS: [&str; 6] = [
    "#52e1c4", "#ffaa4f", "#f25f5c", "#7c77b9", "#70c1b3", "#ffe066",
];

/// Two positions closer than this are the same position.
pub const POSITION_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "MarkerRecord")]
pub struct Marker {
    pub id: Uuid,
    time: f64,
    pub name: String,
    pub category: String,
    positions: Vec<f64>,
}

/// Wire shape of [`Marker`]; checked before it becomes one.
#[derive(Deserialize)]
struct MarkerRecord {
    id: Uuid,
    time: f64,
    name: String,
    category: String,
    positions: Vec<f64>,
}

impl TryFrom<MarkerRecord> for Marker {
    type Error = EngineError;

    fn try_from(record: MarkerRecord) -> Result<Self, Self::Error> {
        let marker = Self {
            id: record.id,
            time: record.time,
            name: record.name,
            category: record.category,
            positions: record.positions,
        };
        marker.check_positions()?;
        Ok(marker)
    }
}

impl Marker {
    #[must_use]
    pub fn new(time: f64, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            time,
            name: name.into(),
            category: category.into(),
            positions: vec![time],
        }
    }

    /// Primary (earliest) position.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Sorted ascending, unique, never empty.
    #[must_use]
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    #[must_use]
    pub fn contains_position(&self, time: f64) -> bool {
        self.positions
            .iter()
            .any(|position| (position - time).abs() < POSITION_EPSILON)
    }

    /// Returns `false` when the position already exists.
    pub fn insert_position(&mut self, time: f64) -> bool {
        if self.contains_position(time) {
            return false;
        }
        let index = self.positions.partition_point(|position| *position < time);
        self.positions.insert(index, time);
        self.time = self.positions[0];
        true
    }

    /// Refuses to remove the last remaining position.
    pub fn remove_position(&mut self, time: f64) -> bool {
        if self.positions.len() == 1 {
            return false;
        }
        let before = self.positions.len();
        self.positions
            .retain(|position| (position - time).abs() >= POSITION_EPSILON);
        self.time = self.positions[0];
        self.positions.len() != before
    }

    /// Non-empty, finite, non-negative, strictly ascending, and `time` is
    /// the first entry.
    pub fn check_positions(&self) -> Result<(), EngineError> {
        let Some(&first) = self.positions.first() else {
            return Err(EngineError::InvalidTime(self.time));
        };
        if let Some(&bad) = self
            .positions
            .iter()
            .find(|position| !position.is_finite() || **position < 0.0)
        {
            return Err(EngineError::InvalidTime(bad));
        }
        if let Some(pair) = self
            .positions
            .windows(2)
            .find(|pair| pair[1] - pair[0] < POSITION_EPSILON)
        {
            return Err(EngineError::InvalidTime(pair[1]));
        }
        if (self.time - first).abs() >= POSITION_EPSILON {
            return Err(EngineError::InvalidTime(self.time));
        }
        Ok(())
    }

    /// Moves the primary position, keeping the set sorted and unique.
    pub fn retime(&mut self, time: f64) {
        if !self.positions.is_empty() {
            self.positions.remove(0);
        }
        self.positions
            .retain(|position| (position - time).abs() >= POSITION_EPSILON);
        let index = self.positions.partition_point(|position| *position < time);
        self.positions.insert(index, time);
        self.time = self.positions[0];
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Region {
    pub id: Uuid,
    pub start_time: f64,
    pub end_time: f64,
    pub name: String,
    pub color: String,
    pub selected: bool,
}

impl Region {
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    #[must_use]
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Selection {
    pub start: f64,
    pub end: f64,
}

impl Selection {
    #[must_use]
    pub fn new(start: f64, end: f64) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Owned copy of every channel of `buffer[start, end)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClipboardSegment {
    pub start: f64,
    pub end: f64,
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl ClipboardSegment {
    #[must_use]
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    Cut,
    Copy,
    Paste,
    Delete,
    Reverse,
    Shuffle,
}

impl EditKind {
    #[must_use]
    pub fn mutates_buffer(self) -> bool {
        !matches!(self, Self::Copy)
    }
}
