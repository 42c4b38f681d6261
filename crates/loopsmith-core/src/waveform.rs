//! Reduction of a [`SampleBuffer`] into display points.
//!
//! Each point blends the RMS and the peak of absolute sample values inside
//! one window of the channel mixdown. The summary is immutable; an edit
//! replaces it wholesale.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::buffer::SampleBuffer;

pub const DEFAULT_MIN_POINTS: usize = 2_000;
pub const DEFAULT_POINTS_PER_SECOND: f64 = 50.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WaveformPoint {
    pub x: f64,
    pub y: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReducerConfig {
    pub min_points: usize,
    pub points_per_second: f64,
    pub rms_weight: f32,
    pub peak_weight: f32,
    pub visual_gain: f32,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            min_points: DEFAULT_MIN_POINTS,
            points_per_second: DEFAULT_POINTS_PER_SECOND,
            rms_weight: 0.7,
            peak_weight: 0.3,
            visual_gain: 2.0,
        }
    }
}

impl ReducerConfig {
    #[must_use]
    pub fn point_count_for(&self, duration_seconds: f64) -> usize {
        let by_duration = (duration_seconds.max(0.0) * self.points_per_second).floor() as usize;
        self.min_points.max(by_duration)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WaveformSummary {
    duration_seconds: f64,
    points: Vec<WaveformPoint>,
}

impl WaveformSummary {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn points(&self) -> &[WaveformPoint] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &WaveformPoint> {
        self.points.iter()
    }

    /// Mirror image used after a whole-buffer reverse: `x -> duration - x`.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let duration = self.duration_seconds;
        let points = self
            .points
            .iter()
            .rev()
            .map(|point| WaveformPoint {
                x: (duration - point.x).max(0.0),
                y: point.y,
            })
            .collect();
        Self {
            duration_seconds: duration,
            points,
        }
    }

    /// Points whose `x` lies in `[start, end)`.
    #[must_use]
    pub fn window(&self, start: f64, end: f64) -> &[WaveformPoint] {
        let from = self.points.partition_point(|point| point.x < start);
        let to = self.points.partition_point(|point| point.x < end);
        &self.points[from..to.max(from)]
    }
}

#[must_use]
pub fn default_point_count(duration_seconds: f64) -> usize {
    ReducerConfig::default().point_count_for(duration_seconds)
}

#[instrument(skip(buffer), fields(frames = buffer.frames()))]
pub fn reduce(buffer: &SampleBuffer) -> WaveformSummary {
    reduce_with(buffer, &ReducerConfig::default())
}

#[instrument(skip(buffer, config), fields(frames = buffer.frames()))]
pub fn reduce_with(buffer: &SampleBuffer, config: &ReducerConfig) -> WaveformSummary {
    let target = config.point_count_for(buffer.duration_seconds());
    reduce_to(buffer, target, config)
}

/// Reduces to at most `target_points` points. Fewer frames than points gives
/// one point per frame; leftover frames fold into the last window.
#[must_use]
pub fn reduce_to(buffer: &SampleBuffer, target_points: usize, config: &ReducerConfig) -> WaveformSummary {
    let frames = buffer.frames();
    if frames == 0 || target_points == 0 {
        return WaveformSummary::empty();
    }

    let duration = buffer.duration_seconds();
    let point_count = target_points.min(frames);
    let window = frames / point_count;

    let mut points = Vec::with_capacity(point_count);
    for index in 0..point_count {
        let start = index * window;
        let end = if index + 1 == point_count {
            frames
        } else {
            start + window
        };

        let mut sum_squares = 0.0_f64;
        let mut peak = 0.0_f32;
        for frame in start..end {
            let value = buffer.mono_frame(frame).abs();
            sum_squares += f64::from(value) * f64::from(value);
            peak = peak.max(value);
        }
        let rms = (sum_squares / (end - start) as f64).sqrt() as f32;
        let blended = config.rms_weight * rms + config.peak_weight * peak;

        points.push(WaveformPoint {
            x: (index as f64 / point_count as f64) * duration,
            y: (blended * config.visual_gain).clamp(0.0, 1.0),
        });
    }

    debug!(points = points.len(), window, "waveform reduction complete");
    WaveformSummary {
        duration_seconds: duration,
        points,
    }
}
