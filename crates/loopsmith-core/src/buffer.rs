use std::ops::Range;

use crate::error::EngineError;

/// Multichannel float PCM. Every channel holds the same number of frames.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, EngineError> {
        if sample_rate == 0 {
            return Err(EngineError::InvalidBuffer(
                "sample rate must be greater than zero".to_string(),
            ));
        }
        if channels.is_empty() {
            return Err(EngineError::InvalidBuffer(
                "buffer needs at least one channel".to_string(),
            ));
        }
        let frames = channels[0].len();
        if let Some(index) = channels.iter().position(|channel| channel.len() != frames) {
            return Err(EngineError::InvalidBuffer(format!(
                "channel {index} has {} frames, expected {frames}",
                channels[index].len()
            )));
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self, EngineError> {
        Self::new(vec![samples], sample_rate)
    }

    pub fn silent(channel_count: usize, frames: usize, sample_rate: u32) -> Result<Self, EngineError> {
        Self::new(vec![vec![0.0; frames]; channel_count], sample_rate)
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    #[must_use]
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    #[must_use]
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    #[must_use]
    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    /// Nearest frame index for a time in seconds. Negative times map to zero.
    #[must_use]
    pub fn frame_at(&self, seconds: f64) -> usize {
        seconds_to_frame(seconds, self.sample_rate)
    }

    #[must_use]
    pub fn frame_to_seconds(&self, frame: usize) -> f64 {
        frame as f64 / f64::from(self.sample_rate)
    }

    /// Validated frame range for `[start, end)` in seconds.
    pub fn frame_span(&self, start: f64, end: f64) -> Result<Range<usize>, EngineError> {
        let duration = self.duration_seconds();
        let invalid = || EngineError::InvalidRange {
            start,
            end,
            duration,
        };

        if !start.is_finite() || !end.is_finite() || start < 0.0 || end <= start {
            return Err(invalid());
        }

        let start_frame = self.frame_at(start);
        let end_frame = self.frame_at(end);
        if end_frame > self.frames() || start_frame >= end_frame {
            return Err(invalid());
        }

        Ok(start_frame..end_frame)
    }

    /// Mean of all channels for one frame.
    #[must_use]
    pub fn mono_frame(&self, frame: usize) -> f32 {
        let sum: f32 = self
            .channels
            .iter()
            .filter_map(|channel| channel.get(frame))
            .sum();
        sum / self.channels.len().max(1) as f32
    }

    #[must_use]
    pub fn slice_frames(&self, range: Range<usize>) -> Vec<Vec<f32>> {
        self.channels
            .iter()
            .map(|channel| channel[range.clone()].to_vec())
            .collect()
    }

    /// Builds a sibling buffer at the same sample rate.
    pub fn with_channels(&self, channels: Vec<Vec<f32>>) -> Result<Self, EngineError> {
        Self::new(channels, self.sample_rate)
    }

    #[must_use]
    pub fn reversed(&self) -> Self {
        let channels = self
            .channels
            .iter()
            .map(|channel| channel.iter().rev().copied().collect())
            .collect();
        Self {
            channels,
            sample_rate: self.sample_rate,
        }
    }
}

#[must_use]
pub fn seconds_to_frame(seconds: f64, sample_rate: u32) -> usize {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * f64::from(sample_rate)).round() as usize
}
