//! Segment shuffling and "interesting segment" detection.
//!
//! A [`Segmentation`] always tiles `[0, duration)` without gaps. Only the
//! segments inside `shuffle_range` are permuted; the rest keep their slot.
//! Boundaries are snapped to whole frames before any audio is moved, so a
//! shuffle never changes the frame count.

use std::ops::Range;

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    buffer::SampleBuffer,
    error::EngineError,
    grid::Grid,
    model::{POSITION_EPSILON, Selection},
    waveform::WaveformSummary,
};

pub const DEFAULT_SUB_CHUNKS: usize = 8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "strategy")]
pub enum ShuffleStrategy {
    MarkerBounded,
    GridBounded,
    SubChunk { start: f64, end: f64, chunks: usize },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
}

impl Segment {
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segmentation {
    pub segments: Vec<Segment>,
    pub shuffle_range: Range<usize>,
}

impl Segmentation {
    fn from_boundaries(boundaries: &[f64]) -> Self {
        let segments: Vec<Segment> = boundaries
            .windows(2)
            .map(|pair| Segment {
                start: pair[0],
                end: pair[1],
            })
            .collect();
        let shuffle_range = 0..segments.len();
        Self {
            segments,
            shuffle_range,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShuffleResult {
    pub buffer: SampleBuffer,
    /// Frame ranges of the source segments, in source order.
    pub segments: Vec<Range<usize>>,
    /// `order[slot]` is the source segment placed at `slot`.
    pub order: Vec<usize>,
}

/// Boundaries are every marker position inside `(0, duration)` plus both ends.
#[must_use]
pub fn marker_segmentation(positions: &[f64], duration: f64) -> Segmentation {
    let mut boundaries = vec![0.0];
    let mut inner: Vec<f64> = positions
        .iter()
        .copied()
        .filter(|position| position.is_finite() && *position > 0.0 && *position < duration)
        .collect();
    inner.sort_by(f64::total_cmp);
    inner.dedup_by(|right, left| (*right - *left).abs() < POSITION_EPSILON);
    boundaries.extend(inner);
    boundaries.push(duration.max(0.0));
    Segmentation::from_boundaries(&boundaries)
}

/// One segment per beat; a trailing partial beat becomes its own segment.
#[must_use]
pub fn grid_segmentation(grid: &Grid, duration: f64) -> Segmentation {
    let mut boundaries = vec![0.0];
    boundaries.extend(grid.beat_times(duration));
    boundaries.push(duration.max(0.0));
    Segmentation::from_boundaries(&boundaries)
}

/// Splits `[start, end)` into `chunks` equal pieces; only those are shuffled.
pub fn sub_chunk_segmentation(
    duration: f64,
    start: f64,
    end: f64,
    chunks: usize,
) -> Result<Segmentation, EngineError> {
    if !start.is_finite() || !end.is_finite() || start < 0.0 || end <= start || end > duration {
        return Err(EngineError::InvalidRange {
            start,
            end,
            duration,
        });
    }
    let chunks = chunks.max(1);
    let chunk_duration = (end - start) / chunks as f64;

    let mut segments = Vec::with_capacity(chunks + 2);
    if start > 0.0 {
        segments.push(Segment { start: 0.0, end: start });
    }
    let first_chunk = segments.len();
    for index in 0..chunks {
        let chunk_start = start + index as f64 * chunk_duration;
        let chunk_end = if index + 1 == chunks {
            end
        } else {
            chunk_start + chunk_duration
        };
        segments.push(Segment {
            start: chunk_start,
            end: chunk_end,
        });
    }
    let shuffle_range = first_chunk..segments.len();
    if end < duration {
        segments.push(Segment { start: end, end: duration });
    }

    Ok(Segmentation {
        segments,
        shuffle_range,
    })
}

/// Permutes the shuffleable segments with a uniform Fisher–Yates shuffle and
/// rebuilds every channel from the new order.
#[instrument(skip(buffer, segmentation, rng), fields(frames = buffer.frames(), segments = segmentation.segments.len()))]
pub fn apply_shuffle<R: Rng + ?Sized>(
    buffer: &SampleBuffer,
    segmentation: &Segmentation,
    rng: &mut R,
) -> Result<ShuffleResult, EngineError> {
    if buffer.is_empty() {
        return Err(EngineError::EmptyBuffer);
    }

    let frames = buffer.frames();
    let mut ranges = Vec::with_capacity(segmentation.segments.len());
    let mut shuffleable = Vec::with_capacity(segmentation.segments.len());
    let mut cursor = 0;
    for (index, segment) in segmentation.segments.iter().enumerate() {
        let end = if index + 1 == segmentation.segments.len() {
            frames
        } else {
            buffer.frame_at(segment.end).clamp(cursor, frames)
        };
        if end > cursor {
            ranges.push(cursor..end);
            shuffleable.push(segmentation.shuffle_range.contains(&index));
            cursor = end;
        }
    }

    let slots: Vec<usize> = (0..ranges.len()).filter(|slot| shuffleable[*slot]).collect();
    let mut sources = slots.clone();
    sources.shuffle(rng);
    let mut order: Vec<usize> = (0..ranges.len()).collect();
    for (slot, source) in slots.iter().zip(sources) {
        order[*slot] = source;
    }

    let channels = buffer
        .channels()
        .iter()
        .map(|channel| {
            let mut shuffled = Vec::with_capacity(frames);
            for source in &order {
                shuffled.extend_from_slice(&channel[ranges[*source].clone()]);
            }
            shuffled
        })
        .collect();

    let shuffled = buffer.with_channels(channels)?;
    debug!(segments = ranges.len(), ?order, "shuffle applied");
    Ok(ShuffleResult {
        buffer: shuffled,
        segments: ranges,
        order,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MagicConfig {
    pub full_windows: usize,
    pub selection_windows: usize,
    pub full_min_seconds: f64,
    pub full_max_seconds: f64,
    pub selection_min_seconds: f64,
    pub selection_max_ratio: f64,
    pub selection_max_seconds: f64,
    pub full_candidates: usize,
    pub selection_candidates: usize,
}

impl Default for MagicConfig {
    fn default() -> Self {
        Self {
            full_windows: 20,
            selection_windows: 5,
            full_min_seconds: 0.5,
            full_max_seconds: 4.0,
            selection_min_seconds: 0.2,
            selection_max_ratio: 0.8,
            selection_max_seconds: 2.0,
            full_candidates: 5,
            selection_candidates: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub start: f64,
    pub end: f64,
    pub mean: f32,
    pub variance: f32,
    pub score: f32,
}

/// Scores equal windows of the summary by `mean * (1 + variance)` and
/// returns the best ones whose duration fits the configured band.
#[instrument(skip(summary, config), fields(points = summary.len()))]
pub fn find_interesting_segments(
    summary: &WaveformSummary,
    scope: Option<Selection>,
    config: &MagicConfig,
) -> Vec<Candidate> {
    let (start, end, windows, min, max, keep) = match scope {
        Some(selection) => (
            selection.start,
            selection.end,
            config.selection_windows,
            config.selection_min_seconds,
            (selection.duration() * config.selection_max_ratio).min(config.selection_max_seconds),
            config.selection_candidates,
        ),
        None => (
            0.0,
            summary.duration_seconds(),
            config.full_windows,
            config.full_min_seconds,
            config.full_max_seconds,
            config.full_candidates,
        ),
    };

    if windows == 0 || end <= start {
        return Vec::new();
    }

    let window_duration = (end - start) / windows as f64;
    if window_duration < min || window_duration > max {
        debug!(window_duration, min, max, "analysis window outside duration band");
        return Vec::new();
    }

    let mut candidates: Vec<Candidate> = (0..windows)
        .filter_map(|index| {
            let window_start = start + index as f64 * window_duration;
            let window_end = window_start + window_duration;
            let points = summary.window(window_start, window_end);
            if points.is_empty() {
                return None;
            }

            let count = points.len() as f32;
            let mean = points.iter().map(|point| point.y).sum::<f32>() / count;
            let variance = points
                .iter()
                .map(|point| (point.y - mean).powi(2))
                .sum::<f32>()
                / count;
            Some(Candidate {
                start: window_start,
                end: window_end,
                mean,
                variance,
                score: mean * (1.0 + variance),
            })
        })
        .collect();

    candidates.sort_by(|left, right| right.score.total_cmp(&left.score));
    candidates.truncate(keep);
    debug!(candidates = candidates.len(), "interesting segments ranked");
    candidates
}

pub fn pick_candidate<'a, R: Rng + ?Sized>(candidates: &'a [Candidate], rng: &mut R) -> Option<&'a Candidate> {
    if candidates.is_empty() {
        return None;
    }
    candidates.get(rng.random_range(0..candidates.len()))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::waveform::{ReducerConfig, reduce_to};

    #[test]
    fn marker_segmentation_adds_both_ends() {
        let segmentation = marker_segmentation(&[3.0, 1.0, 1.0, 12.0], 4.0);
        let bounds: Vec<_> = segmentation
            .segments
            .iter()
            .map(|segment| (segment.start, segment.end))
            .collect();
        assert_eq!(bounds, vec![(0.0, 1.0), (1.0, 3.0), (3.0, 4.0)]);
    }

    #[test]
    fn marker_segmentation_without_markers_is_one_segment() {
        let segmentation = marker_segmentation(&[], 2.0);
        assert_eq!(segmentation.segments.len(), 1);
    }

    #[test]
    fn sub_chunks_only_cover_selection() {
        let segmentation = sub_chunk_segmentation(10.0, 2.0, 6.0, 8).expect("valid selection");
        assert_eq!(segmentation.segments.len(), 10);
        assert_eq!(segmentation.shuffle_range, 1..9);
        assert!((segmentation.segments[1].duration() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn sub_chunks_reject_selection_past_end() {
        assert!(sub_chunk_segmentation(4.0, 2.0, 5.0, 8).is_err());
    }

    #[test]
    fn fixed_segments_keep_their_slot() {
        let samples = (0..100).map(|index| index as f32).collect();
        let buffer = SampleBuffer::from_mono(samples, 10).expect("buffer should build");
        let segmentation = sub_chunk_segmentation(10.0, 2.0, 6.0, 4).expect("valid selection");
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let result = apply_shuffle(&buffer, &segmentation, &mut rng).expect("shuffle should work");
        assert_eq!(result.order[0], 0);
        assert_eq!(result.order[5], 5);
        assert_eq!(&result.buffer.channels()[0][..20], &buffer.channels()[0][..20]);
        assert_eq!(&result.buffer.channels()[0][60..], &buffer.channels()[0][60..]);
    }

    #[test]
    fn loud_window_ranks_first() {
        let mut samples = vec![0.05_f32; 10_000];
        for sample in &mut samples[5_000..5_500] {
            *sample = 0.4;
        }
        let buffer = SampleBuffer::from_mono(samples, 1_000).expect("buffer should build");
        let summary = reduce_to(&buffer, 2_000, &ReducerConfig::default());

        let candidates = find_interesting_segments(&summary, None, &MagicConfig::default());
        assert_eq!(candidates.len(), 5);
        assert!((candidates[0].start - 5.0).abs() < 1e-9);
        assert!(candidates.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }

    #[test]
    fn short_buffer_yields_no_candidates() {
        let buffer = SampleBuffer::from_mono(vec![0.3; 4_000], 1_000).expect("buffer");
        let summary = reduce_to(&buffer, 2_000, &ReducerConfig::default());
        assert!(find_interesting_segments(&summary, None, &MagicConfig::default()).is_empty());
    }

    #[test]
    fn selection_scope_uses_selection_band() {
        let buffer = SampleBuffer::from_mono(vec![0.3; 10_000], 1_000).expect("buffer");
        let summary = reduce_to(&buffer, 2_000, &ReducerConfig::default());
        let candidates = find_interesting_segments(
            &summary,
            Some(Selection::new(2.0, 4.0)),
            &MagicConfig::default(),
        );
        assert_eq!(candidates.len(), 3);
        assert!(candidates.iter().all(|candidate| candidate.start >= 2.0 && candidate.end <= 4.0 + 1e-9));
    }
}
