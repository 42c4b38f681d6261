//! Sample-accurate segment edits. Every function returns a new buffer and
//! leaves its input untouched.

use tracing::{debug, instrument, warn};

use crate::{buffer::SampleBuffer, error::EngineError, model::ClipboardSegment};

#[instrument(skip(buffer), fields(frames = buffer.frames()))]
pub fn copy_range(buffer: &SampleBuffer, start: f64, end: f64) -> Result<ClipboardSegment, EngineError> {
    if buffer.is_empty() {
        return Err(EngineError::EmptyBuffer);
    }
    let span = buffer.frame_span(start, end)?;
    let clip = ClipboardSegment {
        start: buffer.frame_to_seconds(span.start),
        end: buffer.frame_to_seconds(span.end),
        sample_rate: buffer.sample_rate(),
        channels: buffer.slice_frames(span),
    };
    debug!(frames = clip.frames(), "range copied");
    Ok(clip)
}

/// `buffer[0, start) ++ buffer[end, duration)`.
#[instrument(skip(buffer), fields(frames = buffer.frames()))]
pub fn delete_range(buffer: &SampleBuffer, start: f64, end: f64) -> Result<SampleBuffer, EngineError> {
    if buffer.is_empty() {
        return Err(EngineError::EmptyBuffer);
    }
    let span = buffer.frame_span(start, end)?;
    let channels = buffer
        .channels()
        .iter()
        .map(|channel| {
            let mut kept = Vec::with_capacity(channel.len() - span.len());
            kept.extend_from_slice(&channel[..span.start]);
            kept.extend_from_slice(&channel[span.end..]);
            kept
        })
        .collect();

    let result = buffer.with_channels(channels)?;
    debug!(removed = span.len(), frames = result.frames(), "range deleted");
    Ok(result)
}

/// `buffer[0, playhead) ++ clip ++ buffer[playhead, duration)`.
///
/// A clip with fewer channels than the buffer has its channels reused in
/// order, so a mono clip lands on every channel.
#[instrument(skip(buffer, clip), fields(frames = buffer.frames(), clip_frames = clip.frames()))]
pub fn paste_at(buffer: &SampleBuffer, playhead: f64, clip: &ClipboardSegment) -> Result<SampleBuffer, EngineError> {
    if clip.frames() == 0 || clip.channels.is_empty() {
        return Err(EngineError::EmptyClipboard);
    }
    if clip.sample_rate != buffer.sample_rate() {
        return Err(EngineError::SampleRateMismatch {
            buffer: buffer.sample_rate(),
            clip: clip.sample_rate,
        });
    }

    let duration = buffer.duration_seconds();
    let at = buffer.frame_at(playhead);
    if !playhead.is_finite() || playhead < 0.0 || at > buffer.frames() {
        warn!(playhead, duration, "paste position outside buffer");
        return Err(EngineError::InvalidRange {
            start: playhead,
            end: playhead,
            duration,
        });
    }

    let channels = buffer
        .channels()
        .iter()
        .enumerate()
        .map(|(index, channel)| {
            let inserted = &clip.channels[index % clip.channels.len()];
            let mut joined = Vec::with_capacity(channel.len() + inserted.len());
            joined.extend_from_slice(&channel[..at]);
            joined.extend_from_slice(inserted);
            joined.extend_from_slice(&channel[at..]);
            joined
        })
        .collect();

    let result = buffer.with_channels(channels)?;
    debug!(at, frames = result.frames(), "clip pasted");
    Ok(result)
}

#[instrument(skip(buffer), fields(frames = buffer.frames()))]
pub fn reverse(buffer: &SampleBuffer) -> Result<SampleBuffer, EngineError> {
    if buffer.is_empty() {
        return Err(EngineError::EmptyBuffer);
    }
    Ok(buffer.reversed())
}

/// Reverses only `[start, end)`; the rest of the buffer stays in place.
#[instrument(skip(buffer), fields(frames = buffer.frames()))]
pub fn reverse_range(buffer: &SampleBuffer, start: f64, end: f64) -> Result<SampleBuffer, EngineError> {
    if buffer.is_empty() {
        return Err(EngineError::EmptyBuffer);
    }
    let span = buffer.frame_span(start, end)?;
    let channels = buffer
        .channels()
        .iter()
        .map(|channel| {
            let mut reversed = channel.clone();
            reversed[span.clone()].reverse();
            reversed
        })
        .collect();
    buffer.with_channels(channels)
}
