use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid range: start={start} end={end} (duration {duration})")]
    InvalidRange { start: f64, end: f64, duration: f64 },
    #[error("invalid time: {0}")]
    InvalidTime(f64),
    #[error("invalid grid parameter: bpm={bpm} division={division}")]
    InvalidGridParameter { bpm: f64, division: u32 },
    #[error("wav decode failed: {0}")]
    DecodeError(String),
    #[error("invalid buffer: {0}")]
    InvalidBuffer(String),
    #[error("operation requires a non-empty buffer")]
    EmptyBuffer,
    #[error("sample rate mismatch: buffer {buffer} Hz, clip {clip} Hz")]
    SampleRateMismatch { buffer: u32, clip: u32 },
    #[error("marker not found: {0}")]
    MarkerNotFound(Uuid),
    #[error("region not found: {0}")]
    RegionNotFound(Uuid),
    #[error("category is reserved: {0}")]
    ReservedCategory(String),
    #[error("no active selection")]
    NoSelection,
    #[error("clipboard is empty")]
    EmptyClipboard,
    #[error("another edit is still in flight")]
    MutationInFlight,
    #[error("edit was prepared against generation {expected} but buffer is at {actual}")]
    StaleEdit { expected: u64, actual: u64 },
    #[error("background worker stopped: {0}")]
    WorkerFailed(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<anyhow::Error> for EngineError {
    fn from(value: anyhow::Error) -> Self {
        Self::Io(value.to_string())
    }
}

/// Informational outcomes. They never change state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Notice {
    DuplicatePosition { marker_id: Uuid, time: f64 },
    NoCandidateSegment,
}
