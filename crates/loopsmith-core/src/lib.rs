pub mod buffer;
pub mod codec;
pub mod config;
pub mod diagnostics;
pub mod dual;
pub mod editor;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod grid;
pub mod history;
pub mod markers;
pub mod model;
pub mod shared;
pub mod shuffle;
pub mod waveform;

pub use buffer::SampleBuffer;
pub use codec::{decode_wav, encode_wav, read_wav_file, write_wav_file};
pub use config::EngineConfig;
pub use diagnostics::{TelemetryGuard, init_tracing};
pub use dual::{DualWave, DualWaveState, PlaybackCursor, PlaybackPlan, WaveRole};
pub use engine::{Engine, ProjectState, RenderState, ShuffleOutcome, ShuffleReport, ShuffleTask};
pub use error::{EngineError, Notice};
pub use grid::{Grid, GridLine, GridLineKind};
pub use history::{EditHistory, EditHistoryEntry};
pub use markers::{GridMarker, MarkerStore};
pub use model::{ClipboardSegment, EditKind, Marker, Region, Selection};
pub use shared::{PendingShuffle, SharedEngine};
pub use shuffle::{Candidate, MagicConfig, ShuffleStrategy};
pub use waveform::{ReducerConfig, WaveformPoint, WaveformSummary};
