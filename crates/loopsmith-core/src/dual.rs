use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{buffer::SampleBuffer, editor, error::EngineError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WaveRole {
    Primary,
    Secondary,
}

/// Where one buffer should start playing. The caller owns the clock.
#[derive(Debug, Clone)]
pub struct PlaybackCursor {
    pub role: WaveRole,
    pub buffer: Arc<SampleBuffer>,
    pub start_time: f64,
    pub start_frame: usize,
}

#[derive(Debug, Clone)]
pub struct PlaybackPlan {
    pub cursors: Vec<PlaybackCursor>,
}

/// Serializable view of the dual-wave state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DualWaveState {
    pub has_secondary: bool,
    pub secondary_reversed: bool,
    pub swapped: bool,
}

/// Holds an optional second copy of the buffer and which copy is "main".
#[derive(Debug, Clone, Default)]
pub struct DualWave {
    secondary: Option<Arc<SampleBuffer>>,
    reversed: bool,
    swapped: bool,
}

impl DualWave {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> DualWaveState {
        DualWaveState {
            has_secondary: self.secondary.is_some(),
            secondary_reversed: self.reversed,
            swapped: self.swapped,
        }
    }

    #[must_use]
    pub fn secondary(&self) -> Option<&Arc<SampleBuffer>> {
        self.secondary.as_ref()
    }

    #[must_use]
    pub fn is_swapped(&self) -> bool {
        self.swapped
    }

    #[must_use]
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn duplicate(&mut self, primary: &Arc<SampleBuffer>) -> Arc<SampleBuffer> {
        let secondary = Arc::clone(primary);
        self.secondary = Some(Arc::clone(&secondary));
        self.reversed = false;
        self.swapped = false;
        info!(frames = secondary.frames(), "secondary wave duplicated");
        secondary
    }

    /// Reverses the secondary data and flips its reversed flag.
    pub fn reverse_secondary(&mut self) -> Result<bool, EngineError> {
        let secondary = self.secondary.as_ref().ok_or(EngineError::EmptyBuffer)?;
        let reversed = editor::reverse(secondary)?;
        self.secondary = Some(Arc::new(reversed));
        self.reversed = !self.reversed;
        debug!(reversed = self.reversed, "secondary wave reversed");
        Ok(self.reversed)
    }

    /// Exchanges the roles of the two buffers. `primary` is the engine's
    /// current buffer; the returned buffer becomes the new current one.
    pub fn swap_primary(&mut self, primary: Arc<SampleBuffer>) -> Result<Arc<SampleBuffer>, EngineError> {
        let secondary = self.secondary.replace(primary).ok_or(EngineError::EmptyBuffer)?;
        self.swapped = !self.swapped;
        info!(swapped = self.swapped, "wave roles swapped");
        Ok(secondary)
    }

    pub fn clear(&mut self) {
        self.secondary = None;
        self.reversed = false;
        self.swapped = false;
    }

    #[must_use]
    pub fn play_single(&self, primary: &Arc<SampleBuffer>, start_time: f64) -> PlaybackPlan {
        PlaybackPlan {
            cursors: vec![cursor(WaveRole::Primary, primary, start_time)],
        }
    }

    /// Both cursors start at the same time; without a secondary this is
    /// the same as [`Self::play_single`].
    #[must_use]
    pub fn play_both(&self, primary: &Arc<SampleBuffer>, start_time: f64) -> PlaybackPlan {
        let mut plan = self.play_single(primary, start_time);
        if let Some(secondary) = &self.secondary {
            plan.cursors
                .push(cursor(WaveRole::Secondary, secondary, start_time));
        }
        plan
    }
}

fn cursor(role: WaveRole, buffer: &Arc<SampleBuffer>, start_time: f64) -> PlaybackCursor {
    let start_frame = buffer.frame_at(start_time).min(buffer.frames());
    PlaybackCursor {
        role,
        buffer: Arc::clone(buffer),
        start_time,
        start_frame,
    }
}
