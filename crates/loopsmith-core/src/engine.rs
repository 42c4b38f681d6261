use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    buffer::SampleBuffer,
    codec,
    config::EngineConfig,
    dual::{DualWave, DualWaveState, PlaybackPlan},
    editor,
    error::{EngineError, Notice},
    grid::{Grid, GridLine},
    history::EditHistory,
    markers::{GridMarker, MarkerStore},
    model::{ClipboardSegment, EditKind, Marker, Region, Selection},
    shuffle::{
        self, Candidate, MagicConfig, Segmentation, ShuffleStrategy, find_interesting_segments,
        pick_candidate,
    },
    waveform::{ReducerConfig, WaveformSummary, reduce_with},
};

/// Everything a renderer needs for one frame, in seconds.
#[derive(Debug, Clone, Serialize)]
pub struct RenderState {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: usize,
    pub summary: WaveformSummary,
    pub markers: Vec<Marker>,
    pub bar_tracker: Option<Marker>,
    pub regions: Vec<Region>,
    pub grid_lines: Vec<GridLine>,
    pub grid_markers: Vec<GridMarker>,
    pub selection: Option<Selection>,
    pub playhead: f64,
    pub dual: DualWaveState,
}

/// Caller-serializable project fields. Audio travels separately as WAV.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectState {
    pub grid: Grid,
    pub snap_enabled: bool,
    pub markers: MarkerStore,
    pub dual: DualWaveState,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShuffleReport {
    pub strategy: ShuffleStrategy,
    pub segment_count: usize,
    pub order: Vec<usize>,
    pub candidates: Vec<Candidate>,
    pub copied: Option<(f64, f64)>,
    pub notice: Option<Notice>,
}

/// A shuffle prepared against one buffer generation. It owns its inputs, so
/// it can run on another thread while the engine stays readable.
#[derive(Debug, Clone)]
pub struct ShuffleTask {
    generation: u64,
    strategy: ShuffleStrategy,
    source: Arc<SampleBuffer>,
    summary: Arc<WaveformSummary>,
    segmentation: Segmentation,
    magic: Option<(Option<Selection>, MagicConfig)>,
    reducer: ReducerConfig,
    seed: u64,
}

#[derive(Debug, Clone)]
pub struct ShuffleOutcome {
    generation: u64,
    strategy: ShuffleStrategy,
    buffer: SampleBuffer,
    summary: WaveformSummary,
    segment_count: usize,
    order: Vec<usize>,
    magic: bool,
    candidates: Vec<Candidate>,
    clip: Option<ClipboardSegment>,
}

impl ShuffleTask {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[instrument(skip(self), fields(generation = self.generation, strategy = ?self.strategy))]
    pub fn run(self) -> Result<ShuffleOutcome, EngineError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let result = shuffle::apply_shuffle(&self.source, &self.segmentation, &mut rng)?;
        let summary = reduce_with(&result.buffer, &self.reducer);

        let (candidates, clip) = match &self.magic {
            Some((scope, config)) => {
                let candidates = find_interesting_segments(&self.summary, *scope, config);
                let clip = pick_candidate(&candidates, &mut rng).and_then(|candidate| {
                    let end = candidate.end.min(self.source.duration_seconds());
                    editor::copy_range(&self.source, candidate.start, end)
                        .inspect_err(|error| warn!(?error, "candidate copy failed"))
                        .ok()
                });
                (candidates, clip)
            }
            None => (Vec::new(), None),
        };

        Ok(ShuffleOutcome {
            generation: self.generation,
            strategy: self.strategy,
            buffer: result.buffer,
            summary,
            segment_count: result.segments.len(),
            order: result.order,
            magic: self.magic.is_some(),
            candidates,
            clip,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Engine {
    buffer: Arc<SampleBuffer>,
    summary: Arc<WaveformSummary>,
    generation: u64,
    grid: Grid,
    snap_enabled: bool,
    markers: MarkerStore,
    clipboard: Option<ClipboardSegment>,
    history: EditHistory,
    dual: DualWave,
    selection: Option<Selection>,
    playhead: f64,
    config: EngineConfig,
    rng: ChaCha8Rng,
}

impl Engine {
    pub fn new(buffer: SampleBuffer, config: EngineConfig) -> Result<Self, EngineError> {
        let grid = config.grid.to_grid()?;
        Ok(Self::assemble(buffer, grid, config, ChaCha8Rng::from_rng(&mut rand::rng())))
    }

    /// Deterministic shuffles and candidate picks for a given seed.
    pub fn with_seed(buffer: SampleBuffer, config: EngineConfig, seed: u64) -> Result<Self, EngineError> {
        let grid = config.grid.to_grid()?;
        Ok(Self::assemble(buffer, grid, config, ChaCha8Rng::seed_from_u64(seed)))
    }

    fn assemble(buffer: SampleBuffer, grid: Grid, config: EngineConfig, rng: ChaCha8Rng) -> Self {
        let summary = reduce_with(&buffer, &config.reducer);
        Self {
            buffer: Arc::new(buffer),
            summary: Arc::new(summary),
            generation: 0,
            grid,
            snap_enabled: config.grid.snap_enabled,
            markers: MarkerStore::new(),
            clipboard: None,
            history: EditHistory::with_limit(config.editor.history_limit),
            dual: DualWave::new(),
            selection: None,
            playhead: 0.0,
            config,
            rng,
        }
    }

    #[must_use]
    pub fn buffer(&self) -> &Arc<SampleBuffer> {
        &self.buffer
    }

    #[must_use]
    pub fn summary(&self) -> &Arc<WaveformSummary> {
        &self.summary
    }

    /// Bumped every time the current buffer is replaced.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn duration(&self) -> f64 {
        self.buffer.duration_seconds()
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn markers(&self) -> &MarkerStore {
        &self.markers
    }

    #[must_use]
    pub fn clipboard(&self) -> Option<&ClipboardSegment> {
        self.clipboard.as_ref()
    }

    #[must_use]
    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    #[must_use]
    pub fn dual(&self) -> &DualWave {
        &self.dual
    }

    #[must_use]
    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    #[must_use]
    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[instrument(skip(self, buffer), fields(frames = buffer.frames(), sample_rate = buffer.sample_rate()))]
    pub fn load_buffer(&mut self, buffer: SampleBuffer) {
        self.summary = Arc::new(reduce_with(&buffer, &self.config.reducer));
        self.buffer = Arc::new(buffer);
        self.generation += 1;
        self.history.clear();
        self.dual.clear();
        self.markers = MarkerStore::new();
        self.selection = None;
        self.playhead = 0.0;
        info!(generation = self.generation, "buffer loaded");
    }

    /// Decodes before touching any state, so a bad file changes nothing.
    pub fn load_wav(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        let buffer = codec::decode_wav(bytes)?;
        self.load_buffer(buffer);
        Ok(())
    }

    pub fn encode_wav(&self) -> Result<Vec<u8>, EngineError> {
        codec::encode_wav(&self.buffer)
    }

    #[instrument(skip(self))]
    pub fn set_grid(&mut self, bpm: f64, division: u32) -> Result<Grid, EngineError> {
        let grid = Grid::new(bpm, division).inspect_err(|_| warn!("rejected grid parameters"))?;
        self.grid = grid;
        info!(step_duration = grid.step_duration(), "grid updated");
        Ok(grid)
    }

    pub fn set_snap(&mut self, enabled: bool) {
        self.snap_enabled = enabled;
    }

    #[must_use]
    pub fn snap_enabled(&self) -> bool {
        self.snap_enabled
    }

    #[must_use]
    pub fn snap(&self, seconds: f64) -> f64 {
        self.grid.snap(seconds, self.snap_enabled)
    }

    #[must_use]
    pub fn grid_lines(&self) -> Vec<GridLine> {
        self.grid.grid_lines(self.duration())
    }

    /// Clamped to the buffer. Playhead moves are never snapped.
    pub fn set_playhead(&mut self, seconds: f64) -> Result<f64, EngineError> {
        if !seconds.is_finite() {
            return Err(EngineError::InvalidTime(seconds));
        }
        self.playhead = seconds.clamp(0.0, self.duration());
        Ok(self.playhead)
    }

    /// Snaps both ends when snapping is on, then validates against the buffer.
    /// A snapped end that lands past the last frame is pulled back to it.
    #[instrument(skip(self))]
    pub fn set_selection(&mut self, start: f64, end: f64) -> Result<Selection, EngineError> {
        let selection = Selection::new(self.snap_within(start), self.snap_within(end));
        self.buffer.frame_span(selection.start, selection.end)?;
        self.selection = Some(selection);
        debug!(start = selection.start, end = selection.end, "selection set");
        Ok(selection)
    }

    /// Invalid input passes through untouched so `frame_span` can reject it.
    fn snap_within(&self, seconds: f64) -> f64 {
        let duration = self.duration();
        if !seconds.is_finite() || seconds < 0.0 || seconds > duration {
            return seconds;
        }
        self.snap(seconds).clamp(0.0, duration)
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn active_selection(&self) -> Result<Selection, EngineError> {
        self.selection.ok_or(EngineError::NoSelection)
    }

    #[instrument(skip(self), fields(generation = self.generation))]
    pub fn delete(&mut self, start: f64, end: f64) -> Result<Arc<SampleBuffer>, EngineError> {
        let edited = editor::delete_range(&self.buffer, start, end)?;
        self.commit_edit(EditKind::Delete, edited);
        info!(duration = self.duration(), "range deleted");
        Ok(Arc::clone(&self.buffer))
    }

    pub fn delete_selection(&mut self) -> Result<Arc<SampleBuffer>, EngineError> {
        let selection = self.active_selection()?;
        let buffer = self.delete(selection.start, selection.end)?;
        self.selection = None;
        Ok(buffer)
    }

    #[instrument(skip(self), fields(generation = self.generation))]
    pub fn copy(&mut self, start: f64, end: f64) -> Result<ClipboardSegment, EngineError> {
        let clip = editor::copy_range(&self.buffer, start, end)?;
        self.clipboard = Some(clip.clone());
        self.history.record(
            EditKind::Copy,
            Arc::clone(&self.buffer),
            Arc::clone(&self.buffer),
        );
        info!(frames = clip.frames(), "range copied to clipboard");
        Ok(clip)
    }

    pub fn copy_selection(&mut self) -> Result<ClipboardSegment, EngineError> {
        let selection = self.active_selection()?;
        self.copy(selection.start, selection.end)
    }

    /// Copy and delete as one history entry.
    #[instrument(skip(self), fields(generation = self.generation))]
    pub fn cut(&mut self, start: f64, end: f64) -> Result<ClipboardSegment, EngineError> {
        let clip = editor::copy_range(&self.buffer, start, end)?;
        let edited = editor::delete_range(&self.buffer, start, end)?;
        self.clipboard = Some(clip.clone());
        self.commit_edit(EditKind::Cut, edited);
        info!(frames = clip.frames(), duration = self.duration(), "range cut");
        Ok(clip)
    }

    pub fn cut_selection(&mut self) -> Result<ClipboardSegment, EngineError> {
        let selection = self.active_selection()?;
        let clip = self.cut(selection.start, selection.end)?;
        self.selection = None;
        Ok(clip)
    }

    #[instrument(skip(self), fields(generation = self.generation))]
    pub fn paste(&mut self, at: f64) -> Result<Arc<SampleBuffer>, EngineError> {
        let clip = self.clipboard.as_ref().ok_or(EngineError::EmptyClipboard)?;
        let edited = editor::paste_at(&self.buffer, at, clip)?;
        self.commit_edit(EditKind::Paste, edited);
        info!(duration = self.duration(), "clipboard pasted");
        Ok(Arc::clone(&self.buffer))
    }

    pub fn paste_at_playhead(&mut self) -> Result<Arc<SampleBuffer>, EngineError> {
        self.paste(self.playhead)
    }

    /// Whole-buffer reverse. The summary is mirrored, not recomputed.
    #[instrument(skip(self), fields(generation = self.generation))]
    pub fn reverse(&mut self) -> Result<Arc<SampleBuffer>, EngineError> {
        let edited = editor::reverse(&self.buffer)?;
        let summary = self.summary.reversed();
        self.commit_with_summary(EditKind::Reverse, edited, summary);
        info!("buffer reversed");
        Ok(Arc::clone(&self.buffer))
    }

    /// Reverses `[start, end)` exactly as given; edit ranges are not snapped.
    #[instrument(skip(self), fields(generation = self.generation))]
    pub fn reverse_range(&mut self, start: f64, end: f64) -> Result<Arc<SampleBuffer>, EngineError> {
        let edited = editor::reverse_range(&self.buffer, start, end)?;
        self.commit_edit(EditKind::Reverse, edited);
        info!(start, end, "range reversed");
        Ok(Arc::clone(&self.buffer))
    }

    pub fn reverse_selection(&mut self) -> Result<Arc<SampleBuffer>, EngineError> {
        let selection = self.active_selection()?;
        self.reverse_range(selection.start, selection.end)
    }

    pub fn shuffle(&mut self, strategy: ShuffleStrategy) -> Result<ShuffleReport, EngineError> {
        let outcome = self.prepare_shuffle(strategy, false)?.run()?;
        self.commit_shuffle(outcome)
    }

    /// Shuffle plus an auto-copied "interesting" excerpt of the original audio.
    pub fn magic_shuffle(&mut self, strategy: ShuffleStrategy) -> Result<ShuffleReport, EngineError> {
        let outcome = self.prepare_shuffle(strategy, true)?.run()?;
        self.commit_shuffle(outcome)
    }

    /// Sub-chunk shuffle of the active selection with the configured chunk count.
    pub fn shuffle_selection(&mut self, magic: bool) -> Result<ShuffleReport, EngineError> {
        let selection = self.active_selection()?;
        let strategy = ShuffleStrategy::SubChunk {
            start: selection.start,
            end: selection.end,
            chunks: self.config.shuffle.sub_chunks,
        };
        let outcome = self.prepare_shuffle(strategy, magic)?.run()?;
        self.commit_shuffle(outcome)
    }

    #[instrument(skip(self), fields(generation = self.generation))]
    pub fn prepare_shuffle(&mut self, strategy: ShuffleStrategy, magic: bool) -> Result<ShuffleTask, EngineError> {
        if self.buffer.is_empty() {
            return Err(EngineError::EmptyBuffer);
        }

        let duration = self.duration();
        let (segmentation, scope) = match strategy {
            ShuffleStrategy::MarkerBounded => (
                shuffle::marker_segmentation(&self.markers.all_marker_positions(), duration),
                None,
            ),
            ShuffleStrategy::GridBounded => (shuffle::grid_segmentation(&self.grid, duration), None),
            ShuffleStrategy::SubChunk { start, end, chunks } => (
                shuffle::sub_chunk_segmentation(duration, start, end, chunks)?,
                Some(Selection::new(start, end)),
            ),
        };

        debug!(segments = segmentation.segments.len(), "shuffle prepared");
        Ok(ShuffleTask {
            generation: self.generation,
            strategy,
            source: Arc::clone(&self.buffer),
            summary: Arc::clone(&self.summary),
            segmentation,
            magic: magic.then(|| (scope, self.config.shuffle.magic.clone())),
            reducer: self.config.reducer.clone(),
            seed: self.rng.random(),
        })
    }

    #[instrument(skip(self, outcome), fields(generation = self.generation, outcome_generation = outcome.generation))]
    pub fn commit_shuffle(&mut self, outcome: ShuffleOutcome) -> Result<ShuffleReport, EngineError> {
        if outcome.generation != self.generation {
            warn!("discarding shuffle prepared against an older buffer");
            return Err(EngineError::StaleEdit {
                expected: outcome.generation,
                actual: self.generation,
            });
        }

        let copied = outcome.clip.as_ref().map(|clip| (clip.start, clip.end));
        let notice = (outcome.magic && outcome.clip.is_none()).then_some(Notice::NoCandidateSegment);
        if let Some(clip) = outcome.clip {
            self.clipboard = Some(clip);
        }
        self.commit_with_summary(EditKind::Shuffle, outcome.buffer, outcome.summary);

        info!(
            segments = outcome.segment_count,
            candidates = outcome.candidates.len(),
            copied = copied.is_some(),
            "shuffle committed"
        );
        Ok(ShuffleReport {
            strategy: outcome.strategy,
            segment_count: outcome.segment_count,
            order: outcome.order,
            candidates: outcome.candidates,
            copied,
            notice,
        })
    }

    #[instrument(skip(self), fields(generation = self.generation))]
    pub fn undo(&mut self) -> Option<EditKind> {
        let (kind, snapshot) = self.history.undo()?;
        self.restore(snapshot);
        info!(?kind, "edit undone");
        Some(kind)
    }

    #[instrument(skip(self), fields(generation = self.generation))]
    pub fn redo(&mut self) -> Option<EditKind> {
        let (kind, snapshot) = self.history.redo()?;
        self.restore(snapshot);
        info!(?kind, "edit redone");
        Some(kind)
    }

    #[instrument(skip(self))]
    pub fn add_marker(
        &mut self,
        time: f64,
        name: Option<String>,
        category: Option<String>,
    ) -> Result<Marker, EngineError> {
        let time = self.snap(time);
        let marker = self.markers.add_marker(time, name, category)?;
        info!(marker_id = %marker.id, "marker added");
        Ok(marker)
    }

    pub fn add_marker_at_playhead(&mut self, name: Option<String>) -> Result<Marker, EngineError> {
        self.add_marker(self.playhead, name, None)
    }

    #[instrument(skip(self))]
    pub fn add_marker_position(&mut self, marker_id: Uuid, time: f64) -> Result<Option<Notice>, EngineError> {
        let time = self.snap(time);
        let notice = self.markers.add_position(marker_id, time)?;
        if notice.is_some() {
            debug!("marker position already present");
        }
        Ok(notice)
    }

    pub fn remove_marker_position(&mut self, marker_id: Uuid, time: f64) -> Result<bool, EngineError> {
        self.markers.remove_position(marker_id, time)
    }

    #[instrument(skip(self, name))]
    pub fn rename_marker(&mut self, marker_id: Uuid, name: String) -> Result<Marker, EngineError> {
        self.markers.rename_marker(marker_id, name)
    }

    #[instrument(skip(self))]
    pub fn retime_marker(&mut self, marker_id: Uuid, time: f64) -> Result<Marker, EngineError> {
        let time = self.snap(time);
        self.markers.retime_marker(marker_id, time)
    }

    #[instrument(skip(self))]
    pub fn recategorize_marker(&mut self, marker_id: Uuid, category: String) -> Result<Marker, EngineError> {
        self.markers.recategorize(marker_id, category)
    }

    #[instrument(skip(self))]
    pub fn remove_marker(&mut self, marker_id: Uuid) -> Result<Marker, EngineError> {
        let marker = self.markers.remove_marker(marker_id)?;
        info!("marker removed");
        Ok(marker)
    }

    pub fn add_custom_category(&mut self, category: String) -> Result<bool, EngineError> {
        self.markers.add_custom_category(category)
    }

    pub fn remove_custom_category(&mut self, category: &str) -> usize {
        self.markers.remove_custom_category(category)
    }

    #[instrument(skip(self))]
    pub fn add_region(&mut self, start: f64, end: f64, name: Option<String>) -> Result<Region, EngineError> {
        let region = self.markers.add_region(start, end, name)?;
        info!(region_id = %region.id, "region added");
        Ok(region)
    }

    /// Turns the active selection into a region.
    pub fn add_region_from_selection(&mut self, name: Option<String>) -> Result<Region, EngineError> {
        let selection = self.active_selection()?;
        self.add_region(selection.start, selection.end, name)
    }

    pub fn toggle_region_selection(&mut self, region_id: Uuid) -> Result<bool, EngineError> {
        self.markers.toggle_region_selection(region_id)
    }

    #[instrument(skip(self))]
    pub fn remove_region(&mut self, region_id: Uuid) -> Result<Region, EngineError> {
        let region = self.markers.remove_region(region_id)?;
        info!("region removed");
        Ok(region)
    }

    /// Refreshes the bar tracker for the current playhead.
    pub fn update_bar_tracker(&mut self) -> Marker {
        let duration = self.duration();
        self.markers
            .update_bar_tracker(self.playhead, duration, &self.grid)
            .clone()
    }

    #[instrument(skip(self))]
    pub fn duplicate_wave(&mut self) -> Result<Arc<SampleBuffer>, EngineError> {
        if self.buffer.is_empty() {
            return Err(EngineError::EmptyBuffer);
        }
        Ok(self.dual.duplicate(&self.buffer))
    }

    pub fn reverse_secondary(&mut self) -> Result<bool, EngineError> {
        self.dual.reverse_secondary()
    }

    /// Role swap: the secondary becomes the edited buffer and vice versa.
    /// History snapshots stay valid buffers and are kept.
    #[instrument(skip(self), fields(generation = self.generation))]
    pub fn swap_primary(&mut self) -> Result<Arc<SampleBuffer>, EngineError> {
        let promoted = self.dual.swap_primary(Arc::clone(&self.buffer))?;
        self.restore(promoted);
        Ok(Arc::clone(&self.buffer))
    }

    #[must_use]
    pub fn play_single(&self, start_time: f64) -> PlaybackPlan {
        self.dual.play_single(&self.buffer, start_time)
    }

    #[must_use]
    pub fn play_both(&self, start_time: f64) -> PlaybackPlan {
        self.dual.play_both(&self.buffer, start_time)
    }

    #[must_use]
    pub fn render_state(&self) -> RenderState {
        RenderState {
            duration_seconds: self.duration(),
            sample_rate: self.buffer.sample_rate(),
            channels: self.buffer.channel_count(),
            summary: WaveformSummary::clone(&self.summary),
            markers: self.markers.markers().to_vec(),
            bar_tracker: self.markers.bar_tracker().cloned(),
            regions: self.markers.regions().to_vec(),
            grid_lines: self.grid_lines(),
            grid_markers: self.markers.grid_markers().to_vec(),
            selection: self.selection,
            playhead: self.playhead,
            dual: self.dual.state(),
        }
    }

    #[must_use]
    pub fn project_state(&self) -> ProjectState {
        ProjectState {
            grid: self.grid,
            snap_enabled: self.snap_enabled,
            markers: self.markers.clone(),
            dual: self.dual.state(),
        }
    }

    /// Restores grid and markers. Dual-wave flags need the secondary audio,
    /// which the caller re-creates through [`Self::duplicate_wave`].
    /// Nothing changes when any part of the state is invalid.
    #[instrument(skip(self, state))]
    pub fn restore_project_state(&mut self, state: ProjectState) -> Result<(), EngineError> {
        let grid = Grid::new(state.grid.bpm(), state.grid.division())?;
        state
            .markers
            .validate()
            .inspect_err(|error| warn!(%error, "rejected project markers"))?;
        self.grid = grid;
        self.snap_enabled = state.snap_enabled;
        self.markers = state.markers;
        Ok(())
    }

    fn commit_edit(&mut self, kind: EditKind, edited: SampleBuffer) {
        let summary = reduce_with(&edited, &self.config.reducer);
        self.commit_with_summary(kind, edited, summary);
    }

    fn commit_with_summary(&mut self, kind: EditKind, edited: SampleBuffer, summary: WaveformSummary) {
        let before = Arc::clone(&self.buffer);
        let after = Arc::new(edited);
        self.history.record(kind, before, Arc::clone(&after));
        self.buffer = after;
        self.summary = Arc::new(summary);
        self.after_buffer_change();
    }

    fn restore(&mut self, snapshot: Arc<SampleBuffer>) {
        self.summary = Arc::new(reduce_with(&snapshot, &self.config.reducer));
        self.buffer = snapshot;
        self.after_buffer_change();
    }

    fn after_buffer_change(&mut self) {
        self.generation += 1;
        let duration = self.duration();
        self.playhead = self.playhead.min(duration);
        if self
            .selection
            .is_some_and(|selection| selection.end > duration)
        {
            self.selection = None;
        }
        debug!(generation = self.generation, duration, "current buffer replaced");
    }
}
