//! Markers, regions and marker categories.
//!
//! The bar tracker is not a regular marker: it occupies its own slot so the
//! store can never hold two of them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    error::{EngineError, Notice},
    grid::Grid,
    model::{
        BAR_TRACKER_CATEGORY, BUILTIN_MARKER_CATEGORIES, DEFAULT_MARKER_CATEGORY, Marker,
        REGION_COLORS, Region,
    },
};

/// One bar or beat line of the highlight overlay.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GridMarker {
    pub time: f64,
    pub bar: u64,
    /// 1-indexed beat inside the bar; beat 1 is the bar line itself.
    pub beat: u64,
    pub active: bool,
}

impl GridMarker {
    #[must_use]
    pub fn is_bar_line(&self) -> bool {
        self.beat == 1
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarkerStore {
    markers: Vec<Marker>,
    regions: Vec<Region>,
    custom_categories: BTreeSet<String>,
    bar_tracker: Option<Marker>,
    grid_markers: Vec<GridMarker>,
    regions_created: usize,
}

impl MarkerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    #[must_use]
    pub fn marker(&self, marker_id: Uuid) -> Option<&Marker> {
        self.markers.iter().find(|marker| marker.id == marker_id)
    }

    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn selected_regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter().filter(|region| region.selected)
    }

    #[must_use]
    pub fn bar_tracker(&self) -> Option<&Marker> {
        self.bar_tracker.as_ref()
    }

    #[must_use]
    pub fn grid_markers(&self) -> &[GridMarker] {
        &self.grid_markers
    }

    pub fn add_marker(
        &mut self,
        time: f64,
        name: Option<String>,
        category: Option<String>,
    ) -> Result<Marker, EngineError> {
        validate_time(time)?;
        let category = category.unwrap_or_else(|| DEFAULT_MARKER_CATEGORY.to_string());
        reject_reserved(&category)?;

        let name = name.unwrap_or_else(|| format!("Marker {}", self.markers.len() + 1));
        let marker = Marker::new(time, name, category);
        self.markers.push(marker.clone());
        debug!(marker_id = %marker.id, time, "marker added");
        Ok(marker)
    }

    /// `Ok(Some(Notice::DuplicatePosition))` leaves the marker untouched.
    pub fn add_position(&mut self, marker_id: Uuid, time: f64) -> Result<Option<Notice>, EngineError> {
        validate_time(time)?;
        let marker = self.marker_mut(marker_id)?;
        if marker.insert_position(time) {
            debug!(%marker_id, time, positions = marker.positions().len(), "marker position added");
            Ok(None)
        } else {
            debug!(%marker_id, time, "duplicate marker position ignored");
            Ok(Some(Notice::DuplicatePosition { marker_id, time }))
        }
    }

    /// Returns `false` when the time is absent or is the marker's only position.
    pub fn remove_position(&mut self, marker_id: Uuid, time: f64) -> Result<bool, EngineError> {
        let marker = self.marker_mut(marker_id)?;
        Ok(marker.remove_position(time))
    }

    pub fn rename_marker(&mut self, marker_id: Uuid, name: impl Into<String>) -> Result<Marker, EngineError> {
        let marker = self.marker_mut(marker_id)?;
        marker.name = name.into();
        Ok(marker.clone())
    }

    pub fn retime_marker(&mut self, marker_id: Uuid, time: f64) -> Result<Marker, EngineError> {
        validate_time(time)?;
        let marker = self.marker_mut(marker_id)?;
        marker.retime(time);
        Ok(marker.clone())
    }

    pub fn recategorize(&mut self, marker_id: Uuid, category: impl Into<String>) -> Result<Marker, EngineError> {
        let category = category.into();
        reject_reserved(&category)?;
        let marker = self.marker_mut(marker_id)?;
        marker.category = category;
        Ok(marker.clone())
    }

    pub fn remove_marker(&mut self, marker_id: Uuid) -> Result<Marker, EngineError> {
        let index = self
            .markers
            .iter()
            .position(|marker| marker.id == marker_id)
            .ok_or(EngineError::MarkerNotFound(marker_id))?;
        Ok(self.markers.remove(index))
    }

    /// Sorted, de-duplicated union of every regular marker position.
    #[must_use]
    pub fn all_marker_positions(&self) -> Vec<f64> {
        let mut positions: Vec<f64> = self
            .markers
            .iter()
            .flat_map(|marker| marker.positions().iter().copied())
            .collect();
        positions.sort_by(f64::total_cmp);
        positions.dedup_by(|right, left| (*right - *left).abs() < crate::model::POSITION_EPSILON);
        positions
    }

    pub fn add_region(&mut self, start: f64, end: f64, name: Option<String>) -> Result<Region, EngineError> {
        check_region_bounds(start, end).inspect_err(|_| warn!(start, end, "rejected region with invalid bounds"))?;

        let color = REGION_COLORS[self.regions_created % REGION_COLORS.len()];
        self.regions_created += 1;
        let region = Region {
            id: Uuid::new_v4(),
            start_time: start,
            end_time: end,
            name: name.unwrap_or_else(|| format!("Region {}", self.regions_created)),
            color: color.to_string(),
            selected: false,
        };
        self.regions.push(region.clone());
        debug!(region_id = %region.id, start, end, "region added");
        Ok(region)
    }

    pub fn toggle_region_selection(&mut self, region_id: Uuid) -> Result<bool, EngineError> {
        let region = self
            .regions
            .iter_mut()
            .find(|region| region.id == region_id)
            .ok_or(EngineError::RegionNotFound(region_id))?;
        region.selected = !region.selected;
        Ok(region.selected)
    }

    pub fn clear_region_selection(&mut self) {
        for region in &mut self.regions {
            region.selected = false;
        }
    }

    pub fn remove_region(&mut self, region_id: Uuid) -> Result<Region, EngineError> {
        let index = self
            .regions
            .iter()
            .position(|region| region.id == region_id)
            .ok_or(EngineError::RegionNotFound(region_id))?;
        Ok(self.regions.remove(index))
    }

    /// Built-in categories first, then categories in use, then custom ones.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = BUILTIN_MARKER_CATEGORIES
            .iter()
            .map(ToString::to_string)
            .collect();
        let in_use: BTreeSet<&str> = self
            .markers
            .iter()
            .map(|marker| marker.category.as_str())
            .collect();
        for category in in_use
            .into_iter()
            .chain(self.custom_categories.iter().map(String::as_str))
        {
            if !categories.iter().any(|known| known == category) {
                categories.push(category.to_string());
            }
        }
        categories
    }

    /// Returns `false` if the category already exists.
    pub fn add_custom_category(&mut self, category: impl Into<String>) -> Result<bool, EngineError> {
        let category = category.into();
        reject_reserved(&category)?;
        if BUILTIN_MARKER_CATEGORIES.contains(&category.as_str()) {
            return Ok(false);
        }
        Ok(self.custom_categories.insert(category))
    }

    /// Drops a custom category and moves its markers to the default category.
    /// Returns how many markers were reassigned.
    pub fn remove_custom_category(&mut self, category: &str) -> usize {
        if !self.custom_categories.remove(category) {
            return 0;
        }

        let mut reassigned = 0;
        for marker in &mut self.markers {
            if marker.category == category {
                marker.category = DEFAULT_MARKER_CATEGORY.to_string();
                reassigned += 1;
            }
        }
        debug!(category, reassigned, "custom category removed");
        reassigned
    }

    /// Checks a store that arrived from outside (a restored project) against
    /// the rules the mutating methods keep.
    pub fn validate(&self) -> Result<(), EngineError> {
        for marker in &self.markers {
            marker.check_positions()?;
            reject_reserved(&marker.category)?;
        }
        if let Some(tracker) = &self.bar_tracker {
            tracker.check_positions()?;
        }
        for category in &self.custom_categories {
            reject_reserved(category)?;
        }
        for region in &self.regions {
            check_region_bounds(region.start_time, region.end_time)?;
        }
        Ok(())
    }

    /// Upserts the bar tracker marker and rebuilds the bar/beat highlight lines.
    pub fn update_bar_tracker(&mut self, playhead: f64, duration: f64, grid: &Grid) -> &Marker {
        let playhead = if playhead.is_finite() { playhead.max(0.0) } else { 0.0 };
        let (current, total) = grid.bar_position(playhead, duration);
        let label = format!("Bar {current}/{total}");
        let bar_start = grid.bar_to_time(current);

        self.rebuild_grid_markers(grid, total, current, duration);

        let tracker = self.bar_tracker.get_or_insert_with(|| {
            debug!("bar tracker created");
            Marker::new(bar_start, label.clone(), BAR_TRACKER_CATEGORY)
        });
        tracker.name = label;
        tracker.retime(bar_start);
        tracker
    }

    pub fn clear_bar_tracker(&mut self) {
        self.bar_tracker = None;
        self.grid_markers.clear();
    }

    /// Lines past the end of the audio are skipped, even when the label's
    /// rounded bar total reaches further.
    fn rebuild_grid_markers(&mut self, grid: &Grid, total_bars: u64, current_bar: u64, duration: f64) {
        let beats_per_bar = (crate::grid::STEPS_PER_BAR / grid.steps_per_beat()).max(1);
        let beat_duration = grid.bar_duration() / beats_per_bar as f64;

        self.grid_markers.clear();
        for bar in 1..=total_bars {
            let bar_start = grid.bar_to_time(bar);
            for beat in 1..=beats_per_bar {
                let time = bar_start + (beat - 1) as f64 * beat_duration;
                if time >= duration {
                    return;
                }
                self.grid_markers.push(GridMarker {
                    time,
                    bar,
                    beat,
                    active: bar == current_bar,
                });
            }
        }
    }

    fn marker_mut(&mut self, marker_id: Uuid) -> Result<&mut Marker, EngineError> {
        self.markers
            .iter_mut()
            .find(|marker| marker.id == marker_id)
            .ok_or(EngineError::MarkerNotFound(marker_id))
    }
}

fn check_region_bounds(start: f64, end: f64) -> Result<(), EngineError> {
    if !start.is_finite() || !end.is_finite() || start < 0.0 || end <= start {
        return Err(EngineError::InvalidRange {
            start,
            end,
            duration: end - start,
        });
    }
    Ok(())
}

fn validate_time(time: f64) -> Result<(), EngineError> {
    if time.is_finite() && time >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidTime(time))
    }
}

fn reject_reserved(category: &str) -> Result<(), EngineError> {
    if category == BAR_TRACKER_CATEGORY {
        return Err(EngineError::ReservedCategory(category.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names_count_up() {
        let mut store = MarkerStore::new();
        let first = store.add_marker(0.5, None, None).expect("add should succeed");
        let second = store.add_marker(1.5, None, None).expect("add should succeed");
        assert_eq!(first.name, "Marker 1");
        assert_eq!(second.name, "Marker 2");
        assert_eq!(first.category, DEFAULT_MARKER_CATEGORY);
    }

    #[test]
    fn region_colors_cycle() {
        let mut store = MarkerStore::new();
        for index in 0..=REGION_COLORS.len() {
            let start = index as f64;
            store
                .add_region(start, start + 0.5, None)
                .expect("region should be valid");
        }
        assert_eq!(store.regions()[0].color, store.regions()[REGION_COLORS.len()].color);
    }

    #[test]
    fn grid_markers_flag_current_bar() {
        let grid = Grid::new(120.0, 16).expect("grid should be valid");
        let mut store = MarkerStore::new();
        // 4 s at 120 bpm rounds to 8 "bars" under the step/4 rule, but
        // only two real bars fit in the audio.
        let tracker = store.update_bar_tracker(2.5, 4.0, &grid);
        assert_eq!(tracker.name, "Bar 2/8");

        assert_eq!(store.grid_markers().len(), 2 * 4);
        assert!(store.grid_markers().iter().all(|marker| marker.time < 4.0));
        let active: Vec<_> = store
            .grid_markers()
            .iter()
            .filter(|marker| marker.active)
            .collect();
        assert_eq!(active.len(), 4);
        assert!(active.iter().all(|marker| marker.bar == 2));
        assert!(active[0].is_bar_line());
    }
}
