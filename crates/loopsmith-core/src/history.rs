//! Linear undo/redo over buffer snapshots.
//!
//! Each [`EditHistoryEntry`] keeps the buffer before and after the edit.
//! Snapshots are shared through `Arc`, so an entry costs two pointer clones
//! unless the edit produced a new buffer anyway. Recording an entry while
//! the cursor is behind the end discards the redo tail.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{buffer::SampleBuffer, model::EditKind};

pub const DEFAULT_HISTORY_LIMIT: usize = 64;

#[derive(Debug, Clone)]
pub struct EditHistoryEntry {
    pub kind: EditKind,
    pub before: Arc<SampleBuffer>,
    pub after: Arc<SampleBuffer>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct EditHistory {
    entries: Vec<EditHistoryEntry>,
    cursor: usize,
    limit: usize,
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl EditHistory {
    /// A limit of zero keeps every entry.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            limit,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[EditHistoryEntry] {
        &self.entries
    }

    /// Number of entries currently applied.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn record(&mut self, kind: EditKind, before: Arc<SampleBuffer>, after: Arc<SampleBuffer>) {
        let discarded = self.entries.len() - self.cursor;
        self.entries.truncate(self.cursor);
        self.entries.push(EditHistoryEntry {
            kind,
            before,
            after,
            timestamp: Utc::now(),
        });

        if self.limit > 0 && self.entries.len() > self.limit {
            let overflow = self.entries.len() - self.limit;
            self.entries.drain(..overflow);
        }
        self.cursor = self.entries.len();
        debug!(?kind, discarded, entries = self.entries.len(), "history entry recorded");
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.entries[..self.cursor]
            .iter()
            .any(|entry| entry.kind.mutates_buffer())
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.entries[self.cursor..]
            .iter()
            .any(|entry| entry.kind.mutates_buffer())
    }

    /// Steps back over the latest buffer-changing entry, skipping copies.
    pub fn undo(&mut self) -> Option<(EditKind, Arc<SampleBuffer>)> {
        let index = self.entries[..self.cursor]
            .iter()
            .rposition(|entry| entry.kind.mutates_buffer())?;
        self.cursor = index;
        let entry = &self.entries[index];
        Some((entry.kind, Arc::clone(&entry.before)))
    }

    pub fn redo(&mut self) -> Option<(EditKind, Arc<SampleBuffer>)> {
        let offset = self.entries[self.cursor..]
            .iter()
            .position(|entry| entry.kind.mutates_buffer())?;
        let index = self.cursor + offset;
        self.cursor = index + 1;
        let entry = &self.entries[index];
        Some((entry.kind, Arc::clone(&entry.after)))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(value: f32) -> Arc<SampleBuffer> {
        Arc::new(SampleBuffer::from_mono(vec![value; 4], 8_000).expect("buffer should build"))
    }

    #[test]
    fn undo_redo_walks_linearly() {
        let mut history = EditHistory::default();
        let (a, b, c) = (snapshot(0.1), snapshot(0.2), snapshot(0.3));
        history.record(EditKind::Delete, Arc::clone(&a), Arc::clone(&b));
        history.record(EditKind::Reverse, Arc::clone(&b), Arc::clone(&c));

        let (kind, restored) = history.undo().expect("undo should exist");
        assert_eq!(kind, EditKind::Reverse);
        assert!(Arc::ptr_eq(&restored, &b));

        let (_, restored) = history.undo().expect("second undo should exist");
        assert!(Arc::ptr_eq(&restored, &a));
        assert!(history.undo().is_none());

        let (_, redone) = history.redo().expect("redo should exist");
        assert!(Arc::ptr_eq(&redone, &b));
    }

    #[test]
    fn new_entry_discards_redo_tail() {
        let mut history = EditHistory::default();
        let (a, b, c) = (snapshot(0.1), snapshot(0.2), snapshot(0.3));
        history.record(EditKind::Delete, Arc::clone(&a), Arc::clone(&b));
        history.undo();
        history.record(EditKind::Paste, Arc::clone(&a), Arc::clone(&c));

        assert_eq!(history.entries().len(), 1);
        assert!(!history.can_redo());
    }

    #[test]
    fn copy_entries_are_skipped_by_undo() {
        let mut history = EditHistory::default();
        let (a, b) = (snapshot(0.1), snapshot(0.2));
        history.record(EditKind::Delete, Arc::clone(&a), Arc::clone(&b));
        history.record(EditKind::Copy, Arc::clone(&b), Arc::clone(&b));

        let (kind, restored) = history.undo().expect("undo should exist");
        assert_eq!(kind, EditKind::Delete);
        assert!(Arc::ptr_eq(&restored, &a));
        assert_eq!(history.cursor(), 0);
    }

    #[test]
    fn limit_drops_oldest_entries() {
        let mut history = EditHistory::with_limit(2);
        let snapshots: Vec<_> = (0..4).map(|index| snapshot(index as f32 / 10.0)).collect();
        for pair in snapshots.windows(2) {
            history.record(EditKind::Shuffle, Arc::clone(&pair[0]), Arc::clone(&pair[1]));
        }
        history.record(EditKind::Shuffle, Arc::clone(&snapshots[3]), Arc::clone(&snapshots[0]));

        assert_eq!(history.entries().len(), 2);
        assert_eq!(history.cursor(), 2);
    }
}
