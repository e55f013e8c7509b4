//! Bounded linear undo/redo history of element-list snapshots.

use crate::elements::Element;

/// Maximum number of snapshots retained.
pub const HISTORY_CAPACITY: usize = 50;

/// Snapshot history with a movable cursor.
///
/// `snapshots[index]` always equals the element list as of the most recent
/// committed mutation. When the buffer is full, pushing evicts the oldest
/// snapshot and holds the cursor steady instead of advancing it, which caps
/// the effective undo depth at `HISTORY_CAPACITY - 1` once full.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Vec<Element>>,
    index: usize,
}

impl History {
    /// Start with a single snapshot of `elements`.
    pub fn new(elements: &[Element]) -> Self {
        Self {
            snapshots: vec![elements.to_vec()],
            index: 0,
        }
    }

    /// Discard everything and start over with a single snapshot.
    pub fn reset(&mut self, elements: &[Element]) {
        self.snapshots.clear();
        self.snapshots.push(elements.to_vec());
        self.index = 0;
    }

    /// Record a new snapshot, discarding any redo tail first.
    pub fn push(&mut self, elements: &[Element]) {
        self.snapshots.truncate(self.index + 1);
        self.snapshots.push(elements.to_vec());
        if self.snapshots.len() > HISTORY_CAPACITY {
            // Evict the oldest snapshot without advancing the cursor.
            self.snapshots.remove(0);
        } else {
            self.index += 1;
        }
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    /// Step back; returns a deep copy of the snapshot to restore.
    pub fn undo(&mut self) -> Option<Vec<Element>> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        Some(self.snapshots[self.index].clone())
    }

    /// Step forward; returns a deep copy of the snapshot to restore.
    pub fn redo(&mut self) -> Option<Vec<Element>> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        Some(self.snapshots[self.index].clone())
    }

    /// Number of snapshots currently held.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
