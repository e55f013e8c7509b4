//! Document state manager.
//!
//! Owns the authoritative [`Paper`], the undo/redo [`History`], and the
//! persistence store. Every committed mutation stamps the document,
//! snapshots history, notifies the change listener, and schedules a
//! debounced save.

use std::rc::Rc;

use kurbo::Rect;

use crate::clock::Clock;
use crate::elements::{Element, ElementId, StrokeErase, rect_fully_contains};
use crate::history::History;
use crate::paper::{GridSettingsPatch, Paper, PaperSummary};
use crate::storage::{KeyValueStore, StoreError, StoreResult};

/// Storage key prefix for persisted papers.
pub const PAPER_KEY_PREFIX: &str = "paper_";

/// Reserved key holding the id of the most recently saved paper.
pub const LAST_PAPER_KEY: &str = "last_paper_id";

/// Quiet period after the last mutation before the debounced save fires,
/// in milliseconds. Bursts of rapid mutations coalesce into one write.
pub const SAVE_DEBOUNCE_MS: u64 = 500;

type ChangeListener = Box<dyn FnMut(&Paper)>;

/// Owns one live [`Paper`] at a time and mediates every mutation.
pub struct PaperManager<S: KeyValueStore> {
    paper: Paper,
    history: History,
    store: S,
    clock: Rc<dyn Clock>,
    save_due_at: Option<u64>,
    change_listener: Option<ChangeListener>,
}

impl<S: KeyValueStore> PaperManager<S> {
    /// Create a manager with a fresh untitled paper.
    pub fn new(store: S, clock: Rc<dyn Clock>) -> Self {
        let paper = Paper::new("Untitled", clock.now_ms());
        let history = History::new(&paper.elements);
        Self {
            paper,
            history,
            store,
            clock,
            save_due_at: None,
            change_listener: None,
        }
    }

    /// The live paper, for read-only inspection. Mutate only through
    /// manager operations or history invariants break.
    pub fn paper(&self) -> &Paper {
        &self.paper
    }

    /// Independent copy of the element list.
    pub fn elements(&self) -> Vec<Element> {
        self.paper.elements.clone()
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register the change listener invoked after every document change.
    pub fn set_change_listener(&mut self, listener: impl FnMut(&Paper) + 'static) {
        self.change_listener = Some(Box::new(listener));
    }

    pub fn clear_change_listener(&mut self) {
        self.change_listener = None;
    }

    // -- element mutations --------------------------------------------------

    /// Append an element; it becomes the topmost in paint order.
    pub fn add_element(&mut self, element: Element) {
        self.paper.elements.push(element);
        self.commit();
    }

    /// Remove an element by id. Returns whether anything was removed.
    pub fn remove_element(&mut self, id: &ElementId) -> bool {
        let before = self.paper.elements.len();
        self.paper.elements.retain(|e| e.id() != *id);
        if self.paper.elements.len() == before {
            return false;
        }
        self.commit();
        true
    }

    /// Remove every element.
    pub fn clear_elements(&mut self) {
        self.paper.elements.clear();
        self.commit();
    }

    /// Erase everything inside `rect`: strokes are split against the
    /// rectangle, rectangles and text are removed only when their bounds
    /// are fully contained. Commits only when something actually changed;
    /// returns whether it did.
    pub fn erase_in_rect(&mut self, rect: Rect) -> bool {
        let mut changed = false;
        let elements = std::mem::take(&mut self.paper.elements);
        let mut survivors = Vec::with_capacity(elements.len());

        for element in elements {
            match element {
                Element::Stroke(stroke) => match stroke.erase_rect(&rect) {
                    StrokeErase::Unchanged => survivors.push(Element::Stroke(stroke)),
                    StrokeErase::Removed => changed = true,
                    StrokeErase::Split(parts) => {
                        changed = true;
                        survivors.extend(parts.into_iter().map(Element::Stroke));
                    }
                },
                other => {
                    if rect_fully_contains(&rect, &other.bounds()) {
                        changed = true;
                    } else {
                        survivors.push(other);
                    }
                }
            }
        }

        self.paper.elements = survivors;
        if changed {
            self.commit();
        }
        changed
    }

    // -- grid ---------------------------------------------------------------

    /// Merge a grid patch. Stamps and notifies but takes no history
    /// snapshot: the grid is not undoable.
    pub fn set_grid_settings(&mut self, patch: GridSettingsPatch) {
        self.paper.grid_settings.apply(patch);
        self.paper.updated_at = self.clock.now_ms();
        self.schedule_save();
        self.notify();
    }

    // -- history ------------------------------------------------------------

    /// Step back one snapshot. Returns whether the move occurred.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(elements) => {
                self.paper.elements = elements;
                self.paper.updated_at = self.clock.now_ms();
                self.notify();
                true
            }
            None => false,
        }
    }

    /// Step forward one snapshot. Returns whether the move occurred.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(elements) => {
                self.paper.elements = elements;
                self.paper.updated_at = self.clock.now_ms();
                self.notify();
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // -- persistence --------------------------------------------------------

    /// Serialize and store the live paper; returns the serialized form.
    pub fn save(&mut self) -> StoreResult<String> {
        let json = self.paper.to_json()?;
        self.store.set(&paper_key(&self.paper.id), &json)?;
        self.store.set(LAST_PAPER_KEY, &self.paper.id)?;
        self.save_due_at = None;
        Ok(json)
    }

    /// Replace the live paper with a stored one. On any failure the live
    /// paper is left untouched.
    pub fn load(&mut self, id: &str) -> StoreResult<()> {
        let json = self
            .store
            .get(&paper_key(id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let paper = Paper::from_json(&json)?;
        self.adopt(paper);
        Ok(())
    }

    /// Load the paper recorded as most recently saved, if any.
    pub fn load_last(&mut self) -> Option<String> {
        let id = self.store.get(LAST_PAPER_KEY)?;
        match self.load(&id) {
            Ok(()) => Some(id),
            Err(err) => {
                log::warn!("failed to load last paper {id}: {err}");
                None
            }
        }
    }

    /// Serialize the live paper to human-readable JSON.
    pub fn export_to_json(&self) -> StoreResult<String> {
        Ok(self.paper.to_json()?)
    }

    /// Parse and adopt a serialized paper. On parse failure the live paper
    /// is left untouched.
    pub fn import_from_json(&mut self, json: &str) -> StoreResult<()> {
        let paper = Paper::from_json(json)?;
        self.adopt(paper);
        Ok(())
    }

    /// Replace the live paper with a fresh empty one.
    pub fn new_paper(&mut self, name: impl Into<String>) {
        let paper = Paper::new(name, self.clock.now_ms());
        self.adopt(paper);
    }

    /// Summaries of every stored paper, most recently updated first.
    /// Entries that fail to parse are skipped.
    pub fn list_saved_papers(&self) -> Vec<PaperSummary> {
        let mut summaries: Vec<PaperSummary> = self
            .store
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(PAPER_KEY_PREFIX))
            .filter_map(|key| {
                let json = self.store.get(&key)?;
                match Paper::from_json(&json) {
                    Ok(paper) => Some(PaperSummary::from(&paper)),
                    Err(err) => {
                        log::warn!("skipping unreadable paper entry {key}: {err}");
                        None
                    }
                }
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }

    /// Delete a stored paper. The live paper is unaffected even when it is
    /// the one deleted.
    pub fn delete_paper(&mut self, id: &str) -> StoreResult<()> {
        self.store.remove(&paper_key(id))
    }

    /// Rename a stored paper in place. Renaming the live paper also
    /// updates its name and notifies.
    pub fn rename_paper(&mut self, id: &str, new_name: &str) -> StoreResult<()> {
        let key = paper_key(id);
        let json = self
            .store
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let mut stored = Paper::from_json(&json)?;
        stored.name = new_name.to_string();
        stored.updated_at = self.clock.now_ms();
        self.store.set(&key, &stored.to_json()?)?;

        if self.paper.id == id {
            self.paper.name = new_name.to_string();
            self.paper.updated_at = stored.updated_at;
            self.notify();
        }
        Ok(())
    }

    // -- debounced autosave --------------------------------------------------

    /// Whether a debounced save is waiting to fire.
    pub fn save_pending(&self) -> bool {
        self.save_due_at.is_some()
    }

    /// Fire the debounced save once its quiet period has elapsed. Returns
    /// whether a save was written. Failures keep the deadline so a later
    /// pump retries.
    pub fn pump_autosave(&mut self) -> bool {
        match self.save_due_at {
            Some(due) if self.clock.now_ms() >= due => match self.save() {
                Ok(_) => true,
                Err(err) => {
                    log::warn!("autosave failed: {err}");
                    false
                }
            },
            _ => false,
        }
    }

    /// Write any pending debounced save immediately.
    pub fn flush_pending_save(&mut self) -> StoreResult<()> {
        if self.save_due_at.is_some() {
            self.save()?;
        }
        Ok(())
    }

    // -- internals -----------------------------------------------------------

    /// Bookkeeping for a committed element mutation.
    fn commit(&mut self) {
        self.paper.updated_at = self.clock.now_ms();
        self.history.push(&self.paper.elements);
        self.schedule_save();
        self.notify();
    }

    fn schedule_save(&mut self) {
        self.save_due_at = Some(self.clock.now_ms() + SAVE_DEBOUNCE_MS);
    }

    fn notify(&mut self) {
        if let Some(listener) = self.change_listener.as_mut() {
            listener(&self.paper);
        }
    }

    /// Replace the live paper, reset history to a single snapshot, cancel
    /// any pending save, and notify.
    fn adopt(&mut self, paper: Paper) {
        self.history.reset(&paper.elements);
        self.paper = paper;
        self.save_due_at = None;
        self.notify();
    }
}

fn paper_key(id: &str) -> String {
    format!("{PAPER_KEY_PREFIX}{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::elements::{Rectangle, Stroke, StrokePoint, Text};
    use crate::history::HISTORY_CAPACITY;
    use crate::storage::MemoryStore;
    use std::cell::RefCell;

    fn manager() -> (PaperManager<MemoryStore>, Rc<ManualClock>) {
        let clock = Rc::new(ManualClock::new(1_000));
        let manager = PaperManager::new(MemoryStore::new(), clock.clone());
        (manager, clock)
    }

    fn rect_at(x: f64) -> Element {
        Element::Rectangle(Rectangle::new(x, 0.0, 10.0, 10.0))
    }

    fn stroke_of(coords: &[(f64, f64)]) -> Element {
        let points = coords
            .iter()
            .map(|&(x, y)| StrokePoint::plain(x, y))
            .collect();
        Element::Stroke(Stroke::new(points, "#000000", 2.0))
    }

    #[test]
    fn test_add_element_stamps_and_snapshots() {
        let (mut manager, clock) = manager();
        clock.advance(500);

        manager.add_element(rect_at(0.0));
        assert_eq!(manager.paper().element_count(), 1);
        assert_eq!(manager.paper().updated_at, 1_500);
        assert!(manager.can_undo());
    }

    #[test]
    fn test_undo_redo_inverse_law() {
        let (mut manager, _clock) = manager();

        manager.add_element(rect_at(0.0));
        manager.add_element(rect_at(20.0));
        let before = manager.elements();

        assert!(manager.undo());
        assert_eq!(manager.paper().element_count(), 1);
        assert!(manager.redo());
        assert_eq!(manager.elements(), before);
    }

    #[test]
    fn test_undo_redo_out_of_range_reports_false() {
        let (mut manager, _clock) = manager();
        assert!(!manager.undo());
        assert!(!manager.redo());

        manager.add_element(rect_at(0.0));
        assert!(manager.undo());
        assert!(!manager.undo());
    }

    #[test]
    fn test_history_bound_once_full() {
        let (mut manager, _clock) = manager();
        for i in 0..HISTORY_CAPACITY + 20 {
            manager.add_element(rect_at(i as f64));
        }

        let mut steps = 0;
        while manager.undo() {
            steps += 1;
        }
        assert_eq!(steps, HISTORY_CAPACITY - 1);
    }

    #[test]
    fn test_remove_element() {
        let (mut manager, _clock) = manager();
        let element = rect_at(0.0);
        let id = element.id();
        manager.add_element(element);

        assert!(manager.remove_element(&id));
        assert!(manager.paper().is_empty());
        assert!(!manager.remove_element(&id));
    }

    #[test]
    fn test_erase_removes_contained_rectangle_only() {
        let (mut manager, _clock) = manager();
        manager.add_element(Element::Rectangle(Rectangle::new(10.0, 10.0, 5.0, 5.0)));

        // Merely intersecting erase area leaves the rectangle intact.
        assert!(!manager.erase_in_rect(Rect::new(0.0, 0.0, 5.0, 5.0)));
        assert_eq!(manager.paper().element_count(), 1);

        assert!(manager.erase_in_rect(Rect::new(0.0, 0.0, 100.0, 100.0)));
        assert!(manager.paper().is_empty());
    }

    #[test]
    fn test_erase_splits_stroke() {
        let (mut manager, _clock) = manager();
        manager.add_element(stroke_of(&[
            (0.0, 0.0),
            (5.0, 5.0),
            (15.0, 15.0),
            (25.0, 25.0),
        ]));

        assert!(manager.erase_in_rect(Rect::new(4.0, 4.0, 12.0, 12.0)));

        let elements = manager.elements();
        assert_eq!(elements.len(), 1);
        match &elements[0] {
            Element::Stroke(stroke) => {
                assert_eq!(stroke.points.len(), 2);
                assert_eq!(stroke.points[0].x, 15.0);
            }
            other => panic!("expected stroke, got {other:?}"),
        }
    }

    #[test]
    fn test_erase_keeps_untouched_stroke_identity() {
        let (mut manager, _clock) = manager();
        let element = stroke_of(&[(50.0, 50.0), (60.0, 60.0)]);
        let id = element.id();
        manager.add_element(element);

        assert!(!manager.erase_in_rect(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(manager.elements()[0].id(), id);
    }

    #[test]
    fn test_erase_removes_contained_text() {
        let (mut manager, _clock) = manager();
        let mut text = Text::new(10.0, 10.0, "hi");
        text.font_size = 10.0;
        // Approximate box: 2 chars * 10 * 0.6 wide, 10 tall.
        manager.add_element(Element::Text(text));

        assert!(!manager.erase_in_rect(Rect::new(0.0, 0.0, 15.0, 15.0)));
        assert!(manager.erase_in_rect(Rect::new(0.0, 0.0, 30.0, 30.0)));
        assert!(manager.paper().is_empty());
    }

    #[test]
    fn test_noop_erase_leaves_history_untouched() {
        let (mut manager, _clock) = manager();
        manager.add_element(rect_at(0.0));

        assert!(!manager.erase_in_rect(Rect::new(500.0, 500.0, 600.0, 600.0)));

        // One undo back to empty, nothing more.
        assert!(manager.undo());
        assert!(manager.paper().is_empty());
        assert!(!manager.undo());
    }

    #[test]
    fn test_grid_settings_do_not_enter_history() {
        let (mut manager, _clock) = manager();
        manager.add_element(rect_at(0.0));

        manager.set_grid_settings(GridSettingsPatch {
            kind: Some(crate::paper::GridKind::Square),
            ..Default::default()
        });

        assert!(manager.undo());
        // Grid survives the undo; only elements are versioned.
        assert_eq!(
            manager.paper().grid_settings.kind,
            crate::paper::GridKind::Square
        );
        assert!(!manager.undo());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let (mut manager, _clock) = manager();
        manager.add_element(rect_at(5.0));
        manager.new_paper("Original");
        manager.add_element(stroke_of(&[(0.0, 0.0), (10.0, 10.0)]));

        let saved = manager.save().unwrap();
        assert!(saved.contains("Original"));
        let id = manager.paper().id.clone();
        let before = manager.paper().clone();

        manager.new_paper("Other");
        assert!(manager.paper().is_empty());

        manager.load(&id).unwrap();
        assert_eq!(*manager.paper(), before);
        // History was reset to one snapshot of the loaded elements.
        assert!(!manager.can_undo());
        assert!(!manager.can_redo());
    }

    #[test]
    fn test_load_missing_id_leaves_state_untouched() {
        let (mut manager, _clock) = manager();
        manager.add_element(rect_at(0.0));
        let before = manager.paper().clone();

        let result = manager.load("nope");
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert_eq!(*manager.paper(), before);
        assert!(manager.can_undo());
    }

    #[test]
    fn test_import_rejects_garbage_without_mutation() {
        let (mut manager, _clock) = manager();
        manager.add_element(rect_at(0.0));
        let before = manager.paper().clone();

        let result = manager.import_from_json("{not json");
        assert!(matches!(result, Err(StoreError::Serialization(_))));
        assert_eq!(*manager.paper(), before);
    }

    #[test]
    fn test_export_import_round_trip_resets_history() {
        let (mut manager, _clock) = manager();
        manager.add_element(rect_at(0.0));
        manager.add_element(rect_at(20.0));
        let before = manager.paper().clone();

        let json = manager.export_to_json().unwrap();
        manager.import_from_json(&json).unwrap();

        assert_eq!(*manager.paper(), before);
        assert!(!manager.can_undo());
        assert!(!manager.can_redo());
    }

    #[test]
    fn test_list_saved_papers_sorted_and_skips_garbage() {
        let (mut manager, clock) = manager();

        manager.new_paper("First");
        manager.add_element(rect_at(0.0));
        manager.save().unwrap();

        clock.advance(10_000);
        manager.new_paper("Second");
        manager.save().unwrap();

        // A corrupt entry must be skipped, not abort the listing.
        manager
            .store
            .set("paper_corrupt", "{broken")
            .unwrap();

        let summaries = manager.list_saved_papers();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "Second");
        assert_eq!(summaries[1].name, "First");
        assert_eq!(summaries[1].element_count, 1);
    }

    #[test]
    fn test_delete_paper() {
        let (mut manager, _clock) = manager();
        manager.save().unwrap();
        let id = manager.paper().id.clone();

        manager.delete_paper(&id).unwrap();
        assert!(manager.list_saved_papers().is_empty());
    }

    #[test]
    fn test_rename_stored_paper() {
        let (mut manager, clock) = manager();
        manager.save().unwrap();
        let id = manager.paper().id.clone();

        clock.advance(100);
        manager.rename_paper(&id, "Renamed").unwrap();

        // Live paper picked up the rename too.
        assert_eq!(manager.paper().name, "Renamed");
        assert_eq!(manager.list_saved_papers()[0].name, "Renamed");

        let result = manager.rename_paper("missing", "x");
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_rename_other_paper_leaves_live_name() {
        let (mut manager, _clock) = manager();
        manager.new_paper("Stored");
        manager.save().unwrap();
        let stored_id = manager.paper().id.clone();

        manager.new_paper("Live");
        manager.rename_paper(&stored_id, "Archived").unwrap();
        assert_eq!(manager.paper().name, "Live");
    }

    #[test]
    fn test_debounced_save_coalesces_burst() {
        let (mut manager, clock) = manager();

        manager.add_element(rect_at(0.0));
        clock.advance(100);
        manager.add_element(rect_at(10.0));
        clock.advance(100);
        manager.add_element(rect_at(20.0));

        // Still inside the quiet period of the last mutation.
        clock.advance(SAVE_DEBOUNCE_MS - 1);
        assert!(!manager.pump_autosave());
        assert!(manager.store().keys().is_empty());

        clock.advance(1);
        assert!(manager.pump_autosave());
        assert!(!manager.save_pending());

        let summaries = manager.list_saved_papers();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].element_count, 3);
    }

    #[test]
    fn test_flush_pending_save_writes_immediately() {
        let (mut manager, _clock) = manager();
        manager.add_element(rect_at(0.0));
        assert!(manager.save_pending());

        manager.flush_pending_save().unwrap();
        assert!(!manager.save_pending());
        assert_eq!(manager.list_saved_papers().len(), 1);
    }

    #[test]
    fn test_load_last_follows_pointer() {
        let (mut manager, _clock) = manager();
        manager.new_paper("Latest");
        manager.save().unwrap();
        let id = manager.paper().id.clone();

        manager.new_paper("Scratch");
        assert_eq!(manager.load_last().as_deref(), Some(id.as_str()));
        assert_eq!(manager.paper().name, "Latest");

        // The pointer key never shows up in listings.
        assert_eq!(manager.list_saved_papers().len(), 1);
    }

    #[test]
    fn test_change_listener_fires_on_mutation() {
        let (mut manager, _clock) = manager();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        manager.set_change_listener(move |paper| {
            sink.borrow_mut().push(paper.element_count());
        });

        manager.add_element(rect_at(0.0));
        manager.add_element(rect_at(10.0));
        manager.undo();

        assert_eq!(*seen.borrow(), vec![1, 2, 1]);
    }

    #[test]
    fn test_new_paper_resets_everything() {
        let (mut manager, _clock) = manager();
        manager.add_element(rect_at(0.0));

        manager.new_paper("Fresh");
        assert!(manager.paper().is_empty());
        assert_eq!(manager.paper().name, "Fresh");
        assert!(!manager.can_undo());
        assert!(!manager.save_pending());
    }
}
