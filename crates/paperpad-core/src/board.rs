//! Top-level wiring of the input normalizer, tool state machine, and
//! document manager.
//!
//! Raw device events flow in, normalized gestures are routed to the active
//! tool, finished interactions land in the document manager, and the
//! renderer is driven after every commit and preview change. Keys the tool
//! state machine leaves unhandled fall through to the shortcut layer.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::clock::Clock;
use crate::input::{
    EventKind, GestureEvent, InputNormalizer, KeyEvent, PenButtonHint, PointerInput,
};
use crate::manager::PaperManager;
use crate::render::Renderer;
use crate::storage::{KeyValueStore, StoreResult};
use crate::tools::{Commit, ToolKind, ToolManager};

/// A drawing surface session: one normalizer, one tool set, one live
/// paper, one renderer.
pub struct Board<S: KeyValueStore, R: Renderer> {
    input: InputNormalizer,
    tools: ToolManager,
    papers: PaperManager<S>,
    renderer: R,
    pending: Rc<RefCell<VecDeque<GestureEvent>>>,
}

impl<S: KeyValueStore, R: Renderer> Board<S, R> {
    pub fn new(store: S, renderer: R, clock: Rc<dyn Clock>) -> Self {
        let mut input = InputNormalizer::new(clock.clone());
        let pending: Rc<RefCell<VecDeque<GestureEvent>>> = Rc::default();
        for kind in EventKind::all() {
            let queue = pending.clone();
            input.on(kind, move |event| {
                queue.borrow_mut().push_back(event.clone());
            });
        }
        input.attach();

        Self {
            input,
            tools: ToolManager::new(),
            papers: PaperManager::new(store, clock),
            renderer,
            pending,
        }
    }

    // -- device feed --------------------------------------------------------

    pub fn pointer_down(&mut self, raw: PointerInput) {
        self.input.pointer_down(raw);
        self.drain();
    }

    pub fn pointer_move(&mut self, raw: PointerInput) {
        self.input.pointer_move(raw);
        self.drain();
    }

    pub fn pointer_up(&mut self, raw: PointerInput) {
        self.input.pointer_up(raw);
        self.drain();
    }

    pub fn pointer_leave(&mut self) {
        self.input.pointer_leave();
        self.drain();
    }

    /// Feed a key event; returns whether the surface's default action
    /// should be prevented.
    pub fn key_down(&mut self, event: KeyEvent) -> bool {
        let prevented = event.prevent_default.clone();
        self.input.key_down(event);
        self.drain();
        prevented.is_prevented()
    }

    // -- session operations --------------------------------------------------

    /// Switch tools, committing whatever the previous tool had pending.
    pub fn set_tool(&mut self, tool: ToolKind) {
        let commit = self.tools.set_tool(tool);
        self.apply(commit);
        self.draw_preview();
    }

    /// Tool switching by user-facing name; unknown names are ignored.
    pub fn set_tool_by_name(&mut self, name: &str) {
        let commit = self.tools.set_tool_by_name(name);
        self.apply(commit);
        self.draw_preview();
    }

    pub fn undo(&mut self) -> bool {
        let moved = self.papers.undo();
        if moved {
            self.render();
        }
        moved
    }

    pub fn redo(&mut self) -> bool {
        let moved = self.papers.redo();
        if moved {
            self.render();
        }
        moved
    }

    pub fn new_paper(&mut self, name: &str) {
        self.flush_tools();
        self.papers.new_paper(name);
        self.render();
    }

    pub fn load(&mut self, id: &str) -> StoreResult<()> {
        self.flush_tools();
        self.papers.load(id)?;
        self.render();
        Ok(())
    }

    /// Drive the debounced autosave; call periodically from the embedder's
    /// event loop.
    pub fn pump_autosave(&mut self) -> bool {
        self.papers.pump_autosave()
    }

    // -- component access ----------------------------------------------------

    pub fn input(&self) -> &InputNormalizer {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputNormalizer {
        &mut self.input
    }

    pub fn tools(&self) -> &ToolManager {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolManager {
        &mut self.tools
    }

    pub fn papers(&self) -> &PaperManager<S> {
        &self.papers
    }

    pub fn papers_mut(&mut self) -> &mut PaperManager<S> {
        &mut self.papers
    }

    // -- routing -------------------------------------------------------------

    fn drain(&mut self) {
        loop {
            let event = self.pending.borrow_mut().pop_front();
            match event {
                Some(event) => self.route(event),
                None => break,
            }
        }
    }

    fn route(&mut self, event: GestureEvent) {
        match event {
            GestureEvent::StrokeStart { point } => {
                self.tools.gesture_start(point);
                self.draw_preview();
            }
            GestureEvent::StrokeMove { point } => {
                self.tools.gesture_move(point);
                self.draw_preview();
            }
            GestureEvent::StrokeEnd { point } => {
                let commit = self.tools.gesture_end(point);
                self.apply(commit);
                self.draw_preview();
            }
            GestureEvent::Click { x, y } => {
                let commit = self.tools.click(x, y);
                self.apply(commit);
                self.draw_preview();
            }
            GestureEvent::Key(key) => {
                let outcome = self.tools.handle_key(&key);
                if outcome.handled {
                    key.prevent_default.prevent();
                } else {
                    self.handle_shortcut(&key);
                }
                self.apply(outcome.commit);
                self.draw_preview();
            }
            GestureEvent::PenButton { hint } => {
                let tool = match hint {
                    PenButtonHint::Pen => ToolKind::Pen,
                    PenButtonHint::Eraser => ToolKind::Eraser,
                };
                self.set_tool(tool);
            }
            GestureEvent::PenActive { .. } => {}
        }
    }

    fn apply(&mut self, commit: Option<Commit>) {
        match commit {
            Some(Commit::Element(element)) => {
                self.papers.add_element(element);
                self.render();
            }
            Some(Commit::Erase(request)) => {
                if self.papers.erase_in_rect(request.rect) {
                    self.render();
                }
            }
            None => {}
        }
    }

    /// Keys the tool state machine did not consume.
    fn handle_shortcut(&mut self, key: &KeyEvent) {
        let modifiers = key.modifiers;
        if modifiers.ctrl || modifiers.meta {
            match key.key.as_str() {
                "z" | "Z" if modifiers.shift => {
                    self.redo();
                    key.prevent_default.prevent();
                }
                "z" | "Z" => {
                    self.undo();
                    key.prevent_default.prevent();
                }
                "y" | "Y" => {
                    self.redo();
                    key.prevent_default.prevent();
                }
                _ => {}
            }
        } else {
            match key.key.as_str() {
                "p" => self.set_tool(ToolKind::Pen),
                "e" => self.set_tool(ToolKind::Eraser),
                "r" => self.set_tool(ToolKind::Rectangle),
                "t" => self.set_tool(ToolKind::Text),
                _ => {}
            }
        }
    }

    fn flush_tools(&mut self) {
        let commit = self.tools.finalize();
        self.apply(commit);
        self.draw_preview();
    }

    fn draw_preview(&mut self) {
        match self.tools.active_preview() {
            Some(preview) => self.renderer.draw_preview(&preview),
            None => self.renderer.clear_preview(),
        }
    }

    fn render(&mut self) {
        self.renderer.render(self.papers.paper());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::elements::Element;
    use crate::input::{DeviceKind, Modifiers};
    use crate::paper::Paper;
    use crate::storage::MemoryStore;
    use crate::tools::Preview;

    /// Counts renderer calls and remembers the last preview kind.
    #[derive(Default)]
    struct RecordingRenderer {
        renders: Rc<RefCell<usize>>,
        previews: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Renderer for RecordingRenderer {
        fn render(&mut self, _paper: &Paper) {
            *self.renders.borrow_mut() += 1;
        }

        fn draw_preview(&mut self, preview: &Preview) {
            let kind = match preview {
                Preview::Stroke { .. } => "stroke",
                Preview::Rectangle { .. } => "rectangle",
                Preview::EraserSelection { .. } => "eraser",
                Preview::TextCursor { .. } => "cursor",
                Preview::TextPreview { .. } => "text",
            };
            self.previews.borrow_mut().push(kind);
        }
    }

    fn board() -> (
        Board<MemoryStore, RecordingRenderer>,
        Rc<ManualClock>,
        Rc<RefCell<usize>>,
        Rc<RefCell<Vec<&'static str>>>,
    ) {
        let clock = Rc::new(ManualClock::new(0));
        let renderer = RecordingRenderer::default();
        let renders = renderer.renders.clone();
        let previews = renderer.previews.clone();
        let board = Board::new(MemoryStore::new(), renderer, clock.clone());
        (board, clock, renders, previews)
    }

    fn mouse(x: f64, y: f64) -> PointerInput {
        PointerInput::new(DeviceKind::Mouse, x, y)
    }

    fn key(name: &str) -> KeyEvent {
        KeyEvent::new(name, name, Modifiers::default())
    }

    #[test]
    fn test_mouse_drag_commits_stroke_and_renders() {
        let (mut board, _clock, renders, previews) = board();

        board.pointer_down(mouse(0.0, 0.0));
        board.pointer_move(mouse(10.0, 10.0));
        board.pointer_up(mouse(20.0, 20.0));

        let paper = board.papers().paper();
        assert_eq!(paper.element_count(), 1);
        assert!(matches!(paper.elements[0], Element::Stroke(_)));
        assert_eq!(*renders.borrow(), 1);
        assert!(previews.borrow().contains(&"stroke"));
    }

    #[test]
    fn test_rectangle_drag_commits_normalized_rect() {
        let (mut board, _clock, _renders, _previews) = board();
        board.set_tool(ToolKind::Rectangle);

        board.pointer_down(mouse(50.0, 50.0));
        board.pointer_move(mouse(10.0, 20.0));
        board.pointer_up(mouse(10.0, 20.0));

        match &board.papers().paper().elements[0] {
            Element::Rectangle(rect) => {
                assert_eq!((rect.x, rect.y), (10.0, 20.0));
                assert_eq!((rect.width, rect.height), (40.0, 30.0));
            }
            other => panic!("expected rectangle, got {other:?}"),
        }
    }

    #[test]
    fn test_eraser_drag_erases_contained_element() {
        let (mut board, _clock, _renders, _previews) = board();

        board.set_tool(ToolKind::Rectangle);
        board.pointer_down(mouse(10.0, 10.0));
        board.pointer_move(mouse(15.0, 15.0));
        board.pointer_up(mouse(15.0, 15.0));
        assert_eq!(board.papers().paper().element_count(), 1);

        board.set_tool(ToolKind::Eraser);
        board.pointer_down(mouse(0.0, 0.0));
        board.pointer_move(mouse(100.0, 100.0));
        board.pointer_up(mouse(100.0, 100.0));

        assert!(board.papers().paper().is_empty());
    }

    #[test]
    fn test_text_tap_type_escape_commits() {
        let (mut board, _clock, _renders, previews) = board();
        board.set_tool(ToolKind::Text);

        board.pointer_down(mouse(30.0, 40.0));
        board.pointer_up(mouse(30.0, 40.0));
        assert!(previews.borrow().contains(&"cursor"));

        assert!(board.key_down(key("h")));
        assert!(board.key_down(key("i")));
        assert!(previews.borrow().contains(&"text"));
        assert!(board.key_down(key("Escape")));

        match &board.papers().paper().elements[0] {
            Element::Text(text) => {
                assert_eq!(text.content, "hi");
                assert_eq!((text.x, text.y), (30.0, 40.0));
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_tool_switch_flushes_pending_text() {
        let (mut board, _clock, _renders, _previews) = board();
        board.set_tool(ToolKind::Text);

        board.pointer_down(mouse(0.0, 0.0));
        board.pointer_up(mouse(0.0, 0.0));
        board.key_down(key("h"));
        board.key_down(key("i"));

        board.set_tool(ToolKind::Pen);

        let paper = board.papers().paper();
        assert_eq!(paper.element_count(), 1);
        assert!(
            matches!(&paper.elements[0], Element::Text(text) if text.content == "hi")
        );
    }

    #[test]
    fn test_unhandled_keys_fall_through_to_shortcuts() {
        let (mut board, _clock, _renders, _previews) = board();

        board.pointer_down(mouse(0.0, 0.0));
        board.pointer_up(mouse(5.0, 5.0));
        assert_eq!(board.papers().paper().element_count(), 1);

        let mut undo = key("z");
        undo.modifiers.ctrl = true;
        assert!(board.key_down(undo));
        assert!(board.papers().paper().is_empty());

        let mut redo = key("y");
        redo.modifiers.ctrl = true;
        assert!(board.key_down(redo));
        assert_eq!(board.papers().paper().element_count(), 1);

        board.key_down(key("r"));
        assert_eq!(board.tools().current_tool, ToolKind::Rectangle);
    }

    #[test]
    fn test_unknown_key_is_not_consumed() {
        let (mut board, _clock, _renders, _previews) = board();
        assert!(!board.key_down(key("F5")));
    }

    #[test]
    fn test_pen_button_hint_switches_tool() {
        let (mut board, _clock, _renders, _previews) = board();

        board.pointer_down(PointerInput::new(DeviceKind::EraserTip, 0.0, 0.0));
        assert_eq!(board.tools().current_tool, ToolKind::Eraser);
        board.pointer_up(PointerInput::new(DeviceKind::EraserTip, 0.0, 0.0));
    }

    #[test]
    fn test_palm_touch_leaves_document_untouched() {
        let (mut board, _clock, _renders, _previews) = board();

        board.pointer_down(PointerInput::new(DeviceKind::Pen, 0.0, 0.0));
        board.pointer_down(PointerInput::new(DeviceKind::Touch, 80.0, 80.0));
        board.pointer_move(PointerInput::new(DeviceKind::Touch, 90.0, 90.0));
        board.pointer_up(PointerInput::new(DeviceKind::Touch, 90.0, 90.0));
        board.pointer_up(PointerInput::new(DeviceKind::Pen, 50.0, 50.0));

        // Only the pen stroke landed.
        let paper = board.papers().paper();
        assert_eq!(paper.element_count(), 1);
        match &paper.elements[0] {
            Element::Stroke(stroke) => {
                assert!(stroke.points.iter().all(|p| p.x <= 50.0));
            }
            other => panic!("expected stroke, got {other:?}"),
        }
    }

    #[test]
    fn test_autosave_fires_after_quiet_period() {
        let (mut board, clock, _renders, _previews) = board();

        board.pointer_down(mouse(0.0, 0.0));
        board.pointer_up(mouse(5.0, 5.0));

        assert!(!board.pump_autosave());
        clock.advance(500);
        assert!(board.pump_autosave());
        assert_eq!(board.papers().list_saved_papers().len(), 1);
    }
}
