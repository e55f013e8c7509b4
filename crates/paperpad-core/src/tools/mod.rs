//! Tool state machine.
//!
//! Holds the active tool and its single in-flight interaction, turning
//! normalized gestures into live previews and, on completion, committed
//! elements or erase requests. Consumes only the input layer's event
//! vocabulary.

use kurbo::Rect;

use crate::elements::{Element, EraseRequest, Rectangle, Stroke, StrokePoint, Text};
use crate::input::KeyEvent;

/// Minimum drag extent, exclusive, below which rectangle and eraser drags
/// are discarded.
pub const MIN_DRAG_SIZE: f64 = 2.0;

/// Vertical gap between consecutive text lines started with Enter.
pub const TEXT_LINE_GAP: f64 = 4.0;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToolKind {
    #[default]
    Pen,
    Eraser,
    Rectangle,
    Text,
}

impl ToolKind {
    /// Parse a user-facing tool name; unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pen" => Some(ToolKind::Pen),
            "eraser" => Some(ToolKind::Eraser),
            "rectangle" => Some(ToolKind::Rectangle),
            "text" => Some(ToolKind::Text),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Pen => "pen",
            ToolKind::Eraser => "eraser",
            ToolKind::Rectangle => "rectangle",
            ToolKind::Text => "text",
        }
    }
}

/// Settings applied to newly committed elements.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    pub color: String,
    pub stroke_width: f64,
    pub fill_rectangles: bool,
    pub font_size: f64,
    pub font_family: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            color: "#1a1a1a".to_string(),
            stroke_width: 2.0,
            fill_rectangles: false,
            font_size: Text::DEFAULT_FONT_SIZE,
            font_family: "sans-serif".to_string(),
        }
    }
}

/// The single in-flight interaction owned by the active tool.
#[derive(Debug, Clone, Default)]
enum Flight {
    #[default]
    Idle,
    Stroke {
        points: Vec<StrokePoint>,
    },
    RectDrag {
        origin: (f64, f64),
        current: (f64, f64),
    },
    EraseDrag {
        origin: (f64, f64),
        current: (f64, f64),
    },
    Caret {
        x: f64,
        y: f64,
        buffer: String,
    },
}

/// A finished interaction handed to the document manager.
#[derive(Debug, Clone, PartialEq)]
pub enum Commit {
    Element(Element),
    Erase(EraseRequest),
}

/// Live feedback payload for the renderer. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    Stroke {
        points: Vec<StrokePoint>,
        color: String,
        width: f64,
    },
    Rectangle {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: String,
        stroke_width: f64,
        filled: bool,
    },
    /// Selection highlight for an eraser drag, distinct in kind from the
    /// rectangle-tool preview.
    EraserSelection {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    TextCursor {
        x: f64,
        y: f64,
        font_size: f64,
    },
    TextPreview {
        x: f64,
        y: f64,
        content: String,
        font_size: f64,
        color: String,
        font_family: String,
    },
}

/// Result of offering a key event to the tool state machine. An unhandled
/// key may be interpreted by an outer layer, e.g. as a shortcut.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyOutcome {
    pub handled: bool,
    pub commit: Option<Commit>,
}

/// Manages the current tool and its in-flight state.
#[derive(Debug, Clone)]
pub struct ToolManager {
    /// Currently selected tool.
    pub current_tool: ToolKind,
    /// Settings stamped onto committed elements.
    pub settings: ToolSettings,
    flight: Flight,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self {
            current_tool: ToolKind::default(),
            settings: ToolSettings::default(),
            flight: Flight::Idle,
        }
    }
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a gesture or caret is currently open.
    pub fn is_active(&self) -> bool {
        !matches!(self.flight, Flight::Idle)
    }

    /// Switch tools, force-finalizing whatever the previous tool left
    /// open: pending text commits, in-progress strokes and drags are
    /// discarded.
    pub fn set_tool(&mut self, tool: ToolKind) -> Option<Commit> {
        let commit = self.finalize();
        self.current_tool = tool;
        commit
    }

    /// Tool switching by user-facing name; unknown names are ignored with
    /// no state change.
    pub fn set_tool_by_name(&mut self, name: &str) -> Option<Commit> {
        match ToolKind::from_name(name) {
            Some(tool) => self.set_tool(tool),
            None => {
                log::debug!("ignoring unknown tool name {name:?}");
                None
            }
        }
    }

    /// Flush the in-flight state. Non-empty pending text commits;
    /// everything else is dropped without committing.
    pub fn finalize(&mut self) -> Option<Commit> {
        match std::mem::take(&mut self.flight) {
            Flight::Caret { x, y, buffer } if !buffer.is_empty() => {
                Some(Commit::Element(self.make_text(x, y, buffer)))
            }
            _ => None,
        }
    }

    /// A gesture opened on the surface.
    pub fn gesture_start(&mut self, point: StrokePoint) {
        match self.current_tool {
            ToolKind::Pen => {
                self.flight = Flight::Stroke {
                    points: vec![point],
                };
            }
            ToolKind::Rectangle => {
                self.flight = Flight::RectDrag {
                    origin: (point.x, point.y),
                    current: (point.x, point.y),
                };
            }
            ToolKind::Eraser => {
                self.flight = Flight::EraseDrag {
                    origin: (point.x, point.y),
                    current: (point.x, point.y),
                };
            }
            // The text tool reacts to clicks, not drags.
            ToolKind::Text => {}
        }
    }

    /// The open gesture moved.
    pub fn gesture_move(&mut self, point: StrokePoint) {
        match &mut self.flight {
            Flight::Stroke { points } => points.push(point),
            Flight::RectDrag { current, .. } | Flight::EraseDrag { current, .. } => {
                *current = (point.x, point.y);
            }
            Flight::Idle | Flight::Caret { .. } => {}
        }
    }

    /// The open gesture ended; returns the finished interaction, if any.
    pub fn gesture_end(&mut self, point: StrokePoint) -> Option<Commit> {
        match &self.flight {
            Flight::Stroke { .. } | Flight::RectDrag { .. } | Flight::EraseDrag { .. } => {}
            Flight::Idle | Flight::Caret { .. } => return None,
        }

        match std::mem::take(&mut self.flight) {
            Flight::Stroke { mut points } => {
                // Even degenerate strokes commit; there is no minimum
                // length for pen input.
                points.push(point);
                Some(Commit::Element(Element::Stroke(Stroke::new(
                    points,
                    self.settings.color.clone(),
                    self.settings.stroke_width,
                ))))
            }
            Flight::RectDrag { origin, .. } => {
                let (x, y, width, height) = normalized_rect(origin, (point.x, point.y));
                if width > MIN_DRAG_SIZE && height > MIN_DRAG_SIZE {
                    let mut rect = Rectangle::new(x, y, width, height);
                    rect.color = self.settings.color.clone();
                    rect.stroke_width = self.settings.stroke_width;
                    rect.filled = self.settings.fill_rectangles;
                    Some(Commit::Element(Element::Rectangle(rect)))
                } else {
                    None
                }
            }
            Flight::EraseDrag { origin, .. } => {
                let (x, y, width, height) = normalized_rect(origin, (point.x, point.y));
                if width > MIN_DRAG_SIZE && height > MIN_DRAG_SIZE {
                    Some(Commit::Erase(EraseRequest {
                        rect: Rect::new(x, y, x + width, y + height),
                    }))
                } else {
                    None
                }
            }
            Flight::Idle | Flight::Caret { .. } => None,
        }
    }

    /// A tap on the surface. For the text tool this places or relocates
    /// the caret, flushing any pending text first.
    pub fn click(&mut self, x: f64, y: f64) -> Option<Commit> {
        if self.current_tool != ToolKind::Text {
            return None;
        }
        let commit = self.finalize();
        self.flight = Flight::Caret {
            x,
            y,
            buffer: String::new(),
        };
        commit
    }

    /// Offer a key event to the open text caret.
    pub fn handle_key(&mut self, event: &KeyEvent) -> KeyOutcome {
        if !matches!(self.flight, Flight::Caret { .. }) {
            return KeyOutcome::default();
        }
        let Flight::Caret { x, y, mut buffer } = std::mem::take(&mut self.flight) else {
            return KeyOutcome::default();
        };

        match event.key.as_str() {
            "Escape" => {
                let commit =
                    (!buffer.is_empty()).then(|| Commit::Element(self.make_text(x, y, buffer)));
                KeyOutcome {
                    handled: true,
                    commit,
                }
            }
            "Enter" => {
                let commit = (!buffer.is_empty())
                    .then(|| Commit::Element(self.make_text(x, y, std::mem::take(&mut buffer))));
                self.flight = Flight::Caret {
                    x,
                    y: y + self.settings.font_size + TEXT_LINE_GAP,
                    buffer: String::new(),
                };
                KeyOutcome {
                    handled: true,
                    commit,
                }
            }
            "Backspace" => {
                buffer.pop();
                self.flight = Flight::Caret { x, y, buffer };
                KeyOutcome {
                    handled: true,
                    commit: None,
                }
            }
            _ if event.is_printable() => {
                buffer.push_str(&event.key);
                self.flight = Flight::Caret { x, y, buffer };
                KeyOutcome {
                    handled: true,
                    commit: None,
                }
            }
            _ => {
                self.flight = Flight::Caret { x, y, buffer };
                KeyOutcome::default()
            }
        }
    }

    /// The live-feedback payload for the in-flight state, if any. A
    /// freshly opened caret yields a text cursor immediately.
    pub fn active_preview(&self) -> Option<Preview> {
        match &self.flight {
            Flight::Idle => None,
            Flight::Stroke { points } => Some(Preview::Stroke {
                points: points.clone(),
                color: self.settings.color.clone(),
                width: self.settings.stroke_width,
            }),
            Flight::RectDrag { origin, current } => {
                let (x, y, width, height) = normalized_rect(*origin, *current);
                Some(Preview::Rectangle {
                    x,
                    y,
                    width,
                    height,
                    color: self.settings.color.clone(),
                    stroke_width: self.settings.stroke_width,
                    filled: self.settings.fill_rectangles,
                })
            }
            Flight::EraseDrag { origin, current } => {
                let (x, y, width, height) = normalized_rect(*origin, *current);
                Some(Preview::EraserSelection {
                    x,
                    y,
                    width,
                    height,
                })
            }
            Flight::Caret { x, y, buffer } if buffer.is_empty() => Some(Preview::TextCursor {
                x: *x,
                y: *y,
                font_size: self.settings.font_size,
            }),
            Flight::Caret { x, y, buffer } => Some(Preview::TextPreview {
                x: *x,
                y: *y,
                content: buffer.clone(),
                font_size: self.settings.font_size,
                color: self.settings.color.clone(),
                font_family: self.settings.font_family.clone(),
            }),
        }
    }

    fn make_text(&self, x: f64, y: f64, content: String) -> Element {
        let mut text = Text::new(x, y, content);
        text.font_size = self.settings.font_size;
        text.color = self.settings.color.clone();
        text.font_family = self.settings.font_family.clone();
        Element::Text(text)
    }
}

/// Top-left corner and non-negative size from two drag corners.
fn normalized_rect(a: (f64, f64), b: (f64, f64)) -> (f64, f64, f64, f64) {
    (a.0.min(b.0), a.1.min(b.1), (b.0 - a.0).abs(), (b.1 - a.1).abs())
}
