//! Device input normalization.
//!
//! Classifies raw pointer contacts by device kind, applies palm rejection
//! while a stylus is in use, and fans normalized gesture events out to
//! subscribers through a typed publish/subscribe bus. This layer knows
//! nothing about tools or documents.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::clock::Clock;
use crate::elements::StrokePoint;

/// Quiet window after pen activity ends during which touch input stays
/// rejected, in milliseconds. Rejects residual palm contact during pen
/// lift-off.
pub const PEN_QUIET_WINDOW_MS: u64 = 500;

/// Raw pointing-device classification as reported by the device surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Mouse,
    Touch,
    Pen,
    /// Stylus contact made with the eraser end.
    EraserTip,
}

impl DeviceKind {
    fn is_pen_family(self) -> bool {
        matches!(self, DeviceKind::Pen | DeviceKind::EraserTip)
    }
}

/// Pointer button reported with a raw contact. For a stylus, `Secondary`
/// is the barrel button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

/// Modifier key state forwarded with keyboard input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// A raw pointer sample from the device surface, in surface-client
/// coordinates.
#[derive(Debug, Clone, Copy)]
pub struct PointerInput {
    pub device: DeviceKind,
    pub x: f64,
    pub y: f64,
    pub button: PointerButton,
    /// Device pressure in [0,1]; `None` for devices without pressure
    /// sensing.
    pub pressure: Option<f64>,
}

impl PointerInput {
    pub fn new(device: DeviceKind, x: f64, y: f64) -> Self {
        Self {
            device,
            x,
            y,
            button: PointerButton::Primary,
            pressure: None,
        }
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_pressure(mut self, pressure: f64) -> Self {
        self.pressure = Some(pressure);
        self
    }
}

/// Tool suggestion derived from stylus hardware signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenButtonHint {
    Pen,
    Eraser,
}

/// Shared prevent-default flag attached to forwarded key events, standing
/// in for the surface's own default-action suppression.
#[derive(Debug, Clone, Default)]
pub struct PreventDefault(Rc<Cell<bool>>);

impl PreventDefault {
    pub fn prevent(&self) {
        self.0.set(true);
    }

    pub fn is_prevented(&self) -> bool {
        self.0.get()
    }
}

/// Keyboard input forwarded verbatim from the device surface.
#[derive(Debug, Clone)]
pub struct KeyEvent {
    pub key: String,
    pub code: String,
    pub modifiers: Modifiers,
    pub prevent_default: PreventDefault,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, code: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            code: code.into(),
            modifiers,
            prevent_default: PreventDefault::default(),
        }
    }

    /// True for a single printable character with no control/command
    /// modifier held.
    pub fn is_printable(&self) -> bool {
        !self.modifiers.ctrl && !self.modifiers.meta && self.key.chars().count() == 1
    }
}

/// A normalized gesture event emitted to subscribers.
#[derive(Debug, Clone)]
pub enum GestureEvent {
    StrokeStart { point: StrokePoint },
    StrokeMove { point: StrokePoint },
    StrokeEnd { point: StrokePoint },
    /// A plain tap with no drag, at the release coordinates.
    Click { x: f64, y: f64 },
    Key(KeyEvent),
    PenButton { hint: PenButtonHint },
    PenActive { active: bool },
}

impl GestureEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GestureEvent::StrokeStart { .. } => EventKind::StrokeStart,
            GestureEvent::StrokeMove { .. } => EventKind::StrokeMove,
            GestureEvent::StrokeEnd { .. } => EventKind::StrokeEnd,
            GestureEvent::Click { .. } => EventKind::Click,
            GestureEvent::Key(_) => EventKind::Key,
            GestureEvent::PenButton { .. } => EventKind::PenButton,
            GestureEvent::PenActive { .. } => EventKind::PenActive,
        }
    }
}

/// Subscription key for the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StrokeStart,
    StrokeMove,
    StrokeEnd,
    Click,
    Key,
    PenButton,
    PenActive,
}

impl EventKind {
    /// Every event kind the normalizer emits.
    pub fn all() -> [EventKind; 7] {
        [
            EventKind::StrokeStart,
            EventKind::StrokeMove,
            EventKind::StrokeEnd,
            EventKind::Click,
            EventKind::Key,
            EventKind::PenButton,
            EventKind::PenActive,
        ]
    }
}

/// Handle returned by [`InputNormalizer::on`]; pass back to
/// [`InputNormalizer::off`] to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

type Handler = Box<dyn FnMut(&GestureEvent)>;

struct OpenGesture {
    device: DeviceKind,
    start: (f64, f64),
    last: StrokePoint,
    moved: bool,
}

/// Turns raw device events into normalized gesture events.
pub struct InputNormalizer {
    clock: Rc<dyn Clock>,
    listeners: HashMap<EventKind, Vec<(u64, Handler)>>,
    next_listener_id: u64,
    attached: bool,
    surface_origin: (f64, f64),
    gesture: Option<OpenGesture>,
    pen_active: bool,
    last_pen_up_ms: Option<u64>,
}

impl fmt::Debug for InputNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputNormalizer")
            .field("attached", &self.attached)
            .field("pen_active", &self.pen_active)
            .field("drawing", &self.gesture.is_some())
            .finish_non_exhaustive()
    }
}

impl InputNormalizer {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            listeners: HashMap::new(),
            next_listener_id: 0,
            attached: false,
            surface_origin: (0.0, 0.0),
            gesture: None,
            pen_active: false,
            last_pen_up_ms: None,
        }
    }

    /// Subscribe to one event kind.
    pub fn on(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&GestureEvent) + 'static,
    ) -> Subscription {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners
            .entry(kind)
            .or_default()
            .push((id, Box::new(handler)));
        Subscription { kind, id }
    }

    /// Drop a subscription. Unknown handles are ignored.
    pub fn off(&mut self, subscription: Subscription) {
        if let Some(handlers) = self.listeners.get_mut(&subscription.kind) {
            handlers.retain(|(id, _)| *id != subscription.id);
        }
    }

    /// Begin processing device events.
    pub fn attach(&mut self) {
        self.attached = true;
    }

    /// Stop processing device events and discard any open gesture and pen
    /// state without emitting.
    pub fn detach(&mut self) {
        self.attached = false;
        self.gesture = None;
        self.pen_active = false;
        self.last_pen_up_ms = None;
    }

    /// Whether a gesture is currently open.
    pub fn is_drawing(&self) -> bool {
        self.gesture.is_some()
    }

    /// Whether a stylus is currently in contact.
    pub fn is_pen_active(&self) -> bool {
        self.pen_active
    }

    /// Origin of the drawing surface in surface-client coordinates;
    /// emitted coordinates are relative to it.
    pub fn set_surface_origin(&mut self, x: f64, y: f64) {
        self.surface_origin = (x, y);
    }

    pub fn pointer_down(&mut self, input: PointerInput) {
        if !self.attached {
            return;
        }
        let now = self.clock.now_ms();
        let point = self.local_point(&input);

        if input.device.is_pen_family() && !self.pen_active {
            self.pen_active = true;
            self.emit(GestureEvent::PenActive { active: true });
        }

        match input.device {
            DeviceKind::EraserTip => {
                self.emit(GestureEvent::PenButton {
                    hint: PenButtonHint::Eraser,
                });
                return;
            }
            DeviceKind::Pen if input.button == PointerButton::Secondary => {
                // Barrel button press is a hint only, never a stroke.
                self.emit(GestureEvent::PenButton {
                    hint: PenButtonHint::Pen,
                });
                return;
            }
            DeviceKind::Touch => {
                if self.pen_active {
                    log::debug!("palm rejection: touch contact while pen active");
                    return;
                }
                if self.in_pen_quiet_window(now) {
                    log::debug!("palm rejection: touch contact within pen quiet window");
                    return;
                }
            }
            DeviceKind::Mouse if input.button != PointerButton::Primary => return,
            _ => {}
        }

        if self.gesture.is_some() {
            return;
        }
        self.gesture = Some(OpenGesture {
            device: input.device,
            start: (point.x, point.y),
            last: point,
            moved: false,
        });
        self.emit(GestureEvent::StrokeStart { point });
    }

    pub fn pointer_move(&mut self, input: PointerInput) {
        if !self.attached {
            return;
        }
        if input.device == DeviceKind::Touch && self.pen_active {
            return;
        }
        let point = self.local_point(&input);

        let mut forward = false;
        if let Some(gesture) = self.gesture.as_mut() {
            if gesture.device == input.device {
                if (point.x, point.y) != gesture.start {
                    gesture.moved = true;
                }
                gesture.last = point;
                forward = true;
            }
        }
        if forward {
            self.emit(GestureEvent::StrokeMove { point });
        }
    }

    pub fn pointer_up(&mut self, input: PointerInput) {
        if !self.attached {
            return;
        }
        let now = self.clock.now_ms();
        let point = self.local_point(&input);

        if input.device.is_pen_family() && self.pen_active {
            self.pen_active = false;
            self.last_pen_up_ms = Some(now);
            self.emit(GestureEvent::PenActive { active: false });
        }

        let Some(gesture) = self.gesture.take_if(|g| g.device == input.device) else {
            return;
        };

        if input.device == DeviceKind::Touch && (self.pen_active || self.in_pen_quiet_window(now)) {
            log::debug!("palm rejection: touch release during or just after pen activity");
            return;
        }

        self.emit(GestureEvent::StrokeEnd { point });
        if !gesture.moved {
            self.emit(GestureEvent::Click {
                x: point.x,
                y: point.y,
            });
        }
    }

    /// The pointer left the surface; an open gesture ends at its last
    /// known point, with no click.
    pub fn pointer_leave(&mut self) {
        if !self.attached {
            return;
        }
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        self.emit(GestureEvent::StrokeEnd {
            point: gesture.last,
        });
    }

    /// Forward a key event. Returns whether a subscriber requested the
    /// surface's default action be prevented.
    pub fn key_down(&mut self, event: KeyEvent) -> bool {
        if !self.attached {
            return false;
        }
        let prevented = event.prevent_default.clone();
        self.emit(GestureEvent::Key(event));
        prevented.is_prevented()
    }

    fn emit(&mut self, event: GestureEvent) {
        let kind = event.kind();
        let Some(mut handlers) = self.listeners.remove(&kind) else {
            return;
        };
        for (_, handler) in handlers.iter_mut() {
            handler(&event);
        }
        // Merge back anything subscribed for this kind during dispatch.
        if let Some(added) = self.listeners.remove(&kind) {
            handlers.extend(added);
        }
        self.listeners.insert(kind, handlers);
    }

    fn local_point(&self, input: &PointerInput) -> StrokePoint {
        StrokePoint::new(
            input.x - self.surface_origin.0,
            input.y - self.surface_origin.1,
            input
                .pressure
                .unwrap_or(StrokePoint::DEFAULT_PRESSURE)
                .clamp(0.0, 1.0),
        )
    }

    fn in_pen_quiet_window(&self, now: u64) -> bool {
        self.last_pen_up_ms
            .is_some_and(|t| now.saturating_sub(t) < PEN_QUIET_WINDOW_MS)
    }
}
