//! Axis-aligned rectangle element.

use kurbo::Rect;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ElementId;

/// A rectangle with non-negative size; `(x, y)` is always the top-left
/// corner regardless of how the drag was performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rectangle {
    pub id: ElementId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: String,
    pub stroke_width: f64,
    pub filled: bool,
}

impl Rectangle {
    /// Create a new outline rectangle with default styling.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            x,
            y,
            width,
            height,
            color: "#1a1a1a".to_string(),
            stroke_width: 2.0,
            filled: false,
        }
    }

    /// Create a rectangle from two drag corners, normalized to a
    /// non-negative size.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(x1.min(x2), y1.min(y2), (x2 - x1).abs(), (y2 - y1).abs())
    }

    /// The rectangle as a kurbo [`Rect`].
    pub fn as_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn bounds(&self) -> Rect {
        self.as_rect()
    }
}
