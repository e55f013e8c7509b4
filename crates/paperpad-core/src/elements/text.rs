//! Single-line text element.

use kurbo::Rect;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ElementId;

/// A single logical line of text placed at a point. Newline-like input
/// starts a new element below instead of wrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Text {
    pub id: ElementId,
    pub x: f64,
    pub y: f64,
    pub content: String,
    pub font_size: f64,
    pub color: String,
    pub font_family: String,
}

impl Text {
    /// Default font size.
    pub const DEFAULT_FONT_SIZE: f64 = 16.0;

    /// Average glyph advance as a fraction of the font size, used for the
    /// approximate bounding box.
    pub const GLYPH_WIDTH_RATIO: f64 = 0.6;

    /// Create a text element with default styling.
    pub fn new(x: f64, y: f64, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            x,
            y,
            content: content.into(),
            font_size: Self::DEFAULT_FONT_SIZE,
            color: "#1a1a1a".to_string(),
            font_family: "sans-serif".to_string(),
        }
    }

    /// Approximate bounding box: character count scaled by the glyph-width
    /// ratio, one font-size tall.
    pub fn bounds(&self) -> Rect {
        let width = self.content.chars().count() as f64 * self.font_size * Self::GLYPH_WIDTH_RATIO;
        Rect::new(self.x, self.y, self.x + width, self.y + self.font_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_approximation() {
        let mut text = Text::new(10.0, 20.0, "hello");
        text.font_size = 10.0;

        let bounds = text.bounds();
        assert_eq!(bounds, Rect::new(10.0, 20.0, 10.0 + 5.0 * 10.0 * 0.6, 30.0));
    }

    #[test]
    fn test_empty_content_has_zero_width() {
        let text = Text::new(0.0, 0.0, "");
        assert_eq!(text.bounds().width(), 0.0);
        assert_eq!(text.bounds().height(), Text::DEFAULT_FONT_SIZE);
    }
}
