//! Drawing element definitions.

mod rectangle;
mod stroke;
mod text;

pub use rectangle::Rectangle;
pub use stroke::{Stroke, StrokeErase, StrokePoint};
pub use text::Text;

use kurbo::Rect;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique element identifier.
pub type ElementId = Uuid;

/// A committed drawing element.
///
/// Serialized structurally: each variant carries a distinct field set, so
/// the wire format needs no discriminant tag and round-trips with no
/// extraneous fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Element {
    Stroke(Stroke),
    Rectangle(Rectangle),
    Text(Text),
}

impl Element {
    /// This element's identity.
    pub fn id(&self) -> ElementId {
        match self {
            Element::Stroke(s) => s.id,
            Element::Rectangle(r) => r.id,
            Element::Text(t) => t.id,
        }
    }

    /// Axis-aligned bounding box.
    pub fn bounds(&self) -> Rect {
        match self {
            Element::Stroke(s) => s.bounds(),
            Element::Rectangle(r) => r.bounds(),
            Element::Text(t) => t.bounds(),
        }
    }
}

/// One-shot erase command produced by the eraser tool and consumed once by
/// the document manager. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EraseRequest {
    pub rect: Rect,
}

/// Point-in-rect test inclusive of all four edges.
pub(crate) fn rect_contains_inclusive(rect: &Rect, x: f64, y: f64) -> bool {
    x >= rect.x0 && x <= rect.x1 && y >= rect.y0 && y <= rect.y1
}

/// True when `inner` lies entirely within `outer`, edges included.
pub(crate) fn rect_fully_contains(outer: &Rect, inner: &Rect) -> bool {
    inner.x0 >= outer.x0 && inner.y0 >= outer.y0 && inner.x1 <= outer.x1 && inner.y1 <= outer.y1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_dispatch() {
        let stroke = Stroke::new(
            vec![StrokePoint::plain(0.0, 0.0), StrokePoint::plain(10.0, 5.0)],
            "#000000",
            2.0,
        );
        let id = stroke.id;
        let element = Element::Stroke(stroke);

        assert_eq!(element.id(), id);
        assert_eq!(element.bounds(), Rect::new(0.0, 0.0, 10.0, 5.0));
    }

    #[test]
    fn test_untagged_serialization_round_trip() {
        let elements = vec![
            Element::Stroke(Stroke::new(
                vec![StrokePoint::plain(1.0, 2.0), StrokePoint::plain(3.0, 4.0)],
                "#ff0000",
                3.0,
            )),
            Element::Rectangle(Rectangle::new(5.0, 6.0, 20.0, 10.0)),
            Element::Text(Text::new(7.0, 8.0, "hello")),
        ];

        let json = serde_json::to_string(&elements).unwrap();
        let back: Vec<Element> = serde_json::from_str(&json).unwrap();
        assert_eq!(elements, back);
    }

    #[test]
    fn test_serialized_shape_has_no_tag_field() {
        let rect = Element::Rectangle(Rectangle::new(0.0, 0.0, 4.0, 4.0));
        let value: serde_json::Value = serde_json::to_value(&rect).unwrap();
        let obj = value.as_object().unwrap();

        assert!(obj.contains_key("strokeWidth"));
        assert!(!obj.contains_key("type"));
        assert!(!obj.contains_key("points"));
        assert!(!obj.contains_key("content"));
    }

    #[test]
    fn test_rect_containment_is_edge_inclusive() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect_contains_inclusive(&rect, 0.0, 0.0));
        assert!(rect_contains_inclusive(&rect, 10.0, 10.0));
        assert!(!rect_contains_inclusive(&rect, 10.1, 5.0));

        let inner = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect_fully_contains(&rect, &inner));
        assert!(!rect_fully_contains(&rect, &Rect::new(0.0, 0.0, 10.0, 10.5)));
    }
}
