//! Freehand stroke element.

use kurbo::Rect;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ElementId, rect_contains_inclusive};

/// A single sampled input point with stylus pressure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    pub pressure: f64,
}

impl StrokePoint {
    /// Pressure reported for devices without pressure sensing.
    pub const DEFAULT_PRESSURE: f64 = 0.5;

    pub fn new(x: f64, y: f64, pressure: f64) -> Self {
        Self { x, y, pressure }
    }

    /// Point with the default pressure.
    pub fn plain(x: f64, y: f64) -> Self {
        Self::new(x, y, Self::DEFAULT_PRESSURE)
    }
}

/// A committed freehand stroke. Points are frozen once the stroke leaves
/// the tool state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: ElementId,
    pub points: Vec<StrokePoint>,
    pub color: String,
    pub width: f64,
}

impl Stroke {
    /// Create a stroke from recorded points.
    pub fn new(points: Vec<StrokePoint>, color: impl Into<String>, width: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            points,
            color: color.into(),
            width,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Axis-aligned bounding box of the point sequence.
    pub fn bounds(&self) -> Rect {
        if self.points.is_empty() {
            return Rect::ZERO;
        }

        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;

        for point in &self.points {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }

        Rect::new(min_x, min_y, max_x, max_y)
    }

    /// Split this stroke against an erase rectangle.
    ///
    /// Points on the rectangle's edges count as erased. Maximal runs of
    /// surviving points become sub-strokes with fresh identities; runs
    /// shorter than two points are dropped. A stroke the rectangle never
    /// touched is reported [`StrokeErase::Unchanged`] so its identity is
    /// not churned.
    pub fn erase_rect(&self, rect: &Rect) -> StrokeErase {
        let mut runs: Vec<Vec<StrokePoint>> = Vec::new();
        let mut current: Vec<StrokePoint> = Vec::new();

        for point in &self.points {
            if rect_contains_inclusive(rect, point.x, point.y) {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            } else {
                current.push(*point);
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }

        if runs.len() == 1 && runs[0].len() == self.points.len() {
            return StrokeErase::Unchanged;
        }

        let survivors: Vec<Stroke> = runs
            .into_iter()
            .filter(|run| run.len() >= 2)
            .map(|run| Stroke::new(run, self.color.clone(), self.width))
            .collect();

        if survivors.is_empty() {
            StrokeErase::Removed
        } else {
            StrokeErase::Split(survivors)
        }
    }
}

/// Outcome of erasing a rectangle out of a stroke.
#[derive(Debug, Clone, PartialEq)]
pub enum StrokeErase {
    /// No point fell inside the erase area.
    Unchanged,
    /// No surviving run was long enough to keep.
    Removed,
    /// The stroke broke into surviving sub-strokes.
    Split(Vec<Stroke>),
}
