//! Rendering boundary.
//!
//! The engine only ever calls outward through this trait, after document
//! mutations and preview updates; nothing in the core depends on what the
//! implementation paints.

use crate::paper::Paper;
use crate::tools::Preview;

/// Paints the document and transient previews.
pub trait Renderer {
    /// Repaint the full document after a committed mutation.
    fn render(&mut self, paper: &Paper);

    /// Paint live feedback for the in-flight gesture.
    fn draw_preview(&mut self, preview: &Preview);

    /// Remove any previously painted preview.
    fn clear_preview(&mut self) {}
}

/// No-op renderer for headless embedders and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _paper: &Paper) {}

    fn draw_preview(&mut self, _preview: &Preview) {}
}
