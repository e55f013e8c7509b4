//! Paper document and grid configuration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::elements::{Element, ElementId};

/// Grid rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridKind {
    #[default]
    None,
    Horizontal,
    Vertical,
    Square,
}

/// Background grid configuration. Not part of undo history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    #[serde(rename = "type")]
    pub kind: GridKind,
    pub spacing: f64,
    pub color: String,
    pub opacity: f64,
}

impl GridSettings {
    /// Largest accepted grid spacing.
    pub const MAX_SPACING: f64 = 200.0;

    /// Shallow-merge a patch. Out-of-range spacing and opacity fields are
    /// dropped; the rest of the patch still applies.
    pub fn apply(&mut self, patch: GridSettingsPatch) {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(spacing) = patch.spacing {
            if spacing > 0.0 && spacing <= Self::MAX_SPACING {
                self.spacing = spacing;
            } else {
                log::debug!("ignoring out-of-range grid spacing {spacing}");
            }
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(opacity) = patch.opacity {
            if (0.0..=1.0).contains(&opacity) {
                self.opacity = opacity;
            } else {
                log::debug!("ignoring out-of-range grid opacity {opacity}");
            }
        }
    }
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            kind: GridKind::None,
            spacing: 20.0,
            color: "#c8d0e0".to_string(),
            opacity: 0.5,
        }
    }
}

/// Partial grid update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridSettingsPatch {
    pub kind: Option<GridKind>,
    pub spacing: Option<f64>,
    pub color: Option<String>,
    pub opacity: Option<f64>,
}

/// A drawing document. Element order is paint order: append order, except
/// that undo/redo replacement and erase-filtering preserve the relative
/// order of survivors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    pub id: String,
    pub name: String,
    pub elements: Vec<Element>,
    pub grid_settings: GridSettings,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Paper {
    /// Create a new empty paper stamped with `now_ms`.
    pub fn new(name: impl Into<String>, now_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            elements: Vec::new(),
            grid_settings: GridSettings::default(),
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    /// Look up an element by id.
    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == *id)
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Serialize to human-readable JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Listing entry for a stored paper.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperSummary {
    pub id: String,
    pub name: String,
    pub element_count: usize,
    pub created_at: u64,
    pub updated_at: u64,
}

impl From<&Paper> for PaperSummary {
    fn from(paper: &Paper) -> Self {
        Self {
            id: paper.id.clone(),
            name: paper.name.clone(),
            element_count: paper.elements.len(),
            created_at: paper.created_at,
            updated_at: paper.updated_at,
        }
    }
}
