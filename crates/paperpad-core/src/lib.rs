//! Paperpad Core Library
//!
//! Platform-agnostic interaction and document logic for the Paperpad
//! drawing surface: device input normalization with palm rejection,
//! per-tool gesture state, and an undoable, persisted paper document.

pub mod board;
pub mod clock;
pub mod elements;
pub mod history;
pub mod input;
pub mod manager;
pub mod paper;
pub mod render;
pub mod storage;
pub mod tools;

pub use board::Board;
pub use clock::{Clock, ManualClock, SystemClock};
pub use elements::{Element, ElementId, EraseRequest, Rectangle, Stroke, StrokeErase, StrokePoint, Text};
pub use history::{HISTORY_CAPACITY, History};
pub use input::{
    DeviceKind, EventKind, GestureEvent, InputNormalizer, KeyEvent, Modifiers, PenButtonHint,
    PointerButton, PointerInput, Subscription,
};
pub use manager::PaperManager;
pub use paper::{GridKind, GridSettings, GridSettingsPatch, Paper, PaperSummary};
pub use render::{NullRenderer, Renderer};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StoreError, StoreResult};
pub use tools::{Commit, KeyOutcome, Preview, ToolKind, ToolManager, ToolSettings};
