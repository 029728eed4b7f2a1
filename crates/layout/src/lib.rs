//! # Bentofolio Layout
//!
//! The bento grid engine. Cards of `W×H` cells are packed row-major into a
//! responsive column count; the remaining holes become add-card affordances;
//! reorders animate with FLIP; pointer drags resolve to reorder or
//! cross-section move intents.
//!
//! Everything here is pure or single-owner state: no I/O, no rendering.
//! Callers feed widths, items, and pointer events, and apply the returned
//! snapshots, intents, and [`bentofolio_core::Action`]s.

pub mod animator;
pub mod autoscroll;
pub mod controller;
pub mod drag;
pub mod empty_cells;
pub mod export;
pub mod geometry;
pub mod packer;
pub mod responsive;

pub use animator::{AnimationIntent, FlipConfig, ReorderAnimator};
pub use autoscroll::{AutoScrollConfig, AutoScroller, ScrollViewport};
pub use controller::{AddSlot, ControllerState, LayoutController, LayoutSnapshot};
pub use drag::{
    DragCancelReason, DragEffect, DragError, DragEvent, DragIntent, DragNoopReason,
    DragReorderController, DragState, DropTarget, Hit, HitMap,
};
pub use empty_cells::{EmptyCell, locate as locate_empty_cells};
pub use export::{DeclaredGrid, ExportOptions, export_html, parse_declared_sizes};
pub use geometry::{GridMetrics, PixelBox};
pub use packer::{GridRect, Occupancy, PackItem, PackedLayout, Placement, pack};
pub use responsive::{MIN_COLUMN_WIDTH, ResizeDebouncer, debounce_resizes, resolve_columns};
