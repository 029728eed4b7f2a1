//! Per-container layout lifecycle.
//!
//! One [`LayoutController`] is owned by each rendered grid (one per portfolio
//! section) and lives exactly as long as that grid. Every change of items,
//! width, or grid config re-settles it synchronously: resolve columns, pack,
//! locate empty cells, then notify subscribers.

use crate::empty_cells::{EmptyCell, locate};
use crate::geometry::{GridMetrics, PixelBox};
use crate::packer::{PackItem, PackedLayout, pack};
use crate::responsive::{ResizeDebouncer, resolve_columns};
use bentofolio_core::{GridConfig, Section};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

/// An actionable empty cell and the item index a card added there takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddSlot {
    pub cell: EmptyCell,
    pub insert_index: usize,
}

/// Everything the animation and affordance layers need from one layout pass.
#[derive(Debug, Clone)]
pub struct LayoutSnapshot {
    pub container_id: String,
    pub revision: u64,
    pub columns: u32,
    /// The column count differs from the previous pass.
    pub columns_changed: bool,
    pub layout: Arc<PackedLayout>,
    /// Rows to render; at least one in editable mode.
    pub rendered_rows: u32,
    /// Empty in read-only mode.
    pub add_slots: Vec<AddSlot>,
    /// Present once the container width is known.
    pub metrics: Option<GridMetrics>,
}

impl LayoutSnapshot {
    /// Pixel boxes of every item, in item order. Empty until a width is known.
    pub fn boxes(&self) -> Vec<(String, PixelBox)> {
        let Some(metrics) = self.metrics else {
            return Vec::new();
        };
        self.layout
            .placements()
            .iter()
            .map(|p| (p.id.clone(), metrics.rect_box(&p.rect)))
            .collect()
    }

    pub fn content_height(&self) -> f64 {
        self.metrics
            .map_or(0.0, |m| m.content_height(self.rendered_rows))
    }
}

#[derive(Debug, Clone)]
pub enum ControllerState {
    Uninitialized,
    Settled(Arc<LayoutSnapshot>),
}

pub struct LayoutController {
    container_id: String,
    config: GridConfig,
    editable: bool,
    width: Option<f64>,
    resize: Option<ResizeDebouncer>,
    items: Vec<PackItem>,
    state: ControllerState,
    revision: u64,
    events: broadcast::Sender<Arc<LayoutSnapshot>>,
}

impl LayoutController {
    pub fn new(container_id: impl Into<String>, config: GridConfig) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            container_id: container_id.into(),
            config,
            editable: true,
            width: None,
            resize: None,
            items: Vec::new(),
            state: ControllerState::Uninitialized,
            revision: 0,
            events,
        }
    }

    /// Controller for a section grid, already settled on its cards.
    pub fn for_section(section: &Section, config: GridConfig) -> Self {
        let mut controller = Self::new(section.id.clone(), config);
        controller.set_items(section.cards.iter().map(PackItem::from).collect());
        controller
    }

    /// Read-only grids reserve no rows and expose no add slots.
    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    /// Debounce widths fed through [`Self::observe_width`] by `quiet`.
    pub fn with_resize_debounce(mut self, quiet: Duration) -> Self {
        self.resize = Some(ResizeDebouncer::new(quiet));
        self
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn snapshot(&self) -> Option<Arc<LayoutSnapshot>> {
        match &self.state {
            ControllerState::Settled(snapshot) => Some(snapshot.clone()),
            ControllerState::Uninitialized => None,
        }
    }

    /// Receive every settled snapshot from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<LayoutSnapshot>> {
        self.events.subscribe()
    }

    pub fn set_items(&mut self, items: Vec<PackItem>) -> Arc<LayoutSnapshot> {
        let repack = items != self.items;
        self.items = items;
        self.settle(repack)
    }

    /// Sync with the section's current cards.
    pub fn sync_section(&mut self, section: &Section) -> Arc<LayoutSnapshot> {
        self.set_items(section.cards.iter().map(PackItem::from).collect())
    }

    /// Apply a settled container width immediately. Non-finite widths are
    /// ignored. Raw resize observations go through [`Self::observe_width`].
    pub fn set_width(&mut self, width: f64) -> Arc<LayoutSnapshot> {
        if width.is_finite() && width >= 0.0 {
            self.width = Some(width);
        }
        self.settle(false)
    }

    /// Record a raw resize observation. Without a debounce interval the width
    /// is applied at once and the new snapshot returned; otherwise it waits
    /// for [`Self::poll_width`].
    pub fn observe_width(&mut self, width: f64) -> Option<Arc<LayoutSnapshot>> {
        match &mut self.resize {
            Some(debouncer) => {
                debouncer.observe(width);
                None
            }
            None => Some(self.set_width(width)),
        }
    }

    /// When the pending observation settles, if any.
    pub fn resize_deadline(&self) -> Option<tokio::time::Instant> {
        self.resize.as_ref().and_then(ResizeDebouncer::deadline)
    }

    /// Apply the pending width once it has been quiet long enough.
    pub fn poll_width(&mut self) -> Option<Arc<LayoutSnapshot>> {
        let width = self.resize.as_mut()?.poll()?;
        Some(self.set_width(width))
    }

    pub fn set_config(&mut self, config: GridConfig) -> Arc<LayoutSnapshot> {
        self.config = config;
        self.settle(false)
    }

    pub fn set_editable(&mut self, editable: bool) -> Arc<LayoutSnapshot> {
        self.editable = editable;
        self.settle(false)
    }

    fn effective_columns(&self) -> u32 {
        match self.width {
            Some(width) => resolve_columns(width, self.config.max_columns, self.config.cell_gap),
            // First paint: assume the configured maximum until measured.
            None => self.config.max_columns.max(1),
        }
    }

    fn settle(&mut self, items_changed: bool) -> Arc<LayoutSnapshot> {
        let columns = self.effective_columns();
        let previous = self.snapshot();

        let (layout, columns_changed) = match &previous {
            Some(prev) if prev.columns == columns && !items_changed => (prev.layout.clone(), false),
            Some(prev) => (Arc::new(pack(&self.items, columns)), prev.columns != columns),
            None => (Arc::new(pack(&self.items, columns)), false),
        };

        let (rendered_rows, add_slots) = if self.editable {
            editable_slots(&layout)
        } else {
            (layout.total_rows(), Vec::new())
        };

        let metrics = self.width.map(|w| {
            GridMetrics::new(w, columns, self.config.cell_gap, self.config.aspect_ratio)
        });

        self.revision += 1;
        let snapshot = Arc::new(LayoutSnapshot {
            container_id: self.container_id.clone(),
            revision: self.revision,
            columns,
            columns_changed,
            layout,
            rendered_rows,
            add_slots,
            metrics,
        });

        debug!(
            container = %self.container_id,
            revision = self.revision,
            columns,
            items = self.items.len(),
            total_rows = snapshot.layout.total_rows(),
            slots = snapshot.add_slots.len(),
            "Layout settled"
        );

        self.state = ControllerState::Settled(snapshot.clone());
        // No subscribers is fine
        let _ = self.events.send(snapshot.clone());
        snapshot
    }
}

/// Reserve at least one row, plus one more when the packing leaves no
/// trailing cell, so an append slot always exists.
fn editable_slots(layout: &PackedLayout) -> (u32, Vec<AddSlot>) {
    let columns = layout.columns();
    let mut rows = layout.total_rows().max(1);
    let mut cells = locate(layout.occupancy(), rows, columns);
    if !cells.iter().any(|c| c.is_trailing) {
        rows += 1;
        cells = locate(layout.occupancy(), rows, columns);
    }
    let slots = cells
        .into_iter()
        .map(|cell| AddSlot {
            cell,
            insert_index: layout.items_before(cell.row, cell.col),
        })
        .collect();
    (rows, slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_items() -> Vec<PackItem> {
        vec![
            PackItem::new("item1", 2, 2),
            PackItem::new("item2", 1, 1),
            PackItem::new("item3", 1, 1),
            PackItem::new("item4", 2, 1),
        ]
    }

    #[test]
    fn scenario_at_650px_packs_three_columns() {
        let mut controller = LayoutController::new("s1", GridConfig::default());
        controller.set_items(scenario_items());
        let snap = controller.set_width(650.0);

        assert_eq!(snap.columns, 3);
        assert!(snap.columns_changed);
        let layout = &snap.layout;
        let origin = |id: &str| {
            let r = layout.rect(id).unwrap();
            (r.row_start, r.col_start, r.row_span, r.col_span)
        };
        assert_eq!(origin("item1"), (1, 1, 2, 2));
        assert_eq!(origin("item2"), (1, 3, 1, 1));
        assert_eq!(origin("item3"), (2, 3, 1, 1));
        assert_eq!(origin("item4"), (3, 1, 1, 2));
        assert_eq!(layout.total_rows(), 3);
    }

    #[test]
    fn first_paint_uses_max_columns_then_reuses_packing() {
        let mut controller = LayoutController::new("s1", GridConfig::default());
        assert!(matches!(controller.state(), ControllerState::Uninitialized));

        let first = controller.set_items(scenario_items());
        assert_eq!(first.columns, 4);
        assert!(first.metrics.is_none());

        let measured = controller.set_width(1200.0);
        assert_eq!(measured.columns, 4);
        assert!(!measured.columns_changed);
        assert!(Arc::ptr_eq(&first.layout, &measured.layout));
        assert!(measured.metrics.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_widths_settle_once_quiet() {
        let mut controller = LayoutController::new("s1", GridConfig::default())
            .with_resize_debounce(Duration::from_millis(100));
        let first = controller.set_items(scenario_items());

        for width in [900.0, 700.0, 650.0] {
            assert!(controller.observe_width(width).is_none());
            tokio::time::advance(Duration::from_millis(30)).await;
        }
        assert!(controller.poll_width().is_none());
        assert_eq!(controller.snapshot().unwrap().revision, first.revision);

        tokio::time::advance(Duration::from_millis(100)).await;
        let settled = controller.poll_width().unwrap();
        assert_eq!(settled.columns, 3);
        assert_eq!(settled.revision, first.revision + 1);
        assert!(controller.poll_width().is_none());
        assert!(controller.resize_deadline().is_none());
    }

    #[test]
    fn undebounced_observation_applies_at_once() {
        let mut controller = LayoutController::new("s1", GridConfig::default());
        controller.set_items(scenario_items());
        assert_eq!(controller.observe_width(650.0).unwrap().columns, 3);
    }

    #[test]
    fn empty_editable_grid_reserves_one_row_with_append_slot() {
        let mut controller = LayoutController::new("s1", GridConfig::default());
        let snap = controller.set_items(Vec::new());
        assert_eq!(snap.layout.total_rows(), 0);
        assert_eq!(snap.rendered_rows, 1);
        assert_eq!(snap.add_slots.len(), 1);
        assert_eq!(snap.add_slots[0].insert_index, 0);
    }

    #[test]
    fn full_grid_gets_extra_append_row() {
        let mut controller = LayoutController::new("s1", GridConfig { max_columns: 2, ..GridConfig::default() });
        let snap = controller.set_items(vec![PackItem::new("a", 2, 1)]);
        assert_eq!(snap.rendered_rows, 2);
        assert_eq!(snap.add_slots.len(), 1);
        let slot = snap.add_slots[0];
        assert_eq!((slot.cell.row, slot.cell.col), (2, 1));
        assert_eq!(slot.insert_index, 1);
    }

    #[test]
    fn trailing_slot_appends_after_last_item() {
        let mut controller = LayoutController::new("s1", GridConfig::default());
        controller.set_items(scenario_items());
        let snap = controller.set_width(650.0);
        // The only empty cell is (3,3), after every origin.
        let slots: Vec<_> = snap.add_slots.iter().map(|s| (s.cell.row, s.cell.col, s.insert_index)).collect();
        assert_eq!(slots, vec![(3, 3, 4)]);
    }

    #[test]
    fn gap_slot_inserts_before_later_items() {
        let mut controller = LayoutController::new("s1", GridConfig::default());
        let snap = controller.set_items(vec![
            PackItem::new("a", 1, 1),
            PackItem::new("b", 1, 2),
            PackItem::new("c", 2, 1),
            PackItem::new("d", 2, 1),
            PackItem::new("e", 1, 1),
        ]);
        // (2,1) is a real hole left of "d"; a card added there becomes item 4.
        let hole = snap.add_slots.iter().find(|s| !s.cell.is_trailing).unwrap();
        assert_eq!((hole.cell.row, hole.cell.col), (2, 1));
        assert_eq!(hole.insert_index, 3);
    }

    #[test]
    fn read_only_grid_has_no_slots() {
        let mut controller = LayoutController::new("s1", GridConfig::default()).with_editable(false);
        let snap = controller.set_items(Vec::new());
        assert_eq!(snap.rendered_rows, 0);
        assert!(snap.add_slots.is_empty());
    }

    #[tokio::test]
    async fn subscribers_see_each_settle() {
        let mut controller = LayoutController::new("s1", GridConfig::default());
        let mut rx = controller.subscribe();
        controller.set_items(scenario_items());
        controller.set_width(650.0);
        assert_eq!(rx.recv().await.unwrap().revision, 1);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.revision, 2);
        assert_eq!(second.columns, 3);
    }
}
