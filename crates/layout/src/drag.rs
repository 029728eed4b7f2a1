//! Pointer-driven drag reorder across section grids.
//!
//! ```text
//! Idle -> Dragging -> Idle (committed or canceled)
//! ```
//!
//! Hit-testing runs against a [`HitMap`] built from settled layout
//! snapshots, never against rendered output. A release over a valid target
//! emits exactly one [`DragIntent`]; anything else cancels with no mutation.

use crate::autoscroll::AutoScroller;
use crate::controller::LayoutSnapshot;
use crate::geometry::PixelBox;
use bentofolio_core::Action;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

// ── Hit map ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct CardRegion {
    card_id: String,
    index: usize,
    bounds: PixelBox,
}

#[derive(Debug, Clone)]
struct SectionRegion {
    section_id: String,
    bounds: PixelBox,
    cards: Vec<CardRegion>,
}

/// What lies under a page-space point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Hit {
    Card {
        section_id: String,
        card_id: String,
        index: usize,
    },
    /// Inside a section grid but not over any card.
    SectionArea { section_id: String },
    Outside,
}

/// Page-space geometry of every rendered section grid.
#[derive(Debug, Clone, Default)]
pub struct HitMap {
    sections: Vec<SectionRegion>,
}

impl HitMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a settled grid whose container's top-left sits at
    /// `(origin_x, origin_y)`. Grids without a measured width are skipped.
    pub fn push_section(&mut self, snapshot: &LayoutSnapshot, origin_x: f64, origin_y: f64) {
        let Some(metrics) = snapshot.metrics else {
            return;
        };
        let columns = f64::from(metrics.columns);
        let width = columns * metrics.cell_width + (columns - 1.0) * metrics.gap;
        let cards = snapshot
            .layout
            .placements()
            .iter()
            .enumerate()
            .map(|(index, p)| CardRegion {
                card_id: p.id.clone(),
                index,
                bounds: metrics.rect_box(&p.rect).translate(origin_x, origin_y),
            })
            .collect();
        self.sections.push(SectionRegion {
            section_id: snapshot.container_id.clone(),
            bounds: PixelBox::new(origin_x, origin_y, width, snapshot.content_height()),
            cards,
        });
    }

    pub fn hit(&self, x: f64, y: f64) -> Hit {
        for section in &self.sections {
            if let Some(card) = section.cards.iter().find(|c| c.bounds.contains(x, y)) {
                return Hit::Card {
                    section_id: section.section_id.clone(),
                    card_id: card.card_id.clone(),
                    index: card.index,
                };
            }
            if section.bounds.contains(x, y) {
                return Hit::SectionArea { section_id: section.section_id.clone() };
            }
        }
        Hit::Outside
    }

    pub fn card_bounds(&self, card_id: &str) -> Option<PixelBox> {
        self.sections
            .iter()
            .flat_map(|s| s.cards.iter())
            .find(|c| c.card_id == card_id)
            .map(|c| c.bounds)
    }
}

// ── Events, states, effects ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DragEvent {
    PointerDown { pointer_id: u32, x: f64, y: f64 },
    PointerMove { pointer_id: u32, x: f64, y: f64 },
    PointerUp { pointer_id: u32, x: f64, y: f64 },
    Cancel,
}

impl DragEvent {
    fn validate(&self) -> Result<(), DragError> {
        match *self {
            DragEvent::PointerDown { x, y, .. }
            | DragEvent::PointerMove { x, y, .. }
            | DragEvent::PointerUp { x, y, .. } => {
                if x.is_finite() && y.is_finite() {
                    Ok(())
                } else {
                    Err(DragError::InvalidCoordinates { x, y })
                }
            }
            DragEvent::Cancel => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum DropTarget {
    /// Drop onto another card; takes that card's index.
    Card {
        section_id: String,
        card_id: String,
        index: usize,
    },
    /// Drop onto empty area of another section; appends.
    SectionEnd { section_id: String },
}

/// The mutation a committed drag requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum DragIntent {
    Reorder {
        section_id: String,
        from_index: usize,
        to_index: usize,
    },
    MoveToSection {
        card_id: String,
        from_section_id: String,
        to_section_id: String,
        /// `None` appends.
        to_index: Option<usize>,
    },
}

impl DragIntent {
    pub fn into_action(self) -> Action {
        match self {
            DragIntent::Reorder { section_id, from_index, to_index } => {
                Action::ReorderCards { section_id, from_index, to_index }
            }
            DragIntent::MoveToSection { card_id, from_section_id, to_section_id, to_index } => {
                Action::MoveCardToSection { card_id, from_section_id, to_section_id, to_index }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragSession {
    pub pointer_id: u32,
    pub card_id: String,
    pub section_id: String,
    pub index: usize,
    /// Pointer position relative to the card's top-left at grab time.
    pub grab_offset_x: f64,
    pub grab_offset_y: f64,
    pub ghost: PixelBox,
    pub target: Option<DropTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DragState {
    Idle,
    Dragging(DragSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragNoopReason {
    IdleWithoutActiveDrag,
    DragAlreadyInProgress,
    PointerMismatch,
    NotOverCard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragCancelReason {
    NoValidTarget,
    Requested,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum DragEffect {
    Started {
        card_id: String,
        section_id: String,
        index: usize,
        ghost: PixelBox,
    },
    Moved {
        ghost: PixelBox,
        target: Option<DropTarget>,
        /// Scroll delta for the scrollable ancestor this tick.
        scroll_by: f64,
    },
    Committed { intent: DragIntent },
    Canceled { reason: DragCancelReason },
    Noop { reason: DragNoopReason },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DragError {
    #[error("pointer coordinates must be finite (got {x}, {y})")]
    InvalidCoordinates { x: f64, y: f64 },
}

// ── Controller ──────────────────────────────────────────────────────────────

pub struct DragReorderController {
    state: DragState,
    hit_map: HitMap,
    autoscroll: Option<AutoScroller>,
    suppress_click: bool,
}

impl DragReorderController {
    pub fn new(hit_map: HitMap) -> Self {
        Self {
            state: DragState::Idle,
            hit_map,
            autoscroll: None,
            suppress_click: false,
        }
    }

    pub fn with_autoscroll(mut self, scroller: AutoScroller) -> Self {
        self.autoscroll = Some(scroller);
        self
    }

    /// Replace the geometry after a layout pass. An active session keeps its
    /// origin but hit-tests against the new map.
    pub fn set_hit_map(&mut self, hit_map: HitMap) {
        self.hit_map = hit_map;
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// The card under an active drag, for animation exclusion.
    pub fn dragged_card_id(&self) -> Option<&str> {
        match &self.state {
            DragState::Dragging(session) => Some(&session.card_id),
            DragState::Idle => None,
        }
    }

    /// True once after a drag ends, so the release does not also count as a
    /// click on the card underneath.
    pub fn take_click_suppression(&mut self) -> bool {
        std::mem::take(&mut self.suppress_click)
    }

    fn target_for(session: &DragSession, hit: Hit) -> Option<DropTarget> {
        match hit {
            Hit::Card { section_id, index, .. }
                if section_id == session.section_id && index == session.index =>
            {
                None
            }
            Hit::Card { section_id, card_id, index } => {
                Some(DropTarget::Card { section_id, card_id, index })
            }
            Hit::SectionArea { section_id } if section_id != session.section_id => {
                Some(DropTarget::SectionEnd { section_id })
            }
            Hit::SectionArea { .. } | Hit::Outside => None,
        }
    }

    fn intent_for(session: &DragSession, target: DropTarget) -> DragIntent {
        match target {
            DropTarget::Card { section_id, index, .. } if section_id == session.section_id => {
                DragIntent::Reorder {
                    section_id,
                    from_index: session.index,
                    to_index: index,
                }
            }
            DropTarget::Card { section_id, index, .. } => DragIntent::MoveToSection {
                card_id: session.card_id.clone(),
                from_section_id: session.section_id.clone(),
                to_section_id: section_id,
                to_index: Some(index),
            },
            DropTarget::SectionEnd { section_id } => DragIntent::MoveToSection {
                card_id: session.card_id.clone(),
                from_section_id: session.section_id.clone(),
                to_section_id: section_id,
                to_index: None,
            },
        }
    }

    fn end_session(&mut self) {
        self.state = DragState::Idle;
        self.suppress_click = true;
        if let Some(scroller) = &mut self.autoscroll {
            scroller.reset();
        }
    }

    pub fn apply(&mut self, event: DragEvent) -> Result<DragEffect, DragError> {
        event.validate()?;

        let effect = match (&mut self.state, event) {
            (DragState::Idle, DragEvent::PointerDown { pointer_id, x, y }) => {
                match self.hit_map.hit(x, y) {
                    Hit::Card { section_id, card_id, index } => {
                        let bounds = self
                            .hit_map
                            .card_bounds(&card_id)
                            .unwrap_or(PixelBox::new(x, y, 0.0, 0.0));
                        let session = DragSession {
                            pointer_id,
                            card_id: card_id.clone(),
                            section_id: section_id.clone(),
                            index,
                            grab_offset_x: x - bounds.x,
                            grab_offset_y: y - bounds.y,
                            ghost: bounds,
                            target: None,
                        };
                        debug!(card = %card_id, section = %section_id, index, "Drag started");
                        self.state = DragState::Dragging(session);
                        DragEffect::Started { card_id, section_id, index, ghost: bounds }
                    }
                    _ => DragEffect::Noop { reason: DragNoopReason::NotOverCard },
                }
            }
            (DragState::Idle, _) => DragEffect::Noop { reason: DragNoopReason::IdleWithoutActiveDrag },
            (DragState::Dragging(_), DragEvent::PointerDown { .. }) => {
                DragEffect::Noop { reason: DragNoopReason::DragAlreadyInProgress }
            }
            (DragState::Dragging(session), DragEvent::PointerMove { pointer_id, x, y }) => {
                if pointer_id != session.pointer_id {
                    DragEffect::Noop { reason: DragNoopReason::PointerMismatch }
                } else {
                    session.ghost.x = x - session.grab_offset_x;
                    session.ghost.y = y - session.grab_offset_y;
                    session.target = Self::target_for(session, self.hit_map.hit(x, y));
                    let scroll_by = self.autoscroll.as_mut().map_or(0.0, |s| s.update(y));
                    DragEffect::Moved {
                        ghost: session.ghost,
                        target: session.target.clone(),
                        scroll_by,
                    }
                }
            }
            (DragState::Dragging(session), DragEvent::PointerUp { pointer_id, x, y }) => {
                if pointer_id != session.pointer_id {
                    DragEffect::Noop { reason: DragNoopReason::PointerMismatch }
                } else {
                    let outcome = Self::target_for(session, self.hit_map.hit(x, y))
                        .map(|target| Self::intent_for(session, target));
                    self.end_session();
                    match outcome {
                        Some(intent) => {
                            debug!(?intent, "Drag committed");
                            DragEffect::Committed { intent }
                        }
                        None => DragEffect::Canceled { reason: DragCancelReason::NoValidTarget },
                    }
                }
            }
            (DragState::Dragging(_), DragEvent::Cancel) => {
                self.end_session();
                DragEffect::Canceled { reason: DragCancelReason::Requested }
            }
        };
        Ok(effect)
    }

    /// Abort an active drag (focus loss, unmount). `None` when idle.
    pub fn force_cancel(&mut self) -> Option<DragEffect> {
        if !self.is_active() {
            return None;
        }
        self.end_session();
        Some(DragEffect::Canceled { reason: DragCancelReason::Requested })
    }
}
