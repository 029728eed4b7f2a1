//! FLIP reorder animation intents.
//!
//! The animator never touches layout. It diffs two pure layout snapshots
//! (boxes before and after a packing change) and emits one intent per moved
//! item: jump back by the inverse offset, then play to zero.

use crate::geometry::PixelBox;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Moves smaller than this many pixels on both axes are not animated.
pub const DEFAULT_THRESHOLD_PX: f64 = 1.0;

pub const DEFAULT_DURATION: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlipConfig {
    pub threshold_px: f64,
    pub duration: Duration,
}

impl Default for FlipConfig {
    fn default() -> Self {
        Self {
            threshold_px: DEFAULT_THRESHOLD_PX,
            duration: DEFAULT_DURATION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationIntent {
    pub id: String,
    pub from: PixelBox,
    pub to: PixelBox,
    /// Offset to apply instantly before releasing to zero.
    pub invert_x: f64,
    pub invert_y: f64,
    pub duration_ms: u64,
}

/// Pure FLIP diff. Items missing from either side, the `dragged` item, and
/// moves under the threshold produce no intent. Output follows `after` order.
pub fn diff(
    before: &[(String, PixelBox)],
    after: &[(String, PixelBox)],
    dragged: Option<&str>,
    config: &FlipConfig,
) -> Vec<AnimationIntent> {
    let first: HashMap<&str, &PixelBox> = before.iter().map(|(id, b)| (id.as_str(), b)).collect();

    after
        .iter()
        .filter(|(id, _)| Some(id.as_str()) != dragged)
        .filter_map(|(id, last)| {
            let first = first.get(id.as_str())?;
            let dx = first.x - last.x;
            let dy = first.y - last.y;
            if dx.abs() < config.threshold_px && dy.abs() < config.threshold_px {
                return None;
            }
            Some(AnimationIntent {
                id: id.clone(),
                from: **first,
                to: *last,
                invert_x: dx,
                invert_y: dy,
                duration_ms: config.duration.as_millis() as u64,
            })
        })
        .collect()
}

/// Stateful wrapper: capture before a mutation, play after it settles.
#[derive(Debug, Default)]
pub struct ReorderAnimator {
    config: FlipConfig,
    captured: Option<Vec<(String, PixelBox)>>,
    dragged: Option<String>,
}

impl ReorderAnimator {
    pub fn new(config: FlipConfig) -> Self {
        Self {
            config,
            captured: None,
            dragged: None,
        }
    }

    /// Record the current boxes ("First").
    pub fn capture(&mut self, boxes: Vec<(String, PixelBox)>) {
        self.captured = Some(boxes);
    }

    /// Exclude the item under an active drag, or clear the exclusion.
    pub fn set_dragged(&mut self, id: Option<String>) {
        self.dragged = id;
    }

    pub fn has_capture(&self) -> bool {
        self.captured.is_some()
    }

    /// Diff the capture against the settled boxes ("Last"), consuming it.
    /// Without a capture nothing animates.
    pub fn play(&mut self, after: &[(String, PixelBox)]) -> Vec<AnimationIntent> {
        match self.captured.take() {
            Some(before) => diff(&before, after, self.dragged.as_deref(), &self.config),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxes(entries: &[(&str, f64, f64)]) -> Vec<(String, PixelBox)> {
        entries
            .iter()
            .map(|(id, x, y)| (id.to_string(), PixelBox::new(*x, *y, 100.0, 100.0)))
            .collect()
    }

    #[test]
    fn moved_items_get_inverse_offsets() {
        let before = boxes(&[("a", 0.0, 0.0), ("b", 108.0, 0.0)]);
        let after = boxes(&[("b", 0.0, 0.0), ("a", 108.0, 0.0)]);
        let intents = diff(&before, &after, None, &FlipConfig::default());

        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0].id, "b");
        assert!((intents[0].invert_x - 108.0).abs() < 1e-9);
        assert!((intents[1].invert_x + 108.0).abs() < 1e-9);
        assert_eq!(intents[0].duration_ms, 200);
    }

    #[test]
    fn sub_pixel_moves_new_items_and_dragged_item_are_skipped() {
        let before = boxes(&[("a", 0.0, 0.0), ("b", 108.0, 0.0), ("drag", 216.0, 0.0)]);
        let after = boxes(&[("a", 0.5, 0.4), ("b", 108.0, 108.0), ("drag", 0.0, 108.0), ("new", 0.0, 216.0)]);
        let intents = diff(&before, &after, Some("drag"), &FlipConfig::default());
        let ids: Vec<_> = intents.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["b"]);
    }

    #[test]
    fn play_consumes_capture() {
        let mut animator = ReorderAnimator::new(FlipConfig::default());
        animator.capture(boxes(&[("a", 0.0, 0.0)]));
        let after = boxes(&[("a", 0.0, 50.0)]);
        assert_eq!(animator.play(&after).len(), 1);
        assert!(!animator.has_capture());
        assert!(animator.play(&after).is_empty());
    }
}
