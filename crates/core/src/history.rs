//! Bounded snapshot history for undo/redo.

use crate::portfolio::Snapshot;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Maximum number of snapshots kept on each of the undo and redo stacks.
pub const MAX_HISTORY: usize = 5;

/// Repeats of a debounced action inside this window share one undo step.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Default)]
pub struct History {
    past: VecDeque<Snapshot>,
    future: VecDeque<Snapshot>,
    last: Option<(&'static str, Instant)>,
}

fn push_bounded(stack: &mut VecDeque<Snapshot>, snapshot: Snapshot) {
    stack.push_back(snapshot);
    while stack.len() > MAX_HISTORY {
        stack.pop_front();
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the state as it was before a tracked action of kind `kind`.
    ///
    /// When `debounced` is set and the previous record had the same kind less
    /// than [`DEBOUNCE_WINDOW`] ago, no new snapshot is pushed.
    pub fn record(&mut self, kind: &'static str, debounced: bool, before: Snapshot) {
        let now = Instant::now();
        let coalesce = debounced
            && self
                .last
                .is_some_and(|(k, at)| k == kind && now.duration_since(at) < DEBOUNCE_WINDOW);

        if !coalesce {
            push_bounded(&mut self.past, before);
        }
        self.future.clear();
        self.last = Some((kind, now));
    }

    /// Pop the latest snapshot, parking `current` on the redo stack.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.past.pop_back()?;
        push_bounded(&mut self.future, current);
        self.last = None;
        Some(previous)
    }

    /// Pop the latest redo snapshot, parking `current` on the undo stack.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.future.pop_back()?;
        push_bounded(&mut self.past, current);
        self.last = None;
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::Section;

    fn snap(title: &str) -> Snapshot {
        Snapshot {
            sections: vec![Section::new("s", title)],
            bio: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_at_most_five_snapshots() {
        let mut history = History::new();
        for i in 0..8 {
            history.record("ADD_CARD", false, snap(&i.to_string()));
        }
        assert_eq!(history.undo_depth(), MAX_HISTORY);
        let oldest_kept = (0..MAX_HISTORY)
            .filter_map(|_| history.undo(snap("now")))
            .last()
            .unwrap();
        assert_eq!(oldest_kept.sections[0].title, "3");
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_repeats_coalesce_within_window() {
        let mut history = History::new();
        history.record("SET_BIO", true, snap("a"));
        tokio::time::advance(Duration::from_millis(200)).await;
        history.record("SET_BIO", true, snap("b"));
        assert_eq!(history.undo_depth(), 1);

        tokio::time::advance(Duration::from_millis(600)).await;
        history.record("SET_BIO", true, snap("c"));
        assert_eq!(history.undo_depth(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn new_record_clears_redo() {
        let mut history = History::new();
        history.record("ADD_CARD", false, snap("a"));
        let restored = history.undo(snap("b")).unwrap();
        assert_eq!(restored.sections[0].title, "a");
        assert!(history.can_redo());

        history.record("REMOVE_CARD", false, snap("a"));
        assert!(!history.can_redo());
    }
}
