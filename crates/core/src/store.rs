//! The single serialized mutation entry point for portfolio state.
//!
//! Every writer (manual edits, drag commits, agent tools, undo/redo) goes
//! through [`PortfolioStore::dispatch`], so any reader always observes a
//! consistent snapshot. The lock is never held across an `.await`.

use crate::action::{Action, reduce};
use crate::error::StoreError;
use crate::event::{DomainEvent, EventBus};
use crate::history::History;
use crate::portfolio::PortfolioState;
use crate::repository::PortfolioRepository;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct StoreInner {
    state: PortfolioState,
    history: History,
    dirty: bool,
    revision: u64,
}

/// Opaque copy of the full store (state plus history) for turn-level rollback.
#[derive(Debug, Clone)]
pub struct Checkpoint(StoreInner);

impl Checkpoint {
    pub fn revision(&self) -> u64 {
        self.0.revision
    }
}

pub struct PortfolioStore {
    inner: Mutex<StoreInner>,
    events: Option<Arc<EventBus>>,
}

impl PortfolioStore {
    pub fn new(state: PortfolioState) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                state,
                history: History::new(),
                dirty: false,
                revision: 0,
            }),
            events: None,
        }
    }

    /// Publish a `StateChanged` event on `bus` after every effective mutation.
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, action: &'static str, revision: u64) {
        if let Some(bus) = &self.events {
            bus.publish(DomainEvent::StateChanged {
                action: action.to_string(),
                revision,
                timestamp: Utc::now(),
            });
        }
    }

    /// Apply an action. Returns `true` when the state changed.
    pub fn dispatch(&self, action: Action) -> bool {
        let kind = action.kind();
        let revision = {
            let mut inner = self.lock();
            let before = action.is_tracked().then(|| inner.state.snapshot());
            if !reduce(&mut inner.state, &action) {
                debug!(action = kind, "Action was a no-op");
                return false;
            }
            if let Some(before) = before {
                inner.history.record(kind, action.is_debounced(), before);
            }
            match action {
                Action::LoadState { .. } => {
                    inner.history.clear();
                    inner.dirty = false;
                }
                Action::MarkSaved { .. } => inner.dirty = false,
                _ => inner.dirty = true,
            }
            inner.revision += 1;
            inner.revision
        };
        debug!(action = kind, revision, "State updated");
        self.publish(kind, revision);
        true
    }

    /// Restore the previous snapshot. Returns `false` when there is none.
    pub fn undo(&self) -> bool {
        self.step(true)
    }

    /// Re-apply the most recently undone snapshot.
    pub fn redo(&self) -> bool {
        self.step(false)
    }

    fn step(&self, backwards: bool) -> bool {
        let revision = {
            let mut inner = self.lock();
            let current = inner.state.snapshot();
            let target = if backwards {
                inner.history.undo(current)
            } else {
                inner.history.redo(current)
            };
            let Some(snapshot) = target else {
                return false;
            };
            reduce(&mut inner.state, &Action::RestoreSnapshot { snapshot });
            inner.dirty = true;
            inner.revision += 1;
            inner.revision
        };
        self.publish(if backwards { "UNDO" } else { "REDO" }, revision);
        true
    }

    /// Clone of the current state.
    pub fn state(&self) -> PortfolioState {
        self.lock().state.clone()
    }

    /// Read the state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&PortfolioState) -> R) -> R {
        f(&self.lock().state)
    }

    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    pub fn can_undo(&self) -> bool {
        self.lock().history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.lock().history.can_redo()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.lock().clone())
    }

    /// Put the store back exactly as it was when `checkpoint` was taken.
    pub fn rollback(&self, checkpoint: Checkpoint) {
        let revision = {
            let mut inner = self.lock();
            Self::restore(&mut inner, checkpoint)
        };
        warn!(revision, "Portfolio state rolled back");
        self.publish("ROLLBACK", revision);
    }

    /// Roll back to `checkpoint` only if the caller made every change since,
    /// `own_changes` being the number of revisions its dispatches produced.
    ///
    /// Returns `false` and keeps the current state when another writer
    /// dispatched in between.
    pub fn rollback_own(&self, checkpoint: Checkpoint, own_changes: u64) -> bool {
        let expected = checkpoint.revision() + own_changes;
        let revision = {
            let mut inner = self.lock();
            if inner.revision != expected {
                warn!(
                    expected,
                    actual = inner.revision,
                    "Portfolio changed by another writer, not rolling back"
                );
                return false;
            }
            Self::restore(&mut inner, checkpoint)
        };
        warn!(revision, "Portfolio state rolled back");
        self.publish("ROLLBACK", revision);
        true
    }

    fn restore(inner: &mut StoreInner, checkpoint: Checkpoint) -> u64 {
        let current = inner.revision;
        *inner = checkpoint.0;
        // Revisions stay monotonic so observers still see a change.
        inner.revision = current + 1;
        inner.revision
    }

    /// Replace the state with whatever `repo` holds for `identity`.
    ///
    /// Returns `false` and leaves an empty portfolio when nothing is stored.
    pub async fn load_from(
        &self,
        repo: &dyn PortfolioRepository,
        identity: &str,
    ) -> Result<bool, StoreError> {
        let loaded = repo.load(identity).await?;
        let found = loaded.is_some();
        let state = loaded.unwrap_or_default();
        self.dispatch(Action::LoadState { state: Box::new(state) });
        debug!(repository = repo.name(), identity, found, "Portfolio loaded");
        Ok(found)
    }

    /// Persist the current state. A failed save leaves state and dirty flag
    /// untouched.
    pub async fn save_to(
        &self,
        repo: &dyn PortfolioRepository,
        identity: &str,
    ) -> Result<DateTime<Utc>, StoreError> {
        let saved_at = Utc::now();
        let mut state = self.state();
        state.saved_at = Some(saved_at);

        if let Err(e) = repo.save(identity, &state).await {
            warn!(repository = repo.name(), identity, error = %e, "Save failed");
            return Err(e);
        }
        self.dispatch(Action::MarkSaved { saved_at });
        Ok(saved_at)
    }
}

impl Default for PortfolioStore {
    fn default() -> Self {
        Self::new(PortfolioState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::CardSize;
    use async_trait::async_trait;

    fn seeded() -> PortfolioStore {
        let store = PortfolioStore::default();
        store.dispatch(Action::AddSection { section_id: "s1".into(), title: "Work".into() });
        store
    }

    struct FailingRepo;

    #[async_trait]
    impl PortfolioRepository for FailingRepo {
        fn name(&self) -> &str {
            "failing"
        }
        async fn load(&self, _identity: &str) -> Result<Option<PortfolioState>, StoreError> {
            Ok(None)
        }
        async fn save(&self, _identity: &str, _state: &PortfolioState) -> Result<(), StoreError> {
            Err(StoreError::Save("disk full".into()))
        }
    }

    #[tokio::test]
    async fn dispatch_marks_dirty_and_supports_undo_redo() {
        let store = seeded();
        assert!(store.is_dirty());
        store.dispatch(Action::add_card("s1", CardSize::unit()));
        assert_eq!(store.state().card_count(), 1);

        assert!(store.undo());
        assert_eq!(store.state().card_count(), 0);
        assert!(store.redo());
        assert_eq!(store.state().card_count(), 1);
        assert!(!store.redo());
    }

    #[tokio::test]
    async fn load_state_clears_history_and_dirty() {
        let store = seeded();
        store.dispatch(Action::LoadState { state: Box::default() });
        assert!(!store.is_dirty());
        assert!(!store.can_undo());
    }

    #[tokio::test]
    async fn rollback_restores_state_and_history() {
        let store = seeded();
        let checkpoint = store.checkpoint();
        store.dispatch(Action::add_card("s1", CardSize::unit()));
        store.dispatch(Action::add_card("s1", CardSize::unit()));
        store.rollback(checkpoint);

        assert_eq!(store.state().card_count(), 0);
        assert!(store.undo());
        assert!(store.state().sections.is_empty());
    }

    #[tokio::test]
    async fn rollback_own_undoes_only_the_callers_changes() {
        let store = seeded();
        let checkpoint = store.checkpoint();
        store.dispatch(Action::add_card("s1", CardSize::unit()));
        assert!(store.rollback_own(checkpoint, 1));
        assert_eq!(store.state().card_count(), 0);
    }

    #[tokio::test]
    async fn rollback_own_keeps_edits_from_other_writers() {
        let store = seeded();
        let checkpoint = store.checkpoint();
        store.dispatch(Action::add_card("s1", CardSize::unit()));
        // Someone else edits while the owner is suspended.
        store.dispatch(Action::add_section("Manual"));

        assert!(!store.rollback_own(checkpoint, 1));
        let state = store.state();
        assert_eq!(state.sections.len(), 2);
        assert_eq!(state.sections[1].title, "Manual");
    }

    #[tokio::test]
    async fn failed_save_leaves_state_intact() {
        let store = seeded();
        let before = store.state();
        let err = store.save_to(&FailingRepo, "me").await.unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert_eq!(store.state(), before);
        assert!(store.is_dirty());
    }

    #[tokio::test]
    async fn empty_load_yields_empty_portfolio() {
        let store = seeded();
        let found = store.load_from(&FailingRepo, "me").await.unwrap();
        assert!(!found);
        assert!(store.state().sections.is_empty());
    }

    #[tokio::test]
    async fn dispatch_publishes_state_changed() {
        let bus = Arc::new(EventBus::new(8));
        let mut rx = bus.subscribe();
        let store = PortfolioStore::default().with_events(bus);
        store.dispatch(Action::add_section("About"));

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::StateChanged { action, revision, .. } => {
                assert_eq!(action, "ADD_SECTION");
                assert_eq!(*revision, 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
