//! State-mutation actions and the reducer that applies them.
//!
//! Manual edits, drag commits, and agent tool calls all funnel into these
//! actions; nothing else writes to [`PortfolioState`].

use crate::portfolio::{
    Bio, BioUpdate, Card, CardSize, ContentUpdate, GridConfig, PortfolioState, Section, Snapshot,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum Action {
    AddCard {
        section_id: String,
        #[serde(default = "new_id")]
        card_id: String,
        #[serde(default, rename = "bento")]
        size: CardSize,
        /// Position to insert at; appended when absent or past the end.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        insert_index: Option<usize>,
    },
    RemoveCard {
        section_id: String,
        card_id: String,
    },
    ResizeCard {
        section_id: String,
        card_id: String,
        #[serde(rename = "bento")]
        size: CardSize,
    },
    UpdateCardContent {
        section_id: String,
        card_id: String,
        update: ContentUpdate,
    },
    ReorderCards {
        section_id: String,
        from_index: usize,
        to_index: usize,
    },
    MoveCardToSection {
        card_id: String,
        from_section_id: String,
        to_section_id: String,
        /// Insertion index in the target section; appended when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to_index: Option<usize>,
    },
    AddSection {
        #[serde(default = "new_id")]
        section_id: String,
        title: String,
    },
    RemoveSection {
        section_id: String,
    },
    RenameSection {
        section_id: String,
        title: String,
    },
    ReorderSections {
        from_index: usize,
        to_index: usize,
    },
    SetBio {
        update: BioUpdate,
    },
    ClearBio,
    SetGridConfig {
        config: GridConfig,
    },
    ResetState,
    LoadState {
        state: Box<PortfolioState>,
    },
    RestoreSnapshot {
        snapshot: Snapshot,
    },
    MarkSaved {
        saved_at: DateTime<Utc>,
    },
}

impl Action {
    /// Convenience constructor that mints a fresh card id.
    pub fn add_card(section_id: impl Into<String>, size: CardSize) -> Self {
        Action::AddCard {
            section_id: section_id.into(),
            card_id: new_id(),
            size,
            insert_index: None,
        }
    }

    /// Convenience constructor that mints a fresh section id.
    pub fn add_section(title: impl Into<String>) -> Self {
        Action::AddSection {
            section_id: new_id(),
            title: title.into(),
        }
    }

    /// Stable name used for logging and debounce grouping.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::AddCard { .. } => "ADD_CARD",
            Action::RemoveCard { .. } => "REMOVE_CARD",
            Action::ResizeCard { .. } => "RESIZE_CARD",
            Action::UpdateCardContent { .. } => "UPDATE_CARD_CONTENT",
            Action::ReorderCards { .. } => "REORDER_CARDS",
            Action::MoveCardToSection { .. } => "MOVE_CARD_TO_SECTION",
            Action::AddSection { .. } => "ADD_SECTION",
            Action::RemoveSection { .. } => "REMOVE_SECTION",
            Action::RenameSection { .. } => "RENAME_SECTION",
            Action::ReorderSections { .. } => "REORDER_SECTIONS",
            Action::SetBio { .. } => "SET_BIO",
            Action::ClearBio => "CLEAR_BIO",
            Action::SetGridConfig { .. } => "SET_GRID_CONFIG",
            Action::ResetState => "RESET_STATE",
            Action::LoadState { .. } => "LOAD_STATE",
            Action::RestoreSnapshot { .. } => "RESTORE_SNAPSHOT",
            Action::MarkSaved { .. } => "MARK_SAVED",
        }
    }

    /// Whether the action records an undo snapshot.
    pub fn is_tracked(&self) -> bool {
        !matches!(
            self,
            Action::SetGridConfig { .. }
                | Action::LoadState { .. }
                | Action::RestoreSnapshot { .. }
                | Action::MarkSaved { .. }
        )
    }

    /// Rapid repeats of these coalesce into one undo step.
    pub fn is_debounced(&self) -> bool {
        matches!(self, Action::UpdateCardContent { .. } | Action::SetBio { .. })
    }
}

/// Move `items[from]` to position `to`. Out-of-range `from` is a no-op and
/// `to` is clamped to the end.
fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() {
        return false;
    }
    let to = to.min(items.len() - 1);
    if from == to {
        return false;
    }
    let item = items.remove(from);
    items.insert(to, item);
    true
}

fn card_mut<'a>(state: &'a mut PortfolioState, section_id: &str, card_id: &str) -> Option<&'a mut Card> {
    state
        .section_mut(section_id)
        .and_then(|s| s.cards.iter_mut().find(|c| c.id == card_id))
}

/// Apply `action` to `state`. Returns `true` when anything changed.
///
/// Actions naming a section or card that does not exist are no-ops.
pub fn reduce(state: &mut PortfolioState, action: &Action) -> bool {
    match action {
        Action::AddCard { section_id, card_id, size, insert_index } => {
            let color = state.next_card_color();
            let Some(section) = state.section_mut(section_id) else {
                return false;
            };
            let card = Card::new(card_id.clone(), *size, color);
            let at = insert_index.unwrap_or(section.cards.len()).min(section.cards.len());
            section.cards.insert(at, card);
            true
        }
        Action::RemoveCard { section_id, card_id } => {
            let Some(section) = state.section_mut(section_id) else {
                return false;
            };
            let before = section.cards.len();
            section.cards.retain(|c| &c.id != card_id);
            section.cards.len() != before
        }
        Action::ResizeCard { section_id, card_id, size } => match card_mut(state, section_id, card_id) {
            Some(card) if card.size != *size => {
                card.size = *size;
                true
            }
            _ => false,
        },
        Action::UpdateCardContent { section_id, card_id, update } => {
            match card_mut(state, section_id, card_id) {
                Some(card) => {
                    let before = card.content.clone();
                    card.content.apply(update);
                    card.content != before
                }
                None => false,
            }
        }
        Action::ReorderCards { section_id, from_index, to_index } => state
            .section_mut(section_id)
            .is_some_and(|s| move_item(&mut s.cards, *from_index, *to_index)),
        Action::MoveCardToSection { card_id, from_section_id, to_section_id, to_index } => {
            if from_section_id == to_section_id || state.section(to_section_id).is_none() {
                return false;
            }
            let Some(source) = state.section_mut(from_section_id) else {
                return false;
            };
            let Some(idx) = source.card_index(card_id) else {
                return false;
            };
            let card = source.cards.remove(idx);
            let Some(target) = state.section_mut(to_section_id) else {
                return false;
            };
            let at = to_index.unwrap_or(target.cards.len()).min(target.cards.len());
            target.cards.insert(at, card);
            true
        }
        Action::AddSection { section_id, title } => {
            state.sections.push(Section::new(section_id.clone(), title.clone()));
            true
        }
        Action::RemoveSection { section_id } => {
            let before = state.sections.len();
            state.sections.retain(|s| &s.id != section_id);
            state.sections.len() != before
        }
        Action::RenameSection { section_id, title } => match state.section_mut(section_id) {
            Some(section) if &section.title != title => {
                section.title = title.clone();
                true
            }
            _ => false,
        },
        Action::ReorderSections { from_index, to_index } => {
            move_item(&mut state.sections, *from_index, *to_index)
        }
        Action::SetBio { update } => {
            let bio = state.bio.get_or_insert_with(Bio::default);
            bio.apply(update);
            true
        }
        Action::ClearBio => state.bio.take().is_some(),
        Action::SetGridConfig { config } => {
            if state.grid_config == *config {
                return false;
            }
            state.grid_config = *config;
            true
        }
        Action::ResetState => {
            *state = PortfolioState {
                grid_config: state.grid_config,
                ..PortfolioState::default()
            };
            true
        }
        Action::LoadState { state: loaded } => {
            *state = loaded.as_ref().clone();
            true
        }
        Action::RestoreSnapshot { snapshot } => {
            state.sections = snapshot.sections.clone();
            state.bio = snapshot.bio.clone();
            true
        }
        Action::MarkSaved { saved_at } => {
            state.saved_at = Some(*saved_at);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_section() -> PortfolioState {
        let mut state = PortfolioState::default();
        reduce(&mut state, &Action::AddSection { section_id: "s1".into(), title: "Work".into() });
        state
    }

    fn add(state: &mut PortfolioState, id: &str) {
        reduce(
            state,
            &Action::AddCard {
                section_id: "s1".into(),
                card_id: id.into(),
                size: CardSize::unit(),
                insert_index: None,
            },
        );
    }

    fn ids(state: &PortfolioState, section: &str) -> Vec<String> {
        state.section(section).unwrap().cards.iter().map(|c| c.id.clone()).collect()
    }

    #[test]
    fn add_card_honours_insert_index() {
        let mut state = state_with_section();
        add(&mut state, "a");
        add(&mut state, "b");
        reduce(
            &mut state,
            &Action::AddCard {
                section_id: "s1".into(),
                card_id: "x".into(),
                size: CardSize::new(2, 1),
                insert_index: Some(1),
            },
        );
        assert_eq!(ids(&state, "s1"), ["a", "x", "b"]);
    }

    #[test]
    fn add_card_to_missing_section_is_noop() {
        let mut state = PortfolioState::default();
        assert!(!reduce(&mut state, &Action::add_card("nope", CardSize::unit())));
        assert_eq!(state.card_count(), 0);
    }

    #[test]
    fn reorder_moves_and_clamps() {
        let mut state = state_with_section();
        for id in ["a", "b", "c"] {
            add(&mut state, id);
        }
        assert!(reduce(
            &mut state,
            &Action::ReorderCards { section_id: "s1".into(), from_index: 0, to_index: 99 }
        ));
        assert_eq!(ids(&state, "s1"), ["b", "c", "a"]);
        assert!(!reduce(
            &mut state,
            &Action::ReorderCards { section_id: "s1".into(), from_index: 7, to_index: 0 }
        ));
    }

    #[test]
    fn move_card_between_sections_appends_without_index() {
        let mut state = state_with_section();
        reduce(&mut state, &Action::AddSection { section_id: "s2".into(), title: "Play".into() });
        add(&mut state, "a");
        add(&mut state, "b");
        assert!(reduce(
            &mut state,
            &Action::MoveCardToSection {
                card_id: "a".into(),
                from_section_id: "s1".into(),
                to_section_id: "s2".into(),
                to_index: None,
            }
        ));
        assert_eq!(ids(&state, "s1"), ["b"]);
        assert_eq!(ids(&state, "s2"), ["a"]);
    }

    #[test]
    fn move_card_to_missing_section_keeps_card() {
        let mut state = state_with_section();
        add(&mut state, "a");
        assert!(!reduce(
            &mut state,
            &Action::MoveCardToSection {
                card_id: "a".into(),
                from_section_id: "s1".into(),
                to_section_id: "ghost".into(),
                to_index: Some(0),
            }
        ));
        assert_eq!(ids(&state, "s1"), ["a"]);
    }

    #[test]
    fn remove_section_cascades() {
        let mut state = state_with_section();
        add(&mut state, "a");
        reduce(&mut state, &Action::RemoveSection { section_id: "s1".into() });
        assert!(state.sections.is_empty());
        assert_eq!(state.card_count(), 0);
    }

    #[test]
    fn set_bio_creates_then_merges() {
        let mut state = PortfolioState::default();
        reduce(
            &mut state,
            &Action::SetBio { update: BioUpdate { name: Some("Ada".into()), ..Default::default() } },
        );
        reduce(
            &mut state,
            &Action::SetBio {
                update: BioUpdate { description: Some("Engineer".into()), ..Default::default() },
            },
        );
        let bio = state.bio.as_ref().unwrap();
        assert_eq!(bio.name, "Ada");
        assert_eq!(bio.description, "Engineer");
        assert!(reduce(&mut state, &Action::ClearBio));
        assert!(!reduce(&mut state, &Action::ClearBio));
    }

    #[test]
    fn action_json_shape() {
        let json = serde_json::json!({
            "type": "MOVE_CARD_TO_SECTION",
            "cardId": "c1",
            "fromSectionId": "s1",
            "toSectionId": "s2"
        });
        let action: Action = serde_json::from_value(json).unwrap();
        assert!(matches!(action, Action::MoveCardToSection { to_index: None, .. }));

        let add: Action = serde_json::from_value(serde_json::json!({
            "type": "ADD_CARD", "sectionId": "s1", "bento": "2x2"
        }))
        .unwrap();
        match add {
            Action::AddCard { card_id, size, .. } => {
                assert!(!card_id.is_empty());
                assert_eq!(size, CardSize::new(2, 2));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
