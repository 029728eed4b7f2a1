//! Card tools: add, remove, resize, edit content, list, and move cards.

use crate::resolve::{
    CardSelector, SectionSelector, card_selector_properties, checked_index, int_arg,
    object_schema, out_of_range, resolve_card, resolve_section, section_selector_properties,
    str_arg,
};
use bentofolio_core::{
    Action, CardKind, CardSize, ContentUpdate, PortfolioState, PortfolioStore, Tool, ToolError,
    ToolResult,
};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use uuid::Uuid;

fn span_property(axis: &str, unit: &str) -> Value {
    json!({
        "type": "integer",
        "minimum": 1,
        "maximum": 4,
        "description": format!("Card {axis} in grid {unit} (1-4)")
    })
}

/// Section and card ids plus the section title for messages.
struct CardTarget {
    section_id: String,
    section_title: String,
    card_id: String,
    card_index: usize,
}

fn resolve_target(state: &PortfolioState, arguments: &Value) -> Result<CardTarget, String> {
    let (_, section) = resolve_section(state, SectionSelector::from_args(arguments))?;
    let (card_index, card) = resolve_card(section, CardSelector::from_args(arguments))?;
    Ok(CardTarget {
        section_id: section.id.clone(),
        section_title: section.title.clone(),
        card_id: card.id.clone(),
        card_index,
    })
}

fn section_and_card_schema(extra: Map<String, Value>, required: &[&str]) -> Value {
    let mut props = Map::new();
    section_selector_properties(&mut props, "containing the card");
    card_selector_properties(&mut props);
    props.extend(extra);
    object_schema(props, required)
}

// ── add / remove / resize ───────────────────────────────────────────────────

pub struct AddCardTool;

impl Tool for AddCardTool {
    fn name(&self) -> &str {
        "add_card"
    }

    fn description(&self) -> &str {
        "Adds a new card to a section. Specify the section by title or index. Optionally set the size in grid cells and the insert position."
    }

    fn parameters_schema(&self) -> Value {
        let mut props = Map::new();
        section_selector_properties(&mut props, "to add the card to");
        props.insert("width".into(), span_property("width", "columns"));
        props.insert("height".into(), span_property("height", "rows"));
        props.insert(
            "insertIndex".into(),
            json!({ "type": "integer", "description": "Position to insert the card at (0-based). If omitted, the card goes to the end." }),
        );
        object_schema(props, &[])
    }

    fn execute(&self, arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let size = CardSize::new(
            int_arg(arguments, "width").unwrap_or(1),
            int_arg(arguments, "height").unwrap_or(1),
        );
        let resolved = store.read(|state| {
            resolve_section(state, SectionSelector::from_args(arguments))
                .map(|(_, s)| (s.id.clone(), s.title.clone(), s.cards.len()))
        });
        let (section_id, title, count) = match resolved {
            Ok(found) => found,
            Err(e) => return Ok(ToolResult::fail(e)),
        };

        let index = match int_arg(arguments, "insertIndex") {
            None => count,
            Some(raw) => match checked_index(raw, count + 1) {
                Some(i) => i,
                None => {
                    let owner = format!("The \"{title}\" section");
                    return Ok(ToolResult::fail(out_of_range("insert", raw, &owner, count, "card", count + 1)));
                }
            },
        };

        let card_id = Uuid::new_v4().to_string();
        debug!(section = %title, %size, index, "Adding card");
        store.dispatch(Action::AddCard {
            section_id,
            card_id: card_id.clone(),
            size,
            insert_index: Some(index),
        });
        Ok(ToolResult::ok(format!("Added {size} card to section \"{title}\""))
            .with("cardIndex", index)
            .with("cardId", card_id))
    }
}

pub struct RemoveCardTool;

impl Tool for RemoveCardTool {
    fn name(&self) -> &str {
        "remove_card"
    }

    fn description(&self) -> &str {
        "Removes a card from a section. Identify the card by index (0-based) or by matching caption/text content."
    }

    fn parameters_schema(&self) -> Value {
        section_and_card_schema(Map::new(), &[])
    }

    fn execute(&self, arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let target = match store.read(|state| resolve_target(state, arguments)) {
            Ok(target) => target,
            Err(e) => return Ok(ToolResult::fail(e)),
        };
        debug!(section = %target.section_title, card = %target.card_id, "Removing card");
        store.dispatch(Action::RemoveCard { section_id: target.section_id, card_id: target.card_id });
        Ok(ToolResult::ok(format!(
            "Removed card {} from section \"{}\"",
            target.card_index + 1,
            target.section_title
        )))
    }
}

pub struct ResizeCardTool;

impl Tool for ResizeCardTool {
    fn name(&self) -> &str {
        "resize_card"
    }

    fn description(&self) -> &str {
        "Resizes a card. Specify width (columns) and height (rows), each 1-4."
    }

    fn parameters_schema(&self) -> Value {
        let mut extra = Map::new();
        extra.insert("width".into(), span_property("width", "columns"));
        extra.insert("height".into(), span_property("height", "rows"));
        section_and_card_schema(extra, &["width", "height"])
    }

    fn execute(&self, arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let size = CardSize::new(
            int_arg(arguments, "width").unwrap_or(1),
            int_arg(arguments, "height").unwrap_or(1),
        );
        let target = match store.read(|state| resolve_target(state, arguments)) {
            Ok(target) => target,
            Err(e) => return Ok(ToolResult::fail(e)),
        };
        store.dispatch(Action::ResizeCard {
            section_id: target.section_id,
            card_id: target.card_id,
            size,
        });
        Ok(ToolResult::ok(format!("Resized card to {size}")))
    }
}

// ── content edits ───────────────────────────────────────────────────────────

fn update_content(
    store: &PortfolioStore,
    arguments: &Value,
    update: ContentUpdate,
    message: String,
) -> ToolResult {
    let target = match store.read(|state| resolve_target(state, arguments)) {
        Ok(target) => target,
        Err(e) => return ToolResult::fail(e),
    };
    store.dispatch(Action::UpdateCardContent {
        section_id: target.section_id,
        card_id: target.card_id,
        update,
    });
    ToolResult::ok(message)
}

pub struct UpdateCardCaptionTool;

impl Tool for UpdateCardCaptionTool {
    fn name(&self) -> &str {
        "update_card_caption"
    }

    fn description(&self) -> &str {
        "Updates only the caption shown on a card. Does not change the card type or other properties."
    }

    fn parameters_schema(&self) -> Value {
        let mut extra = Map::new();
        extra.insert("caption".into(), json!({ "type": "string", "description": "New caption text to display on the card" }));
        section_and_card_schema(extra, &["caption"])
    }

    fn execute(&self, arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let caption = str_arg(arguments, "caption").unwrap_or_default().to_string();
        let update = ContentUpdate { title: Some(caption.clone()), ..Default::default() };
        Ok(update_content(store, arguments, update, format!("Updated caption to \"{caption}\"")))
    }
}

pub struct UpdateCardTextTool;

impl Tool for UpdateCardTextTool {
    fn name(&self) -> &str {
        "update_card_text"
    }

    fn description(&self) -> &str {
        "Updates a card's text content, caption, and colors. The card type is set to \"text\" automatically."
    }

    fn parameters_schema(&self) -> Value {
        let mut extra = Map::new();
        extra.insert("text".into(), json!({ "type": "string", "description": "Main text content for the card" }));
        extra.insert("title".into(), json!({ "type": "string", "description": "Caption displayed on the card" }));
        extra.insert("bgColor".into(), json!({ "type": "string", "description": "Background color as hex (e.g. \"#fde2e4\")" }));
        extra.insert("textColor".into(), json!({ "type": "string", "description": "Text color as hex (e.g. \"#374151\")" }));
        section_and_card_schema(extra, &[])
    }

    fn execute(&self, arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let owned = |key: &str| str_arg(arguments, key).map(str::to_string);
        let update = ContentUpdate {
            kind: Some(CardKind::Text),
            text: owned("text"),
            title: owned("title"),
            bg_color: owned("bgColor"),
            text_color: owned("textColor"),
            ..Default::default()
        };
        Ok(update_content(store, arguments, update, "Updated card content".into()))
    }
}

pub struct UpdateCardLinkTool;

impl Tool for UpdateCardLinkTool {
    fn name(&self) -> &str {
        "update_card_link"
    }

    fn description(&self) -> &str {
        "Sets or updates the click-through link URL on a card. An empty string removes the link."
    }

    fn parameters_schema(&self) -> Value {
        let mut extra = Map::new();
        extra.insert("linkUrl".into(), json!({ "type": "string", "description": "The URL to link the card to" }));
        section_and_card_schema(extra, &["linkUrl"])
    }

    fn execute(&self, arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let link = str_arg(arguments, "linkUrl").unwrap_or_default().trim().to_string();
        let message = if link.is_empty() { "Removed link from card" } else { "Set link URL on card" };
        let update = ContentUpdate { link_url: Some(link), ..Default::default() };
        Ok(update_content(store, arguments, update, message.into()))
    }
}

// ── listing and moving ──────────────────────────────────────────────────────

pub struct ListCardsTool;

impl Tool for ListCardsTool {
    fn name(&self) -> &str {
        "list_cards"
    }

    fn description(&self) -> &str {
        "Lists the cards in a section, or in every section when none is specified. Returns type, size, caption, text, link and color."
    }

    fn parameters_schema(&self) -> Value {
        let mut props = Map::new();
        section_selector_properties(&mut props, "to list; omit to list all sections");
        object_schema(props, &[])
    }

    fn execute(&self, arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let selector = SectionSelector::from_args(arguments);
        let listing = store.read(|state| {
            let sections: Vec<_> = if selector.title.is_some() || selector.index.is_some() {
                vec![resolve_section(state, selector)?.1]
            } else {
                state.sections.iter().collect()
            };
            let data: Vec<Value> = sections
                .into_iter()
                .map(|s| {
                    let cards: Vec<Value> = s
                        .cards
                        .iter()
                        .enumerate()
                        .map(|(i, c)| {
                            let non_empty = |v: &str| (!v.is_empty()).then(|| v.to_string());
                            json!({
                                "index": i,
                                "bento": c.size.to_string(),
                                "type": c.content.kind().as_str(),
                                "title": non_empty(&c.content.title),
                                "text": c.content.body.text().and_then(non_empty),
                                "linkUrl": non_empty(&c.content.link_url),
                                "bgColor": c.content.bg_color,
                            })
                        })
                        .collect();
                    json!({ "sectionTitle": s.title, "cards": cards })
                })
                .collect();
            Ok::<_, String>(data)
        });
        match listing {
            Ok(sections) => {
                let total: usize = sections
                    .iter()
                    .map(|s| s["cards"].as_array().map_or(0, Vec::len))
                    .sum();
                Ok(ToolResult::ok(format!("Found {total} card(s)")).with("sections", sections))
            }
            Err(e) => Ok(ToolResult::fail(e)),
        }
    }
}

pub struct MoveCardTool;

impl Tool for MoveCardTool {
    fn name(&self) -> &str {
        "move_card"
    }

    fn description(&self) -> &str {
        "Moves a card to a different position within the same section. Provide fromIndex and toIndex (0-based)."
    }

    fn parameters_schema(&self) -> Value {
        let mut props = Map::new();
        section_selector_properties(&mut props, "containing the card");
        props.insert("fromIndex".into(), json!({ "type": "integer", "description": "Current position of the card (0-based)" }));
        props.insert("toIndex".into(), json!({ "type": "integer", "description": "Target position for the card (0-based)" }));
        object_schema(props, &["fromIndex", "toIndex"])
    }

    fn execute(&self, arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let from = int_arg(arguments, "fromIndex").unwrap_or(-1);
        let to = int_arg(arguments, "toIndex").unwrap_or(-1);
        let resolved = store.read(|state| {
            resolve_section(state, SectionSelector::from_args(arguments))
                .map(|(_, s)| (s.id.clone(), s.title.clone(), s.cards.len()))
        });
        let (section_id, title, count) = match resolved {
            Ok(found) => found,
            Err(e) => return Ok(ToolResult::fail(e)),
        };
        let owner = format!("The \"{title}\" section");

        let Some(from_index) = checked_index(from, count) else {
            return Ok(ToolResult::fail(out_of_range("source", from, &owner, count, "card", count)));
        };
        let Some(to_index) = checked_index(to, count) else {
            return Ok(ToolResult::fail(out_of_range("target", to, &owner, count, "card", count)));
        };

        store.dispatch(Action::ReorderCards { section_id, from_index, to_index });
        Ok(ToolResult::ok(format!(
            "Moved card from position {} to position {} in section \"{title}\"",
            from_index + 1,
            to_index + 1
        )))
    }
}

pub struct MoveCardToSectionTool;

impl Tool for MoveCardToSectionTool {
    fn name(&self) -> &str {
        "move_card_to_section"
    }

    fn description(&self) -> &str {
        "Moves a card from one section to another. Optionally specify the position in the target section."
    }

    fn parameters_schema(&self) -> Value {
        let mut props = Map::new();
        card_selector_properties(&mut props);
        props.insert("fromSectionTitle".into(), json!({ "type": "string", "description": "Title of the section the card is in" }));
        props.insert("fromSectionIndex".into(), json!({ "type": "integer", "description": "Index of the source section (0-based)" }));
        props.insert("toSectionTitle".into(), json!({ "type": "string", "description": "Title of the target section" }));
        props.insert("toSectionIndex".into(), json!({ "type": "integer", "description": "Index of the target section (0-based)" }));
        props.insert(
            "toIndex".into(),
            json!({ "type": "integer", "description": "Position in the target section (0-based). If omitted, the card goes to the end." }),
        );
        object_schema(props, &[])
    }

    fn execute(&self, arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError> {
        let to_index = int_arg(arguments, "toIndex");
        let planned = store.read(|state| {
            let (_, source) =
                resolve_section(state, SectionSelector::from_keys(arguments, "fromSectionTitle", "fromSectionIndex"))
                    .map_err(|e| format!("Source: {e}"))?;
            let (_, target) =
                resolve_section(state, SectionSelector::from_keys(arguments, "toSectionTitle", "toSectionIndex"))
                    .map_err(|e| format!("Target: {e}"))?;
            if source.id == target.id {
                return Err(format!(
                    "The card is already in the \"{}\" section. Use move_card to change its position within a section.",
                    source.title
                ));
            }
            let (_, card) = resolve_card(source, CardSelector::from_args(arguments))?;

            let count = target.cards.len();
            let index = match to_index {
                None => None,
                Some(raw) => {
                    let owner = format!("The \"{}\" section", target.title);
                    let valid = checked_index(raw, count + 1)
                        .ok_or_else(|| out_of_range("target", raw, &owner, count, "card", count + 1))?;
                    Some(valid)
                }
            };

            Ok::<_, String>((
                Action::MoveCardToSection {
                    card_id: card.id.clone(),
                    from_section_id: source.id.clone(),
                    to_section_id: target.id.clone(),
                    to_index: index,
                },
                source.title.clone(),
                target.title.clone(),
            ))
        });

        match planned {
            Ok((action, from_title, to_title)) => {
                if !store.dispatch(action) {
                    warn!(from = %from_title, to = %to_title, "Card move was not applied");
                    return Ok(ToolResult::fail(format!(
                        "Could not move the card from section \"{from_title}\" to section \"{to_title}\"."
                    )));
                }
                Ok(ToolResult::ok(format!(
                    "Moved card from section \"{from_title}\" to section \"{to_title}\""
                )))
            }
            Err(e) => Ok(ToolResult::fail(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bentofolio_core::Section;

    fn store() -> PortfolioStore {
        let store = PortfolioStore::new(PortfolioState {
            sections: vec![Section::new("s1", "Work"), Section::new("s2", "Play")],
            ..Default::default()
        });
        for _ in 0..3 {
            store.dispatch(Action::add_card("s1", CardSize::unit()));
        }
        store
    }

    fn ids(store: &PortfolioStore, section: usize) -> Vec<String> {
        store.read(|s| s.sections[section].cards.iter().map(|c| c.id.clone()).collect())
    }

    #[test]
    fn add_card_reports_size_and_index() {
        let store = store();
        let result = AddCardTool
            .execute(&json!({"sectionTitle": "work", "width": 2, "height": 2}), &store)
            .unwrap();
        assert_eq!(result.message.as_deref(), Some("Added 2x2 card to section \"Work\""));
        assert_eq!(result.data["cardIndex"], 3);
        assert_eq!(store.read(|s| s.sections[0].cards[3].size), CardSize::new(2, 2));
    }

    #[test]
    fn add_card_at_position() {
        let store = store();
        let result = AddCardTool.execute(&json!({"sectionIndex": 0, "insertIndex": 1}), &store).unwrap();
        let new_id = result.data["cardId"].as_str().unwrap().to_string();
        assert_eq!(ids(&store, 0)[1], new_id);

        let bad = AddCardTool.execute(&json!({"sectionIndex": 1, "insertIndex": 2}), &store).unwrap();
        assert_eq!(
            bad.error.as_deref(),
            Some("Invalid insert position 3. The \"Play\" section only has 0 cards (valid positions are 1 to 1).")
        );
    }

    #[test]
    fn move_card_reports_one_based_range() {
        let store = store();
        let result = MoveCardTool
            .execute(&json!({"sectionTitle": "Work", "fromIndex": 5, "toIndex": 0}), &store)
            .unwrap();
        assert_eq!(
            result.error.as_deref(),
            Some("Invalid source position 6. The \"Work\" section only has 3 cards (valid positions are 1 to 3).")
        );
    }

    #[test]
    fn move_card_reorders() {
        let store = store();
        let before = ids(&store, 0);
        let result = MoveCardTool
            .execute(&json!({"sectionTitle": "Work", "fromIndex": 0, "toIndex": 2}), &store)
            .unwrap();
        assert_eq!(
            result.message.as_deref(),
            Some("Moved card from position 1 to position 3 in section \"Work\"")
        );
        assert_eq!(ids(&store, 0), vec![before[1].clone(), before[2].clone(), before[0].clone()]);
    }

    #[test]
    fn move_to_section_appends_or_inserts() {
        let store = store();
        let first = ids(&store, 0)[0].clone();
        let result = MoveCardToSectionTool
            .execute(&json!({"fromSectionTitle": "Work", "toSectionTitle": "Play", "cardIndex": 0}), &store)
            .unwrap();
        assert!(result.success);
        assert_eq!(ids(&store, 1), vec![first]);
        assert_eq!(ids(&store, 0).len(), 2);
    }

    #[test]
    fn move_to_same_section_fails_and_points_to_move_card() {
        let store = store();
        let before = ids(&store, 0);
        let revision = store.revision();

        let result = MoveCardToSectionTool
            .execute(
                &json!({"fromSectionTitle": "Work", "toSectionTitle": "work", "cardIndex": 0, "toIndex": 2}),
                &store,
            )
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("move_card"));
        assert_eq!(ids(&store, 0), before);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn move_to_section_prefixes_lookup_errors() {
        let store = store();
        let source = MoveCardToSectionTool
            .execute(&json!({"fromSectionTitle": "Nope", "toSectionTitle": "Play", "cardIndex": 0}), &store)
            .unwrap();
        assert!(source.error.unwrap().starts_with("Source: No section found"));

        let target = MoveCardToSectionTool
            .execute(&json!({"fromSectionTitle": "Work", "toSectionIndex": 9, "cardIndex": 0}), &store)
            .unwrap();
        assert!(target.error.unwrap().starts_with("Target: Invalid section position 10."));

        let position = MoveCardToSectionTool
            .execute(
                &json!({"fromSectionTitle": "Work", "toSectionTitle": "Play", "cardIndex": 0, "toIndex": 3}),
                &store,
            )
            .unwrap();
        assert_eq!(
            position.error.as_deref(),
            Some("Invalid target position 4. The \"Play\" section only has 0 cards (valid positions are 1 to 1).")
        );
    }

    #[test]
    fn update_text_switches_kind() {
        let store = store();
        let result = UpdateCardTextTool
            .execute(&json!({"sectionTitle": "Work", "cardIndex": 1, "text": "Hello", "bgColor": "#000"}), &store)
            .unwrap();
        assert!(result.success);
        let card = store.read(|s| s.sections[0].cards[1].clone());
        assert_eq!(card.content.kind(), CardKind::Text);
        assert_eq!(card.content.body.text(), Some("Hello"));
        assert_eq!(card.content.bg_color, "#000");

        let found = UpdateCardCaptionTool
            .execute(&json!({"sectionTitle": "Work", "cardTitle": "hell", "caption": "Greeting"}), &store)
            .unwrap();
        assert_eq!(found.message.as_deref(), Some("Updated caption to \"Greeting\""));
    }

    #[test]
    fn list_cards_for_unknown_section_fails() {
        let store = store();
        let result = ListCardsTool.execute(&json!({"sectionTitle": "Blog"}), &store).unwrap();
        assert!(!result.success);

        let all = ListCardsTool.execute(&json!({}), &store).unwrap();
        assert_eq!(all.message.as_deref(), Some("Found 3 card(s)"));
        assert_eq!(all.data["sections"][0]["cards"][0]["bento"], "1x1");
    }
}
