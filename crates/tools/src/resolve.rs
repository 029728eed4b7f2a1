//! Argument helpers and entity resolution shared by every tool.
//!
//! Tool calls address sections by title (case-insensitive) or 0-based index,
//! and cards by 0-based index or a fuzzy caption/text match. Every failure
//! names the alternatives, and index failures are phrased as 1-based
//! positions so the model can repeat them back to the user verbatim.

use bentofolio_core::{Card, PortfolioState, Section};
use serde_json::{Map, Value, json};

// ── Argument access ─────────────────────────────────────────────────────────

pub fn str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

/// Integer argument; whole floats such as `2.0` are accepted.
pub fn int_arg(args: &Value, key: &str) -> Option<i64> {
    let value = args.get(key)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
}

pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Message for an index outside `0..max_valid`, reported 1-based.
///
/// `owner` reads as the sentence subject, e.g. `The "Work" section`.
pub fn out_of_range(
    label: &str,
    index: i64,
    owner: &str,
    count: usize,
    noun: &str,
    max_valid: usize,
) -> String {
    let position = index.saturating_add(1);
    if max_valid == 0 {
        format!("Invalid {label} position {position}. {owner} has no {noun}s yet.")
    } else {
        format!(
            "Invalid {label} position {position}. {owner} only has {} (valid positions are 1 to {max_valid}).",
            plural(count, noun)
        )
    }
}

/// Checked conversion of a 0-based index into `0..len`.
pub fn checked_index(index: i64, len: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|&i| i < len)
}

// ── Schemas ─────────────────────────────────────────────────────────────────

/// Object schema from a property map and required keys.
pub fn object_schema(properties: Map<String, Value>, required: &[&str]) -> Value {
    let mut schema = json!({ "type": "object", "properties": properties });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

pub fn section_selector_properties(props: &mut Map<String, Value>, what: &str) {
    props.insert(
        "sectionTitle".into(),
        json!({ "type": "string", "description": format!("Title of the section {what} (case-insensitive)") }),
    );
    props.insert(
        "sectionIndex".into(),
        json!({ "type": "integer", "description": "Index of the section (0-based)" }),
    );
}

pub fn card_selector_properties(props: &mut Map<String, Value>) {
    props.insert(
        "cardIndex".into(),
        json!({ "type": "integer", "description": "Index of the card within the section (0-based)" }),
    );
    props.insert(
        "cardTitle".into(),
        json!({ "type": "string", "description": "Caption or text content to match the card" }),
    );
}

// ── Resolution ──────────────────────────────────────────────────────────────

/// How a tool call names a section.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionSelector<'a> {
    pub title: Option<&'a str>,
    pub index: Option<i64>,
}

impl<'a> SectionSelector<'a> {
    pub fn from_args(args: &'a Value) -> Self {
        Self::from_keys(args, "sectionTitle", "sectionIndex")
    }

    pub fn from_keys(args: &'a Value, title_key: &str, index_key: &str) -> Self {
        Self {
            title: str_arg(args, title_key),
            index: int_arg(args, index_key),
        }
    }
}

fn quoted_titles(state: &PortfolioState) -> String {
    if state.sections.is_empty() {
        return "none".into();
    }
    state
        .sections
        .iter()
        .map(|s| format!("\"{}\"", s.title))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Find a section by title first, then by index.
pub fn resolve_section<'s>(
    state: &'s PortfolioState,
    selector: SectionSelector<'_>,
) -> Result<(usize, &'s Section), String> {
    if let Some(title) = selector.title {
        let wanted = title.to_lowercase();
        return state
            .sections
            .iter()
            .enumerate()
            .find(|(_, s)| s.title.to_lowercase() == wanted)
            .ok_or_else(|| {
                format!(
                    "No section found with title \"{title}\". Available sections: {}",
                    quoted_titles(state)
                )
            });
    }
    if let Some(index) = selector.index {
        let count = state.sections.len();
        return checked_index(index, count)
            .map(|i| (i, &state.sections[i]))
            .ok_or_else(|| {
                let mut message = out_of_range("section", index, "The portfolio", count, "section", count);
                if count > 0 {
                    message.push_str(&format!(" Available sections: {}", quoted_titles(state)));
                }
                message
            });
    }
    Err("Either sectionTitle or sectionIndex must be provided.".into())
}

/// How a tool call names a card inside a resolved section.
#[derive(Debug, Clone, Copy, Default)]
pub struct CardSelector<'a> {
    pub index: Option<i64>,
    pub query: Option<&'a str>,
}

impl<'a> CardSelector<'a> {
    pub fn from_args(args: &'a Value) -> Self {
        Self {
            index: int_arg(args, "cardIndex"),
            query: str_arg(args, "cardTitle"),
        }
    }
}

/// Short human label for a card, used when listing alternatives.
pub fn card_label(card: &Card) -> String {
    let content = &card.content;
    if !content.title.is_empty() {
        return format!("\"{}\"", content.title);
    }
    match content.body.text().filter(|t| !t.is_empty()) {
        Some(text) => format!("\"{}\"", preview(text, 30)),
        None => format!("untitled {} {}", card.size, content.kind().as_str()),
    }
}

/// First `max_chars` characters, with an ellipsis when truncated.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn section_owner(section: &Section) -> String {
    format!("The \"{}\" section", section.title)
}

/// Find a card by index first, then by case-insensitive substring of its
/// caption or text.
pub fn resolve_card<'s>(
    section: &'s Section,
    selector: CardSelector<'_>,
) -> Result<(usize, &'s Card), String> {
    if let Some(index) = selector.index {
        let count = section.cards.len();
        return checked_index(index, count)
            .map(|i| (i, &section.cards[i]))
            .ok_or_else(|| out_of_range("card", index, &section_owner(section), count, "card", count));
    }
    if let Some(query) = selector.query {
        let wanted = query.to_lowercase();
        let matches = |card: &Card| {
            card.content.title.to_lowercase().contains(&wanted)
                || card
                    .content
                    .body
                    .text()
                    .is_some_and(|t| t.to_lowercase().contains(&wanted))
        };
        return section
            .cards
            .iter()
            .enumerate()
            .find(|(_, c)| matches(c))
            .ok_or_else(|| {
                let listing = if section.cards.is_empty() {
                    "The section has no cards.".to_string()
                } else {
                    let cards: Vec<String> = section
                        .cards
                        .iter()
                        .enumerate()
                        .map(|(i, c)| format!("#{} {}", i + 1, card_label(c)))
                        .collect();
                    format!("Cards in this section: {}", cards.join(", "))
                };
                format!(
                    "No card found matching \"{query}\" in section \"{}\". {listing}",
                    section.title
                )
            });
    }
    Err("Either cardIndex or cardTitle must be provided.".into())
}
