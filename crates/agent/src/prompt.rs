//! System prompt assembly.
//!
//! The prompt is rebuilt from the live portfolio before every model call so
//! the model always reasons about the state its previous tool calls produced.

use bentofolio_core::portfolio::{Card, PortfolioState};
use std::fmt::Write;

const TEXT_PREVIEW_CHARS: usize = 50;

const OPERATING_RULES: &str = "\
You are the Bentofolio assistant, built into a visual bento-grid portfolio editor. \
Turn what the user asks for into tool calls. You never change the portfolio yourself: \
call the tools, let them run, then explain the outcome. \
Only confirm an action when its tool result contains \"success\": true. \
When a tool result has \"success\": false, report the error to the user and do not claim the action happened.

POSITION INDEXING: Users count positions from 1 (\"the 1st card\", \"position 2\"). \
Tool arguments use 0-based indices, so subtract one before calling a tool. \
When talking to the user, always use 1-based positions. \
If a tool reports an index out of range, restate it in user terms (\"that section only has 4 cards\").

If a request is ambiguous, ask one short clarifying question. Refer to cards by caption or position and never guess. \
Keep replies short, friendly and focused on the result.

CARD PROPERTIES:
- \"caption\" is the label shown over image and video cards (update_card_caption keeps the card type)
- \"text\" is the body of a text card (update_card_text turns the card into a text card)
- \"link\" is the URL opened when the card is clicked (update_card_link)

If the portfolio is empty, help the user build one quickly: ask one question at a time, \
create sections, and suggest a bio, projects, images, videos, captions and links with sensible defaults.";

/// Build the system prompt for the current portfolio.
pub fn build_system_prompt(state: &PortfolioState) -> String {
    let mut prompt = String::with_capacity(OPERATING_RULES.len() + 512);
    prompt.push_str(OPERATING_RULES);
    prompt.push_str("\n\n## Current Portfolio State\n\n");
    prompt.push_str(&sections_summary(state));
    prompt.push_str("\n\n");
    prompt.push_str(&bio_summary(state));
    let _ = write!(
        prompt,
        "\n\nGrid config: {} columns, {}px gap",
        state.grid_config.max_columns, state.grid_config.cell_gap
    );
    prompt
}

fn sections_summary(state: &PortfolioState) -> String {
    if state.sections.is_empty() {
        return "  (no sections)".into();
    }
    let mut out = String::new();
    for (i, section) in state.sections.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "  Section {i}: \"{}\" ({} cards)", section.title, section.cards.len());
        for (j, card) in section.cards.iter().enumerate() {
            out.push('\n');
            out.push_str(&card_summary(j, card));
        }
    }
    out
}

fn card_summary(index: usize, card: &Card) -> String {
    let content = &card.content;
    let mut line = format!("    Card {index}: {} {}", card.size, content.kind().as_str());
    if !content.title.is_empty() {
        let _ = write!(line, " caption=\"{}\"", content.title);
    }
    if let Some(text) = content.body.text().filter(|t| !t.is_empty()) {
        let mut chars = text.chars();
        let head: String = chars.by_ref().take(TEXT_PREVIEW_CHARS).collect();
        let ellipsis = if chars.next().is_some() { "..." } else { "" };
        let _ = write!(line, " text=\"{head}{ellipsis}\"");
    }
    if !content.link_url.is_empty() {
        let _ = write!(line, " link=\"{}\"", content.link_url);
    }
    line
}

fn bio_summary(state: &PortfolioState) -> String {
    match &state.bio {
        Some(bio) => format!(
            "Bio: name=\"{}\", description=\"{}\", {} blocks",
            bio.name,
            bio.description,
            bio.blocks.len()
        ),
        None => "Bio: not set".into(),
    }
}
