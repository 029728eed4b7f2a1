//! Portfolio domain model: sections of sized cards, the bio sidebar, and the
//! grid configuration shared by every section grid.
//!
//! A card's [`CardSize`] is the only input the packer ever sees; everything in
//! [`CardContent`] is opaque to layout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest span (in grid units) a card may declare on either axis.
pub const MAX_CARD_SPAN: u8 = 4;

/// Background colours handed out to new cards in rotation.
pub const CARD_PALETTE: [&str; 6] = [
    "#fde2e4", "#d3e4cd", "#dde1f8", "#fce8c3", "#c9e8f5", "#f5e6d3",
];

/// Default foreground colour for card captions and text.
pub const DEFAULT_TEXT_COLOR: &str = "#374151";

// ── Card size ───────────────────────────────────────────────────────────────

/// Card footprint in grid units. Serialized as the bento string `"WxH"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CardSize {
    pub cols: u8,
    pub rows: u8,
}

impl CardSize {
    /// Build a size, clamping both axes into `1..=MAX_CARD_SPAN`.
    pub fn new(cols: i64, rows: i64) -> Self {
        Self {
            cols: clamp_span(cols),
            rows: clamp_span(rows),
        }
    }

    pub fn unit() -> Self {
        Self { cols: 1, rows: 1 }
    }

    /// Parse a `"WxH"` bento string. Unparseable components fall back to 1.
    pub fn parse(bento: &str) -> Self {
        let mut parts = bento.trim().splitn(2, ['x', 'X']);
        let cols = parts
            .next()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(1);
        let rows = parts
            .next()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(1);
        Self::new(cols, rows)
    }
}

fn clamp_span(v: i64) -> u8 {
    v.clamp(1, MAX_CARD_SPAN as i64) as u8
}

impl Default for CardSize {
    fn default() -> Self {
        Self::unit()
    }
}

impl fmt::Display for CardSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

impl From<String> for CardSize {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<CardSize> for String {
    fn from(size: CardSize) -> Self {
        size.to_string()
    }
}

// ── Card content ────────────────────────────────────────────────────────────

/// Which payload a card renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Image,
    Video,
    Text,
}

impl CardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardKind::Image => "image",
            CardKind::Video => "video",
            CardKind::Text => "text",
        }
    }

    fn empty_body(self) -> CardBody {
        match self {
            CardKind::Image => CardBody::Image { image_url: String::new() },
            CardKind::Video => CardBody::Video { video_url: String::new() },
            CardKind::Text => CardBody::Text { text: String::new() },
        }
    }
}

/// The type-specific payload. Exactly one is active at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CardBody {
    Image {
        #[serde(rename = "imageUrl", default)]
        image_url: String,
    },
    Video {
        #[serde(rename = "videoUrl", default)]
        video_url: String,
    },
    Text {
        #[serde(default)]
        text: String,
    },
}

impl CardBody {
    pub fn kind(&self) -> CardKind {
        match self {
            CardBody::Image { .. } => CardKind::Image,
            CardBody::Video { .. } => CardKind::Video,
            CardBody::Text { .. } => CardKind::Text,
        }
    }

    /// The media URL for image and video cards.
    pub fn media_url(&self) -> Option<&str> {
        match self {
            CardBody::Image { image_url } => Some(image_url),
            CardBody::Video { video_url } => Some(video_url),
            CardBody::Text { .. } => None,
        }
    }

    pub fn media_url_mut(&mut self) -> Option<&mut String> {
        match self {
            CardBody::Image { image_url } => Some(image_url),
            CardBody::Video { video_url } => Some(video_url),
            CardBody::Text { .. } => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            CardBody::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Manual pan/zoom applied to a card's media.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTransform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardContent {
    #[serde(flatten)]
    pub body: CardBody,

    /// Caption shown over the card.
    #[serde(default)]
    pub title: String,

    #[serde(default = "default_bg_color")]
    pub bg_color: String,

    #[serde(default = "default_text_color")]
    pub text_color: String,

    #[serde(default)]
    pub link_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_transform: Option<MediaTransform>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
}

fn default_bg_color() -> String {
    CARD_PALETTE[0].to_string()
}

fn default_text_color() -> String {
    DEFAULT_TEXT_COLOR.to_string()
}

impl CardContent {
    /// Empty image card with the given background colour.
    pub fn with_background(bg_color: impl Into<String>) -> Self {
        Self {
            body: CardKind::Image.empty_body(),
            title: String::new(),
            bg_color: bg_color.into(),
            text_color: default_text_color(),
            link_url: String::new(),
            media_transform: None,
            font_size: None,
        }
    }

    pub fn kind(&self) -> CardKind {
        self.body.kind()
    }

    /// Merge a partial update. Switching kind drops the previous payload and
    /// any manual media transform or font-size override.
    pub fn apply(&mut self, update: &ContentUpdate) {
        if let Some(kind) = update.kind
            && kind != self.kind()
        {
            self.body = kind.empty_body();
            self.media_transform = None;
            self.font_size = None;
        }

        match &mut self.body {
            CardBody::Image { image_url } => {
                if let Some(url) = &update.image_url {
                    *image_url = url.clone();
                }
            }
            CardBody::Video { video_url } => {
                if let Some(url) = &update.video_url {
                    *video_url = url.clone();
                }
            }
            CardBody::Text { text } => {
                if let Some(t) = &update.text {
                    *text = t.clone();
                }
            }
        }

        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(bg) = &update.bg_color {
            self.bg_color = bg.clone();
        }
        if let Some(fg) = &update.text_color {
            self.text_color = fg.clone();
        }
        if let Some(link) = &update.link_url {
            self.link_url = link.clone();
        }
        if let Some(transform) = update.media_transform {
            self.media_transform = Some(transform);
        }
        if let Some(size) = update.font_size {
            self.font_size = Some(size);
        }
    }
}

/// Partial content change carried by `UpdateCardContent`.
///
/// Payload fields for a kind other than the resulting one are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUpdate {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<CardKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_transform: Option<MediaTransform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,

    #[serde(rename = "bento", default)]
    pub size: CardSize,

    pub content: CardContent,
}

impl Card {
    pub fn new(id: impl Into<String>, size: CardSize, bg_color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            size,
            content: CardContent::with_background(bg_color),
        }
    }
}

// ── Sections ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub cards: Vec<Card>,
}

impl Section {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            cards: Vec::new(),
        }
    }

    pub fn card_index(&self, card_id: &str) -> Option<usize> {
        self.cards.iter().position(|c| c.id == card_id)
    }
}

// ── Bio ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BioBlock {
    pub id: String,
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bio {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Durable URL of the avatar image, empty when unset.
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub blocks: Vec<BioBlock>,
}

/// Partial bio change carried by `SetBio`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BioUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<BioBlock>>,
}

impl Bio {
    pub fn apply(&mut self, update: &BioUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(avatar) = &update.avatar {
            self.avatar = avatar.clone();
        }
        if let Some(blocks) = &update.blocks {
            self.blocks = blocks.clone();
        }
    }
}

// ── Grid configuration ──────────────────────────────────────────────────────

/// Portfolio-wide grid settings, changed only through `SetGridConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConfig {
    #[serde(rename = "columns", alias = "maxColumns", default = "default_max_columns")]
    pub max_columns: u32,

    #[serde(default = "default_cell_gap")]
    pub cell_gap: f64,

    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: f64,
}

fn default_max_columns() -> u32 {
    4
}

fn default_cell_gap() -> f64 {
    8.0
}

fn default_aspect_ratio() -> f64 {
    1.0
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            max_columns: default_max_columns(),
            cell_gap: default_cell_gap(),
            aspect_ratio: default_aspect_ratio(),
        }
    }
}

// ── Whole-portfolio state ───────────────────────────────────────────────────

/// The persisted portfolio document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioState {
    #[serde(default)]
    pub sections: Vec<Section>,

    #[serde(default)]
    pub bio: Option<Bio>,

    #[serde(default)]
    pub grid_config: GridConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

/// Undo/redo granularity: sections and bio, nothing else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub sections: Vec<Section>,
    pub bio: Option<Bio>,
}

impl PortfolioState {
    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    pub fn section_mut(&mut self, section_id: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id == section_id)
    }

    pub fn section_index(&self, section_id: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.id == section_id)
    }

    /// Total number of cards across all sections.
    pub fn card_count(&self) -> usize {
        self.sections.iter().map(|s| s.cards.len()).sum()
    }

    /// Locate a card by id, returning `(section_index, card_index)`.
    pub fn find_card(&self, card_id: &str) -> Option<(usize, usize)> {
        self.sections
            .iter()
            .enumerate()
            .find_map(|(si, s)| s.card_index(card_id).map(|ci| (si, ci)))
    }

    /// Next background colour from the rotating palette.
    pub fn next_card_color(&self) -> &'static str {
        CARD_PALETTE[self.card_count() % CARD_PALETTE.len()]
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            sections: self.sections.clone(),
            bio: self.bio.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_size_parses_and_clamps() {
        assert_eq!(CardSize::parse("2x3"), CardSize { cols: 2, rows: 3 });
        assert_eq!(CardSize::parse("9x0"), CardSize { cols: 4, rows: 1 });
        assert_eq!(CardSize::parse("garbage"), CardSize::unit());
        assert_eq!(CardSize::parse("3"), CardSize { cols: 3, rows: 1 });
    }

    #[test]
    fn card_serializes_bento_and_flat_content() {
        let card = Card::new("c1", CardSize::new(2, 1), "#fde2e4");
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["bento"], "2x1");
        assert_eq!(json["content"]["type"], "image");
        assert_eq!(json["content"]["imageUrl"], "");
        assert_eq!(json["content"]["textColor"], DEFAULT_TEXT_COLOR);
    }

    #[test]
    fn card_deserializes_with_missing_fields() {
        let card: Card = serde_json::from_value(serde_json::json!({
            "id": "c9",
            "bento": "1x2",
            "content": { "type": "text", "text": "hello" }
        }))
        .unwrap();
        assert_eq!(card.size, CardSize { cols: 1, rows: 2 });
        assert_eq!(card.content.body.text(), Some("hello"));
        assert_eq!(card.content.bg_color, CARD_PALETTE[0]);
    }

    #[test]
    fn switching_kind_clears_stale_payload() {
        let mut content = CardContent::with_background("#fff");
        content.apply(&ContentUpdate {
            image_url: Some("/assets/a.png".into()),
            media_transform: Some(MediaTransform { scale: 2.0, offset_x: 1.0, offset_y: 0.0 }),
            ..Default::default()
        });
        assert_eq!(content.body.media_url(), Some("/assets/a.png"));

        content.apply(&ContentUpdate {
            kind: Some(CardKind::Text),
            text: Some("About me".into()),
            image_url: Some("/assets/ignored.png".into()),
            ..Default::default()
        });
        assert_eq!(content.kind(), CardKind::Text);
        assert_eq!(content.body.text(), Some("About me"));
        assert_eq!(content.body.media_url(), None);
        assert!(content.media_transform.is_none());
    }

    #[test]
    fn grid_config_accepts_both_column_keys() {
        let a: GridConfig = serde_json::from_str(r#"{"columns": 3}"#).unwrap();
        let b: GridConfig = serde_json::from_str(r#"{"maxColumns": 5, "cellGap": 12}"#).unwrap();
        assert_eq!(a.max_columns, 3);
        assert_eq!(b.max_columns, 5);
        assert!((b.cell_gap - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn palette_rotates_with_card_count() {
        let mut state = PortfolioState::default();
        assert_eq!(state.next_card_color(), CARD_PALETTE[0]);
        let mut section = Section::new("s1", "Work");
        section.cards.push(Card::new("c1", CardSize::unit(), CARD_PALETTE[0]));
        state.sections.push(section);
        assert_eq!(state.next_card_color(), CARD_PALETTE[1]);
    }
}
