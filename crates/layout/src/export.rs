//! Self-contained static HTML export.
//!
//! Every card declares its size as `data-bento="WxH"` and every grid carries
//! the grid config. An inline script implements the same packing rule and
//! column resolution as [`crate::pack`] and [`crate::resolve_columns`], so the
//! exported page lays out exactly like the editor with no network access.

use bentofolio_core::{Bio, Card, CardBody, CardSize, GridConfig, PortfolioState};
use std::fmt::Write;

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Document title; defaults to the bio name, then "Portfolio".
    pub title: Option<String>,
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn unescape_html(input: &str) -> String {
    input
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

const STYLE: &str = r#"
*{box-sizing:border-box}body{margin:0;font-family:system-ui,-apple-system,sans-serif;background:#fafafa;color:#111827}
.portfolio{display:flex;gap:32px;max-width:1400px;margin:0 auto;padding:32px}
.bio{flex:0 0 280px}.bio img{width:96px;height:96px;border-radius:50%;object-fit:cover}
.sections{flex:1;min-width:0}.bento-section h2{font-size:1.1rem;margin:24px 0 12px}
.bento-grid{display:grid;grid-template-columns:repeat(var(--cols,4),1fr)}
.bento-card{position:relative;overflow:hidden;border-radius:16px}
.bento-card img,.bento-card video{width:100%;height:100%;object-fit:cover;display:block}
.bento-card a{position:absolute;inset:0}.bento-card p{margin:0;padding:16px;white-space:pre-wrap}
.caption{position:absolute;left:12px;bottom:10px;font-size:.85rem;font-weight:600}
@media (max-width:800px){.portfolio{flex-direction:column}.bio{flex:none}}
"#;

const SCRIPT: &str = r#"
(function () {
  var MIN_COLUMN_WIDTH = 160;
  var MAX_SPAN = 4;

  function resolveColumns(width, maxColumns, gap) {
    gap = Math.max(0, gap);
    for (var cols = Math.max(1, maxColumns); cols >= 1; cols--) {
      if ((width - gap * (cols - 1)) / cols >= MIN_COLUMN_WIDTH) return cols;
    }
    return 1;
  }

  function parseSize(bento) {
    var parts = String(bento || '').split(/x/i);
    var clamp = function (v) { v = parseInt(v, 10); return isNaN(v) ? 1 : Math.min(MAX_SPAN, Math.max(1, v)); };
    return { cols: clamp(parts[0]), rows: parts.length > 1 ? clamp(parts[1]) : 1 };
  }

  function pack(items, columns) {
    columns = Math.max(1, columns);
    var occupied = {}, frontier = {}, rects = [], totalRows = 0;
    function free(r, c, w, h) {
      for (var y = r; y < r + h; y++)
        for (var x = c; x < c + w; x++)
          if (occupied[y + ':' + x]) return false;
      return true;
    }
    items.forEach(function (item) {
      var w = Math.min(Math.max(1, item.cols), columns);
      var h = Math.max(1, item.rows);
      var lastCol = columns - w + 1;
      for (var r = 1; ; r++) {
        var c = frontier[r] ? frontier[r] + 1 : 1;
        while (c <= lastCol && !free(r, c, w, h)) c++;
        if (c > lastCol) continue;
        for (var y = r; y < r + h; y++)
          for (var x = c; x < c + w; x++) occupied[y + ':' + x] = true;
        frontier[r] = c;
        rects.push({ row: r, col: c, rowSpan: h, colSpan: w });
        totalRows = Math.max(totalRows, r + h - 1);
        break;
      }
    });
    return { rects: rects, totalRows: totalRows };
  }

  function layout(grid) {
    var maxColumns = parseInt(grid.getAttribute('data-columns'), 10) || 4;
    var gap = parseFloat(grid.getAttribute('data-gap')) || 0;
    var ratio = parseFloat(grid.getAttribute('data-aspect-ratio')) || 1;
    var width = grid.clientWidth;
    var cols = resolveColumns(width, maxColumns, gap);
    var cards = Array.prototype.filter.call(grid.children, function (el) {
      return el.classList.contains('bento-card');
    });
    var packed = pack(cards.map(function (el) { return parseSize(el.getAttribute('data-bento')); }), cols);
    var cell = Math.max(0, (width - gap * (cols - 1)) / cols);
    grid.style.setProperty('--cols', cols);
    grid.style.gap = gap + 'px';
    grid.style.gridAutoRows = (cell / ratio) + 'px';
    packed.rects.forEach(function (r, i) {
      cards[i].style.gridRow = r.row + ' / span ' + r.rowSpan;
      cards[i].style.gridColumn = r.col + ' / span ' + r.colSpan;
    });
  }

  function layoutAll() {
    Array.prototype.forEach.call(document.querySelectorAll('.bento-grid'), layout);
  }

  var pending;
  window.addEventListener('resize', function () {
    clearTimeout(pending);
    pending = setTimeout(layoutAll, 100);
  });
  layoutAll();
})();
"#;

/// A CSS colour this exporter is willing to inline: `#rgb[a]`/`#rrggbb[aa]`,
/// an `rgb()`/`rgba()`/`hsl()`/`hsla()` call with numeric arguments, or a
/// bare keyword such as `teal`.
pub fn is_safe_color(value: &str) -> bool {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    for func in ["rgba(", "rgb(", "hsla(", "hsl("] {
        if let Some(args) = value.strip_prefix(func) {
            return args.strip_suffix(')').is_some_and(|args| {
                let mut parts = args.split([',', ' ', '/']).filter(|a| !a.is_empty()).peekable();
                parts.peek().is_some() && parts.all(is_numeric_arg)
            });
        }
    }
    !value.is_empty() && value.len() <= 32 && value.chars().all(|c| c.is_ascii_alphabetic())
}

fn is_numeric_arg(arg: &str) -> bool {
    let number = arg.strip_suffix("deg").or_else(|| arg.strip_suffix("turn")).unwrap_or(arg);
    !number.is_empty() && number.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '%' | '-'))
}

fn write_card(out: &mut String, card: &Card) {
    let content = &card.content;
    let mut declarations = Vec::with_capacity(3);
    if is_safe_color(&content.bg_color) {
        declarations.push(format!("background:{}", content.bg_color.trim()));
    }
    if is_safe_color(&content.text_color) {
        declarations.push(format!("color:{}", content.text_color.trim()));
    }
    if let Some(size) = content.font_size.filter(|s| s.is_finite() && *s > 0.0) {
        declarations.push(format!("font-size:{size}px"));
    }
    let style = escape_html(&declarations.join(";"));
    let _ = write!(
        out,
        r#"<div class="bento-card" data-card-id="{}" data-bento="{}" data-type="{}" style="{}">"#,
        escape_html(&card.id),
        card.size,
        content.kind().as_str(),
        style
    );

    let media_style = content.media_transform.map(|t| {
        format!(
            r#" style="transform:translate({}px,{}px) scale({})""#,
            t.offset_x, t.offset_y, t.scale
        )
    });
    match &content.body {
        CardBody::Image { image_url } if !image_url.is_empty() => {
            let _ = write!(
                out,
                r#"<img src="{}" alt="{}" loading="lazy"{}>"#,
                escape_html(image_url),
                escape_html(&content.title),
                media_style.unwrap_or_default()
            );
        }
        CardBody::Video { video_url } if !video_url.is_empty() => {
            let _ = write!(
                out,
                r#"<video src="{}" autoplay muted loop playsinline{}></video>"#,
                escape_html(video_url),
                media_style.unwrap_or_default()
            );
        }
        CardBody::Text { text } => {
            let _ = write!(out, "<p>{}</p>", escape_html(text));
        }
        _ => {}
    }
    if !content.title.is_empty() {
        let _ = write!(out, r#"<span class="caption">{}</span>"#, escape_html(&content.title));
    }
    if !content.link_url.is_empty() {
        let _ = write!(
            out,
            r#"<a href="{}" target="_blank" rel="noopener noreferrer" aria-label="{}"></a>"#,
            escape_html(&content.link_url),
            escape_html(&content.title)
        );
    }
    out.push_str("</div>");
}

fn write_bio(out: &mut String, bio: &Bio) {
    out.push_str(r#"<aside class="bio">"#);
    if !bio.avatar.is_empty() {
        let _ = write!(out, r#"<img src="{}" alt="{}">"#, escape_html(&bio.avatar), escape_html(&bio.name));
    }
    if !bio.name.is_empty() {
        let _ = write!(out, "<h1>{}</h1>", escape_html(&bio.name));
    }
    if !bio.description.is_empty() {
        let _ = write!(out, "<p>{}</p>", escape_html(&bio.description));
    }
    for block in &bio.blocks {
        let _ = write!(
            out,
            "<h3>{}</h3><p>{}</p>",
            escape_html(&block.heading),
            escape_html(&block.body)
        );
    }
    out.push_str("</aside>");
}

/// Render the whole portfolio as one standalone HTML document.
pub fn export_html(state: &PortfolioState, options: &ExportOptions) -> String {
    let title = options
        .title
        .clone()
        .or_else(|| state.bio.as_ref().map(|b| b.name.clone()).filter(|n| !n.is_empty()))
        .unwrap_or_else(|| "Portfolio".to_string());
    let grid = &state.grid_config;

    let mut out = String::with_capacity(4096);
    let _ = write!(
        out,
        r#"<!DOCTYPE html><html lang="en"><head><meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1"><title>{}</title><style>{}</style></head><body><main class="portfolio">"#,
        escape_html(&title),
        STYLE
    );
    if let Some(bio) = &state.bio {
        write_bio(&mut out, bio);
    }
    out.push_str(r#"<div class="sections">"#);
    for section in &state.sections {
        let _ = write!(
            out,
            r#"<section class="bento-section"><h2>{}</h2><div class="bento-grid" data-section-id="{}" data-columns="{}" data-gap="{}" data-aspect-ratio="{}">"#,
            escape_html(&section.title),
            escape_html(&section.id),
            grid.max_columns,
            grid.cell_gap,
            grid.aspect_ratio
        );
        for card in &section.cards {
            write_card(&mut out, card);
        }
        out.push_str("</div></section>");
    }
    let _ = write!(out, "</div></main><script>{SCRIPT}</script></body></html>");
    out
}

// ── Parsing an export back ──────────────────────────────────────────────────

/// One grid as declared in an exported document.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredGrid {
    pub section_id: String,
    pub config: GridConfig,
    pub cards: Vec<(String, CardSize)>,
}

fn attribute(tag: &str, name: &str) -> Option<String> {
    let needle = format!(r#" {name}=""#);
    let start = tag.find(&needle)? + needle.len();
    let len = tag[start..].find('"')?;
    Some(unescape_html(&tag[start..start + len]))
}

/// Recover every grid's config and declared card sizes, in document order.
pub fn parse_declared_sizes(html: &str) -> Vec<DeclaredGrid> {
    let mut grids: Vec<DeclaredGrid> = Vec::new();
    let mut rest = html;
    while let Some(open) = rest.find("<div class=\"bento-") {
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        let tag = &rest[open..open + close];
        if tag.starts_with("<div class=\"bento-grid\"") {
            let defaults = GridConfig::default();
            grids.push(DeclaredGrid {
                section_id: attribute(tag, "data-section-id").unwrap_or_default(),
                config: GridConfig {
                    max_columns: attribute(tag, "data-columns")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(defaults.max_columns),
                    cell_gap: attribute(tag, "data-gap")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(defaults.cell_gap),
                    aspect_ratio: attribute(tag, "data-aspect-ratio")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(defaults.aspect_ratio),
                },
                cards: Vec::new(),
            });
        } else if tag.starts_with("<div class=\"bento-card\"")
            && let Some(grid) = grids.last_mut()
        {
            let id = attribute(tag, "data-card-id").unwrap_or_default();
            let size = attribute(tag, "data-bento").map_or_else(CardSize::unit, |b| CardSize::parse(&b));
            grid.cards.push((id, size));
        }
        rest = &rest[open + close..];
    }
    grids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packer::{PackItem, pack};
    use bentofolio_core::{Action, ContentUpdate, CardKind, reduce};

    fn sample_state() -> PortfolioState {
        let mut state = PortfolioState::default();
        reduce(&mut state, &Action::AddSection { section_id: "s1".into(), title: "Work & <Play>".into() });
        for (id, w, h) in [("a", 2, 2), ("b", 1, 1), ("c", 1, 1), ("d", 2, 1)] {
            reduce(
                &mut state,
                &Action::AddCard {
                    section_id: "s1".into(),
                    card_id: id.into(),
                    size: CardSize::new(w, h),
                    insert_index: None,
                },
            );
        }
        reduce(
            &mut state,
            &Action::UpdateCardContent {
                section_id: "s1".into(),
                card_id: "b".into(),
                update: ContentUpdate {
                    kind: Some(CardKind::Text),
                    text: Some("say \"hi\"".into()),
                    ..Default::default()
                },
            },
        );
        state
    }

    #[test]
    fn export_declares_sizes_and_escapes_content() {
        let html = export_html(&sample_state(), &ExportOptions::default());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"data-bento="2x2""#));
        assert!(html.contains("Work &amp; &lt;Play&gt;"));
        assert!(html.contains("say &quot;hi&quot;"));
        assert!(html.contains("function pack(items, columns)"));
        assert!(!html.contains("http://") && !html.contains("https://"));
    }

    #[test]
    fn export_round_trip_reproduces_packing() {
        let state = sample_state();
        let html = export_html(&state, &ExportOptions::default());
        let grids = parse_declared_sizes(&html);
        assert_eq!(grids.len(), 1);
        assert_eq!(grids[0].section_id, "s1");
        assert_eq!(grids[0].config, state.grid_config);

        let original: Vec<PackItem> = state.sections[0].cards.iter().map(PackItem::from).collect();
        let parsed: Vec<PackItem> = grids[0]
            .cards
            .iter()
            .map(|(id, size)| PackItem::sized(id.clone(), *size))
            .collect();
        for columns in 1..=4 {
            assert_eq!(pack(&original, columns), pack(&parsed, columns));
        }
    }

    #[test]
    fn colours_are_validated_before_inlining() {
        for ok in ["#fde2e4", "#FFF", "rgb(10, 20, 30)", "rgba(0 0 0 / 50%)", "hsl(120deg, 50%, 40%)", "teal"] {
            assert!(is_safe_color(ok), "{ok}");
        }
        for bad in ["red;position:fixed;inset:0", "#12345", "url(x)", "rgb(1,2,3);x:y", "", "expression(alert(1))"] {
            assert!(!is_safe_color(bad), "{bad}");
        }
    }

    #[test]
    fn unsafe_colour_is_dropped_from_card_style() {
        let mut state = sample_state();
        state.sections[0].cards[0].content.bg_color = "red;position:fixed;inset:0".into();
        let html = export_html(&state, &ExportOptions::default());
        assert!(!html.contains("position:fixed"));
        assert!(html.contains(r#"data-card-id="a" data-bento="2x2" data-type="image" style="color:#374151">"#));
    }

    #[test]
    fn attribute_values_are_unescaped() {
        let tag = r#"<div class="bento-card" data-card-id="a&amp;b" data-bento="1x2""#;
        assert_eq!(attribute(tag, "data-card-id").as_deref(), Some("a&b"));
    }
}
