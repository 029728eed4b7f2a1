//! `bentofolio pack`: Pack card sizes and draw the result.

use bentofolio_core::CardSize;
use bentofolio_layout::{EmptyCell, PackItem, PackedLayout, locate_empty_cells, pack, resolve_columns};
use std::fmt::Write;

pub fn run(
    sizes: &[String],
    columns: Option<u32>,
    width: Option<f64>,
    max_columns: u32,
    gap: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let columns = match (columns, width) {
        (Some(columns), _) => columns.max(1),
        (None, Some(width)) => resolve_columns(width, max_columns, gap),
        (None, None) => max_columns.max(1),
    };

    let items: Vec<PackItem> = sizes
        .iter()
        .enumerate()
        .map(|(i, size)| PackItem::sized(item_label(i), CardSize::parse(size)))
        .collect();
    let layout = pack(&items, columns);
    let empty = locate_empty_cells(layout.occupancy(), layout.total_rows(), columns);

    print!("{}", describe(&items, &layout, &empty));
    Ok(())
}

/// `A`..`Z`, then `a`..`z`, then `#`.
fn item_label(index: usize) -> String {
    let c = match index {
        0..=25 => char::from(b'A' + index as u8),
        26..=51 => char::from(b'a' + (index - 26) as u8),
        _ => '#',
    };
    c.to_string()
}

pub fn describe(items: &[PackItem], layout: &PackedLayout, empty: &[EmptyCell]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Columns: {}  Rows: {}\n", layout.columns(), layout.total_rows());
    for (item, placement) in items.iter().zip(layout.placements()) {
        let rect = placement.rect;
        let _ = writeln!(
            out,
            "  {} {}x{}  row {} col {}  ({}x{})",
            placement.id, item.cols, item.rows, rect.row_start, rect.col_start, rect.col_span, rect.row_span
        );
    }
    if !empty.is_empty() {
        let cells: Vec<String> = empty
            .iter()
            .map(|c| {
                let marker = if c.is_trailing { "+" } else { "" };
                format!("({},{}){marker}", c.row, c.col)
            })
            .collect();
        let _ = writeln!(out, "\n  Empty: {}", cells.join(" "));
    }
    out.push('\n');
    out.push_str(&ascii_grid(layout, empty));
    out
}

/// One character per cell: the item label, `+` for an add slot, `.` otherwise.
pub fn ascii_grid(layout: &PackedLayout, empty: &[EmptyCell]) -> String {
    let mut out = String::new();
    for row in 1..=layout.total_rows() {
        out.push_str("  ");
        for col in 1..=layout.columns() {
            let owner = layout.placements().iter().find(|p| p.rect.contains(row, col));
            let cell = match owner {
                Some(p) => p.id.chars().next().unwrap_or('?'),
                None if empty.iter().any(|c| c.row == row && c.col == col) => '+',
                None => '.',
            };
            out.push(cell);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed(sizes: &[&str], columns: u32) -> (Vec<PackItem>, PackedLayout, Vec<EmptyCell>) {
        let items: Vec<PackItem> = sizes
            .iter()
            .enumerate()
            .map(|(i, s)| PackItem::sized(item_label(i), CardSize::parse(s)))
            .collect();
        let layout = pack(&items, columns);
        let empty = locate_empty_cells(layout.occupancy(), layout.total_rows(), columns);
        (items, layout, empty)
    }

    #[test]
    fn labels() {
        assert_eq!(item_label(0), "A");
        assert_eq!(item_label(27), "b");
        assert_eq!(item_label(60), "#");
    }

    #[test]
    fn draws_grid_with_append_slot() {
        let (_, layout, empty) = packed(&["2x2", "1x1", "1x1"], 4);
        assert_eq!(ascii_grid(&layout, &empty), "  AABC\n  AA+.\n");
    }

    #[test]
    fn describe_lists_positions() {
        let (items, layout, empty) = packed(&["2x1", "1x1"], 2);
        let text = describe(&items, &layout, &empty);
        assert!(text.starts_with("Columns: 2  Rows: 2"));
        assert!(text.contains("  A 2x1  row 1 col 1  (2x1)"));
        assert!(text.contains("  B 1x1  row 2 col 1  (1x1)"));
        assert!(text.contains("Empty: (2,2)+"));
    }
}
