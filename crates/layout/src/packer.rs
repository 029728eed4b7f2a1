//! First-fit bento packing.
//!
//! Items are placed strictly in input order. For each item the candidate
//! origins are scanned row-major from row 1 and the first free rectangle wins,
//! with one extra rule: an item may not start in a row to the left of an
//! earlier item that already starts in that row. That keeps visual order equal
//! to input order even when a narrow item could backfill an earlier gap.
//!
//! The result is a pure function of `(items, columns)`.

use bentofolio_core::{Card, CardSize};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One item to pack. Spans are signed so degenerate input can be clamped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackItem {
    pub id: String,
    pub cols: i32,
    pub rows: i32,
}

impl PackItem {
    pub fn new(id: impl Into<String>, cols: i32, rows: i32) -> Self {
        Self { id: id.into(), cols, rows }
    }

    pub fn sized(id: impl Into<String>, size: CardSize) -> Self {
        Self::new(id, size.cols as i32, size.rows as i32)
    }
}

impl From<&Card> for PackItem {
    fn from(card: &Card) -> Self {
        Self::sized(card.id.clone(), card.size)
    }
}

/// A rectangle of grid cells. All coordinates are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRect {
    pub row_start: u32,
    pub col_start: u32,
    pub row_span: u32,
    pub col_span: u32,
}

impl GridRect {
    pub fn row_end(&self) -> u32 {
        self.row_start + self.row_span - 1
    }

    pub fn col_end(&self) -> u32 {
        self.col_start + self.col_span - 1
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.row_start..=self.row_end()).contains(&row)
            && (self.col_start..=self.col_end()).contains(&col)
    }

    pub fn intersects(&self, other: &GridRect) -> bool {
        self.row_start <= other.row_end()
            && other.row_start <= self.row_end()
            && self.col_start <= other.col_end()
            && other.col_start <= self.col_end()
    }

    fn cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.row_start..=self.row_end())
            .flat_map(move |r| (self.col_start..=self.col_end()).map(move |c| (r, c)))
    }
}

/// Cells covered by packed items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Occupancy {
    cells: HashSet<(u32, u32)>,
    /// Greatest occupied cell in row-major order.
    last: Option<(u32, u32)>,
}

impl Occupancy {
    pub fn is_occupied(&self, row: u32, col: u32) -> bool {
        self.cells.contains(&(row, col))
    }

    fn is_free(&self, rect: &GridRect) -> bool {
        rect.cells().all(|cell| !self.cells.contains(&cell))
    }

    fn mark(&mut self, rect: &GridRect) {
        for cell in rect.cells() {
            self.cells.insert(cell);
        }
        let end = (rect.row_end(), rect.col_end());
        if self.last.is_none_or(|last| end > last) {
            self.last = Some(end);
        }
    }

    /// Whether any occupied cell comes after `(row, col)` in row-major order.
    pub fn occupied_after(&self, row: u32, col: u32) -> bool {
        self.last.is_some_and(|last| last > (row, col))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub id: String,
    pub rect: GridRect,
}

/// A complete packing of one item list at one column count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedLayout {
    columns: u32,
    placements: Vec<Placement>,
    total_rows: u32,
    occupancy: Occupancy,
}

impl PackedLayout {
    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Placements in input order.
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn total_rows(&self) -> u32 {
        self.total_rows
    }

    pub fn occupancy(&self) -> &Occupancy {
        &self.occupancy
    }

    pub fn rect(&self, id: &str) -> Option<GridRect> {
        self.placements.iter().find(|p| p.id == id).map(|p| p.rect)
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Number of items whose origin precedes `(row, col)` in row-major order.
    /// A card inserted at that index lands in the cell's slot of the item order.
    pub fn items_before(&self, row: u32, col: u32) -> usize {
        self.placements
            .iter()
            .filter(|p| (p.rect.row_start, p.rect.col_start) < (row, col))
            .count()
    }
}

/// Pack `items` into a grid of `columns` columns.
///
/// Never fails: `columns == 0` is treated as 1, spans below 1 become 1, and
/// items wider than the grid are clamped to its width.
pub fn pack(items: &[PackItem], columns: u32) -> PackedLayout {
    let columns = columns.max(1);
    let mut occupancy = Occupancy::default();
    let mut placements = Vec::with_capacity(items.len());
    // Right-most origin column among items starting in each row.
    let mut row_frontier: BTreeMap<u32, u32> = BTreeMap::new();
    let mut total_rows = 0;

    for item in items {
        let col_span = (item.cols.max(1) as u32).min(columns);
        let row_span = item.rows.max(1) as u32;
        let last_col = columns - col_span + 1;

        let mut row = 1;
        let rect = loop {
            let first_col = row_frontier.get(&row).map_or(1, |c| c + 1);
            let found = (first_col..=last_col)
                .map(|col| GridRect { row_start: row, col_start: col, row_span, col_span })
                .find(|candidate| occupancy.is_free(candidate));
            if let Some(rect) = found {
                break rect;
            }
            row += 1;
        };

        occupancy.mark(&rect);
        row_frontier.insert(rect.row_start, rect.col_start);
        total_rows = total_rows.max(rect.row_end());
        placements.push(Placement { id: item.id.clone(), rect });
    }

    PackedLayout { columns, placements, total_rows, occupancy }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(sizes: &[(i32, i32)]) -> Vec<PackItem> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, (c, r))| PackItem::new(format!("item{}", i + 1), *c, *r))
            .collect()
    }

    fn origin(layout: &PackedLayout, id: &str) -> (u32, u32) {
        let rect = layout.rect(id).unwrap();
        (rect.row_start, rect.col_start)
    }

    #[test]
    fn mixed_sizes_at_three_columns() {
        let layout = pack(&items(&[(2, 2), (1, 1), (1, 1), (2, 1)]), 3);
        assert_eq!(
            layout.rect("item1"),
            Some(GridRect { row_start: 1, col_start: 1, row_span: 2, col_span: 2 })
        );
        assert_eq!(origin(&layout, "item2"), (1, 3));
        assert_eq!(origin(&layout, "item3"), (2, 3));
        assert_eq!(
            layout.rect("item4"),
            Some(GridRect { row_start: 3, col_start: 1, row_span: 1, col_span: 2 })
        );
        assert_eq!(layout.total_rows(), 3);
    }

    #[test]
    fn mixed_sizes_at_four_columns() {
        let layout = pack(&items(&[(2, 2), (1, 1), (1, 1), (2, 1)]), 4);
        assert_eq!(origin(&layout, "item2"), (1, 3));
        assert_eq!(origin(&layout, "item3"), (1, 4));
        assert_eq!(origin(&layout, "item4"), (2, 3));
        assert_eq!(layout.total_rows(), 2);
    }

    #[test]
    fn empty_input_packs_to_zero_rows() {
        let layout = pack(&[], 4);
        assert!(layout.is_empty());
        assert_eq!(layout.total_rows(), 0);
    }

    #[test]
    fn wide_items_are_clamped_to_grid() {
        let layout = pack(&items(&[(4, 1), (3, 2)]), 2);
        assert_eq!(layout.rect("item1").unwrap().col_span, 2);
        assert_eq!(layout.rect("item2").unwrap().col_span, 2);
        assert_eq!(origin(&layout, "item2"), (2, 1));
        assert_eq!(layout.total_rows(), 3);
    }

    #[test]
    fn degenerate_spans_become_one() {
        let layout = pack(&items(&[(0, -3), (-1, 0)]), 0);
        assert_eq!(layout.columns(), 1);
        assert_eq!(layout.rect("item1").unwrap(), GridRect { row_start: 1, col_start: 1, row_span: 1, col_span: 1 });
        assert_eq!(origin(&layout, "item2"), (2, 1));
    }

    #[test]
    fn later_item_never_starts_left_of_earlier_in_same_row() {
        // Row 2 has a one-cell hole at column 1, so item4 (2x1) starts at
        // column 3. item5 would fit the hole but must not pass item4.
        let layout = pack(&items(&[(1, 1), (1, 2), (2, 1), (2, 1), (1, 1)]), 4);
        assert_eq!(origin(&layout, "item2"), (1, 2));
        assert_eq!(origin(&layout, "item4"), (2, 3));
        assert_eq!(origin(&layout, "item5"), (3, 1));
        assert!(!layout.occupancy().is_occupied(2, 1));
    }

    #[test]
    fn items_before_counts_origins_in_scan_order() {
        let layout = pack(&items(&[(2, 2), (1, 1), (1, 1), (2, 1)]), 3);
        assert_eq!(layout.items_before(1, 1), 0);
        assert_eq!(layout.items_before(3, 3), 4);
        assert_eq!(layout.items_before(2, 1), 2);
    }
}
