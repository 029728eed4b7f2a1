//! Empty-cell detection for "add card" affordances.
//!
//! Real holes the packer left behind are always actionable. Cells past the
//! last occupied cell are trailing; only the first of those becomes the append
//! slot, so a sparse last row shows one button instead of a row of them.

use crate::packer::Occupancy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyCell {
    pub row: u32,
    pub col: u32,
    /// Nothing is occupied after this cell in row-major order.
    pub is_trailing: bool,
}

/// Every empty cell in `1..=total_rows × 1..=columns`, row-major.
pub fn scan(occupancy: &Occupancy, total_rows: u32, columns: u32) -> Vec<EmptyCell> {
    let mut cells = Vec::new();
    for row in 1..=total_rows {
        for col in 1..=columns {
            if !occupancy.is_occupied(row, col) {
                cells.push(EmptyCell {
                    row,
                    col,
                    is_trailing: !occupancy.occupied_after(row, col),
                });
            }
        }
    }
    cells
}

/// The actionable empty cells: all non-trailing cells plus the first trailing
/// one, in row-major order.
pub fn locate(occupancy: &Occupancy, total_rows: u32, columns: u32) -> Vec<EmptyCell> {
    let mut seen_trailing = false;
    scan(occupancy, total_rows, columns)
        .into_iter()
        .filter(|cell| {
            if !cell.is_trailing {
                return true;
            }
            !std::mem::replace(&mut seen_trailing, true)
        })
        .collect()
}
