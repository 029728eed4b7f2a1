//! Grid-unit to pixel conversion.

use crate::packer::GridRect;
use serde::{Deserialize, Serialize};

/// A box in logical pixels, relative to the grid container's top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..*self }
    }
}

/// Cell dimensions for one grid at one container width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridMetrics {
    pub columns: u32,
    pub cell_width: f64,
    pub cell_height: f64,
    pub gap: f64,
}

impl GridMetrics {
    /// `aspect_ratio` is cell width over cell height.
    pub fn new(container_width: f64, columns: u32, gap: f64, aspect_ratio: f64) -> Self {
        let columns = columns.max(1);
        let gap = gap.max(0.0);
        let cell_width =
            ((container_width - gap * f64::from(columns - 1)) / f64::from(columns)).max(0.0);
        let ratio = if aspect_ratio.is_finite() && aspect_ratio > 0.0 { aspect_ratio } else { 1.0 };
        Self {
            columns,
            cell_width,
            cell_height: cell_width / ratio,
            gap,
        }
    }

    pub fn rect_box(&self, rect: &GridRect) -> PixelBox {
        let stride_x = self.cell_width + self.gap;
        let stride_y = self.cell_height + self.gap;
        PixelBox {
            x: f64::from(rect.col_start - 1) * stride_x,
            y: f64::from(rect.row_start - 1) * stride_y,
            width: f64::from(rect.col_span) * self.cell_width
                + f64::from(rect.col_span - 1) * self.gap,
            height: f64::from(rect.row_span) * self.cell_height
                + f64::from(rect.row_span - 1) * self.gap,
        }
    }

    pub fn cell_box(&self, row: u32, col: u32) -> PixelBox {
        self.rect_box(&GridRect { row_start: row, col_start: col, row_span: 1, col_span: 1 })
    }

    /// Total height of `rows` rows including the gaps between them.
    pub fn content_height(&self, rows: u32) -> f64 {
        if rows == 0 {
            return 0.0;
        }
        f64::from(rows) * self.cell_height + f64::from(rows - 1) * self.gap
    }

    /// The 1-based cell under a container-relative point, if any. Points in a
    /// gap belong to no cell.
    pub fn cell_at(&self, x: f64, y: f64, rows: u32) -> Option<(u32, u32)> {
        if x < 0.0 || y < 0.0 || self.cell_width <= 0.0 {
            return None;
        }
        let col = (x / (self.cell_width + self.gap)).floor() as u32 + 1;
        let row = (y / (self.cell_height + self.gap)).floor() as u32 + 1;
        if col > self.columns || row > rows {
            return None;
        }
        self.cell_box(row, col).contains(x, y).then_some((row, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_include_inner_gaps() {
        let metrics = GridMetrics::new(650.0, 3, 8.0, 1.0);
        let cell = metrics.cell_width;
        assert!((cell - 634.0 / 3.0).abs() < 1e-9);

        let b = metrics.rect_box(&GridRect { row_start: 2, col_start: 2, row_span: 2, col_span: 2 });
        assert!((b.x - (cell + 8.0)).abs() < 1e-9);
        assert!((b.width - (2.0 * cell + 8.0)).abs() < 1e-9);
        assert!((b.height - b.width).abs() < 1e-9);
    }

    #[test]
    fn cell_at_skips_gaps() {
        let metrics = GridMetrics::new(408.0, 2, 8.0, 2.0);
        // cell 200 x 100
        assert_eq!(metrics.cell_at(10.0, 10.0, 2), Some((1, 1)));
        assert_eq!(metrics.cell_at(204.0, 10.0, 2), None);
        assert_eq!(metrics.cell_at(250.0, 150.0, 2), Some((2, 2)));
        assert_eq!(metrics.cell_at(250.0, 250.0, 2), None);
    }
}
