//! Grid cell addressing.
//!
//! Labeling convention:
//!   - Rows:    A, B, C … Z, AA, AB … (top  → bottom)
//!   - Columns: 1, 2, 3 … N           (left → right)
//!
//! So "B3" is row 1, column 2 (both 0-based).

use serde::{Deserialize, Serialize};

use crate::errors::{VizCueError, VizCueResult};
use crate::geometry::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    rows: u32,
    cols: u32,
}

impl GridSpec {
    pub fn new(rows: u32, cols: u32) -> VizCueResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(VizCueError::InvalidGrid(format!(
                "grid must have at least one row and column, got {rows}x{cols}"
            )));
        }
        Ok(Self { rows, cols })
    }

    /// Size a grid so cells are roughly `target_cell_px` wide, never below 5×5.
    pub fn auto_for_surface(width: u32, height: u32, target_cell_px: u32) -> Self {
        let target = target_cell_px.max(1);
        Self {
            rows: (height / target).max(5),
            cols: (width / target).max(5),
        }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn contains(&self, cell: GridCell) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    /// Label of the bottom-right cell, e.g. "D4" for a 4×4 grid.
    pub fn last_cell_id(&self) -> String {
        cell_id(self.rows - 1, self.cols - 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub row: u32,
    pub col: u32,
}

impl GridCell {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    pub fn id(&self) -> String {
        cell_id(self.row, self.col)
    }
}

/// Convert a 0-indexed row number to its letter label (bijective base-26).
/// 0→A, 25→Z, 26→AA, 27→AB, 51→AZ, 52→BA, …
pub fn row_label(row: u32) -> String {
    let mut n = row as u64 + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push(char::from(b'A' + rem));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Full label for a grid cell: row=1, col=2 → "B3".
pub fn cell_id(row: u32, col: u32) -> String {
    format!("{}{}", row_label(row), col as u64 + 1)
}

/// Parse a cell label like "b3" or " AA12 " into a 0-based cell.
/// Returns `None` on anything that is not letters followed by a positive number.
pub fn parse_cell_id(text: &str) -> Option<GridCell> {
    let label = text.trim().to_ascii_uppercase();
    let letters: String = label.chars().take_while(|c| c.is_ascii_uppercase()).collect();
    let digits = &label[letters.len()..];

    if letters.is_empty() || digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut row: u64 = 0;
    for c in letters.chars() {
        row = row.checked_mul(26)?.checked_add((c as u8 - b'A') as u64 + 1)?;
    }
    let row = u32::try_from(row - 1).ok()?;
    let col = digits.parse::<u32>().ok()?.checked_sub(1)?;

    Some(GridCell { row, col })
}

/// Rectangle of one cell after dividing the surface into `rows × cols` equal cells.
/// Edges are computed as `i * size / n`, so neighbouring cells share edges exactly.
pub fn cell_rect(row: u32, col: u32, grid: &GridSpec, surface_w: f64, surface_h: f64) -> Rect {
    let edge = |i: u32, n: u32, size: f64| i as f64 * size / n as f64;
    Rect::new(
        edge(col, grid.cols, surface_w),
        edge(row, grid.rows, surface_h),
        edge(col + 1, grid.cols, surface_w),
        edge(row + 1, grid.rows, surface_h),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_id_uses_row_letter_and_one_based_column() {
        assert_eq!(cell_id(0, 0), "A1");
        assert_eq!(cell_id(1, 2), "B3");
        assert_eq!(cell_id(25, 9), "Z10");
    }

    #[test]
    fn rows_past_z_continue_with_two_letters() {
        assert_eq!(row_label(26), "AA");
        assert_eq!(row_label(27), "AB");
        assert_eq!(row_label(51), "AZ");
        assert_eq!(row_label(52), "BA");
        assert_eq!(row_label(701), "ZZ");
        assert_eq!(row_label(702), "AAA");
    }

    #[test]
    fn parse_is_inverse_of_cell_id() {
        for row in 0..26 {
            for col in [0u32, 1, 7, 42, 999] {
                let parsed = parse_cell_id(&cell_id(row, col));
                assert_eq!(parsed, Some(GridCell::new(row, col)));
            }
        }
        for row in [26u32, 51, 52, 701, 702] {
            assert_eq!(parse_cell_id(&cell_id(row, 3)), Some(GridCell::new(row, 3)));
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(parse_cell_id(" b3 "), Some(GridCell::new(1, 2)));
    }

    #[test]
    fn parse_rejects_malformed_labels() {
        for bad in ["", "A", "3", "A0", "3B", "A-1", "B3x", "A 1", "É3"] {
            assert_eq!(parse_cell_id(bad), None, "{bad:?} should not parse");
        }
    }

    #[test]
    fn grid_rejects_zero_dimensions() {
        assert!(GridSpec::new(0, 4).is_err());
        assert!(GridSpec::new(4, 0).is_err());
        assert!(GridSpec::new(1, 1).is_ok());
    }

    #[test]
    fn cells_tile_the_surface() {
        for (rows, cols, w, h) in [(4, 4, 1920.0, 1080.0), (7, 3, 1001.0, 333.0), (13, 17, 2560.0, 1600.0)] {
            let grid = GridSpec::new(rows, cols).unwrap();
            let mut total = 0.0;
            for r in 0..rows {
                for c in 0..cols {
                    let rect = cell_rect(r, c, &grid, w, h);
                    assert!(rect.width() > 0.0 && rect.height() > 0.0);
                    total += rect.area();
                    if c + 1 < cols {
                        assert_eq!(rect.x2, cell_rect(r, c + 1, &grid, w, h).x1);
                    }
                    if r + 1 < rows {
                        assert_eq!(rect.y2, cell_rect(r + 1, c, &grid, w, h).y1);
                    }
                }
            }
            assert!((total - w * h).abs() < 1e-6 * w * h);
            let last = cell_rect(rows - 1, cols - 1, &grid, w, h);
            assert_eq!((last.x2, last.y2), (w, h));
        }
    }

    #[test]
    fn auto_grid_aims_for_cell_size_with_floor() {
        let g = GridSpec::auto_for_surface(1920, 1080, 80);
        assert_eq!((g.rows(), g.cols()), (13, 24));
        let small = GridSpec::auto_for_surface(200, 100, 80);
        assert_eq!((small.rows(), small.cols()), (5, 5));
    }
}
