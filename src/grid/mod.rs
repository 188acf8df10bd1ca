pub mod addressing;
pub mod overlay;

pub use addressing::{cell_id, cell_rect, parse_cell_id, GridCell, GridSpec};
