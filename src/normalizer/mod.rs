//! Coordinate normalization: parsed spatial reference → live-screen pixels.
//!
//! Pipeline for boxes:
//!   axis canonicalization → space conversion → refiners → screen clamp → min-size grow → shift on screen
//!
//! Grid cells skip refiners and clamps; a cell rect is already well-formed.

pub mod refine;

pub use refine::{IconSquaring, RectRefiner, Refinement};

use serde::Serialize;

use crate::capture::ScreenContext;
use crate::config::{DprPolicy, NormalizerConfig};
use crate::errors::{VizCueError, VizCueResult};
use crate::geometry::{PixelRect, Rect, ScreenPoint};
use crate::grid::{cell_rect, GridCell, GridSpec};
use crate::parser::{AxisOrder, BoxRef, CoordSpace, SpatialReference};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTarget {
    /// Live-screen rectangle, `width > 0`, `height > 0`, origin non-negative.
    pub rect: PixelRect,
    /// Click point: the rect center.
    pub center: ScreenPoint,
    /// Name of the last refiner that reshaped the box.
    pub refined_by: Option<String>,
}

impl NormalizedTarget {
    fn from_rect(rect: Rect, refined_by: Option<String>) -> Self {
        let rect = rect.to_pixels();
        Self {
            rect,
            center: rect.center(),
            refined_by,
        }
    }
}

pub struct Normalizer {
    config: NormalizerConfig,
    refiners: Vec<Box<dyn RectRefiner>>,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        let mut refiners: Vec<Box<dyn RectRefiner>> = Vec::new();
        if config.icon_squaring {
            refiners.push(Box::new(IconSquaring::with_min_size(config.icon_min_size)));
        }
        Self { config, refiners }
    }

    /// Append a refiner after the built-in ones.
    pub fn with_refiner(mut self, refiner: Box<dyn RectRefiner>) -> Self {
        self.refiners.push(refiner);
        self
    }

    /// `source_text` is the raw response, handed to refiners as context.
    pub fn normalize(
        &self,
        reference: &SpatialReference,
        ctx: &ScreenContext,
        grid: &GridSpec,
        source_text: &str,
    ) -> VizCueResult<NormalizedTarget> {
        let target = match reference {
            SpatialReference::GridCell(cell) => self.grid_target(*cell, grid, ctx)?,
            SpatialReference::Box(b) => self.box_target(b, ctx, source_text),
        };
        tracing::debug!(
            ?reference,
            rect = ?target.rect,
            center = ?target.center,
            refined_by = ?target.refined_by,
            "reference normalized"
        );
        Ok(target)
    }

    pub fn grid_target(
        &self,
        cell: GridCell,
        grid: &GridSpec,
        ctx: &ScreenContext,
    ) -> VizCueResult<NormalizedTarget> {
        grid_cell_target(cell, grid, ctx)
    }

    pub fn box_target(&self, b: &BoxRef, ctx: &ScreenContext, source_text: &str) -> NormalizedTarget {
        let mut rect = to_live_space(canonical_box(b), b.space, ctx);
        let mut min_size = self.config.min_size;
        let mut refined_by = None;

        for refiner in &self.refiners {
            if let Some(refinement) = refiner.refine(rect, source_text) {
                rect = refinement.rect;
                if let Some(m) = refinement.min_size {
                    min_size = m;
                }
                refined_by = Some(refiner.name().to_string());
            }
        }

        let (lw, lh) = (ctx.live_width as f64, ctx.live_height as f64);
        let rect = rect
            .clamped_to(lw, lh)
            .grown_to_min(min_size, min_size)
            .shifted_inside(lw, lh);
        NormalizedTarget::from_rect(rect, refined_by)
    }

    /// Rect in the render layer's coordinate system. Click coordinates never
    /// go through here.
    pub fn overlay_rect(&self, rect: PixelRect, ctx: &ScreenContext) -> PixelRect {
        match self.config.dpr_policy {
            DprPolicy::Logical => rect,
            DprPolicy::Physical => rect.scaled(ctx.device_pixel_ratio),
        }
    }
}

/// Live-screen rect of a grid cell laid over the screenshot.
pub fn grid_cell_target(
    cell: GridCell,
    grid: &GridSpec,
    ctx: &ScreenContext,
) -> VizCueResult<NormalizedTarget> {
    if !grid.contains(cell) {
        return Err(VizCueError::OutOfBounds {
            cell: cell.id(),
            rows: grid.rows(),
            cols: grid.cols(),
        });
    }
    let (sx, sy) = ctx.scale();
    let rect = cell_rect(
        cell.row,
        cell.col,
        grid,
        ctx.screenshot_width as f64,
        ctx.screenshot_height as f64,
    )
    .scaled(sx, sy);
    Ok(NormalizedTarget::from_rect(rect, None))
}

/// Put the four numbers in `x1, y1, x2, y2` order with `x1 <= x2`, `y1 <= y2`.
/// Values stay in their original space.
pub fn canonical_box(b: &BoxRef) -> Rect {
    let [a, c, d, e] = b.values;
    let rect = match b.order {
        AxisOrder::XyXy => Rect::new(a, c, d, e),
        AxisOrder::YxYx => Rect::new(c, a, e, d),
    };
    rect.ordered()
}

/// Convert a canonical box from `space` to live-screen pixels.
pub fn to_live_space(rect: Rect, space: CoordSpace, ctx: &ScreenContext) -> Rect {
    let (lw, lh) = (ctx.live_width as f64, ctx.live_height as f64);
    match space {
        CoordSpace::Normalized1000 => rect.scaled(lw / 1000.0, lh / 1000.0),
        CoordSpace::Normalized01 => rect.scaled(lw, lh),
        CoordSpace::Pixel => {
            let (sx, sy) = ctx.scale();
            rect.scaled(sx, sy)
        }
    }
}
