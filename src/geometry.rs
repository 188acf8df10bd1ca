use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in floating-point pixel space, corners `(x1, y1)`–`(x2, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rect {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self {
            x1: cx - width / 2.0,
            y1: cy - height / 2.0,
            x2: cx + width / 2.0,
            y2: cy + height / 2.0,
        }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Swap corners so that `x1 <= x2` and `y1 <= y2`.
    pub fn ordered(self) -> Self {
        Self {
            x1: self.x1.min(self.x2),
            y1: self.y1.min(self.y2),
            x2: self.x1.max(self.x2),
            y2: self.y1.max(self.y2),
        }
    }

    pub fn scaled(self, sx: f64, sy: f64) -> Self {
        Self {
            x1: self.x1 * sx,
            y1: self.y1 * sy,
            x2: self.x2 * sx,
            y2: self.y2 * sy,
        }
    }

    /// Grow symmetrically around the center until both sides reach the minimum.
    pub fn grown_to_min(self, min_w: f64, min_h: f64) -> Self {
        let (cx, cy) = self.center();
        Self::from_center(cx, cy, self.width().max(min_w), self.height().max(min_h))
    }

    /// Clamp every corner into `[0, width] × [0, height]`. May collapse the
    /// rect to zero size when it lies entirely off that area.
    pub fn clamped_to(self, width: f64, height: f64) -> Self {
        Self {
            x1: self.x1.clamp(0.0, width),
            y1: self.y1.clamp(0.0, height),
            x2: self.x2.clamp(0.0, width),
            y2: self.y2.clamp(0.0, height),
        }
    }

    /// Shift (never shrink) so the rect ends inside `width × height` where it
    /// fits. The top-left corner is never pushed below zero.
    pub fn shifted_inside(self, width: f64, height: f64) -> Self {
        let dx = if self.x2 > width { width - self.x2 } else { 0.0 };
        let dy = if self.y2 > height { height - self.y2 } else { 0.0 };
        Self {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
        .shifted_into_positive()
    }

    /// Shift (never shrink) so the top-left corner is not negative.
    pub fn shifted_into_positive(self) -> Self {
        let dx = if self.x1 < 0.0 { -self.x1 } else { 0.0 };
        let dy = if self.y1 < 0.0 { -self.y1 } else { 0.0 };
        Self {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }

    pub fn to_pixels(&self) -> PixelRect {
        let x = self.x1.round() as i32;
        let y = self.y1.round() as i32;
        let width = self.width().round().clamp(1.0, u32::MAX as f64) as u32;
        let height = self.height().round().clamp(1.0, u32::MAX as f64) as u32;
        PixelRect { x, y, width, height }
    }
}

/// Integer rectangle handed to the render and input layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint {
            x: self.x.saturating_add((self.width / 2) as i32),
            y: self.y.saturating_add((self.height / 2) as i32),
        }
    }

    pub fn scaled(&self, factor: f64) -> PixelRect {
        PixelRect {
            x: (self.x as f64 * factor).round() as i32,
            y: (self.y as f64 * factor).round() as i32,
            width: ((self.width as f64 * factor).round() as u32).max(1),
            height: ((self.height as f64 * factor).round() as u32).max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}
