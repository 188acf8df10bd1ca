use serde::{Deserialize, Serialize};

/// Geometry of one capture, paired with the live screen it was taken from.
/// Built fresh per screenshot and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenContext {
    pub screenshot_width: u32,
    pub screenshot_height: u32,
    pub live_width: u32,
    pub live_height: u32,
    pub device_pixel_ratio: f64,
}

impl ScreenContext {
    pub fn new(
        screenshot_width: u32,
        screenshot_height: u32,
        live_width: u32,
        live_height: u32,
        device_pixel_ratio: f64,
    ) -> Self {
        Self {
            screenshot_width: screenshot_width.max(1),
            screenshot_height: screenshot_height.max(1),
            live_width: live_width.max(1),
            live_height: live_height.max(1),
            device_pixel_ratio: if device_pixel_ratio > 0.0 { device_pixel_ratio } else { 1.0 },
        }
    }

    /// Screenshot and live screen share one resolution.
    pub fn uniform(width: u32, height: u32) -> Self {
        Self::new(width, height, width, height, 1.0)
    }

    /// Screenshot-pixel → live-pixel ratios `(sx, sy)`.
    pub fn scale(&self) -> (f64, f64) {
        (
            self.live_width as f64 / self.screenshot_width as f64,
            self.live_height as f64 / self.screenshot_height as f64,
        )
    }
}

/// Raw output of the capture collaborator.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub png_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Logical size of the monitor the frame came from.
    pub live_width: u32,
    pub live_height: u32,
    pub scale_factor: f64,
}

impl CapturedFrame {
    pub fn context(&self) -> ScreenContext {
        ScreenContext::new(
            self.width,
            self.height,
            self.live_width,
            self.live_height,
            self.scale_factor,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retina_capture_scales_down_to_logical() {
        let ctx = ScreenContext::new(2880, 1800, 1440, 900, 2.0);
        assert_eq!(ctx.scale(), (0.5, 0.5));
    }

    #[test]
    fn degenerate_sizes_are_clamped() {
        let ctx = ScreenContext::new(0, 0, 0, 0, 0.0);
        assert_eq!(ctx.scale(), (1.0, 1.0));
        assert_eq!(ctx.device_pixel_ratio, 1.0);
    }
}
