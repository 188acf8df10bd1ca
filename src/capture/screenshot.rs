use async_trait::async_trait;
use xcap::Monitor;

use crate::capture::traits::ScreenCapture;
use crate::capture::types::CapturedFrame;
use crate::errors::{VizCueError, VizCueResult};

/// Captures the primary monitor (or the first one when none is flagged primary).
#[derive(Debug, Default, Clone)]
pub struct XcapCapture;

impl XcapCapture {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ScreenCapture for XcapCapture {
    async fn capture(&self) -> VizCueResult<CapturedFrame> {
        tokio::task::spawn_blocking(capture_primary)
            .await
            .map_err(|e| VizCueError::Capture(format!("capture task failed: {e}")))?
    }
}

fn capture_primary() -> VizCueResult<CapturedFrame> {
    let monitors = Monitor::all().map_err(|e| VizCueError::Capture(e.to_string()))?;
    let monitor = monitors
        .iter()
        .find(|m| m.is_primary())
        .or_else(|| monitors.first())
        .ok_or_else(|| VizCueError::Capture("no monitor found".into()))?;

    let scale_factor = monitor.scale_factor() as f64;
    let live_width = monitor.width();
    let live_height = monitor.height();

    let img = monitor
        .capture_image()
        .map_err(|e| VizCueError::Capture(e.to_string()))?;
    let (width, height) = (img.width(), img.height());
    let png_bytes = encode_png(img)?;

    tracing::info!(
        width,
        height,
        live = %format!("{live_width}×{live_height}"),
        scale = scale_factor,
        bytes = png_bytes.len(),
        "screenshot captured"
    );

    Ok(CapturedFrame {
        png_bytes,
        width,
        height,
        live_width,
        live_height,
        scale_factor,
    })
}

pub fn encode_png(canvas: image::RgbaImage) -> VizCueResult<Vec<u8>> {
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(canvas)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_png_decodes_to_same_size() {
        let img = image::RgbaImage::from_pixel(7, 3, image::Rgba([1, 2, 3, 255]));
        let bytes = encode_png(img).unwrap();
        let back = image::load_from_memory(&bytes).unwrap();
        assert_eq!((back.width(), back.height()), (7, 3));
    }
}
