//! Grid overlay for grid-mode screenshots.
//!
//! Draws the rows×cols grid onto the captured image and prints every cell's
//! label ("A1", "B3", …) in its top-left corner so the model can read the
//! label instead of counting cells.

use crate::capture::encode_png;
use crate::errors::VizCueResult;
use crate::grid::addressing::{cell_id, cell_rect, GridSpec};

// 3×5 glyphs, one u8 per row, bit2 = leftmost pixel.
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

const LETTERS: [[u8; 5]; 26] = [
    [0b010, 0b101, 0b111, 0b101, 0b101],
    [0b110, 0b101, 0b110, 0b101, 0b110],
    [0b011, 0b100, 0b100, 0b100, 0b011],
    [0b110, 0b101, 0b101, 0b101, 0b110],
    [0b111, 0b100, 0b110, 0b100, 0b111],
    [0b111, 0b100, 0b110, 0b100, 0b100],
    [0b011, 0b100, 0b101, 0b101, 0b011],
    [0b101, 0b101, 0b111, 0b101, 0b101],
    [0b111, 0b010, 0b010, 0b010, 0b111],
    [0b001, 0b001, 0b001, 0b101, 0b010],
    [0b101, 0b101, 0b110, 0b101, 0b101],
    [0b100, 0b100, 0b100, 0b100, 0b111],
    [0b101, 0b111, 0b111, 0b101, 0b101],
    [0b110, 0b101, 0b101, 0b101, 0b101],
    [0b010, 0b101, 0b101, 0b101, 0b010],
    [0b110, 0b101, 0b110, 0b100, 0b100],
    [0b010, 0b101, 0b101, 0b110, 0b011],
    [0b110, 0b101, 0b110, 0b101, 0b101],
    [0b011, 0b100, 0b010, 0b001, 0b110],
    [0b111, 0b010, 0b010, 0b010, 0b010],
    [0b101, 0b101, 0b101, 0b101, 0b111],
    [0b101, 0b101, 0b101, 0b101, 0b010],
    [0b101, 0b101, 0b111, 0b111, 0b101],
    [0b101, 0b101, 0b010, 0b101, 0b101],
    [0b101, 0b101, 0b010, 0b010, 0b010],
    [0b111, 0b001, 0b010, 0b100, 0b111],
];

const LINE_RGBA: [u8; 4] = [255, 0, 0, 150];
const LABEL_RGB: [u8; 3] = [255, 40, 40];

fn glyph(c: char) -> Option<&'static [u8; 5]> {
    match c {
        '0'..='9' => DIGITS.get((c as u8 - b'0') as usize),
        'A'..='Z' => LETTERS.get((c as u8 - b'A') as usize),
        _ => None,
    }
}

/// Overlay the labeled grid on `src_bytes` (PNG or JPEG). Returns PNG bytes.
pub fn draw_grid(src_bytes: &[u8], grid: &GridSpec) -> VizCueResult<Vec<u8>> {
    let img = image::load_from_memory(src_bytes)?;
    let mut canvas = img.to_rgba8();
    let (w, h) = canvas.dimensions();
    if w == 0 || h == 0 {
        return encode_png(canvas);
    }

    for col in 1..grid.cols() {
        let x = cell_rect(0, col, grid, w as f64, h as f64).x1.round() as u32;
        if x >= w {
            continue;
        }
        for y in 0..h {
            blend(canvas.get_pixel_mut(x, y), LINE_RGBA);
        }
    }
    for row in 1..grid.rows() {
        let y = cell_rect(row, 0, grid, w as f64, h as f64).y1.round() as u32;
        if y >= h {
            continue;
        }
        for x in 0..w {
            blend(canvas.get_pixel_mut(x, y), LINE_RGBA);
        }
    }

    let cell_w = w as f64 / grid.cols() as f64;
    let scale: u32 = if cell_w >= 120.0 { 3 } else if cell_w >= 60.0 { 2 } else { 1 };
    for row in 0..grid.rows() {
        for col in 0..grid.cols() {
            let r = cell_rect(row, col, grid, w as f64, h as f64);
            let x = r.x1.round() as u32 + 3;
            let y = r.y1.round() as u32 + 3;
            draw_label(&mut canvas, &cell_id(row, col), x, y, scale);
        }
    }

    tracing::debug!(rows = grid.rows(), cols = grid.cols(), w, h, "grid overlay drawn");
    encode_png(canvas)
}

fn draw_label(canvas: &mut image::RgbaImage, label: &str, px: u32, py: u32, scale: u32) {
    let (w, h) = canvas.dimensions();
    let step = 4 * scale;
    let text_w = label.chars().count() as u32 * step;
    let text_h = 5 * scale;

    // Darkened backing box so the label stays readable on any background.
    for y in py.saturating_sub(1)..(py + text_h + 1).min(h) {
        for x in px.saturating_sub(1)..(px + text_w).min(w) {
            let p = canvas.get_pixel_mut(x, y);
            for ch in 0..3 {
                p[ch] /= 4;
            }
            p[3] = 255;
        }
    }

    for (i, c) in label.chars().enumerate() {
        let Some(rows) = glyph(c) else { continue };
        let gx = px + i as u32 * step;
        for (dy, bits) in rows.iter().enumerate() {
            for dx in 0..3u32 {
                if (bits >> (2 - dx)) & 1 == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        let x = gx + dx * scale + sx;
                        let y = py + dy as u32 * scale + sy;
                        if x < w && y < h {
                            let p = canvas.get_pixel_mut(x, y);
                            p[0] = LABEL_RGB[0];
                            p[1] = LABEL_RGB[1];
                            p[2] = LABEL_RGB[2];
                            p[3] = 255;
                        }
                    }
                }
            }
        }
    }
}

fn blend(pixel: &mut image::Rgba<u8>, [r, g, b, a]: [u8; 4]) {
    let alpha = a as f32 / 255.0;
    for (i, src) in [r, g, b].into_iter().enumerate() {
        pixel[i] = (pixel[i] as f32 * (1.0 - alpha) + src as f32 * alpha).round() as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_png(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([255, 255, 255, 255]));
        encode_png(img).unwrap()
    }

    #[test]
    fn every_label_character_has_a_glyph() {
        for c in ('A'..='Z').chain('0'..='9') {
            assert!(glyph(c).is_some(), "missing glyph for {c}");
        }
        assert!(glyph('-').is_none());
    }

    #[test]
    fn grid_lines_are_drawn_on_cell_edges() {
        let grid = GridSpec::new(4, 4).unwrap();
        let out = draw_grid(&blank_png(400, 200), &grid).unwrap();
        let img = image::load_from_memory(&out).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (400, 200));

        // Vertical line at x=100, away from any label box.
        let on_line = img.get_pixel(100, 40);
        assert!(on_line[1] < 200, "expected red tint on grid line, got {on_line:?}");
        // Middle of a cell stays white.
        assert_eq!(img.get_pixel(150, 30), &image::Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn rejects_non_image_input() {
        let grid = GridSpec::new(2, 2).unwrap();
        assert!(draw_grid(b"not an image", &grid).is_err());
    }
}
