//! Overlay rendering and output surfaces.
//!
//! Draws detection overlays (2px rectangle plus a caption in a built-in
//! 5x7 bitmap font) directly onto RGB frames, and defines the [`Surface`]
//! the capture loop presents to. The shipping surface writes the annotated
//! frame to a file path; tests use recording surfaces.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use std::path::PathBuf;

use crate::detect::result::Detection;

/// Overlay color matching the demo UI ("lime").
const OVERLAY_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: u32 = 2;
const FONT_SCALE: u32 = 2;
/// Glyph cell: 5 columns x 7 rows plus 1 column spacing, before scaling.
const GLYPH_W: u32 = 6;
const GLYPH_H: u32 = 7;

/// Where rendered frames go.
pub trait Surface: Send {
    /// Present the most recent frame (annotated or not).
    fn present(&mut self, image: &RgbImage) -> Result<()>;

    /// Show a transient, dismissible message (transport hiccups and the
    /// like). Never fatal.
    fn notice(&mut self, text: &str);
}

/// Writes each presented frame to a fixed file path.
pub struct FileSurface {
    path: PathBuf,
    quality: u8,
}

impl FileSurface {
    pub fn new(path: PathBuf, quality: u8) -> Self {
        Self { path, quality }
    }
}

impl Surface for FileSurface {
    fn present(&mut self, image: &RgbImage) -> Result<()> {
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, self.quality)
            .encode_image(image)
            .context("encode output frame")?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)
            .with_context(|| format!("write output frame {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("publish output frame {}", self.path.display()))?;
        Ok(())
    }

    fn notice(&mut self, text: &str) {
        log::warn!("{}", text);
    }
}

/// Draw rectangle + caption overlays for every detection onto `image`.
///
/// With zero detections the image is left untouched; presenting it then
/// clears any previously rendered overlay.
pub fn annotate(image: &mut RgbImage, detections: &[Detection]) {
    for det in detections {
        draw_rect(
            image,
            det.x,
            det.y,
            det.width,
            det.height,
            OVERLAY_COLOR,
            BOX_THICKNESS,
        );
        let (tx, ty) = caption_origin(det.x, det.y);
        draw_text(image, tx, ty, &det.caption(), OVERLAY_COLOR, FONT_SCALE);
    }
}

/// Caption placement follows the demo UI: above the box when it fits,
/// inside the top edge otherwise.
fn caption_origin(x: f32, y: f32) -> (i32, i32) {
    let text_h = (GLYPH_H * FONT_SCALE) as i32;
    let x = x as i32;
    let y = y as i32;
    if y > 20 {
        (x, y - 5 - text_h)
    } else {
        (x, y + 20 - text_h)
    }
}

fn draw_rect(img: &mut RgbImage, x: f32, y: f32, w: f32, h: f32, color: Rgb<u8>, thickness: u32) {
    let (iw, ih) = img.dimensions();
    if iw == 0 || ih == 0 || w <= 0.0 || h <= 0.0 {
        return;
    }
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let x1 = (x + w).ceil() as i64;
    let y1 = (y + h).ceil() as i64;
    let t = thickness as i64;

    // Walk only the four edge bands, clamped to the image, so cost is
    // bounded by the frame rather than the box the service reported.
    let bands = [
        (x0, y0, x1, (y0 + t).min(y1)),
        (x0, (y1 - t).max(y0), x1, y1),
        (x0, y0, (x0 + t).min(x1), y1),
        ((x1 - t).max(x0), y0, x1, y1),
    ];
    for (bx0, by0, bx1, by1) in bands {
        let cx0 = bx0.clamp(0, iw as i64) as u32;
        let cy0 = by0.clamp(0, ih as i64) as u32;
        let cx1 = bx1.clamp(0, iw as i64) as u32;
        let cy1 = by1.clamp(0, ih as i64) as u32;
        for ty in cy0..cy1 {
            for tx in cx0..cx1 {
                img.put_pixel(tx, ty, color);
            }
        }
    }
}

fn draw_text(img: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>, scale: u32) {
    let (iw, ih) = img.dimensions();
    let scale = scale.max(1) as i32;
    let mut pen_x = x;
    for ch in text.chars() {
        let columns = glyph(ch);
        for (col, bits) in columns.iter().enumerate() {
            for row in 0..7 {
                if bits & (1 << row) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = pen_x + (col as i32) * scale + dx;
                        let py = y + row * scale + dy;
                        if px < 0 || py < 0 || px >= iw as i32 || py >= ih as i32 {
                            continue;
                        }
                        img.put_pixel(px as u32, py as u32, color);
                    }
                }
            }
        }
        pen_x += (GLYPH_W as i32) * scale;
    }
}

/// 5x7 glyphs, column-major, bit 0 = top row. Lowercase renders as
/// uppercase; characters outside the set render as blanks.
fn glyph(ch: char) -> [u8; 5] {
    match ch.to_ascii_uppercase() {
        '0' => [0x3E, 0x51, 0x49, 0x45, 0x3E],
        '1' => [0x00, 0x42, 0x7F, 0x40, 0x00],
        '2' => [0x42, 0x61, 0x51, 0x49, 0x46],
        '3' => [0x21, 0x41, 0x45, 0x4B, 0x31],
        '4' => [0x18, 0x14, 0x12, 0x7F, 0x10],
        '5' => [0x27, 0x45, 0x45, 0x45, 0x39],
        '6' => [0x3C, 0x4A, 0x49, 0x49, 0x30],
        '7' => [0x01, 0x71, 0x09, 0x05, 0x03],
        '8' => [0x36, 0x49, 0x49, 0x49, 0x36],
        '9' => [0x06, 0x49, 0x49, 0x29, 0x1E],
        'A' => [0x7E, 0x11, 0x11, 0x11, 0x7E],
        'B' => [0x7F, 0x49, 0x49, 0x49, 0x36],
        'C' => [0x3E, 0x41, 0x41, 0x41, 0x22],
        'D' => [0x7F, 0x41, 0x41, 0x22, 0x1C],
        'E' => [0x7F, 0x49, 0x49, 0x49, 0x41],
        'F' => [0x7F, 0x09, 0x09, 0x09, 0x01],
        'G' => [0x3E, 0x41, 0x49, 0x49, 0x7A],
        'H' => [0x7F, 0x08, 0x08, 0x08, 0x7F],
        'I' => [0x00, 0x41, 0x7F, 0x41, 0x00],
        'J' => [0x20, 0x40, 0x41, 0x3F, 0x01],
        'K' => [0x7F, 0x08, 0x14, 0x22, 0x41],
        'L' => [0x7F, 0x40, 0x40, 0x40, 0x40],
        'M' => [0x7F, 0x02, 0x0C, 0x02, 0x7F],
        'N' => [0x7F, 0x04, 0x08, 0x10, 0x7F],
        'O' => [0x3E, 0x41, 0x41, 0x41, 0x3E],
        'P' => [0x7F, 0x09, 0x09, 0x09, 0x06],
        'Q' => [0x3E, 0x41, 0x51, 0x21, 0x5E],
        'R' => [0x7F, 0x09, 0x19, 0x29, 0x46],
        'S' => [0x46, 0x49, 0x49, 0x49, 0x31],
        'T' => [0x01, 0x01, 0x7F, 0x01, 0x01],
        'U' => [0x3F, 0x40, 0x40, 0x40, 0x3F],
        'V' => [0x1F, 0x20, 0x40, 0x20, 0x1F],
        'W' => [0x7F, 0x20, 0x18, 0x20, 0x7F],
        'X' => [0x63, 0x14, 0x08, 0x14, 0x63],
        'Y' => [0x03, 0x04, 0x78, 0x04, 0x03],
        'Z' => [0x61, 0x51, 0x49, 0x45, 0x43],
        '(' => [0x00, 0x1C, 0x22, 0x41, 0x00],
        ')' => [0x00, 0x41, 0x22, 0x1C, 0x00],
        '%' => [0x23, 0x13, 0x08, 0x64, 0x62],
        '.' => [0x00, 0x60, 0x60, 0x00, 0x00],
        ',' => [0x00, 0x50, 0x30, 0x00, 0x00],
        '-' => [0x08, 0x08, 0x08, 0x08, 0x08],
        '_' => [0x40, 0x40, 0x40, 0x40, 0x40],
        ':' => [0x00, 0x36, 0x36, 0x00, 0x00],
        _ => [0x00; 5],
    }
}
