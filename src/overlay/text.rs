use std::path::Path;

use fontdue::{Font, FontSettings};
use image::RgbImage;

use crate::error::{Result, VideoError};

/// Pixel size of a glyph run at scale 1.0.
pub const BASE_FONT_PX: f32 = 30.0;

/// Horizontal room a label must leave inside its button.
pub const TEXT_MARGIN: u32 = 10;

/// Candidate scales for label words, tried largest first (1.2 down to 0.3).
const SCALE_STEPS: std::ops::RangeInclusive<u32> = 3..=12;

/// Measures and rasterises text for the side panel.
pub trait Typeface: Send + Sync {
    /// Bounding box `(width, height)` of `text` at `scale`, height measured
    /// above the baseline.
    fn measure(&self, text: &str, scale: f32) -> (u32, u32);

    /// Draw `text` with its baseline at `baseline`, clipped to the image.
    fn draw(&self, image: &mut RgbImage, text: &str, x: i32, baseline: i32, scale: f32, color: [u8; 3]);
}

/// A label word placed inside a button cell, relative to the cell origin.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedWord {
    pub text: String,
    pub x: u32,
    pub baseline: u32,
    pub scale: f32,
}

/// Fit a label into a `cell_width` x `cell_height` button.
///
/// Each whitespace-separated word gets the largest candidate scale whose
/// box fits within the cell width minus [`TEXT_MARGIN`] and is shorter than
/// `cell_height / (words + 2)`. Words are stacked vertically and centred
/// horizontally. A word that fits at no scale is left out.
pub fn fit_label(face: &dyn Typeface, label: &str, cell_width: u32, cell_height: u32) -> Vec<PlacedWord> {
    let words: Vec<&str> = label.split_whitespace().collect();
    let row_limit = cell_height as f32 / (words.len() + 2) as f32;

    words
        .iter()
        .enumerate()
        .filter_map(|(row, word)| {
            SCALE_STEPS.rev().find_map(|step| {
                let scale = step as f32 / 10.0;
                let (w, h) = face.measure(word, scale);
                (w + TEXT_MARGIN <= cell_width && (h as f32) < row_limit).then(|| PlacedWord {
                    text: (*word).to_string(),
                    x: (cell_width - w) / 2,
                    baseline: (1 + row as u32) * 2 * h,
                    scale,
                })
            })
        })
        .collect()
}

/// [`Typeface`] backed by a TrueType font rasterised with fontdue.
pub struct FontFace {
    font: Font,
}

impl FontFace {
    /// The monospace font bundled with egui.
    pub fn builtin() -> Result<Self> {
        Self::from_bytes(epaint_default_fonts::HACK_REGULAR)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|e| VideoError::InvalidParameters {
            details: format!("unusable font: {}", e),
        })?;
        Ok(Self { font })
    }
}

impl Typeface for FontFace {
    fn measure(&self, text: &str, scale: f32) -> (u32, u32) {
        let px = scale * BASE_FONT_PX;
        let mut width = 0.0f32;
        let mut height = 0i32;
        for c in text.chars() {
            let metrics = self.font.metrics(c, px);
            width += metrics.advance_width;
            height = height.max(metrics.height as i32 + metrics.ymin);
        }
        (width.ceil() as u32, height.max(0) as u32)
    }

    fn draw(&self, image: &mut RgbImage, text: &str, x: i32, baseline: i32, scale: f32, color: [u8; 3]) {
        let px = scale * BASE_FONT_PX;
        let (img_w, img_h) = (image.width() as i32, image.height() as i32);
        let mut pen = x as f32;

        for c in text.chars() {
            let (metrics, coverage) = self.font.rasterize(c, px);
            let left = pen.round() as i32 + metrics.xmin;
            let top = baseline - (metrics.height as i32 + metrics.ymin);

            for (i, alpha) in coverage.iter().enumerate() {
                if *alpha == 0 {
                    continue;
                }
                let gx = left + (i % metrics.width) as i32;
                let gy = top + (i / metrics.width) as i32;
                if gx < 0 || gy < 0 || gx >= img_w || gy >= img_h {
                    continue;
                }
                let a = *alpha as u32;
                let pixel = image.get_pixel_mut(gx as u32, gy as u32);
                for (channel, target) in pixel.0.iter_mut().zip(color) {
                    *channel = ((*channel as u32 * (255 - a) + target as u32 * a) / 255) as u8;
                }
            }
            pen += metrics.advance_width;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Fixed-advance face: every glyph is a `20*scale` square block.
    pub struct BlockFace;

    impl BlockFace {
        fn side(scale: f32) -> u32 {
            (scale * 20.0).round() as u32
        }
    }

    impl Typeface for BlockFace {
        fn measure(&self, text: &str, scale: f32) -> (u32, u32) {
            let side = Self::side(scale);
            (side * text.chars().count() as u32, side)
        }

        fn draw(&self, image: &mut RgbImage, text: &str, x: i32, baseline: i32, scale: f32, color: [u8; 3]) {
            let (w, h) = self.measure(text, scale);
            for dy in 0..h as i32 {
                for dx in 0..w as i32 {
                    let (px, py) = (x + dx, baseline - h as i32 + dy);
                    if px >= 0 && py >= 0 && (px as u32) < image.width() && (py as u32) < image.height() {
                        image.put_pixel(px as u32, py as u32, image::Rgb(color));
                    }
                }
            }
        }
    }
}
