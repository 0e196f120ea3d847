use std::sync::Arc;

use image::{Rgb, RgbImage};
use rayon::prelude::*;

use crate::overlay::layout::{Button, CellRect, PanelLayout};
use crate::overlay::text::{fit_label, Typeface};
use crate::playback::PlaybackState;
use crate::video::Frame;

pub const CAPTION: &str = "Drag the progress bar when video pause";

const PANEL_BACKGROUND: [u8; 3] = [255, 255, 255];
const ENABLED_COLOR: [u8; 3] = [0, 200, 0];
const DISABLED_COLOR: [u8; 3] = [200, 0, 0];
const LABEL_COLOR: [u8; 3] = [255, 255, 0];
const CAPTION_COLOR: [u8; 3] = [255, 0, 255];

/// Toggle states shown on the three panel buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanelState {
    pub playing: bool,
    pub cutting: bool,
    pub save_pending: bool,
}

impl PanelState {
    pub fn of(state: &PlaybackState, save_pending: bool) -> Self {
        Self {
            playing: state.playing,
            cutting: state.cutting,
            save_pending,
        }
    }

    fn enabled(&self, button: Button) -> bool {
        match button {
            Button::Play => self.playing,
            Button::Cut => self.cutting,
            Button::Save => self.save_pending,
        }
    }

    fn label(&self, button: Button) -> &'static str {
        match button {
            Button::Play if self.playing => "Video PAUSE",
            Button::Play => "Video START",
            Button::Cut if self.cutting => "CUT PAUSE",
            Button::Cut => "CUT START",
            Button::Save => "SAVE IMAGE",
        }
    }
}

/// A source frame composited with the control panel, ready for display.
#[derive(Debug, Clone)]
pub struct DisplayFrame {
    pub image: RgbImage,
    pub layout: PanelLayout,
    /// Index of the source frame shown.
    pub position: u64,
}

/// Composes decoded frames with the side panel.
///
/// Rendering has no side effects; the same inputs always produce the same
/// pixels.
#[derive(Clone)]
pub struct OverlayRenderer {
    face: Arc<dyn Typeface>,
}

impl OverlayRenderer {
    pub fn new(face: Arc<dyn Typeface>) -> Self {
        Self { face }
    }

    pub fn render(&self, frame: &Frame, panel: PanelState, position: u64) -> DisplayFrame {
        let layout = PanelLayout::new(frame.width(), frame.height());
        let mut image = RgbImage::from_pixel(layout.display_width(), layout.frame_height, Rgb(PANEL_BACKGROUND));
        copy_into_left(&mut image, frame);

        let width = layout.frame_width as f32;
        self.face.draw(
            &mut image,
            CAPTION,
            10,
            (width / 40.0).round() as i32,
            width / 1000.0,
            CAPTION_COLOR,
        );

        for button in Button::ALL {
            self.draw_button(&mut image, layout.cell(button), panel.label(button), panel.enabled(button));
        }

        DisplayFrame { image, layout, position }
    }

    fn draw_button(&self, image: &mut RgbImage, cell: CellRect, label: &str, enabled: bool) {
        if cell.width == 0 || cell.height == 0 {
            return;
        }
        let color = if enabled { ENABLED_COLOR } else { DISABLED_COLOR };
        fill_circle(image, cell, color);

        for word in fit_label(self.face.as_ref(), label, cell.width, cell.height) {
            self.face.draw(
                image,
                &word.text,
                (cell.x + word.x) as i32,
                (cell.y + word.baseline) as i32,
                word.scale,
                LABEL_COLOR,
            );
        }
    }
}

/// Copy the source rows into the left columns of the wider display image.
fn copy_into_left(image: &mut RgbImage, frame: &Frame) {
    let dst_stride = image.width() as usize * 3;
    let src_stride = frame.width() as usize * 3;
    if src_stride == 0 {
        return;
    }
    let pixels: &mut [u8] = image;
    pixels
        .par_chunks_mut(dst_stride)
        .zip(frame.as_rgb_bytes().par_chunks(src_stride))
        .for_each(|(dst, src)| dst[..src_stride].copy_from_slice(src));
}

/// Filled circle of radius `min(width, height)/2` centred in `cell`.
fn fill_circle(image: &mut RgbImage, cell: CellRect, color: [u8; 3]) {
    let radius = (cell.width.min(cell.height) / 2) as i64;
    let cx = (cell.x + cell.width / 2) as i64;
    let cy = (cell.y + cell.height / 2) as i64;

    for y in cell.y..(cell.y + cell.height).min(image.height()) {
        for x in cell.x..(cell.x + cell.width).min(image.width()) {
            let (dx, dy) = (x as i64 - cx, y as i64 - cy);
            if dx * dx + dy * dy <= radius * radius {
                image.put_pixel(x, y, Rgb(color));
            }
        }
    }
}
