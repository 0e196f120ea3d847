use image::{ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// A single decoded video frame
///
/// Thin wrapper around an RGB image buffer. Frames are produced by a
/// [`FrameSource`](crate::video::FrameSource) and handed to the overlay
/// renderer, the encoder and the still-image writer.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_fn(width, height, |_, _| Rgb(color));
        Self { buffer }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    /// Raw RGB24 bytes, row-major, as fed to the encoder
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Create a frame from raw RGB bytes
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    /// Save the frame as a PNG file
    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), image::ImageError> {
        self.buffer.save_with_format(path, image::ImageFormat::Png)
    }
}

/// Stream parameters of an opened source. Fixed for the lifetime of the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    /// Frames per second, rounded to an integer
    pub fps: u32,
    /// Exact frame rate, e.g. 29.97 for a `30000/1001` stream
    pub frame_rate: f64,
    pub width: u32,
    pub height: u32,
    pub total_frames: u64,
}

impl VideoInfo {
    pub fn new(frame_rate: f64, width: u32, height: u32, total_frames: u64) -> Self {
        Self {
            fps: (frame_rate.round() as u32).max(1),
            frame_rate,
            width,
            height,
            total_frames,
        }
    }

    /// Size in bytes of one RGB24 frame
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Frame index that corresponds to `seconds` into the stream, clamped to the stream length
    pub fn frame_at_seconds(&self, seconds: f64) -> u64 {
        let index = (self.frame_rate * seconds.max(0.0)).round() as u64;
        index.min(self.total_frames)
    }

    /// Input seek time that makes frame `index` the first decoded frame.
    ///
    /// Lands half a frame before the frame's timestamp so that rounding of
    /// the printed time can neither skip it nor include its predecessor.
    pub fn seek_seconds(&self, index: u64) -> f64 {
        if index == 0 {
            return 0.0;
        }
        (index as f64 - 0.5) / self.frame_rate
    }

    /// Frame index for a progress slider percentage
    pub fn frame_at_percent(&self, percent: u8) -> u64 {
        let percent = percent.min(100) as u64;
        ((self.total_frames * percent) as f64 / 100.0).round() as u64
    }

    /// Progress slider percentage for a frame position
    pub fn percent_at(&self, position: u64) -> u8 {
        if self.total_frames == 0 {
            return 0;
        }
        let percent = (position as f64 * 100.0 / self.total_frames as f64).round();
        percent.clamp(0.0, 100.0) as u8
    }

    /// Position as a fraction of the whole stream, used in log lines
    pub fn ratio_at(&self, position: u64) -> f64 {
        if self.total_frames == 0 {
            0.0
        } else {
            position as f64 / self.total_frames as f64
        }
    }
}

/// Output encoding parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EncoderParams {
    /// ffmpeg video encoder name
    pub codec: String,

    /// Quality setting (0-100, higher is better)
    pub quality: u8,
}

impl Default for EncoderParams {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            quality: 85,
        }
    }
}

impl EncoderParams {
    /// Map the 0-100 quality setting onto ffmpeg's CRF scale (0 best, 51 worst)
    pub fn crf(&self) -> u8 {
        (51 - ((self.quality.min(100) as f32 / 100.0) * 51.0) as u8).clamp(0, 51)
    }
}
