//! # Video Module
//!
//! Frame decoding, encoding of the cut region and still-image snapshots.
//! Both directions drive external `ffmpeg`/`ffprobe` processes.

pub mod types;
pub mod source;
pub mod sink;
pub mod still;

pub use types::{EncoderParams, Frame, VideoInfo};
pub use source::{probe, FfmpegSource, FrameSource};
pub use sink::{FfmpegSink, FrameSink};
