use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Result, VideoError};
use crate::video::types::{Frame, VideoInfo};

/// Sequential frame reader with random access by frame index.
///
/// `read_frame` returns `Ok(None)` at end of stream; that is a normal
/// terminal condition, not an error.
pub trait FrameSource: Send {
    fn info(&self) -> VideoInfo;

    fn read_frame(&mut self) -> Result<Option<Frame>>;

    /// Reposition so that the next `read_frame` yields frame `index`.
    fn seek(&mut self, index: u64) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    nb_read_packets: Option<String>,
    duration: Option<String>,
}

/// Decodes a video file through an `ffmpeg` child process that streams
/// raw RGB24 frames on its stdout.
pub struct FfmpegSource {
    path: PathBuf,
    info: VideoInfo,
    decoder: Option<Child>,
    stdout: Option<ChildStdout>,
}

impl FfmpegSource {
    /// Probe `path` and start decoding from frame 0.
    ///
    /// Fails with [`VideoError::OpenFailed`] when the file is missing or the
    /// backend cannot read it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(VideoError::OpenFailed {
                path: path.display().to_string(),
                reason: "no such file".to_string(),
            }
            .into());
        }

        let info = probe(path)?;
        info!(
            "Video: {} fps:{}, size:({}, {}), total:{}",
            path.display(),
            info.fps,
            info.width,
            info.height,
            info.total_frames
        );

        let mut source = Self {
            path: path.to_path_buf(),
            info,
            decoder: None,
            stdout: None,
        };
        source.spawn_decoder(0)?;
        Ok(source)
    }

    fn spawn_decoder(&mut self, index: u64) -> Result<()> {
        self.stop_decoder();

        let start_seconds = self.info.seek_seconds(index);
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin"])
            .args(["-ss", &format!("{:.6}", start_seconds)])
            .arg("-i")
            .arg(&self.path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VideoError::OpenFailed {
                path: self.path.display().to_string(),
                reason: format!("failed to spawn ffmpeg: {}", e),
            })?;

        self.stdout = child.stdout.take();
        self.decoder = Some(child);
        debug!("Decoder positioned at frame {} ({:.3}s)", index, start_seconds);
        Ok(())
    }

    fn stop_decoder(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.decoder.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut data = vec![0u8; self.info.frame_bytes()];
        match stdout.read_exact(&mut data) {
            Ok(()) => {}
            // A short read means the decoder has drained the stream.
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.stop_decoder();
                return Ok(None);
            }
            Err(e) => {
                return Err(VideoError::DecodingFailed {
                    reason: format!("{}: {}", self.path.display(), e),
                }
                .into())
            }
        }

        Frame::from_rgb_bytes(self.info.width, self.info.height, data)
            .map(Some)
            .ok_or_else(|| {
                VideoError::DecodingFailed {
                    reason: "frame buffer size mismatch".to_string(),
                }
                .into()
            })
    }

    fn seek(&mut self, index: u64) -> Result<()> {
        self.spawn_decoder(index.min(self.info.total_frames))
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.stop_decoder();
    }
}

/// Read fps, frame size and frame count of the first video stream with `ffprobe`.
pub fn probe<P: AsRef<Path>>(path: P) -> Result<VideoInfo> {
    let path = path.as_ref();
    let open_failed = |reason: String| VideoError::OpenFailed {
        path: path.display().to_string(),
        reason,
    };

    let output = Command::new("ffprobe")
        .args(["-v", "error", "-select_streams", "v:0", "-count_packets"])
        .args([
            "-show_entries",
            "stream=width,height,r_frame_rate,nb_frames,nb_read_packets,duration",
        ])
        .args(["-of", "json"])
        .arg(path)
        .output()
        .map_err(|e| open_failed(format!("failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(open_failed(stderr.trim().to_string()).into());
    }

    let parsed: ProbeOutput = serde_json::from_slice(&output.stdout).map_err(|e| VideoError::ProbeFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| open_failed("no video stream".to_string()))?;

    stream_info(stream).ok_or_else(|| {
        VideoError::ProbeFailed {
            path: path.display().to_string(),
            reason: "incomplete stream metadata".to_string(),
        }
        .into()
    })
}

fn stream_info(stream: ProbeStream) -> Option<VideoInfo> {
    let width = stream.width.filter(|w| *w > 0)?;
    let height = stream.height.filter(|h| *h > 0)?;
    let frame_rate = stream.r_frame_rate.as_deref().and_then(parse_rate)?;

    let counted = |value: &Option<String>| value.as_deref().and_then(|v| v.parse::<u64>().ok()).filter(|n| *n > 0);
    let total_frames = match counted(&stream.nb_read_packets).or_else(|| counted(&stream.nb_frames)) {
        Some(n) => n,
        None => {
            let duration: f64 = stream.duration.as_deref()?.parse().ok()?;
            warn!("Frame count unavailable, estimating from duration {:.2}s", duration);
            (duration * frame_rate).round() as u64
        }
    };

    Some(VideoInfo::new(frame_rate, width, height, total_frames))
}

/// Parse an ffprobe rational like `30000/1001` or a plain number.
fn parse_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("30/1"), Some(30.0));
        assert!((parse_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_rate("25"), Some(25.0));
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("abc"), None);
    }

    #[test]
    fn test_stream_info_prefers_counted_packets() {
        let json = r#"{"streams":[{"width":640,"height":360,"r_frame_rate":"30000/1001",
            "nb_frames":"290","nb_read_packets":"300","duration":"10.0"}]}"#;
        let parsed: ProbeOutput = serde_json::from_str(json).unwrap();
        let info = stream_info(parsed.streams.into_iter().next().unwrap()).unwrap();

        assert_eq!(info, VideoInfo::new(30000.0 / 1001.0, 640, 360, 300));
    }

    #[test]
    fn test_stream_info_falls_back_to_duration() {
        let json = r#"{"streams":[{"width":320,"height":240,"r_frame_rate":"25/1","duration":"4.0"}]}"#;
        let parsed: ProbeOutput = serde_json::from_str(json).unwrap();
        let info = stream_info(parsed.streams.into_iter().next().unwrap()).unwrap();

        assert_eq!(info.total_frames, 100);
    }

    #[test]
    fn test_stream_info_keeps_exact_ntsc_rate() {
        let json = r#"{"streams":[{"width":1920,"height":1080,"r_frame_rate":"30000/1001",
            "nb_read_packets":"17982"}]}"#;
        let parsed: ProbeOutput = serde_json::from_str(json).unwrap();
        let info = stream_info(parsed.streams.into_iter().next().unwrap()).unwrap();

        assert_eq!(info.fps, 30);
        assert!((info.frame_rate - 29.970_03).abs() < 1e-4);

        // Halfway seek must start on frame 8991, not on the frame an
        // integer rate would give.
        let target = info.frame_at_percent(50);
        let first_decoded = (info.seek_seconds(target) * 30000.0 / 1001.0).ceil() as u64;
        assert_eq!(first_decoded, 8991);
    }

    #[test]
    fn test_open_missing_file_fails() {
        let err = FfmpegSource::open("definitely/not/here.mp4").err().unwrap();
        assert!(matches!(
            err,
            crate::error::CutterError::Video(VideoError::OpenFailed { .. })
        ));
    }
}
