use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::error::{Result, VideoError};
use crate::video::types::{EncoderParams, Frame, VideoInfo};

/// Destination for the frames of the cut region, in source order.
pub trait FrameSink: Send {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and close the output. Returns the number of frames written.
    fn finish(&mut self) -> Result<u64>;
}

/// Encodes frames by piping raw RGB24 into an `ffmpeg` child process.
///
/// The encoder process is started on the first frame, so a session that
/// never cuts leaves no output file behind. If it cannot be started, later
/// frames are dropped without retrying and `finish` reports the failure.
pub struct FfmpegSink {
    path: PathBuf,
    info: VideoInfo,
    params: EncoderParams,
    program: String,
    encoder: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    spawn_error: Option<String>,
    frames_written: u64,
    frames_dropped: u64,
}

impl FfmpegSink {
    pub fn new<P: AsRef<Path>>(path: P, info: VideoInfo, params: EncoderParams) -> Self {
        Self::with_program(path, info, params, "ffmpeg")
    }

    fn with_program<P: AsRef<Path>>(path: P, info: VideoInfo, params: EncoderParams, program: &str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            info,
            params,
            program: program.to_string(),
            encoder: None,
            stdin: None,
            stderr: None,
            spawn_error: None,
            frames_written: 0,
            frames_dropped: 0,
        }
    }

    fn ensure_encoder(&mut self) -> Result<&mut ChildStdin> {
        if self.stdin.is_none() {
            let spawned = Command::new(&self.program)
                .args(["-v", "error", "-y"])
                .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
                .args(["-s", &format!("{}x{}", self.info.width, self.info.height)])
                .args(["-r", &format!("{:.6}", self.info.frame_rate)])
                .args(["-i", "-"])
                .args(["-c:v", &self.params.codec])
                .args(["-pix_fmt", "yuv420p"])
                .args(["-crf", &self.params.crf().to_string()])
                .arg(&self.path)
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .spawn();
            let mut child = match spawned {
                Ok(child) => child,
                Err(e) => {
                    let reason = format!("Failed to spawn FFmpeg process: {}", e);
                    self.spawn_error = Some(reason.clone());
                    return Err(VideoError::EncodingFailed { reason }.into());
                }
            };

            info!(
                "Encoding to {} ({} {}x{} @ {} fps, crf {})",
                self.path.display(),
                self.params.codec,
                self.info.width,
                self.info.height,
                self.info.fps,
                self.params.crf()
            );
            self.stdin = child.stdin.take();
            // Drained on its own thread so a chatty encoder never blocks on a full pipe.
            self.stderr = child.stderr.take().map(|mut stderr| {
                thread::spawn(move || {
                    let mut text = String::new();
                    let _ = stderr.read_to_string(&mut text);
                    text
                })
            });
            self.encoder = Some(child);
        }

        self.stdin.as_mut().ok_or_else(|| {
            VideoError::EncodingFailed {
                reason: "encoder stdin unavailable".to_string(),
            }
            .into()
        })
    }
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.width() != self.info.width || frame.height() != self.info.height {
            return Err(VideoError::InvalidParameters {
                details: format!(
                    "frame is {}x{}, encoder expects {}x{}",
                    frame.width(),
                    frame.height(),
                    self.info.width,
                    self.info.height
                ),
            }
            .into());
        }

        if self.spawn_error.is_some() {
            self.frames_dropped += 1;
            return Ok(());
        }

        let stdin = self.ensure_encoder()?;
        stdin.write_all(frame.as_rgb_bytes()).map_err(|e| VideoError::EncodingFailed {
            reason: format!("Failed to write frame: {}", e),
        })?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<u64> {
        // Closing stdin tells ffmpeg the stream is complete.
        self.stdin = None;
        if let Some(reason) = self.spawn_error.take() {
            return Err(VideoError::EncodingFailed {
                reason: format!("{}; {} cut frames dropped", reason, self.frames_dropped + 1),
            }
            .into());
        }
        let Some(mut child) = self.encoder.take() else {
            debug!("No frames were cut, {} not written", self.path.display());
            return Ok(0);
        };

        let status = child.wait().map_err(|e| VideoError::EncodingFailed {
            reason: format!("FFmpeg execution failed: {}", e),
        })?;
        let stderr = self.stderr.take().and_then(|reader| reader.join().ok()).unwrap_or_default();
        if !status.success() {
            return Err(VideoError::EncodingFailed {
                reason: format!("FFmpeg failed: {}", stderr.trim()),
            }
            .into());
        }

        info!("Wrote {} frames to {}", self.frames_written, self.path.display());
        Ok(self.frames_written)
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.encoder.is_some() {
            if let Err(e) = self.finish() {
                warn!("Encoder did not shut down cleanly: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn info() -> VideoInfo {
        VideoInfo::new(25.0, 8, 6, 100)
    }

    #[test]
    fn test_unused_sink_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        let mut sink = FfmpegSink::new(&path, info(), EncoderParams::default());

        assert_eq!(sink.finish().unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_encoder_fails_once_then_drops_frames() {
        let dir = tempdir().unwrap();
        let mut sink = FfmpegSink::with_program(
            dir.path().join("out.mp4"),
            info(),
            EncoderParams::default(),
            "videocut-missing-encoder",
        );
        let frame = Frame::new_filled(8, 6, [10, 20, 30]);

        let err = sink.write_frame(&frame).unwrap_err();
        assert!(err.is_recoverable());
        for _ in 0..4 {
            assert!(sink.write_frame(&frame).is_ok());
        }
        assert_eq!(sink.frames_dropped, 4);

        let err = sink.finish().unwrap_err();
        assert!(err.to_string().contains("5 cut frames dropped"));
        assert!(sink.encoder.is_none());
    }

    #[test]
    fn test_rejects_wrong_frame_size() {
        let dir = tempdir().unwrap();
        let mut sink = FfmpegSink::new(dir.path().join("out.mp4"), info(), EncoderParams::default());

        let err = sink.write_frame(&Frame::new_filled(4, 4, [0, 0, 0])).unwrap_err();
        assert!(!err.is_recoverable());
        assert!(sink.encoder.is_none());
    }
}
