use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use tracing::{error, info, warn};

use crate::{
    config::Config,
    display::{run_viewer, Viewer},
    error::{CutterError, Result},
    overlay::{FontFace, OverlayRenderer, PanelLayout, Typeface},
    playback::{command_channel, ControllerOptions, PipelineHandles, PlaybackController, Watchdog},
    video::{FfmpegSink, FfmpegSource, FrameSource},
};

/// Outcome of a finished session
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub output: PathBuf,
    pub frames_cut: u64,
    pub fps: u32,
}

impl SessionReport {
    pub fn duration_seconds(&self) -> f64 {
        self.frames_cut as f64 / self.fps.max(1) as f64
    }
}

/// One interactive cut: opens the source, starts the playback and watchdog
/// threads, runs the viewer on the calling thread and waits for everything
/// to wind down.
///
/// The calling thread must be the main thread; the window requires it.
pub struct Session {
    config: Config,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<SessionReport> {
        let job = self.config.video_job()?;
        let player = &self.config.player;

        // Nothing starts until the source has opened.
        let source = FfmpegSource::open(&job.input)?;
        let info = source.info();
        let sink = FfmpegSink::new(&job.output, info, self.config.encoder.clone());

        let handles = PipelineHandles::new(player.queue_capacity);
        let (commands, receiver) = command_channel();
        let controller = PlaybackController::new(
            Box::new(source),
            Box::new(sink),
            OverlayRenderer::new(self.load_face()?),
            receiver,
            handles.clone(),
            ControllerOptions {
                start_seconds: job.start_seconds,
                speed_level: player.speed_level,
                pause_poll: player.pause_poll(),
            },
        )?;

        let watchdog = Watchdog::new(
            Arc::clone(&handles.status),
            Arc::clone(&handles.save_slot),
            commands.clone(),
            player.save_dir.clone(),
            player.save_pattern.clone(),
            player.watchdog_tick(),
        );

        let playback = thread::Builder::new()
            .name("playback".to_string())
            .spawn(move || controller.run())?;
        let watchdog = watchdog.spawn()?;

        let viewer = Viewer::new(
            Arc::clone(&handles.queue),
            Arc::clone(&handles.status),
            commands.clone(),
            player.speed_level,
            player.display_poll(),
        );
        let layout = PanelLayout::new(info.width, info.height);
        if let Err(e) = run_viewer(viewer, window_size(layout)) {
            // The watchdog sees the closed window and stops playback.
            error!("{}", e);
        }

        let frames_cut = playback
            .join()
            .map_err(|_| CutterError::generic("playback thread panicked"))??;
        if watchdog.join().is_err() {
            warn!("watchdog thread panicked");
        }

        info!("Cut {} frames into {}", frames_cut, job.output.display());
        Ok(SessionReport {
            output: job.output,
            frames_cut,
            fps: info.fps,
        })
    }

    fn load_face(&self) -> Result<Arc<dyn Typeface>> {
        let face = match &self.config.player.font {
            Some(path) => FontFace::from_file(path).or_else(|e| {
                warn!("Font {} unusable ({}), using bundled font", path.display(), e);
                FontFace::builtin()
            })?,
            None => FontFace::builtin()?,
        };
        Ok(Arc::new(face))
    }
}

/// Initial window size: the display frame, scaled down to fit a typical screen.
fn window_size(layout: PanelLayout) -> [f32; 2] {
    const MAX_WIDTH: f32 = 1600.0;
    const SLIDER_ROOM: f32 = 80.0;
    let width = layout.display_width() as f32;
    let height = layout.frame_height as f32;
    let scale = (MAX_WIDTH / width).min(1.0);
    [width * scale, height * scale + SLIDER_ROOM]
}
