use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, TryRecvError};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::overlay::{DisplayFrame, OverlayRenderer, PanelState};
use crate::playback::command::Command;
use crate::playback::queue::FrameQueue;
use crate::playback::state::{PlaybackState, SaveSlot, SharedStatus};
use crate::video::{Frame, FrameSink, FrameSource};

/// How long the paused loop waits for a command before re-checking its state.
pub const DEFAULT_PAUSE_POLL: Duration = Duration::from_millis(100);

/// Handles shared between the controller, the viewer and the watchdog.
#[derive(Clone)]
pub struct PipelineHandles {
    pub queue: Arc<FrameQueue<DisplayFrame>>,
    pub status: Arc<SharedStatus>,
    pub save_slot: Arc<SaveSlot>,
}

impl PipelineHandles {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue: Arc::new(FrameQueue::new(queue_capacity)),
            status: Arc::new(SharedStatus::new()),
            save_slot: Arc::new(SaveSlot::new()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    pub start_seconds: f64,
    pub speed_level: u8,
    pub pause_poll: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            start_seconds: 0.0,
            speed_level: 8,
            pause_poll: DEFAULT_PAUSE_POLL,
        }
    }
}

/// Result of one main-loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    EndOfStream,
    Stopped,
}

/// Drives decode, display and encode, and is the only writer of
/// [`PlaybackState`].
///
/// Commands from the viewer and watchdog are applied at two points: at the
/// start of every iteration and while blocked in the pause wait. The source
/// and sink are owned exclusively and released exactly once by
/// [`finish`](Self::finish).
pub struct PlaybackController {
    source: Box<dyn FrameSource>,
    sink: Box<dyn FrameSink>,
    renderer: OverlayRenderer,
    commands: Receiver<Command>,
    handles: PipelineHandles,
    state: PlaybackState,
    current: Option<Frame>,
    pause_poll: Duration,
}

impl PlaybackController {
    /// Position the source at the configured start time. Starts paused.
    pub fn new(
        mut source: Box<dyn FrameSource>,
        sink: Box<dyn FrameSink>,
        renderer: OverlayRenderer,
        commands: Receiver<Command>,
        handles: PipelineHandles,
        options: ControllerOptions,
    ) -> Result<Self> {
        let info = source.info();
        let position = info.frame_at_seconds(options.start_seconds);
        if position > 0 {
            source.seek(position)?;
        }

        let state = PlaybackState::new(info, position, options.speed_level);
        handles.status.publish(&state);
        info!(
            "Ready at frame {} of {} ({} fps, speed level {})",
            position, info.total_frames, info.fps, state.speed_level
        );

        Ok(Self {
            source,
            sink,
            renderer,
            commands,
            handles,
            state,
            current: None,
            pause_poll: options.pause_poll,
        })
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Run until end of stream or shutdown, then release the source and
    /// sink. Returns the number of frames written to the output.
    pub fn run(mut self) -> Result<u64> {
        let outcome = loop {
            match self.step() {
                Ok(Step::Continue) => continue,
                Ok(step) => break Ok(step),
                Err(e) => break Err(e),
            }
        };

        match &outcome {
            Ok(Step::EndOfStream) => info!("[VIDEO] play over at frame {}", self.state.position),
            Ok(_) => info!("[VIDEO] stopped at frame {}", self.state.position),
            Err(e) => error!("Playback aborted: {}", e),
        }

        let written = self.finish();
        outcome.and(written)
    }

    /// One iteration of the main loop.
    pub fn step(&mut self) -> Result<Step> {
        self.drain_commands();
        if !self.state.running {
            return Ok(Step::Stopped);
        }

        let Some(frame) = self.source.read_frame()? else {
            return Ok(Step::EndOfStream);
        };
        let index = self.state.position;
        self.state.position = (index + 1).min(self.state.info.total_frames);
        self.show(&frame, index);
        self.current = Some(frame);

        if !self.state.playing {
            self.state.seeking = false;
            info!("[VIDEO] Pause at {}({:.3})", self.state.position, self.state.ratio());
            self.wait_while_paused();
        }

        if !self.state.running {
            return Ok(Step::Stopped);
        }

        if self.state.cutting {
            if let Some(frame) = &self.current {
                if let Err(e) = self.sink.write_frame(frame) {
                    error!("[CUT] frame {} not written: {}", index, e);
                    if !e.is_recoverable() {
                        self.state.cutting = false;
                        info!("[CUT] Stop at {}({:.3})", self.state.position, self.state.ratio());
                        self.handles.status.publish(&self.state);
                    }
                }
            }
        }

        if !self.state.frame_delay.is_zero() {
            thread::sleep(self.state.frame_delay);
        }
        Ok(Step::Continue)
    }

    /// Apply a single command. Only the controller thread calls this.
    pub fn apply(&mut self, command: Command) {
        let position = self.state.position;
        let ratio = self.state.ratio();

        match command {
            Command::TogglePlay => {
                self.state.playing = !self.state.playing;
                if self.state.playing {
                    info!("[VIDEO] Start play at {}({:.3})", position, ratio);
                } else {
                    info!("[VIDEO] Pause requested at {}({:.3})", position, ratio);
                    if self.state.cutting {
                        self.state.cutting = false;
                        info!("[CUT] Stop at {}({:.3})", position, ratio);
                    }
                }
            }
            Command::ToggleCut => {
                if !self.state.playing {
                    debug!("Cut toggle ignored while paused");
                } else {
                    self.state.cutting = !self.state.cutting;
                    if self.state.cutting {
                        info!("[CUT] Start at {}({:.3})", position, ratio);
                    } else {
                        info!("[CUT] Stop at {}({:.3})", position, ratio);
                    }
                }
            }
            Command::SeekToPercent(percent) => self.seek_to_percent(percent),
            Command::SetSpeedLevel(level) => {
                self.state.set_speed_level(level);
                info!("[Set] video play speed level {}", self.state.speed_level);
            }
            Command::RequestSave => match &self.current {
                Some(frame) => self.handles.save_slot.request(frame.clone()),
                None => warn!("[IMAGE] no frame decoded yet, nothing to save"),
            },
            Command::Shutdown => {
                self.state.running = false;
                debug!("Shutdown requested at frame {}", position);
            }
        }

        self.handles.status.publish(&self.state);
    }

    /// Flush the output and mark the pipeline finished. Returns the number
    /// of frames written.
    pub fn finish(mut self) -> Result<u64> {
        let written = self.sink.finish();
        self.handles.status.mark_finished();
        written
    }

    fn seek_to_percent(&mut self, percent: u8) {
        if self.state.playing || self.state.seeking {
            debug!("Seek to {}% ignored, pause first", percent);
            return;
        }

        let target = self.state.info.frame_at_percent(percent);
        match self.source.seek(target) {
            Ok(()) => {
                self.state.position = target;
                self.state.seeking = true;
                info!("[Set] video progress to {}%({})", percent.min(100), target);
            }
            Err(e) => error!("Seek to frame {} failed: {}", target, e),
        }
    }

    fn show(&mut self, frame: &Frame, index: u64) {
        let panel = PanelState::of(&self.state, self.handles.save_slot.is_pending());
        let display = self.renderer.render(frame, panel, index);
        if self.handles.queue.put(display).is_some() {
            debug!("Viewer behind, dropped a frame before {}", index);
        }
        self.handles.status.publish(&self.state);
        self.handles.status.frame_queued();
    }

    fn drain_commands(&mut self) {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.apply(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.state.running = false;
                    break;
                }
            }
        }
    }

    /// Block until playback resumes, a seek is pending or shutdown is
    /// requested, applying commands as they arrive.
    fn wait_while_paused(&mut self) {
        while !self.state.playing && !self.state.seeking && self.state.running {
            match self.commands.recv_timeout(self.pause_poll) {
                Ok(command) => self.apply(command),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("Command channel closed while paused");
                    self.state.running = false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::text::testing::BlockFace;
    use crate::playback::command::{command_channel, CommandSender};
    use crate::video::VideoInfo;
    use parking_lot::Mutex;
    use std::time::Instant;

    /// Frames whose first pixel encodes their index.
    struct ScriptedSource {
        info: VideoInfo,
        next: u64,
    }

    impl ScriptedSource {
        fn new(total_frames: u64) -> Self {
            Self {
                info: VideoInfo::new(30.0, 28, 14, total_frames),
                next: 0,
            }
        }
    }

    fn index_of(frame: &Frame) -> u64 {
        let [lo, hi, _] = frame.get_pixel(0, 0);
        lo as u64 | ((hi as u64) << 8)
    }

    impl FrameSource for ScriptedSource {
        fn info(&self) -> VideoInfo {
            self.info
        }

        fn read_frame(&mut self) -> Result<Option<Frame>> {
            if self.next >= self.info.total_frames {
                return Ok(None);
            }
            let i = self.next;
            self.next += 1;
            Ok(Some(Frame::new_filled(
                self.info.width,
                self.info.height,
                [(i & 0xff) as u8, (i >> 8) as u8, 0],
            )))
        }

        fn seek(&mut self, index: u64) -> Result<()> {
            self.next = index;
            Ok(())
        }
    }

    /// Rejects every frame with an error the pipeline cannot recover from.
    struct RejectingSink;

    impl FrameSink for RejectingSink {
        fn write_frame(&mut self, _frame: &Frame) -> Result<()> {
            Err(crate::error::VideoError::InvalidParameters {
                details: "wrong frame size".to_string(),
            }
            .into())
        }

        fn finish(&mut self) -> Result<u64> {
            Ok(0)
        }
    }

    /// Collects formatted log output of the current thread.
    #[derive(Clone, Default)]
    struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogCapture {
        fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.lock()).lines().map(str::to_string).collect()
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        written: Arc<Mutex<Vec<u64>>>,
        finished: Arc<Mutex<u32>>,
    }

    impl FrameSink for RecordingSink {
        fn write_frame(&mut self, frame: &Frame) -> Result<()> {
            self.written.lock().push(index_of(frame));
            Ok(())
        }

        fn finish(&mut self) -> Result<u64> {
            *self.finished.lock() += 1;
            Ok(self.written.lock().len() as u64)
        }
    }

    fn controller(total: u64, options: ControllerOptions) -> (PlaybackController, CommandSender, PipelineHandles, RecordingSink) {
        let (tx, rx) = command_channel();
        let handles = PipelineHandles::new(1);
        let sink = RecordingSink::default();
        let controller = PlaybackController::new(
            Box::new(ScriptedSource::new(total)),
            Box::new(sink.clone()),
            OverlayRenderer::new(Arc::new(BlockFace)),
            rx,
            handles.clone(),
            options,
        )
        .unwrap();
        (controller, tx, handles, sink)
    }

    fn fast() -> ControllerOptions {
        ControllerOptions {
            speed_level: 10,
            pause_poll: Duration::from_millis(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_start_seconds_position_the_source() {
        let options = ControllerOptions { start_seconds: 2.0, ..fast() };
        let (mut controller, _tx, handles, _sink) = controller(300, options);
        assert_eq!(controller.state().position, 60);

        controller.apply(Command::TogglePlay);
        assert_eq!(controller.step().unwrap(), Step::Continue);
        assert_eq!(handles.queue.get().map(|d| d.position), Some(60));
        assert_eq!(controller.state().position, 61);
    }

    #[test]
    fn test_cut_toggle_ignored_while_paused() {
        let (mut controller, _tx, _handles, _sink) = controller(10, fast());
        controller.apply(Command::ToggleCut);
        assert!(!controller.state().cutting);

        controller.apply(Command::TogglePlay);
        controller.apply(Command::ToggleCut);
        assert!(controller.state().cutting);

        // Pausing ends the cut so cutting never outlives playing.
        controller.apply(Command::TogglePlay);
        assert!(!controller.state().playing);
        assert!(!controller.state().cutting);
    }

    #[test]
    fn test_seek_ignored_while_playing() {
        let (mut controller, _tx, _handles, _sink) = controller(300, fast());
        controller.apply(Command::TogglePlay);
        controller.apply(Command::SeekToPercent(50));

        assert_eq!(controller.state().position, 0);
        assert!(!controller.state().seeking);
    }

    #[test]
    fn test_seek_while_paused_sets_exact_position() {
        for percent in [0u8, 1, 33, 50, 99, 100] {
            let (mut controller, _tx, _handles, _sink) = controller(299, fast());
            controller.apply(Command::SeekToPercent(percent));

            let expected = ((299.0 * percent as f64) / 100.0).round() as u64;
            assert_eq!(controller.state().position, expected);
            assert!(controller.state().seeking);

            // A second seek before the first one is served is dropped.
            controller.apply(Command::SeekToPercent(10));
            assert_eq!(controller.state().position, expected);
        }
    }

    #[test]
    fn test_speed_levels() {
        let (mut controller, _tx, _handles, _sink) = controller(10, fast());
        assert_eq!(controller.state().frame_delay, Duration::ZERO);

        controller.apply(Command::SetSpeedLevel(0));
        assert!((controller.state().frame_delay.as_secs_f64() - 1.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_cut_region_frame_count() {
        let (mut controller, _tx, _handles, sink) = controller(300, fast());

        controller.apply(Command::TogglePlay);
        for _ in 0..100 {
            assert_eq!(controller.step().unwrap(), Step::Continue);
        }
        controller.apply(Command::ToggleCut);
        for _ in 100..250 {
            assert_eq!(controller.step().unwrap(), Step::Continue);
        }
        controller.apply(Command::ToggleCut);
        for _ in 250..260 {
            controller.step().unwrap();
        }

        let written = sink.written.lock().clone();
        assert_eq!(written.len(), 150);
        assert_eq!(written.first(), Some(&100));
        assert_eq!(written.last(), Some(&249));
        assert!(written.windows(2).all(|w| w[1] == w[0] + 1));
    }

    #[test]
    fn test_end_of_stream_releases_sink_once() {
        let (mut controller, _tx, handles, sink) = controller(5, fast());
        controller.apply(Command::TogglePlay);
        controller.apply(Command::ToggleCut);

        let mut steps = 0;
        while controller.step().unwrap() == Step::Continue {
            steps += 1;
        }
        assert_eq!(steps, 5);

        assert_eq!(controller.finish().unwrap(), 5);
        assert_eq!(*sink.finished.lock(), 1);
        assert!(handles.status.is_finished());
    }

    #[test]
    fn test_viewer_woken_for_every_shown_frame() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let (mut controller, _tx, handles, _sink) = controller(20, fast());
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        handles.status.set_frame_waker(Box::new(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        }));

        controller.apply(Command::TogglePlay);
        for _ in 0..12 {
            controller.step().unwrap();
        }
        assert_eq!(wakes.load(Ordering::Relaxed), 12);
    }

    #[test]
    fn test_save_request_hands_current_frame_to_slot() {
        let (mut controller, _tx, handles, _sink) = controller(10, fast());
        controller.apply(Command::RequestSave);
        assert!(!handles.save_slot.is_pending());

        controller.apply(Command::TogglePlay);
        controller.step().unwrap();
        controller.step().unwrap();
        controller.apply(Command::RequestSave);

        let saved = handles.save_slot.take().unwrap();
        assert_eq!(index_of(&saved), 1);
    }

    #[test]
    fn test_cut_between_toggles_writes_exact_range_and_logs_each_toggle() {
        let capture = LogCapture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .with_target(false)
            .finish();

        let (mut controller, _tx, _handles, sink) = controller(300, fast());
        tracing::subscriber::with_default(subscriber, || {
            controller.apply(Command::TogglePlay);
            for _ in 0..30 {
                assert_eq!(controller.step().unwrap(), Step::Continue);
            }
            controller.apply(Command::ToggleCut);
            for _ in 30..90 {
                assert_eq!(controller.step().unwrap(), Step::Continue);
            }
            controller.apply(Command::ToggleCut);
            controller.apply(Command::TogglePlay);
        });

        let written = sink.written.lock().clone();
        assert_eq!(written, (30..90).collect::<Vec<u64>>());
        assert_eq!(controller.finish().unwrap(), 60);

        let toggles: Vec<String> = capture
            .lines()
            .into_iter()
            .filter(|line| line.contains("[VIDEO] Start play") || line.contains("[CUT]") || line.contains("Pause requested"))
            .collect();
        assert_eq!(toggles.len(), 4, "{:?}", toggles);
        assert!(toggles[0].ends_with("[VIDEO] Start play at 0(0.000)"));
        assert!(toggles[1].ends_with("[CUT] Start at 30(0.100)"));
        assert!(toggles[2].ends_with("[CUT] Stop at 90(0.300)"));
        assert!(toggles[3].ends_with("[VIDEO] Pause requested at 90(0.300)"));
    }

    #[test]
    fn test_unrecoverable_write_error_ends_cut() {
        let (_tx, rx) = command_channel();
        let handles = PipelineHandles::new(1);
        let mut controller = PlaybackController::new(
            Box::new(ScriptedSource::new(10)),
            Box::new(RejectingSink),
            OverlayRenderer::new(Arc::new(BlockFace)),
            rx,
            handles.clone(),
            fast(),
        )
        .unwrap();

        controller.apply(Command::TogglePlay);
        controller.apply(Command::ToggleCut);
        assert_eq!(controller.step().unwrap(), Step::Continue);

        assert!(!controller.state().cutting);
        assert!(controller.state().playing);
        assert_eq!(controller.step().unwrap(), Step::Continue);
        assert!(!handles.status.is_finished());
    }

    #[test]
    fn test_end_to_end_session() {
        let (controller, tx, handles, sink) = controller(300, fast());
        let worker = thread::spawn(move || controller.run());

        let wait_for = |wanted: u64| {
            let deadline = Instant::now() + Duration::from_secs(10);
            loop {
                if let Some(display) = handles.queue.get() {
                    if display.position == wanted {
                        return;
                    }
                }
                assert!(Instant::now() < deadline, "frame {} never shown", wanted);
                thread::sleep(Duration::from_millis(1));
            }
        };

        // Paused on the first frame; seek to the middle while paused.
        wait_for(0);
        tx.send(Command::SeekToPercent(50));
        wait_for(150);
        assert!(!handles.status.is_playing());
        assert_eq!(handles.status.progress(), 50);

        tx.send(Command::Shutdown);
        assert_eq!(worker.join().unwrap().unwrap(), 0);
        assert!(sink.written.lock().is_empty());
        assert!(handles.status.is_finished());
    }

    #[test]
    fn test_paused_controller_stops_when_channel_closes() {
        let (controller, tx, handles, _sink) = controller(300, fast());
        let worker = thread::spawn(move || controller.run());

        drop(tx);
        assert_eq!(worker.join().unwrap().unwrap(), 0);
        assert!(handles.status.is_finished());
    }
}
