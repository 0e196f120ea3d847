use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::video::{Frame, VideoInfo};

/// Highest speed slider level; plays without any per-frame delay.
pub const MAX_SPEED_LEVEL: u8 = 10;

/// Per-frame delay for a speed slider level.
///
/// `delay = (1/fps)/10 * (10 - level)`: level 0 waits a full frame period,
/// level 10 does not wait at all.
pub fn speed_delay(fps: u32, level: u8) -> Duration {
    let level = level.min(MAX_SPEED_LEVEL);
    let period = 1.0 / fps.max(1) as f64;
    Duration::from_secs_f64(period / 10.0 * (MAX_SPEED_LEVEL - level) as f64)
}

/// Playback state machine. Owned and mutated only by the controller thread.
#[derive(Debug, Clone)]
pub struct PlaybackState {
    pub playing: bool,
    /// Only ever true while `playing` is true.
    pub cutting: bool,
    /// A user seek is waiting for its frame to be fetched.
    pub seeking: bool,
    pub running: bool,
    /// Index of the next frame to read, in `0..=total_frames`.
    pub position: u64,
    pub speed_level: u8,
    pub frame_delay: Duration,
    pub info: VideoInfo,
}

impl PlaybackState {
    /// Paused at `position` with the given speed level.
    pub fn new(info: VideoInfo, position: u64, speed_level: u8) -> Self {
        let speed_level = speed_level.min(MAX_SPEED_LEVEL);
        Self {
            playing: false,
            cutting: false,
            seeking: false,
            running: true,
            position: position.min(info.total_frames),
            speed_level,
            frame_delay: speed_delay(info.fps, speed_level),
            info,
        }
    }

    pub fn progress_percent(&self) -> u8 {
        self.info.percent_at(self.position)
    }

    pub fn ratio(&self) -> f64 {
        self.info.ratio_at(self.position)
    }

    pub fn set_speed_level(&mut self, level: u8) {
        self.speed_level = level.min(MAX_SPEED_LEVEL);
        self.frame_delay = speed_delay(self.info.fps, self.speed_level);
    }
}

/// Read-only view of the controller's state for the viewer and watchdog.
///
/// Written by the controller after each applied command and each frame;
/// other threads only read it, except for `window_open` which belongs to
/// the viewer.
pub struct SharedStatus {
    playing: AtomicBool,
    progress: AtomicU8,
    finished: AtomicBool,
    window_open: AtomicBool,
    frame_waker: Mutex<Option<FrameWaker>>,
}

/// Called by the controller each time a frame is queued for display.
pub type FrameWaker = Box<dyn Fn() + Send + Sync>;

impl SharedStatus {
    pub fn new() -> Self {
        Self {
            playing: AtomicBool::new(false),
            progress: AtomicU8::new(0),
            finished: AtomicBool::new(false),
            window_open: AtomicBool::new(true),
            frame_waker: Mutex::new(None),
        }
    }

    pub(crate) fn publish(&self, state: &PlaybackState) {
        self.playing.store(state.playing, Ordering::Release);
        self.progress.store(state.progress_percent(), Ordering::Release);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Last published progress, 0-100.
    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Acquire)
    }

    /// The controller loop has exited and released its handles.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub(crate) fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }

    pub fn is_window_open(&self) -> bool {
        self.window_open.load(Ordering::Acquire)
    }

    pub fn mark_window_closed(&self) {
        self.window_open.store(false, Ordering::Release);
    }

    /// Install the viewer's wake-up hook, replacing any previous one.
    pub fn set_frame_waker(&self, waker: FrameWaker) {
        *self.frame_waker.lock() = Some(waker);
    }

    pub(crate) fn frame_queued(&self) {
        if let Some(wake) = self.frame_waker.lock().as_ref() {
            wake();
        }
    }
}

impl Default for SharedStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot hand-off of a frame to be written to disk by the watchdog.
///
/// The controller fills the slot; the watchdog takes it and performs the
/// I/O, so the playback loop never waits on the filesystem. The pending
/// flag is cleared by the same take that starts the save.
#[derive(Debug, Default)]
pub struct SaveSlot {
    frame: Mutex<Option<Frame>>,
}

impl SaveSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a save of `frame`. A request that has not been serviced yet
    /// is replaced by the newer frame.
    pub fn request(&self, frame: Frame) {
        *self.frame.lock() = Some(frame);
    }

    pub fn is_pending(&self) -> bool {
        self.frame.lock().is_some()
    }

    pub fn take(&self) -> Option<Frame> {
        self.frame.lock().take()
    }
}
