use crossbeam::channel::{self, Receiver, Sender};
use tracing::debug;

/// Requests produced by pointer/slider input and the watchdog.
///
/// Producers only ever send these; the playback controller is the single
/// thread that applies them to [`PlaybackState`](super::PlaybackState).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePlay,
    /// Ignored unless playing.
    ToggleCut,
    RequestSave,
    /// Ignored unless paused and no seek is pending. Percent in `0..=100`.
    SeekToPercent(u8),
    /// Speed slider level in `0..=10`; 10 plays with no delay.
    SetSpeedLevel(u8),
    Shutdown,
}

/// Cloneable sending half handed to the viewer and the watchdog.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<Command>,
}

impl CommandSender {
    /// Send a command. A closed channel means the controller has already
    /// stopped, which callers do not need to handle.
    pub fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            debug!("Controller gone, dropped {:?}", command);
        }
    }
}

/// Create the command channel shared by the UI, watchdog and controller.
pub fn command_channel() -> (CommandSender, Receiver<Command>) {
    let (tx, rx) = channel::unbounded();
    (CommandSender { tx }, rx)
}
