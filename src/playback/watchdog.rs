use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::error::Result;
use crate::playback::command::{Command, CommandSender};
use crate::playback::state::{SaveSlot, SharedStatus};
use crate::video::still;

pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Exit,
}

/// Low-frequency supervisor: writes requested stills and turns a closed
/// window into a shutdown command.
pub struct Watchdog {
    status: Arc<SharedStatus>,
    save_slot: Arc<SaveSlot>,
    commands: CommandSender,
    save_dir: PathBuf,
    save_pattern: String,
    tick: Duration,
}

impl Watchdog {
    pub fn new(
        status: Arc<SharedStatus>,
        save_slot: Arc<SaveSlot>,
        commands: CommandSender,
        save_dir: PathBuf,
        save_pattern: String,
        tick: Duration,
    ) -> Self {
        Self {
            status,
            save_slot,
            commands,
            save_dir,
            save_pattern,
            tick,
        }
    }

    pub fn spawn(self) -> Result<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("watchdog".to_string())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    pub fn run(self) {
        debug!("Watchdog started ({:?} tick)", self.tick);
        while self.tick() == Tick::Continue {
            thread::sleep(self.tick);
        }
        debug!("Watchdog stopped");
    }

    pub fn tick(&self) -> Tick {
        if let Some(frame) = self.save_slot.take() {
            // A failed save is logged; playback carries on.
            if let Err(e) = still::save_next(&frame, &self.save_dir, &self.save_pattern) {
                error!("[IMAGE] {}", e);
            }
        }

        if self.status.is_finished() {
            return Tick::Exit;
        }

        if !self.status.is_window_open() {
            info!("[CLOSE] VideoCut close ...");
            self.commands.send(Command::Shutdown);
            return Tick::Exit;
        }

        Tick::Continue
    }
}
