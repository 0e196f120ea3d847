//! # Playback Module
//!
//! The concurrent frame pipeline: a controller thread that decodes, renders
//! and encodes; a drop-oldest queue feeding the viewer; and a watchdog that
//! services saves and window closure.
//!
//! ```text
//! viewer ──Command──▶ controller ──DisplayFrame──▶ FrameQueue ──▶ viewer
//!    ▲                    │  ▲                                      │
//!    │               SaveSlot │ Command::Shutdown                    │
//!    │                    ▼  │                                      │
//!    └── SharedStatus ◀─ watchdog ◀──── window closed ──────────────┘
//! ```

pub mod command;
pub mod controller;
pub mod queue;
pub mod state;
pub mod watchdog;

pub use command::{command_channel, Command, CommandSender};
pub use controller::{ControllerOptions, PipelineHandles, PlaybackController, Step};
pub use queue::FrameQueue;
pub use state::{speed_delay, PlaybackState, SaveSlot, SharedStatus, MAX_SPEED_LEVEL};
pub use watchdog::Watchdog;
