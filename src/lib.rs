//! # videocut
//!
//! Open a video, scrub or play it, mark a start/stop region and re-encode
//! the marked frames to a new file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use videocut::{config::Config, session::Session};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::from_file("config.toml")?;
//! let report = Session::new(config).run()?;
//! println!("{} frames written to {:?}", report.frames_cut, report.output);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`playback`] - Controller state machine, frame queue, watchdog
//! - [`overlay`] - Side panel composition and label fitting
//! - [`display`] - The window, its sliders and click handling
//! - [`video`] - ffmpeg-backed decoding, encoding and snapshots
//! - [`config`] / [`logging`] - TOML configuration and the log file
//!
//! Three threads share the work: the playback controller (decode, render,
//! encode), the viewer on the main thread, and a low-frequency watchdog.
//! Only the controller mutates playback state; the others send
//! [`Command`](playback::Command)s.

pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod overlay;
pub mod playback;
pub mod session;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    error::{CutterError, Result},
    playback::{Command, PlaybackController},
    session::{Session, SessionReport},
};
