use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    error::{ConfigError, Result},
    playback::MAX_SPEED_LEVEL,
    video::{still::INDEX_PLACEHOLDER, EncoderParams},
};

/// Main configuration for videocut
///
/// Every section and key may be omitted; missing input/output paths are only
/// reported, and become an error when a cut is started.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input/output files and start position
    pub video: VideoConfig,

    /// Log file settings
    pub log: LogConfig,

    /// Playback, polling and snapshot settings
    pub player: PlayerConfig,

    /// Output encoding settings
    pub encoder: EncoderParams,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.display().to_string(),
            reason: e.message().to_string(),
        })?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.video.validate()?;
        self.player.validate()?;
        if self.encoder.quality > 100 {
            return Err(ConfigError::InvalidValue {
                key: "encoder.quality".to_string(),
                value: self.encoder.quality.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Log every missing required key. Returns how many were missing.
    pub fn report_missing(&self) -> usize {
        let missing = self.video.missing_keys();
        for key in &missing {
            error!("no config about {}", key);
        }
        missing.len()
    }

    /// The cut to perform, or the first missing required key.
    pub fn video_job(&self) -> Result<VideoJob> {
        if let Some(key) = self.video.missing_keys().into_iter().next() {
            return Err(ConfigError::MissingKey { key: key.to_string() }.into());
        }
        Ok(VideoJob {
            input: self.video.input.clone().unwrap_or_default(),
            output: self.video.output.clone().unwrap_or_default(),
            start_seconds: self.video.start,
        })
    }
}

/// `[video]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Source video
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,

    /// Destination of the cut region
    #[serde(rename = "out", skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Initial position in seconds
    pub start: f64,
}

impl VideoConfig {
    fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.input.as_ref().map_or(true, |p| p.as_os_str().is_empty()) {
            missing.push("video.in");
        }
        if self.output.as_ref().map_or(true, |p| p.as_os_str().is_empty()) {
            missing.push("video.out");
        }
        missing
    }

    fn validate(&self) -> Result<()> {
        if !self.start.is_finite() || self.start < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "video.start".to_string(),
                value: self.start.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// A fully specified cut
#[derive(Debug, Clone, PartialEq)]
pub struct VideoJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub start_seconds: f64,
}

/// `[log]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// File name; `{date}` or `{time}` are replaced with the current local time
    pub name: String,

    /// Truncate an existing log file at startup
    pub clear: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            name: "logcat.txt".to_string(),
            clear: false,
        }
    }
}

/// `[player]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Initial speed slider level (0-10)
    pub speed_level: u8,

    /// Frames buffered between the controller and the window
    pub queue_capacity: usize,

    pub pause_poll_ms: u64,
    pub display_poll_ms: u64,
    pub watchdog_tick_ms: u64,

    /// Snapshot file name, `{}` is replaced with the first unused index
    pub save_pattern: String,

    /// Directory snapshots are written to
    pub save_dir: PathBuf,

    /// TrueType font for the panel; the bundled font is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<PathBuf>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed_level: 8,
            queue_capacity: 1,
            pause_poll_ms: 100,
            display_poll_ms: 50,
            watchdog_tick_ms: 10,
            save_pattern: "image-{}.png".to_string(),
            save_dir: PathBuf::from("."),
            font: None,
        }
    }
}

impl PlayerConfig {
    pub fn pause_poll(&self) -> Duration {
        Duration::from_millis(self.pause_poll_ms)
    }

    pub fn display_poll(&self) -> Duration {
        Duration::from_millis(self.display_poll_ms)
    }

    pub fn watchdog_tick(&self) -> Duration {
        Duration::from_millis(self.watchdog_tick_ms)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |key: &str, value: String| ConfigError::InvalidValue {
            key: format!("player.{}", key),
            value,
        };

        if self.speed_level > MAX_SPEED_LEVEL {
            return Err(invalid("speed_level", self.speed_level.to_string()).into());
        }
        if self.queue_capacity == 0 {
            return Err(invalid("queue_capacity", self.queue_capacity.to_string()).into());
        }
        if self.pause_poll_ms == 0 || self.display_poll_ms == 0 || self.watchdog_tick_ms == 0 {
            return Err(invalid(
                "poll intervals",
                format!("{}/{}/{}", self.pause_poll_ms, self.display_poll_ms, self.watchdog_tick_ms),
            )
            .into());
        }
        if !self.save_pattern.contains(INDEX_PLACEHOLDER) {
            return Err(invalid("save_pattern", self.save_pattern.clone()).into());
        }
        Ok(())
    }
}
