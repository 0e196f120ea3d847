//! Console and file logging.
//!
//! Every `tracing` event goes to the console and is appended to the log file
//! as one `[YYYY-MM-DD_HH-MM-SS] [LEVEL] message` line.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, NaiveDateTime};
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::config::LogConfig;
use crate::error::{CutterError, Result};

const LINE_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Formats events as `[timestamp] [LEVEL] message`.
pub struct LogLineFormat;

impl<S, N> FormatEvent<S, N> for LogLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> fmt::Result {
        write!(
            writer,
            "[{}] [{}] ",
            Local::now().format(LINE_TIME_FORMAT),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Expand `{date}` / `{time}` in a log name and default the extension to `.log`.
pub fn resolve_log_name(pattern: &str, now: NaiveDateTime) -> PathBuf {
    let name = if pattern.contains("{date}") {
        pattern.replace("{date}", &now.format(DATE_FORMAT).to_string())
    } else if pattern.contains("{time}") {
        pattern.replace("{time}", &now.format(LINE_TIME_FORMAT).to_string())
    } else {
        pattern.to_string()
    };

    let mut path = PathBuf::from(name.trim());
    if path.extension().is_none() {
        path.set_extension("log");
    }
    path
}

/// Truncate the log file, leaving a single marker line.
pub fn clear_log<P: AsRef<Path>>(path: P, now: NaiveDateTime) -> Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "Clear at {}", now.format("%Y-%m-%d %H:%M:%S"))?;
    Ok(())
}

/// Install the global subscriber. Returns the resolved log file path.
pub fn init(config: &LogConfig, verbose: bool) -> Result<PathBuf> {
    let now = Local::now().naive_local();
    let path = resolve_log_name(&config.name, now);
    if config.clear && path.exists() {
        clear_log(&path, now)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let console_level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let ours = |level| Targets::new().with_target(env!("CARGO_CRATE_NAME"), level).with_default(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_filter(ours(console_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(LogLineFormat)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(ours(LevelFilter::DEBUG)),
        )
        .try_init()
        .map_err(|e| CutterError::generic(format!("logging already initialised: {}", e)))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn moment() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 12, 14).unwrap().and_hms_opt(16, 52, 7).unwrap()
    }

    #[test]
    fn test_resolve_log_name_placeholders() {
        assert_eq!(resolve_log_name("logcat.txt", moment()), PathBuf::from("logcat.txt"));
        assert_eq!(resolve_log_name("run-{date}.txt", moment()), PathBuf::from("run-2020-12-14.txt"));
        assert_eq!(resolve_log_name("run-{time}", moment()), PathBuf::from("run-2020-12-14_16-52-07.log"));
        assert_eq!(resolve_log_name("  cut ", moment()), PathBuf::from("cut.log"));
    }

    #[test]
    fn test_clear_log_leaves_marker() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logcat.txt");
        std::fs::write(&path, "old line\nanother\n").unwrap();

        clear_log(&path, moment()).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Clear at 2020-12-14 16:52:07\n");
    }
}
