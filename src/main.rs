use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use videocut::{config::Config, logging, session::Session};

#[derive(Parser)]
#[command(
    name = "videocut",
    version,
    about = "Scrub through a video and cut a region out of it",
    long_about = "Opens the configured video paused on its start frame. Use the panel buttons to play/pause, \
                  start/stop cutting and save snapshots; drag the progress slider while paused to seek. \
                  Frames played while cutting are encoded to the output file."
)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Input video, overrides [video] in
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output video, overrides [video] out
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Start position in seconds, overrides [video] start
    #[arg(short, long)]
    start: Option<f64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging needs the [log] section, so a broken config is reported
    // through a default logger.
    let loaded = Config::from_file(&cli.config);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => Config::default(),
    };
    let log_path = logging::init(&config.log, cli.verbose)?;

    if let Err(e) = loaded {
        if cli.input.is_none() || cli.output.is_none() {
            error!("{}", e.user_message());
            return Err(e.into());
        }
        info!("No usable config ({}), using command line only", e);
    }

    if let Some(input) = cli.input {
        config.video.input = Some(input);
    }
    if let Some(output) = cli.output {
        config.video.output = Some(output);
    }
    if let Some(start) = cli.start {
        config.video.start = start;
    }

    info!("Starting videocut v{}", env!("CARGO_PKG_VERSION"));
    info!("Log file: {:?}", log_path);

    config.report_missing();
    if let Err(e) = config.validate() {
        error!("{}", e.user_message());
        return Err(e.into());
    }

    match Session::new(config).run() {
        Ok(report) => {
            info!(
                "Done: {} frames ({:.2}s) in {:?}",
                report.frames_cut,
                report.duration_seconds(),
                report.output
            );
            Ok(())
        }
        Err(e) => {
            error!("{}", e.user_message());
            Err(e.into())
        }
    }
}
