// Print the stream parameters videocut would use for a file

use std::path::PathBuf;

use videocut::{
    overlay::PanelLayout,
    playback::speed_delay,
    video::probe,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("usage: probe <video>");
        std::process::exit(2);
    };

    let info = match probe(&path) {
        Ok(info) => info,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };

    let layout = PanelLayout::new(info.width, info.height);
    println!("{}", path.display());
    println!("  fps:          {} ({:.3})", info.fps, info.frame_rate);
    println!("  size:         {}x{}", info.width, info.height);
    println!("  frames:       {} ({:.2}s)", info.total_frames, info.total_frames as f64 / info.frame_rate);
    println!("  display:      {}x{} (panel {}px, band {}px)", layout.display_width(), layout.frame_height, layout.panel_width, layout.band_height);
    println!("  frame delay:  {:?} at level 0, {:?} at level 8", speed_delay(info.fps, 0), speed_delay(info.fps, 8));

    Ok(())
}
