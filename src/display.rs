//! The viewer window: the consumer end of the frame queue.
//!
//! Runs on the main thread (windowing systems require it). The controller
//! wakes it for every queued frame; while the queue is empty it polls on a
//! short interval. Clicks and slider moves become [`Command`]s. It never
//! touches playback state directly.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{CutterError, Result};
use crate::overlay::{Button, DisplayFrame, PanelLayout};
use crate::playback::{Command, CommandSender, FrameQueue, SharedStatus, MAX_SPEED_LEVEL};

pub const DEFAULT_POLL: Duration = Duration::from_millis(50);
pub const WINDOW_TITLE: &str = "display";

/// Command sent for a click on a panel button.
pub fn command_for(button: Button) -> Command {
    match button {
        Button::Play => Command::TogglePlay,
        Button::Cut => Command::ToggleCut,
        Button::Save => Command::RequestSave,
    }
}

pub struct Viewer {
    queue: Arc<FrameQueue<DisplayFrame>>,
    status: Arc<SharedStatus>,
    commands: CommandSender,
    texture: Option<egui::TextureHandle>,
    layout: Option<PanelLayout>,
    progress: u8,
    progress_dragging: bool,
    speed_level: u8,
    poll: Duration,
    close_sent: bool,
}

impl Viewer {
    pub fn new(
        queue: Arc<FrameQueue<DisplayFrame>>,
        status: Arc<SharedStatus>,
        commands: CommandSender,
        speed_level: u8,
        poll: Duration,
    ) -> Self {
        Self {
            queue,
            status,
            commands,
            texture: None,
            layout: None,
            progress: 0,
            progress_dragging: false,
            speed_level: speed_level.min(MAX_SPEED_LEVEL),
            poll,
            close_sent: false,
        }
    }

    fn upload(&mut self, ctx: &egui::Context, frame: DisplayFrame) {
        let size = [frame.image.width() as usize, frame.image.height() as usize];
        let image = egui::ColorImage::from_rgb(size, frame.image.as_raw());
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.texture = Some(ctx.load_texture("video-frame", image, egui::TextureOptions::LINEAR));
            }
        }
        self.layout = Some(frame.layout);
    }

    fn sliders(&mut self, ui: &mut egui::Ui) {
        if !self.progress_dragging {
            self.progress = self.status.progress();
        }
        let progress = ui.add(egui::Slider::new(&mut self.progress, 0..=100).text("Progress"));
        if progress.changed() {
            self.commands.send(Command::SeekToPercent(self.progress));
        }
        self.progress_dragging = progress.dragged();

        let speed = ui.add(egui::Slider::new(&mut self.speed_level, 0..=MAX_SPEED_LEVEL).text("Play fast"));
        if speed.changed() {
            self.commands.send(Command::SetSpeedLevel(self.speed_level));
        }
    }

    fn picture(&mut self, ui: &mut egui::Ui) {
        let (Some(texture), Some(layout)) = (&self.texture, self.layout) else {
            ui.centered_and_justified(|ui| ui.label("Loading..."));
            return;
        };

        let native = texture.size_vec2();
        let available = ui.available_size();
        let scale = (available.x / native.x).min(available.y / native.y).max(0.01);
        let response = ui.add(egui::Image::new((texture.id(), native * scale)).sense(egui::Sense::click()));

        if response.clicked() {
            if let Some(pointer) = response.interact_pointer_pos() {
                let local = (pointer - response.rect.min) / scale;
                if local.x >= 0.0 && local.y >= 0.0 {
                    if let Some(button) = layout.hit_test(local.x as u32, local.y as u32) {
                        debug!("Clicked {:?} at ({:.0}, {:.0})", button, local.x, local.y);
                        self.commands.send(command_for(button));
                    }
                }
            }
        }
    }
}

impl eframe::App for Viewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.status.is_finished() && !self.close_sent {
            info!("Playback finished, closing window");
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            self.close_sent = true;
        }

        let fresh = self.queue.get();
        let shown = fresh.is_some();
        if let Some(frame) = fresh {
            self.upload(ctx, frame);
        }

        egui::TopBottomPanel::bottom("sliders").show(ctx, |ui| self.sliders(ui));
        egui::CentralPanel::default().show(ctx, |ui| self.picture(ui));

        ctx.request_repaint_after(repaint_delay(shown, self.poll));
    }
}

/// Delay before the next queue check: none right after a frame was shown,
/// one poll interval while the queue is empty.
fn repaint_delay(shown: bool, poll: Duration) -> Duration {
    if shown {
        Duration::ZERO
    } else {
        poll
    }
}

/// Open the window and run the viewer until it is closed.
///
/// The window is marked closed on return however it ended, which is what
/// the watchdog watches for.
pub fn run_viewer(viewer: Viewer, initial_size: [f32; 2]) -> Result<()> {
    let status = Arc::clone(&viewer.status);
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(initial_size),
        ..Default::default()
    };

    let result = eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |cc| {
            let ctx = cc.egui_ctx.clone();
            viewer.status.set_frame_waker(Box::new(move || ctx.request_repaint()));
            Ok(Box::new(viewer))
        }),
    );
    status.mark_window_closed();
    result.map_err(|e| CutterError::generic(format!("display window failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buttons_map_to_commands() {
        assert_eq!(command_for(Button::Play), Command::TogglePlay);
        assert_eq!(command_for(Button::Cut), Command::ToggleCut);
        assert_eq!(command_for(Button::Save), Command::RequestSave);
    }

    #[test]
    fn test_repaints_immediately_while_frames_arrive() {
        assert_eq!(repaint_delay(true, DEFAULT_POLL), Duration::ZERO);
        assert_eq!(repaint_delay(false, DEFAULT_POLL), DEFAULT_POLL);

        // Frames every 1/60 s are never throttled to the poll interval.
        let frame_interval = Duration::from_secs_f64(1.0 / 60.0);
        assert!(repaint_delay(true, DEFAULT_POLL) < frame_interval);
    }

    #[test]
    fn test_panel_clicks_produce_commands() {
        let layout = PanelLayout::new(700, 700);
        let clicks: Vec<Command> = [(750, 150), (20, 150), (750, 350), (750, 450), (750, 550)]
            .into_iter()
            .filter_map(|(x, y)| layout.hit_test(x, y))
            .map(command_for)
            .collect();

        assert_eq!(clicks, vec![Command::TogglePlay, Command::ToggleCut, Command::RequestSave]);
    }
}
