/// Number of horizontal bands the side panel is divided into.
pub const PANEL_BANDS: u32 = 7;

/// Clickable cells in the side panel, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Play,
    Cut,
    Save,
}

impl Button {
    pub const ALL: [Button; 3] = [Button::Play, Button::Cut, Button::Save];

    /// Zero-based band index holding this button (bands 1, 3, 5 of 0..7).
    fn band_index(self) -> u32 {
        match self {
            Button::Play => 1,
            Button::Cut => 3,
            Button::Save => 5,
        }
    }
}

/// Pixel rectangle, half-open on the right and bottom edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CellRect {
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Geometry of a display frame: the source image on the left and a
/// `min(height, width)/7` wide panel on the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelLayout {
    pub frame_width: u32,
    pub frame_height: u32,
    pub panel_width: u32,
    /// Height of one of the seven panel bands.
    pub band_height: u32,
}

impl PanelLayout {
    pub fn new(frame_width: u32, frame_height: u32) -> Self {
        let panel_width = (frame_width.min(frame_height) as f64 / PANEL_BANDS as f64).round() as u32;
        let band_height = (frame_height as f64 / PANEL_BANDS as f64).round() as u32;
        Self {
            frame_width,
            frame_height,
            panel_width: panel_width.max(1),
            band_height,
        }
    }

    /// Width of the composited display frame
    pub fn display_width(&self) -> u32 {
        self.frame_width + self.panel_width
    }

    /// Cell occupied by `button`, clipped to the panel.
    pub fn cell(&self, button: Button) -> CellRect {
        let y = button.band_index() * self.band_height;
        CellRect {
            x: self.frame_width,
            y,
            width: self.band_height.min(self.panel_width),
            height: self.band_height.min(self.frame_height.saturating_sub(y)),
        }
    }

    /// Map a click in display-frame coordinates to a panel button.
    ///
    /// Only clicks inside the panel count; the full panel width is
    /// clickable within a button's band.
    pub fn hit_test(&self, x: u32, y: u32) -> Option<Button> {
        if x < self.frame_width || x >= self.display_width() {
            return None;
        }
        Button::ALL.into_iter().find(|button| {
            let cell = self.cell(*button);
            y >= cell.y && y < cell.y + cell.height
        })
    }
}
