//! # Overlay Module
//!
//! Composes each decoded frame with the control panel: three toggle
//! buttons, a caption and size-fitted labels.

pub mod layout;
pub mod renderer;
pub mod text;

pub use layout::{Button, CellRect, PanelLayout};
pub use renderer::{DisplayFrame, OverlayRenderer, PanelState};
pub use text::{fit_label, FontFace, PlacedWord, Typeface};
