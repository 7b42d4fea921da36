//! Capability surface of the display host
//!
//! The core (layer placement, drag handling, orchestration) only talks to the
//! widget through [`Surface`]. The X11 backend in `overlay::window` implements
//! it for real; tests use a recording implementation.

use anyhow::Result;

use crate::style::WidgetStyle;
use crate::types::Position;

/// Compositing tier the widget can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Above every window
    Topmost,
    /// Below every window but above the wallpaper
    Background,
}

/// Attachment options for the topmost layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChromeOptions {
    /// Whether the widget reserves input routing away from other windows
    pub affects_input_region: bool,
    /// Whether the widget hides when a fullscreen window is active
    pub track_fullscreen: bool,
}

/// System pointer glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorGlyph {
    Default,
    Move,
}

pub trait Surface {
    /// Current absolute position
    fn position(&self) -> Position;

    fn set_position(&mut self, position: Position) -> Result<()>;

    fn apply_style(&mut self, style: &WidgetStyle) -> Result<()>;

    /// Replace the displayed document
    fn set_markup(&mut self, markup: &str) -> Result<()>;

    fn set_cursor(&mut self, cursor: CursorGlyph) -> Result<()>;

    /// Layer the widget is attached to, if any
    fn parent(&self) -> Option<Layer>;

    /// Remove from the current layer; no-op when not attached
    fn detach(&mut self) -> Result<()>;

    /// Stop always-on-top tracking; no-op when not tracked
    fn untrack(&mut self) -> Result<()>;

    fn attach(&mut self, layer: Layer, options: ChromeOptions) -> Result<()>;
}

/// Status area indicator (tray menu) owned by the orchestrator
pub trait Indicator {
    /// Tear the indicator down; called exactly once at shutdown
    fn release(&mut self);
}
