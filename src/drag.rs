//! Click-and-drag repositioning of the widget
//!
//! Positions are persisted only when a drag ends, never on every motion event.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::{SettingsKey, SettingsStore};
use crate::constants::mouse;
use crate::surface::{CursorGlyph, Surface};
use crate::types::{PointerCoords, Position};

/// Pointer input delivered to the widget, in root (screen) coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    ButtonPress { button: u8, x: f64, y: f64 },
    Motion { x: f64, y: f64 },
    ButtonRelease { button: u8, x: f64, y: f64 },
    /// Pointer grab was taken away (another client grabbed, window unmapped)
    CaptureLost,
}

/// Whether the host should keep dispatching the event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Stop,
    Propagate,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        origin_pointer: PointerCoords,
        origin_position: Position,
    },
}

#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn handle<S: Surface, C: SettingsStore>(
        &mut self,
        event: PointerEvent,
        surface: &mut S,
        store: &mut C,
    ) -> Result<Propagation> {
        match (self.state, event) {
            (DragState::Idle, PointerEvent::ButtonPress { button, x, y })
                if button == mouse::BUTTON_PRIMARY =>
            {
                let origin_position = surface.position();
                self.state = DragState::Dragging {
                    origin_pointer: PointerCoords { x, y },
                    origin_position,
                };
                surface
                    .set_cursor(CursorGlyph::Move)
                    .context("Failed to set move cursor")?;
                debug!(x = x, y = y, origin = ?origin_position, "Drag started");
                Ok(Propagation::Stop)
            }
            (
                DragState::Dragging {
                    origin_pointer,
                    origin_position,
                },
                PointerEvent::Motion { x, y },
            ) => {
                let position = Position::new(
                    (origin_position.x as f64 + (x - origin_pointer.x)).round() as i32,
                    (origin_position.y as f64 + (y - origin_pointer.y)).round() as i32,
                );
                surface
                    .set_position(position)
                    .context(format!("Failed to move widget to {:?}", position))?;
                Ok(Propagation::Stop)
            }
            (DragState::Dragging { .. }, PointerEvent::ButtonRelease { button, .. })
                if button == mouse::BUTTON_PRIMARY =>
            {
                self.finish(surface, store)?;
                Ok(Propagation::Stop)
            }
            (DragState::Dragging { .. }, PointerEvent::CaptureLost) => {
                warn!("Pointer capture lost mid-drag, keeping current position");
                self.finish(surface, store)?;
                Ok(Propagation::Stop)
            }
            _ => Ok(Propagation::Propagate),
        }
    }

    /// Return to idle, restore the cursor and persist where the widget ended up
    fn finish<S: Surface, C: SettingsStore>(&mut self, surface: &mut S, store: &mut C) -> Result<()> {
        self.state = DragState::Idle;

        if let Err(e) = surface.set_cursor(CursorGlyph::Default) {
            warn!(error = %e, "Failed to restore default cursor");
        }

        let position = surface.position();
        store
            .set_int(SettingsKey::PositionX, position.x)
            .context("Failed to save position-x")?;
        store
            .set_int(SettingsKey::PositionY, position.y)
            .context("Failed to save position-y")?;

        info!(x = position.x, y = position.y, "Saved widget position");
        Ok(())
    }
}
