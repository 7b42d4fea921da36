use anyhow::Result;
use tracing::{debug, error};
use x11rb::protocol::Event;
use x11rb::protocol::xproto::*;

use crate::config::SettingsStore;
use crate::drag::PointerEvent;
use crate::orchestrator::Overlay;

use super::window::OverlayWindow;

/// Pointer input on the overlay window, in root coordinates
fn pointer_event(event: &Event, window: Window) -> Option<PointerEvent> {
    match event {
        Event::ButtonPress(e) if e.event == window => Some(PointerEvent::ButtonPress {
            button: e.detail,
            x: e.root_x as f64,
            y: e.root_y as f64,
        }),
        Event::MotionNotify(e) if e.event == window => Some(PointerEvent::Motion {
            x: e.root_x as f64,
            y: e.root_y as f64,
        }),
        Event::ButtonRelease(e) if e.event == window => Some(PointerEvent::ButtonRelease {
            button: e.detail,
            x: e.root_x as f64,
            y: e.root_y as f64,
        }),
        // Another client grabbed the pointer, or our implicit grab ended
        Event::LeaveNotify(e)
            if e.event == window && (e.mode == NotifyMode::GRAB || e.mode == NotifyMode::UNGRAB) =>
        {
            Some(PointerEvent::CaptureLost)
        }
        Event::UnmapNotify(e) if e.window == window => Some(PointerEvent::CaptureLost),
        _ => None,
    }
}

pub fn handle_event<C: SettingsStore>(overlay: &mut Overlay<OverlayWindow, C>, event: Event) -> Result<()> {
    let Some(window) = overlay.surface().map(|surface| surface.window) else {
        return Ok(());
    };

    if let Some(pointer) = pointer_event(&event, window) {
        let propagation = overlay.handle_pointer(pointer)?;
        debug!(event = ?pointer, propagation = ?propagation, "Pointer event");
        return Ok(());
    }

    match event {
        Event::Expose(e) if e.window == window && e.count == 0 => {
            if let Some(surface) = overlay.surface() {
                surface.redraw()?;
            }
        }
        // Some other top-level window was mapped or restacked above us
        Event::MapNotify(e) if e.window != window => restack(overlay)?,
        Event::ConfigureNotify(e) if e.window != window && e.event != window => restack(overlay)?,
        Event::Error(e) => {
            error!(error = ?e, "X11 protocol error");
        }
        _ => (),
    }
    Ok(())
}

fn restack<C: SettingsStore>(overlay: &Overlay<OverlayWindow, C>) -> Result<()> {
    if let Some(surface) = overlay.surface()
        && surface.is_tracked()
    {
        surface.restack()?;
    }
    Ok(())
}
