use anyhow::{Context, Result};
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use crate::constants::x11;

/// Pre-cached X11 atoms to avoid repeated roundtrips
#[derive(Debug, Clone, Copy)]
pub struct CachedAtoms {
    pub net_wm_state: Atom,
    pub net_wm_state_above: Atom,
    pub net_wm_state_below: Atom,
    pub net_wm_state_skip_taskbar: Atom,
    pub net_wm_state_skip_pager: Atom,
}

fn intern(conn: &RustConnection, name: &str) -> Result<Atom> {
    Ok(conn
        .intern_atom(false, name.as_bytes())
        .context(format!("Failed to intern {} atom", name))?
        .reply()
        .context(format!("Failed to get reply for {} atom", name))?
        .atom)
}

impl CachedAtoms {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        Ok(Self {
            net_wm_state: intern(conn, "_NET_WM_STATE")?,
            net_wm_state_above: intern(conn, "_NET_WM_STATE_ABOVE")?,
            net_wm_state_below: intern(conn, "_NET_WM_STATE_BELOW")?,
            net_wm_state_skip_taskbar: intern(conn, "_NET_WM_STATE_SKIP_TASKBAR")?,
            net_wm_state_skip_pager: intern(conn, "_NET_WM_STATE_SKIP_PAGER")?,
        })
    }
}

/// 32-bit TrueColor visual for a translucent window, if the server has one
pub fn find_argb_visual(screen: &Screen) -> Option<Visualid> {
    screen
        .allowed_depths
        .iter()
        .filter(|depth| depth.depth == x11::ARGB_DEPTH)
        .flat_map(|depth| depth.visuals.iter())
        .find(|visual| visual.class == VisualClass::TRUE_COLOR)
        .map(|visual| visual.visual_id)
}

/// ARGB u32 pixels to X11 native byte order (little-endian BGRA)
pub fn to_bgra_bytes(pixels: &[u32]) -> Vec<u8> {
    let mut image_data = Vec::with_capacity(pixels.len() * 4);
    for pixel in pixels {
        image_data.push(*pixel as u8); // B
        image_data.push((pixel >> 8) as u8); // G
        image_data.push((pixel >> 16) as u8); // R
        image_data.push((pixel >> 24) as u8); // A
    }
    image_data
}

/// Rows per PutImage request so each request fits the server's limit
pub fn rows_per_request(max_request_bytes: usize, width: usize) -> usize {
    // PutImage request header
    const HEADER: usize = 24;
    let row_bytes = (width * 4).max(1);
    (max_request_bytes.saturating_sub(HEADER) / row_bytes).max(1)
}
