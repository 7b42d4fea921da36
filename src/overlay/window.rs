//! The overlay widget as an override-redirect X11 window
//!
//! Text is shaped and rasterized client side (cosmic-text) and uploaded with
//! PutImage. On servers with a 32-bit visual the window is translucent.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as WrapperExt;

use crate::constants::x11;
use crate::style::WidgetStyle;
use crate::surface::{ChromeOptions, CursorGlyph, Layer, Surface};
use crate::types::Position;

use super::font::{RenderedImage, TextRenderer};
use super::richtext;
use super::x11_utils::{find_argb_visual, rows_per_request, to_bgra_bytes, CachedAtoms};

pub struct OverlayWindow {
    // === Widget State ===
    style: WidgetStyle,
    markup: String,
    image: Option<RenderedImage>,
    position: Position,
    parent: Option<Layer>,
    tracked: bool,

    // === X11 Handles (owned resources) ===
    pub window: Window,
    depth: u8,
    colormap: Option<Colormap>,
    gc: Gcontext,
    move_cursor: Cursor,

    // === Shared Dependencies ===
    conn: Arc<RustConnection>,
    atoms: CachedAtoms,
    text: TextRenderer,
}

/// Destroys a half-built window if construction fails
struct WindowGuard<'a> {
    conn: &'a RustConnection,
    window: Window,
    should_cleanup: bool,
}

impl Drop for WindowGuard<'_> {
    fn drop(&mut self) {
        if self.should_cleanup {
            if let Err(e) = self.conn.destroy_window(self.window) {
                error!(window = self.window, error = %e, "Failed to clean up window after initialization failure");
            }
            let _ = self.conn.flush();
        }
    }
}

impl OverlayWindow {
    pub fn new(
        conn: Arc<RustConnection>,
        screen_num: usize,
        atoms: CachedAtoms,
        text: TextRenderer,
        style: WidgetStyle,
        position: Position,
    ) -> Result<Self> {
        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;

        let window = conn.generate_id().context("Failed to generate X11 window ID")?;
        let (depth, visual, colormap) = match find_argb_visual(screen) {
            Some(visual) => {
                let colormap = conn.generate_id().context("Failed to generate colormap ID")?;
                conn.create_colormap(ColormapAlloc::NONE, colormap, root, visual)
                    .context("Failed to create ARGB colormap")?;
                (x11::ARGB_DEPTH, visual, Some(colormap))
            }
            None => {
                warn!("No 32-bit visual available, widget background will be opaque");
                (screen.root_depth, screen.root_visual, None)
            }
        };

        let mut aux = CreateWindowAux::new()
            .override_redirect(x11::OVERRIDE_REDIRECT)
            .background_pixel(0)
            .border_pixel(0)
            .event_mask(
                EventMask::EXPOSURE
                    | EventMask::STRUCTURE_NOTIFY
                    | EventMask::BUTTON_PRESS
                    | EventMask::BUTTON_RELEASE
                    | EventMask::POINTER_MOTION
                    | EventMask::LEAVE_WINDOW,
            );
        if let Some(colormap) = colormap {
            aux = aux.colormap(colormap);
        }

        conn.create_window(
            depth,
            window,
            root,
            position.x as i16,
            position.y as i16,
            style.min_width,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            visual,
            &aux,
        )
        .context("Failed to create overlay window")?;

        let mut guard = WindowGuard {
            conn: conn.as_ref(),
            window,
            should_cleanup: true,
        };

        conn.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_CLASS,
            AtomEnum::STRING,
            x11::WM_CLASS,
        )
        .context("Failed to set WM_CLASS")?;
        conn.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_NAME,
            AtomEnum::STRING,
            b"Hadith Overlay",
        )
        .context("Failed to set WM_NAME")?;

        let gc = conn.generate_id().context("Failed to generate graphics context ID")?;
        conn.create_gc(gc, window, &CreateGCAux::new())
            .context("Failed to create graphics context")?;

        // Four-way arrow from the core cursor font
        let cursor_font = conn.generate_id().context("Failed to generate cursor font ID")?;
        conn.open_font(cursor_font, b"cursor")
            .context("Failed to open cursor font")?;
        let move_cursor = conn.generate_id().context("Failed to generate cursor ID")?;
        conn.create_glyph_cursor(
            move_cursor,
            cursor_font,
            cursor_font,
            x11::CURSOR_FLEUR,
            x11::CURSOR_FLEUR + 1,
            0,
            0,
            0,
            0xFFFF,
            0xFFFF,
            0xFFFF,
        )
        .context("Failed to create move cursor")?;
        conn.close_font(cursor_font)
            .context("Failed to close cursor font")?;

        conn.flush().context("Failed to flush after creating overlay window")?;
        guard.should_cleanup = false;
        drop(guard);

        info!(window = window, depth = depth, x = position.x, y = position.y, "Created overlay window");
        Ok(Self {
            style,
            markup: String::new(),
            image: None,
            position,
            parent: None,
            tracked: false,
            window,
            depth,
            colormap,
            gc,
            move_cursor,
            conn,
            atoms,
            text,
        })
    }

    /// Shape and rasterize the current markup, resize to fit, and draw
    fn rerender(&mut self) -> Result<()> {
        let paragraphs = richtext::parse_or_plain(&self.markup);
        let image = self.text.render(&paragraphs, &self.style);

        self.conn
            .configure_window(
                self.window,
                &ConfigureWindowAux::new()
                    .width(image.width as u32)
                    .height(image.height as u32),
            )
            .context(format!("Failed to resize overlay to {}x{}", image.width, image.height))?;
        self.image = Some(image);
        self.redraw()
    }

    /// Upload the cached image (Expose handler)
    pub fn redraw(&self) -> Result<()> {
        let Some(image) = &self.image else {
            return Ok(());
        };
        if self.parent.is_none() || image.width == 0 || image.height == 0 {
            return Ok(());
        }

        let bytes = to_bgra_bytes(&image.data);
        let rows = rows_per_request(self.conn.maximum_request_bytes(), image.width);
        let row_bytes = image.width * 4;

        for (chunk_idx, chunk) in bytes.chunks(rows * row_bytes).enumerate() {
            let height = chunk.len() / row_bytes;
            self.conn
                .put_image(
                    ImageFormat::Z_PIXMAP,
                    self.window,
                    self.gc,
                    image.width as u16,
                    height as u16,
                    0,
                    (chunk_idx * rows) as i16,
                    0,
                    self.depth,
                    chunk,
                )
                .context("Failed to upload overlay image")?;
        }
        self.conn.flush().context("Failed to flush after drawing overlay")?;
        Ok(())
    }

    /// Keep the topmost widget above windows that were just mapped or raised
    pub fn restack(&self) -> Result<()> {
        if !self.tracked {
            return Ok(());
        }
        self.conn
            .configure_window(self.window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))
            .context("Failed to raise overlay window")?;
        self.conn.flush().context("Failed to flush after raising overlay")?;
        Ok(())
    }

    pub fn is_tracked(&self) -> bool {
        self.tracked
    }
}

impl Surface for OverlayWindow {
    fn position(&self) -> Position {
        self.position
    }

    fn set_position(&mut self, position: Position) -> Result<()> {
        self.conn
            .configure_window(
                self.window,
                &ConfigureWindowAux::new().x(position.x).y(position.y),
            )
            .context(format!("Failed to move overlay to ({}, {})", position.x, position.y))?;
        self.conn.flush().context("Failed to flush after moving overlay")?;
        self.position = position;
        Ok(())
    }

    fn apply_style(&mut self, style: &WidgetStyle) -> Result<()> {
        if *style == self.style && self.image.is_some() {
            return Ok(());
        }
        self.style = style.clone();
        if self.markup.is_empty() {
            return Ok(());
        }
        self.rerender()
    }

    fn set_markup(&mut self, markup: &str) -> Result<()> {
        self.markup = markup.to_string();
        self.rerender()
    }

    fn set_cursor(&mut self, cursor: CursorGlyph) -> Result<()> {
        let cursor = match cursor {
            CursorGlyph::Move => self.move_cursor,
            CursorGlyph::Default => x11rb::NONE,
        };
        self.conn
            .change_window_attributes(self.window, &ChangeWindowAttributesAux::new().cursor(cursor))
            .context("Failed to change overlay cursor")?;
        self.conn.flush().context("Failed to flush after cursor change")?;
        Ok(())
    }

    fn parent(&self) -> Option<Layer> {
        self.parent
    }

    fn detach(&mut self) -> Result<()> {
        if self.parent.take().is_none() {
            return Ok(());
        }
        self.conn
            .unmap_window(self.window)
            .context("Failed to unmap overlay window")?;
        self.conn.flush().context("Failed to flush after unmapping overlay")?;
        debug!(window = self.window, "Overlay detached");
        Ok(())
    }

    fn untrack(&mut self) -> Result<()> {
        if !self.tracked {
            anyhow::bail!("overlay window {} is not tracked", self.window);
        }
        self.tracked = false;
        self.conn
            .delete_property(self.window, self.atoms.net_wm_state)
            .context("Failed to clear _NET_WM_STATE")?;
        Ok(())
    }

    fn attach(&mut self, layer: Layer, options: ChromeOptions) -> Result<()> {
        let (state, stack_mode) = match layer {
            Layer::Topmost => (self.atoms.net_wm_state_above, StackMode::ABOVE),
            Layer::Background => (self.atoms.net_wm_state_below, StackMode::BELOW),
        };
        self.conn
            .change_property32(
                PropMode::REPLACE,
                self.window,
                self.atoms.net_wm_state,
                AtomEnum::ATOM,
                &[state, self.atoms.net_wm_state_skip_taskbar, self.atoms.net_wm_state_skip_pager],
            )
            .context(format!("Failed to set _NET_WM_STATE for {:?} layer", layer))?;

        self.conn
            .map_window(self.window)
            .context("Failed to map overlay window")?;
        self.conn
            .configure_window(self.window, &ConfigureWindowAux::new().stack_mode(stack_mode))
            .context(format!("Failed to restack overlay for {:?} layer", layer))?;
        self.conn.flush().context("Failed to flush after attaching overlay")?;

        self.parent = Some(layer);
        self.tracked = layer == Layer::Topmost;
        debug!(
            layer = ?layer,
            affects_input_region = options.affects_input_region,
            track_fullscreen = options.track_fullscreen,
            "Overlay attached"
        );
        self.redraw()
    }
}

impl Drop for OverlayWindow {
    fn drop(&mut self) {
        // Clean up each resource independently so one failure does not leak the rest
        if let Err(e) = self.conn.free_cursor(self.move_cursor) {
            error!(cursor = self.move_cursor, error = %e, "Failed to free cursor");
        }
        if let Err(e) = self.conn.free_gc(self.gc) {
            error!(gc = self.gc, error = %e, "Failed to free GC");
        }
        if let Err(e) = self.conn.destroy_window(self.window) {
            error!(window = self.window, error = %e, "Failed to destroy overlay window");
        }
        if let Some(colormap) = self.colormap
            && let Err(e) = self.conn.free_colormap(colormap)
        {
            error!(colormap = colormap, error = %e, "Failed to free colormap");
        }
        if let Err(e) = self.conn.flush() {
            error!(error = %e, "Failed to flush X11 connection during cleanup");
        }
    }
}
