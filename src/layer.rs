//! Layer placement: keep the widget in exactly one compositing tier
//!
//! Placement is idempotent. Re-placing with the same flag detaches and
//! re-attaches, which leaves the widget in the same state.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::surface::{ChromeOptions, Layer, Surface};

/// Attach options used for the topmost layer. The widget neither steals input
/// routing nor hides behind fullscreen windows.
const TOPMOST_CHROME: ChromeOptions = ChromeOptions {
    affects_input_region: false,
    track_fullscreen: false,
};

pub fn target_layer(always_on_top: bool) -> Layer {
    if always_on_top {
        Layer::Topmost
    } else {
        Layer::Background
    }
}

/// Move the widget to the topmost or background layer
pub fn place<S: Surface>(surface: &mut S, always_on_top: bool) -> Result<()> {
    if let Some(current) = surface.parent() {
        surface
            .detach()
            .context(format!("Failed to detach widget from {:?} layer", current))?;
    }

    // Not tracked is the common case; nothing to undo
    if let Err(e) = surface.untrack() {
        debug!(error = %e, "Widget was not tracked as always-on-top");
    }

    let layer = target_layer(always_on_top);
    let options = match layer {
        Layer::Topmost => TOPMOST_CHROME,
        Layer::Background => ChromeOptions::default(),
    };
    surface
        .attach(layer, options)
        .context(format!("Failed to attach widget to {:?} layer", layer))?;

    info!(layer = ?layer, "Widget placed");
    Ok(())
}
