//! Application-wide constants
//!
//! This module contains the magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// X11 protocol constants
pub mod x11 {
    /// ARGB color depth (32-bit: 8 bits each for Alpha, Red, Green, Blue)
    pub const ARGB_DEPTH: u8 = 32;

    /// Override redirect flag for unmanaged windows
    pub const OVERRIDE_REDIRECT: u32 = 1;

    /// Glyph index of the four-way move arrow in the X "cursor" font (XC_fleur)
    pub const CURSOR_FLEUR: u16 = 52;

    /// WM_CLASS for the overlay window (instance\0class\0)
    pub const WM_CLASS: &[u8] = b"hadith-overlay\0hadith-overlay\0";
}

/// Mouse button constants
pub mod mouse {
    /// Primary (left) mouse button number
    pub const BUTTON_PRIMARY: u8 = 1;
}

/// Content library constants
pub mod content {
    /// Placeholder the scraper wrote for missing translations
    pub const MISSING_SENTINEL: &str = "Not available on the source page";

    /// Shown when the content library is empty or failed to load
    pub const NO_CONTENT_MESSAGE: &str = "No hadiths available";

    /// File name of the bundled content library
    pub const FILENAME: &str = "hadith_list.json";
}

/// Markup composition constants
pub mod markup {
    /// U+200E LEFT-TO-RIGHT MARK
    pub const LTR_MARK: char = '\u{200E}';

    /// LTR marks placed before each translated or metadata block
    pub const LEADING_LTR_MARKS: usize = 3;

    /// Pango size units per point
    pub const PANGO_SCALE: f64 = 1024.0;

    /// Arabic block is slightly larger than the translations
    pub const ARABIC_SCALE: f64 = 1.1;

    /// Narrator/source lines are this many points smaller than the base size
    pub const METADATA_SIZE_DELTA: i32 = 2;

    /// Alert color of the "enable a language" warning
    pub const WARNING_COLOR: &str = "#FF0000";

    pub const ENABLE_LANGUAGE_WARNING: &str = "Please enable at least one language in settings";

    pub const NARRATOR_LABEL: &str = "📖 Narrator: ";

    pub const SOURCE_LABEL: &str = "📚 Source: ";
}

/// Widget box style constants
pub mod style {
    pub const PADDING: u16 = 20;
    pub const BORDER_RADIUS: u16 = 12;
    pub const MIN_WIDTH: u16 = 400;
    pub const LINE_HEIGHT: f32 = 1.5;
}

/// Scheduler constants
pub mod schedule {
    /// Floor applied to a zero refresh interval so the timer cannot spin
    pub const MIN_INTERVAL_MINUTES: u32 = 1;
}

/// Configuration file constants
pub mod config {
    /// Application directory name under XDG config/data/runtime dirs
    pub const APP_DIR: &str = "hadith-overlay";

    /// Settings file name
    pub const FILENAME: &str = "settings.json";
}

/// Settings validation limits (the ranges the preferences dialog offers)
pub mod validation {
    pub const MIN_FONT_SIZE: i32 = 8;
    pub const MAX_FONT_SIZE: i32 = 48;

    pub const MIN_MAX_WIDTH: i32 = 400;
    pub const MAX_MAX_WIDTH: i32 = 2000;

    /// Minutes
    pub const MIN_REFRESH_INTERVAL: u32 = 5;
    pub const MAX_REFRESH_INTERVAL: u32 = 1440;

    pub const MAX_POSITION_X: i32 = 3840;
    pub const MAX_POSITION_Y: i32 = 2160;
}

/// IPC constants
pub mod ipc {
    /// Socket file name under the runtime dir
    pub const SOCKET_NAME: &str = "overlay.sock";

    /// Maximum message size (1 MB) to prevent memory exhaustion
    pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
}

/// Display conversion constants
pub mod display {
    /// Pixels per point at the X11 reference resolution of 96 DPI
    pub const PIXELS_PER_POINT: f32 = 96.0 / 72.0;
}
