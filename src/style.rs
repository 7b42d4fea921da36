//! Widget box style derived from a settings snapshot

use tracing::warn;

use crate::color::HexColor;
use crate::config::Settings;
use crate::constants::style;

/// Everything the surface needs to draw the widget box
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetStyle {
    /// Box background, opacity already applied to alpha
    pub background: HexColor,
    /// Base text size in points
    pub font_size: f32,
    pub max_width: u16,
    pub min_width: u16,
    pub padding: u16,
    pub border_radius: u16,
    pub line_height: f32,
}

impl WidgetStyle {
    pub fn from_settings(settings: &Settings) -> Self {
        let background = HexColor::parse(&settings.background_color).unwrap_or_else(|| {
            warn!(background_color = %settings.background_color, "Invalid background color, using black");
            HexColor::BLACK
        });
        let max_width = settings.max_width.clamp(style::MIN_WIDTH as i32, u16::MAX as i32) as u16;

        Self {
            background: background.with_opacity(settings.background_opacity),
            font_size: settings.font_size as f32,
            max_width,
            min_width: style::MIN_WIDTH,
            padding: style::PADDING,
            border_radius: style::BORDER_RADIUS,
            line_height: style::LINE_HEIGHT,
        }
    }

    /// CSS rendition, logged at debug level when the style changes
    pub fn to_css(&self) -> String {
        format!(
            "background-color: {}; padding: {}px; border-radius: {}px; max-width: {}px; min-width: {}px; line-height: {};",
            self.background.to_css_rgba(),
            self.padding,
            self.border_radius,
            self.max_width,
            self.min_width,
            self.line_height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings_applies_opacity() {
        let settings = Settings {
            background_color: "#102030".into(),
            background_opacity: 0.5,
            max_width: 900,
            font_size: 16,
            ..Default::default()
        };
        let style = WidgetStyle::from_settings(&settings);
        assert_eq!(style.background, HexColor { r: 0x10, g: 0x20, b: 0x30, a: 128 });
        assert_eq!(style.max_width, 900);
        assert_eq!(style.font_size, 16.0);
        assert_eq!(
            style.to_css(),
            "background-color: rgba(16, 32, 48, 0.50); padding: 20px; border-radius: 12px; max-width: 900px; min-width: 400px; line-height: 1.5;"
        );
    }

    #[test]
    fn test_invalid_background_falls_back_to_black() {
        let settings = Settings {
            background_color: "bogus".into(),
            background_opacity: 1.0,
            ..Default::default()
        };
        assert_eq!(WidgetStyle::from_settings(&settings).background, HexColor::BLACK);
    }

    #[test]
    fn test_max_width_never_below_min_width() {
        let settings = Settings {
            max_width: 100,
            ..Default::default()
        };
        assert_eq!(WidgetStyle::from_settings(&settings).max_width, style::MIN_WIDTH);
    }
}
