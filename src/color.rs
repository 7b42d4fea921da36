//! Hex color parsing
//!
//! Settings store colors as `#RRGGBB` strings (the preferences surface writes
//! exactly that). `#RRGGBBAA` and a missing `#` are accepted too.

/// An 8-bit-per-channel RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl HexColor {
    pub const WHITE: HexColor = HexColor::rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: HexColor = HexColor::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    /// Parse `#RRGGBB` / `#RRGGBBAA` (leading `#` optional)
    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
                a: channel(6)?,
            }),
            _ => None,
        }
    }

    /// Same color with alpha scaled by `opacity` (clamped to [0, 1])
    pub fn with_opacity(self, opacity: f64) -> Self {
        let opacity = opacity.clamp(0.0, 1.0);
        Self {
            a: (self.a as f64 * opacity).round() as u8,
            ..self
        }
    }

    /// Raw (non-premultiplied) ARGB32
    pub fn argb32(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    /// CSS `rgba(r, g, b, a)` notation
    pub fn to_css_rgba(self) -> String {
        let alpha = self.a as f64 / 255.0;
        format!("rgba({}, {}, {}, {:.2})", self.r, self.g, self.b, alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rgb() {
        assert_eq!(HexColor::parse("#1a2B3c"), Some(HexColor::rgb(0x1a, 0x2b, 0x3c)));
        assert_eq!(HexColor::parse("ffffff"), Some(HexColor::WHITE));
    }

    #[test]
    fn test_parse_rgba() {
        let c = HexColor::parse("#00ff0080").unwrap();
        assert_eq!((c.r, c.g, c.b, c.a), (0, 255, 0, 0x80));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(HexColor::parse("red"), None);
        assert_eq!(HexColor::parse("#12345"), None);
        assert_eq!(HexColor::parse("#gg0000"), None);
        assert_eq!(HexColor::parse("#éééé"), None);
    }

    #[test]
    fn test_with_opacity() {
        assert_eq!(HexColor::BLACK.with_opacity(0.5).a, 128);
        assert_eq!(HexColor::BLACK.with_opacity(2.0).a, 255);
        assert_eq!(HexColor::BLACK.with_opacity(-1.0).a, 0);
    }

    #[test]
    fn test_argb32_and_css() {
        let c = HexColor::parse("#102030").unwrap().with_opacity(0.0);
        assert_eq!(c.argb32(), 0x00102030);
        assert_eq!(HexColor::rgb(1, 2, 3).to_css_rgba(), "rgba(1, 2, 3, 1.00)");
    }
}
