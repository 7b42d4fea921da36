//! Small value types shared across modules

use serde::{Deserialize, Serialize};

/// Absolute widget position in screen pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Pointer coordinates as delivered by the event source (sub-pixel capable)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerCoords {
    pub x: f64,
    pub y: f64,
}

impl PointerCoords {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Translation languages, in the fixed order they are rendered.
/// Arabic is not a member: it is always rendered and never toggled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Turkish,
    German,
    French,
}

impl Language {
    /// Render order, independent of the order languages were enabled in
    pub const RENDER_ORDER: [Language; 4] = [
        Language::English,
        Language::Turkish,
        Language::German,
        Language::French,
    ];

    /// Settings code (`enabled-languages` members)
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Turkish => "tr",
            Language::German => "de",
            Language::French => "fr",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::RENDER_ORDER.into_iter().find(|lang| lang.code() == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes() {
        for lang in Language::RENDER_ORDER {
            assert_eq!(Language::from_code(lang.code()), Some(lang));
        }
        assert_eq!(Language::from_code("ar"), None);
        assert_eq!(Language::from_code("EN"), None);
    }
}
