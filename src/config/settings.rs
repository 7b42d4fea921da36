//! Typed settings snapshot
//!
//! One field per recognized key with explicit defaults. A snapshot is built
//! once per read and never mutated by the code that consumes it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

use crate::constants::validation;
use crate::types::{Language, Position};

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("unknown settings key: {0}")]
    UnknownKey(String),

    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: SettingsKey,
        value: String,
        reason: &'static str,
    },
}

/// Every key of the settings store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsKey {
    EnabledLanguages,
    ShowSource,
    ShowNarrator,
    BackgroundColor,
    ArabicColor,
    ArabicBackgroundColor,
    TurkishColor,
    EnglishColor,
    GermanColor,
    FrenchColor,
    SourceColor,
    BackgroundOpacity,
    FontSize,
    MaxWidth,
    AlwaysOnTop,
    RefreshInterval,
    PositionX,
    PositionY,
}

impl SettingsKey {
    pub const ALL: [SettingsKey; 18] = [
        SettingsKey::EnabledLanguages,
        SettingsKey::ShowSource,
        SettingsKey::ShowNarrator,
        SettingsKey::BackgroundColor,
        SettingsKey::ArabicColor,
        SettingsKey::ArabicBackgroundColor,
        SettingsKey::TurkishColor,
        SettingsKey::EnglishColor,
        SettingsKey::GermanColor,
        SettingsKey::FrenchColor,
        SettingsKey::SourceColor,
        SettingsKey::BackgroundOpacity,
        SettingsKey::FontSize,
        SettingsKey::MaxWidth,
        SettingsKey::AlwaysOnTop,
        SettingsKey::RefreshInterval,
        SettingsKey::PositionX,
        SettingsKey::PositionY,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SettingsKey::EnabledLanguages => "enabled-languages",
            SettingsKey::ShowSource => "show-source",
            SettingsKey::ShowNarrator => "show-narrator",
            SettingsKey::BackgroundColor => "background-color",
            SettingsKey::ArabicColor => "arabic-color",
            SettingsKey::ArabicBackgroundColor => "arabic-background-color",
            SettingsKey::TurkishColor => "turkish-color",
            SettingsKey::EnglishColor => "english-color",
            SettingsKey::GermanColor => "german-color",
            SettingsKey::FrenchColor => "french-color",
            SettingsKey::SourceColor => "source-color",
            SettingsKey::BackgroundOpacity => "background-opacity",
            SettingsKey::FontSize => "font-size",
            SettingsKey::MaxWidth => "max-width",
            SettingsKey::AlwaysOnTop => "always-on-top",
            SettingsKey::RefreshInterval => "refresh-interval",
            SettingsKey::PositionX => "position-x",
            SettingsKey::PositionY => "position-y",
        }
    }
}

impl SettingsKey {
    /// Accepted values of the integer keys; `None` for every other key
    pub fn int_range(self) -> Option<RangeInclusive<i64>> {
        use validation::*;
        match self {
            SettingsKey::FontSize => Some(MIN_FONT_SIZE as i64..=MAX_FONT_SIZE as i64),
            SettingsKey::MaxWidth => Some(MIN_MAX_WIDTH as i64..=MAX_MAX_WIDTH as i64),
            SettingsKey::RefreshInterval => {
                Some(MIN_REFRESH_INTERVAL as i64..=MAX_REFRESH_INTERVAL as i64)
            }
            SettingsKey::PositionX => Some(0..=MAX_POSITION_X as i64),
            SettingsKey::PositionY => Some(0..=MAX_POSITION_Y as i64),
            _ => None,
        }
    }
}

impl fmt::Display for SettingsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SettingsKey {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.name() == s)
            .ok_or_else(|| SettingsError::UnknownKey(s.to_string()))
    }
}

/// Immutable configuration snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    /// Translation codes to show (`en`, `tr`, `de`, `fr`); Arabic is always shown
    pub enabled_languages: Vec<String>,
    pub show_source: bool,
    pub show_narrator: bool,

    pub background_color: String,
    pub arabic_color: String,
    pub arabic_background_color: String,
    pub turkish_color: String,
    pub english_color: String,
    pub german_color: String,
    pub french_color: String,
    /// Color of the narrator and source lines
    pub source_color: String,

    /// 0.0 (transparent) to 1.0 (opaque)
    pub background_opacity: f64,
    /// Base font size in points
    pub font_size: i32,
    /// Maximum widget width in pixels
    pub max_width: i32,
    pub always_on_top: bool,
    /// Minutes between automatic refreshes
    pub refresh_interval: u32,

    pub position_x: i32,
    pub position_y: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled_languages: vec!["en".to_string()],
            show_source: true,
            show_narrator: true,
            background_color: "#000000".to_string(),
            arabic_color: "#ffffff".to_string(),
            arabic_background_color: "#1a1a2e".to_string(),
            turkish_color: "#ffd700".to_string(),
            english_color: "#ffffff".to_string(),
            german_color: "#87ceeb".to_string(),
            french_color: "#98fb98".to_string(),
            source_color: "#aaaaaa".to_string(),
            background_opacity: 0.7,
            font_size: 14,
            max_width: 800,
            always_on_top: false,
            refresh_interval: 30,
            position_x: 100,
            position_y: 100,
        }
    }
}

fn parse_bool(key: SettingsKey, raw: &str) -> Result<bool, SettingsError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(SettingsError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: "expected true or false",
        }),
    }
}

fn parse_num<T: FromStr>(key: SettingsKey, raw: &str) -> Result<T, SettingsError> {
    raw.trim().parse().map_err(|_| SettingsError::InvalidValue {
        key,
        value: raw.to_string(),
        reason: "expected a number",
    })
}

/// Integer within the key's accepted range
fn parse_int<T: TryFrom<i64>>(key: SettingsKey, raw: &str) -> Result<T, SettingsError> {
    let value: i64 = parse_num(key, raw)?;
    let out_of_range = || SettingsError::InvalidValue {
        key,
        value: raw.to_string(),
        reason: "outside the accepted range",
    };
    if key.int_range().is_some_and(|range| !range.contains(&value)) {
        return Err(out_of_range());
    }
    T::try_from(value).map_err(|_| out_of_range())
}

/// Clamp into `[min, max]`, logging the correction
fn clamp_field<T: PartialOrd + Copy + fmt::Display>(key: SettingsKey, value: &mut T, min: T, max: T) {
    let clamped = if *value < min {
        min
    } else if *value > max {
        max
    } else {
        return;
    };
    warn!(key = %key, value = %value, using = %clamped, "Value out of range, clamping");
    *value = clamped;
}

fn parse_color(key: SettingsKey, raw: &str) -> Result<String, SettingsError> {
    crate::color::HexColor::parse(raw)
        .map(|_| raw.trim().to_string())
        .ok_or_else(|| SettingsError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: "expected a #RRGGBB color",
        })
}

impl Settings {
    pub fn position(&self) -> Position {
        Position::new(self.position_x, self.position_y)
    }

    /// Whether a translation language is enabled
    pub fn is_enabled(&self, language: Language) -> bool {
        self.enabled_languages.iter().any(|code| code == language.code())
    }

    /// Configured color of a translation block
    pub fn language_color(&self, language: Language) -> &str {
        match language {
            Language::English => &self.english_color,
            Language::Turkish => &self.turkish_color,
            Language::German => &self.german_color,
            Language::French => &self.french_color,
        }
    }

    /// Render a single key's current value as text
    pub fn get(&self, key: SettingsKey) -> String {
        match key {
            SettingsKey::EnabledLanguages => self.enabled_languages.join(","),
            SettingsKey::ShowSource => self.show_source.to_string(),
            SettingsKey::ShowNarrator => self.show_narrator.to_string(),
            SettingsKey::BackgroundColor => self.background_color.clone(),
            SettingsKey::ArabicColor => self.arabic_color.clone(),
            SettingsKey::ArabicBackgroundColor => self.arabic_background_color.clone(),
            SettingsKey::TurkishColor => self.turkish_color.clone(),
            SettingsKey::EnglishColor => self.english_color.clone(),
            SettingsKey::GermanColor => self.german_color.clone(),
            SettingsKey::FrenchColor => self.french_color.clone(),
            SettingsKey::SourceColor => self.source_color.clone(),
            SettingsKey::BackgroundOpacity => self.background_opacity.to_string(),
            SettingsKey::FontSize => self.font_size.to_string(),
            SettingsKey::MaxWidth => self.max_width.to_string(),
            SettingsKey::AlwaysOnTop => self.always_on_top.to_string(),
            SettingsKey::RefreshInterval => self.refresh_interval.to_string(),
            SettingsKey::PositionX => self.position_x.to_string(),
            SettingsKey::PositionY => self.position_y.to_string(),
        }
    }

    /// Parse `raw` for `key` and store it. Languages are a comma separated list.
    pub fn set(&mut self, key: SettingsKey, raw: &str) -> Result<(), SettingsError> {
        match key {
            SettingsKey::EnabledLanguages => {
                let mut codes = Vec::new();
                for code in raw.split(',').map(str::trim).filter(|c| !c.is_empty()) {
                    if Language::from_code(code).is_none() {
                        return Err(SettingsError::InvalidValue {
                            key,
                            value: raw.to_string(),
                            reason: "languages must be en, tr, de or fr",
                        });
                    }
                    if !codes.iter().any(|c| c == code) {
                        codes.push(code.to_string());
                    }
                }
                self.enabled_languages = codes;
            }
            SettingsKey::ShowSource => self.show_source = parse_bool(key, raw)?,
            SettingsKey::ShowNarrator => self.show_narrator = parse_bool(key, raw)?,
            SettingsKey::BackgroundColor => self.background_color = parse_color(key, raw)?,
            SettingsKey::ArabicColor => self.arabic_color = parse_color(key, raw)?,
            SettingsKey::ArabicBackgroundColor => {
                self.arabic_background_color = parse_color(key, raw)?
            }
            SettingsKey::TurkishColor => self.turkish_color = parse_color(key, raw)?,
            SettingsKey::EnglishColor => self.english_color = parse_color(key, raw)?,
            SettingsKey::GermanColor => self.german_color = parse_color(key, raw)?,
            SettingsKey::FrenchColor => self.french_color = parse_color(key, raw)?,
            SettingsKey::SourceColor => self.source_color = parse_color(key, raw)?,
            SettingsKey::BackgroundOpacity => {
                let opacity: f64 = parse_num(key, raw)?;
                if !(0.0..=1.0).contains(&opacity) {
                    return Err(SettingsError::InvalidValue {
                        key,
                        value: raw.to_string(),
                        reason: "opacity must be between 0 and 1",
                    });
                }
                self.background_opacity = opacity;
            }
            SettingsKey::FontSize => self.font_size = parse_int(key, raw)?,
            SettingsKey::MaxWidth => self.max_width = parse_int(key, raw)?,
            SettingsKey::AlwaysOnTop => self.always_on_top = parse_bool(key, raw)?,
            SettingsKey::RefreshInterval => self.refresh_interval = parse_int(key, raw)?,
            SettingsKey::PositionX => self.position_x = parse_int(key, raw)?,
            SettingsKey::PositionY => self.position_y = parse_int(key, raw)?,
        }
        Ok(())
    }

    /// Validate and clamp values to safe ranges.
    /// Called after every load; hand-edited files may hold anything.
    pub fn validate_and_clamp(&mut self) {
        use validation::*;

        let before = self.enabled_languages.len();
        self.enabled_languages
            .retain(|code| Language::from_code(code).is_some());
        if self.enabled_languages.len() != before {
            warn!(kept = ?self.enabled_languages, "Dropped unknown language codes from enabled-languages");
        }

        if !(0.0..=1.0).contains(&self.background_opacity) || self.background_opacity.is_nan() {
            let clamped = if self.background_opacity.is_nan() {
                Settings::default().background_opacity
            } else {
                self.background_opacity.clamp(0.0, 1.0)
            };
            warn!(background_opacity = self.background_opacity, using = clamped, "background-opacity out of range, clamping");
            self.background_opacity = clamped;
        }

        clamp_field(SettingsKey::FontSize, &mut self.font_size, MIN_FONT_SIZE, MAX_FONT_SIZE);
        clamp_field(SettingsKey::MaxWidth, &mut self.max_width, MIN_MAX_WIDTH, MAX_MAX_WIDTH);
        clamp_field(
            SettingsKey::RefreshInterval,
            &mut self.refresh_interval,
            MIN_REFRESH_INTERVAL,
            MAX_REFRESH_INTERVAL,
        );
        clamp_field(SettingsKey::PositionX, &mut self.position_x, 0, MAX_POSITION_X);
        clamp_field(SettingsKey::PositionY, &mut self.position_y, 0, MAX_POSITION_Y);

        let defaults = Settings::default();
        for (name, color, fallback) in [
            ("background-color", &mut self.background_color, defaults.background_color),
            ("arabic-color", &mut self.arabic_color, defaults.arabic_color),
            ("arabic-background-color", &mut self.arabic_background_color, defaults.arabic_background_color),
            ("turkish-color", &mut self.turkish_color, defaults.turkish_color),
            ("english-color", &mut self.english_color, defaults.english_color),
            ("german-color", &mut self.german_color, defaults.german_color),
            ("french-color", &mut self.french_color, defaults.french_color),
            ("source-color", &mut self.source_color, defaults.source_color),
        ] {
            if crate::color::HexColor::parse(color).is_none() {
                warn!(key = name, value = %color, using = %fallback, "Invalid color, using default");
                *color = fallback;
            }
        }
    }
}
