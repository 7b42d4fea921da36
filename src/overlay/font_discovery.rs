//! Font discovery via fontconfig
//!
//! cosmic-text falls back across every installed face on its own. This only
//! picks the Arabic family to request by name, since the first face fontdb
//! finds for Arabic script is often a poor match for fully vowelled text.

use anyhow::{Context, Result};
use fontconfig::{Fontconfig, Pattern};
use std::ffi::CString;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Arabic families with good harakat placement, in order of preference
pub const ARABIC_FAMILIES: &[&str] = &[
    "Noto Naskh Arabic",
    "Amiri",
    "Noto Sans Arabic",
    "Scheherazade New",
    "KacstOne",
];

/// Find the font file for an exact family name
pub fn find_font_path(family_name: &str) -> Result<PathBuf> {
    let fc = Fontconfig::new().context("Failed to initialize fontconfig")?;

    let mut pattern = Pattern::new(&fc);
    let family_cstr = CString::new(family_name)
        .with_context(|| format!("Invalid family name: {}", family_name))?;
    pattern.add_string(fontconfig::FC_FAMILY, &family_cstr);

    let matched = pattern.font_match();

    // Fontconfig always returns something; reject substitutes
    if let Some(matched_family) = matched.get_string(fontconfig::FC_FAMILY)
        && !matched_family.eq_ignore_ascii_case(family_name)
    {
        debug!(
            requested = family_name,
            matched_family = matched_family,
            "Fontconfig returned a different family"
        );
        anyhow::bail!("Font '{}' not installed (got '{}')", family_name, matched_family);
    }

    let path = PathBuf::from(
        matched
            .filename()
            .with_context(|| format!("No font file found for '{}'", family_name))?,
    );
    if !path.exists() {
        anyhow::bail!("Font file path '{}' does not exist", path.display());
    }

    debug!(family = family_name, path = %path.display(), "Resolved font path");
    Ok(path)
}

/// First installed family of [`ARABIC_FAMILIES`] and its file
pub fn arabic_font() -> Option<(String, PathBuf)> {
    for family in ARABIC_FAMILIES {
        match find_font_path(family) {
            Ok(path) => {
                info!(family = family, path = %path.display(), "Using Arabic font");
                return Some((family.to_string(), path));
            }
            Err(e) => debug!(family = family, error = %e, "Arabic font family unavailable"),
        }
    }
    warn!(tried = ?ARABIC_FAMILIES, "No preferred Arabic font installed, relying on fallback");
    None
}
