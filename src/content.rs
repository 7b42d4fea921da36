//! Content store: the bundled hadith library
//!
//! Loaded once at startup. Loading never fails hard: a missing or malformed
//! file yields an empty library and the widget shows a placeholder instead.

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::constants::{config, content};
use crate::types::Language;

/// One displayable hadith with optional per-language fields
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub arabic: Option<String>,
    #[serde(default)]
    pub english: Option<String>,
    #[serde(default)]
    pub turkish: Option<String>,
    #[serde(default)]
    pub german: Option<String>,
    #[serde(default)]
    pub french: Option<String>,
    #[serde(default)]
    pub narrator: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Empty strings and the scraper's placeholder both count as absent
fn present(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .filter(|text| !text.is_empty() && *text != content::MISSING_SENTINEL)
}

impl Entry {
    pub fn arabic(&self) -> Option<&str> {
        present(&self.arabic)
    }

    pub fn translation(&self, language: Language) -> Option<&str> {
        present(match language {
            Language::English => &self.english,
            Language::Turkish => &self.turkish,
            Language::German => &self.german,
            Language::French => &self.french,
        })
    }

    pub fn narrator(&self) -> Option<&str> {
        present(&self.narrator)
    }

    pub fn source(&self) -> Option<&str> {
        present(&self.source)
    }
}

/// Default library location: `$XDG_DATA_HOME/hadith-overlay/hadith_list.json`
pub fn default_path() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(config::APP_DIR);
    path.push(content::FILENAME);
    path
}

fn read_entries(path: &Path) -> Result<Vec<Entry>> {
    let contents = fs::read_to_string(path)
        .context(format!("Failed to read content file {}", path.display()))?;
    serde_json::from_str(&contents)
        .context(format!("Failed to parse content file {}", path.display()))
}

/// Load the library, degrading to an empty list on any failure
pub fn load(path: &Path) -> Vec<Entry> {
    match read_entries(path) {
        Ok(entries) => {
            info!(path = %path.display(), count = entries.len(), "Loaded content library");
            entries
        }
        Err(e) => {
            error!(path = %path.display(), error = ?e, "Error loading hadith data, continuing with no content");
            Vec::new()
        }
    }
}

/// Uniformly random entry, `None` only for an empty library
pub fn pick_random(entries: &[Entry]) -> Option<&Entry> {
    entries.choose(&mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn entry(arabic: &str) -> Entry {
        Entry {
            arabic: Some(arabic.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_pick_random_empty() {
        assert!(pick_random(&[]).is_none());
    }

    #[test]
    fn test_pick_random_returns_member() {
        let entries = vec![entry("a"), entry("b"), entry("c")];
        for _ in 0..100 {
            let picked = pick_random(&entries).unwrap();
            assert!(entries.contains(picked));
        }
    }

    #[test]
    fn test_pick_random_reaches_every_entry() {
        let entries = vec![entry("a"), entry("b")];
        let mut seen = [false, false];
        for _ in 0..500 {
            let picked = pick_random(&entries).unwrap();
            seen[if picked.arabic() == Some("a") { 0 } else { 1 }] = true;
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn test_sentinel_and_empty_are_absent() {
        let e = Entry {
            arabic: Some(String::new()),
            english: Some("Text".to_string()),
            turkish: Some(content::MISSING_SENTINEL.to_string()),
            source: Some(content::MISSING_SENTINEL.to_string()),
            ..Default::default()
        };
        assert_eq!(e.arabic(), None);
        assert_eq!(e.translation(Language::English), Some("Text"));
        assert_eq!(e.translation(Language::Turkish), None);
        assert_eq!(e.translation(Language::German), None);
        assert_eq!(e.source(), None);
    }

    #[test]
    fn test_load_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"arabic": "نص", "english": "Text", "narrator": "Abu Hurairah"}}, {{"source": "Bukhari"}}]"#
        )
        .unwrap();

        let entries = load(file.path());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].arabic(), Some("نص"));
        assert_eq!(entries[0].narrator(), Some("Abu Hurairah"));
        assert_eq!(entries[1].source(), Some("Bukhari"));
        assert_eq!(entries[1].arabic(), None);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("nope.json")).is_empty());
    }

    #[test]
    fn test_load_malformed_file_is_empty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(load(file.path()).is_empty());
    }
}
