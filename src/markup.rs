//! Markup renderer: entry + settings snapshot → Pango-style markup document
//!
//! Pure and deterministic. Block order is fixed (Arabic first, then English,
//! Turkish, German, French) regardless of the order languages were enabled.

use crate::constants::{content, markup::*};
use crate::content::Entry;
use crate::config::Settings;
use crate::types::Language;

/// Escape the five markup-significant characters
pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Point size → Pango units
fn pango_size(points: f64) -> i64 {
    (points * PANGO_SCALE).round() as i64
}

/// Wrap text in direction marks so the shaper treats it as left-to-right
fn force_ltr(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + LEADING_LTR_MARKS * 3 + 3);
    for _ in 0..LEADING_LTR_MARKS {
        out.push(LTR_MARK);
    }
    out.push_str(text);
    out.push(LTR_MARK);
    out
}

fn colored_block(color: &str, size: i64, body: &str) -> String {
    let color = escape_markup(color);
    format!(
        "<span foreground=\"{color}\"><span size=\"{size}\" foreground=\"{color}\">{}</span></span>",
        force_ltr(body)
    )
}

/// Render one entry. `None` (empty library) yields the fixed placeholder.
pub fn render(entry: Option<&Entry>, settings: &Settings) -> String {
    let Some(entry) = entry else {
        return content::NO_CONTENT_MESSAGE.to_string();
    };

    let font_size = settings.font_size as f64;
    let mut document = String::new();
    let mut has_language = false;

    if let Some(arabic) = entry.arabic() {
        let size = pango_size(font_size * ARABIC_SCALE);
        document.push_str(&format!(
            "<span size=\"{size}\" foreground=\"{}\" background=\"{}\">{}</span>\n\n",
            escape_markup(&settings.arabic_color),
            escape_markup(&settings.arabic_background_color),
            escape_markup(arabic),
        ));
        has_language = true;
    }

    let normal_size = pango_size(font_size);
    for language in Language::RENDER_ORDER {
        if !settings.is_enabled(language) {
            continue;
        }
        if let Some(text) = entry.translation(language) {
            document.push_str(&colored_block(
                settings.language_color(language),
                normal_size,
                &escape_markup(text),
            ));
            document.push_str("\n\n");
            has_language = true;
        }
    }

    if !has_language {
        document = format!("<span foreground=\"{WARNING_COLOR}\">{ENABLE_LANGUAGE_WARNING}</span>");
    }

    let meta_size = pango_size((settings.font_size - METADATA_SIZE_DELTA) as f64);
    if settings.show_narrator
        && let Some(narrator) = entry.narrator()
    {
        document.push('\n');
        document.push_str(&colored_block(
            &settings.source_color,
            meta_size,
            &format!("{NARRATOR_LABEL}{}", escape_markup(narrator)),
        ));
    }

    if settings.show_source
        && let Some(source) = entry.source()
    {
        document.push('\n');
        document.push_str(&colored_block(
            &settings.source_color,
            meta_size,
            &format!("{SOURCE_LABEL}{}", escape_markup(source)),
        ));
    }

    document.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(languages: &[&str]) -> Settings {
        Settings {
            enabled_languages: languages.iter().map(|s| s.to_string()).collect(),
            show_source: false,
            show_narrator: false,
            ..Default::default()
        }
    }

    fn full_entry() -> Entry {
        Entry {
            arabic: Some("نص".into()),
            english: Some("English text".into()),
            turkish: Some("Türkçe metin".into()),
            german: Some("Deutscher Text".into()),
            french: Some("Texte français".into()),
            narrator: Some("Abu Hurairah".into()),
            source: Some("Sahih al-Bukhari 1".into()),
        }
    }

    /// Strip every tag, leaving only text content (entities left escaped)
    fn text_content(markup: &str) -> String {
        let mut out = String::new();
        let mut in_tag = false;
        for ch in markup.chars() {
            match ch {
                '<' => in_tag = true,
                '>' => in_tag = false,
                _ if !in_tag => out.push(ch),
                _ => {}
            }
        }
        out
    }

    #[test]
    fn test_escape_markup() {
        assert_eq!(
            escape_markup(r#"a & b < c > d " e ' f"#),
            "a &amp; b &lt; c &gt; d &quot; e &apos; f"
        );
        assert_eq!(escape_markup("plain"), "plain");
    }

    #[test]
    fn test_no_entry_gives_placeholder() {
        assert_eq!(render(None, &settings(&["en"])), content::NO_CONTENT_MESSAGE);
    }

    #[test]
    fn test_scenario_sentinel_turkish_omitted() {
        let entry = Entry {
            arabic: Some("نص".into()),
            english: Some("Text".into()),
            turkish: Some(content::MISSING_SENTINEL.into()),
            ..Default::default()
        };
        let out = render(Some(&entry), &settings(&["en", "tr"]));

        assert!(out.contains("نص"));
        assert!(out.contains("\u{200E}\u{200E}\u{200E}Text\u{200E}"));
        assert!(!out.contains("#ffd700")); // turkish color
        assert!(!out.contains(content::MISSING_SENTINEL));
    }

    #[test]
    fn test_scenario_empty_entry_no_languages_warns() {
        let out = render(Some(&Entry::default()), &settings(&[]));
        assert_eq!(
            out,
            format!("<span foreground=\"{WARNING_COLOR}\">{ENABLE_LANGUAGE_WARNING}</span>")
        );
    }

    #[test]
    fn test_empty_entry_with_languages_warns() {
        let out = render(Some(&Entry::default()), &settings(&["en", "tr", "de", "fr"]));
        assert!(out.contains(ENABLE_LANGUAGE_WARNING));
    }

    #[test]
    fn test_arabic_rendered_even_with_no_languages() {
        let entry = Entry {
            arabic: Some("نص".into()),
            english: Some("Text".into()),
            ..Default::default()
        };
        let out = render(Some(&entry), &settings(&[]));
        // round(14 * 1.1 * 1024)
        assert!(out.starts_with("<span size=\"15770\""));
        assert!(out.contains("background=\"#1a1a2e\""));
        assert!(!out.contains("Text"));
        assert!(!out.contains(ENABLE_LANGUAGE_WARNING));
    }

    #[test]
    fn test_fixed_language_order() {
        let entry = full_entry();
        let out = render(Some(&entry), &settings(&["fr", "de", "tr", "en"]));

        let positions: Vec<usize> = ["نص", "English text", "Türkçe metin", "Deutscher Text", "Texte français"]
            .iter()
            .map(|needle| out.find(needle).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_translation_sizes_and_direction_marks() {
        let entry = Entry {
            english: Some("Hello".into()),
            ..Default::default()
        };
        let out = render(Some(&entry), &settings(&["en"]));
        assert_eq!(
            out,
            "<span foreground=\"#ffffff\"><span size=\"14336\" foreground=\"#ffffff\">\u{200E}\u{200E}\u{200E}Hello\u{200E}</span></span>"
        );
    }

    #[test]
    fn test_metadata_lines() {
        let mut s = settings(&["en"]);
        s.show_narrator = true;
        s.show_source = true;
        let out = render(Some(&full_entry()), &s);

        let meta_size = format!("size=\"{}\"", 12 * 1024);
        assert_eq!(out.matches(&meta_size).count(), 2);
        let narrator = out.find("📖 Narrator: Abu Hurairah").unwrap();
        let source = out.find("📚 Source: Sahih al-Bukhari 1").unwrap();
        assert!(narrator < source);
        assert!(out.contains("\u{200E}\u{200E}\u{200E}📖 Narrator"));
    }

    #[test]
    fn test_source_without_narrator() {
        let mut s = settings(&["en"]);
        s.show_source = true;
        let out = render(Some(&full_entry()), &s);
        assert!(!out.contains("Narrator"));
        assert!(out.contains("📚 Source: "));
    }

    #[test]
    fn test_metadata_follows_warning() {
        let mut s = settings(&[]);
        s.show_source = true;
        let entry = Entry {
            source: Some("Muslim".into()),
            ..Default::default()
        };
        let out = render(Some(&entry), &s);
        assert!(out.starts_with(&format!("<span foreground=\"{WARNING_COLOR}\">")));
        assert!(out.ends_with("Muslim\u{200E}</span></span>"));
    }

    #[test]
    fn test_output_is_trimmed() {
        let out = render(Some(&full_entry()), &settings(&["en"]));
        assert_eq!(out, out.trim());
        assert!(!out.ends_with('\n'));
    }

    #[test]
    fn test_source_text_never_leaks_unescaped() {
        let hostile = r#"<b>"x" & 'y'</b>"#;
        let entry = Entry {
            arabic: Some(hostile.into()),
            english: Some(hostile.into()),
            french: Some(hostile.into()),
            narrator: Some(hostile.into()),
            source: Some(hostile.into()),
            ..Default::default()
        };
        let mut s = settings(&["en", "fr"]);
        s.show_narrator = true;
        s.show_source = true;
        let out = render(Some(&entry), &s);

        let text = text_content(&out);
        for ch in ['<', '>', '"', '\''] {
            assert!(!text.contains(ch), "unescaped {ch:?} in {text:?}");
        }
        assert!(!text.replace("&amp;", "").replace("&lt;", "").replace("&gt;", "")
            .replace("&quot;", "").replace("&apos;", "").contains('&'));
        assert!(!out.contains("<b>"));
    }
}
