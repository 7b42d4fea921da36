//! Parser for the span-only markup subset the renderer produces
//!
//! Supported: `<span>` with `foreground`/`color`, `background`/`bgcolor` and
//! `size` (Pango units) attributes, the five XML entities plus numeric
//! character references, and `\n` as a paragraph break.

use anyhow::{anyhow, bail, Result};
use tracing::warn;

use crate::color::HexColor;
use crate::constants::markup::PANGO_SCALE;

/// Style in effect for a run of text. `None` inherits the widget default.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunStyle {
    pub foreground: Option<HexColor>,
    pub background: Option<HexColor>,
    pub size_points: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub style: RunStyle,
}

/// One line of the source document (text between `\n`s)
pub type Paragraph = Vec<TextRun>;

/// Parse markup, or fall back to showing it as plain text
pub fn parse_or_plain(markup: &str) -> Vec<Paragraph> {
    match parse(markup) {
        Ok(paragraphs) => paragraphs,
        Err(e) => {
            warn!(error = %e, "Malformed markup, displaying as plain text");
            markup
                .split('\n')
                .map(|line| {
                    if line.is_empty() {
                        Vec::new()
                    } else {
                        vec![TextRun {
                            text: line.to_string(),
                            style: RunStyle::default(),
                        }]
                    }
                })
                .collect()
        }
    }
}

pub fn parse(markup: &str) -> Result<Vec<Paragraph>> {
    let mut paragraphs: Vec<Paragraph> = vec![Vec::new()];
    let mut stack: Vec<RunStyle> = vec![RunStyle::default()];
    let mut text = String::new();
    let mut rest = markup;

    // Push pending text as a run with the current style
    fn flush(text: &mut String, style: RunStyle, paragraphs: &mut [Paragraph]) {
        if text.is_empty() {
            return;
        }
        if let Some(paragraph) = paragraphs.last_mut() {
            paragraph.push(TextRun {
                text: std::mem::take(text),
                style,
            });
        }
    }

    while let Some(ch) = rest.chars().next() {
        let current = *stack.last().ok_or_else(|| anyhow!("style stack underflow"))?;
        match ch {
            '<' => {
                let end = rest
                    .find('>')
                    .ok_or_else(|| anyhow!("unterminated tag"))?;
                let tag = &rest[1..end];
                rest = &rest[end + 1..];
                flush(&mut text, current, &mut paragraphs);

                if let Some(name) = tag.strip_prefix('/') {
                    if name.trim() != "span" {
                        bail!("unsupported closing tag </{}>", name);
                    }
                    if stack.len() == 1 {
                        bail!("unbalanced </span>");
                    }
                    stack.pop();
                } else {
                    let style = parse_span(tag, current)?;
                    stack.push(style);
                }
            }
            '&' => {
                let end = rest
                    .find(';')
                    .ok_or_else(|| anyhow!("unterminated entity"))?;
                text.push(decode_entity(&rest[1..end])?);
                rest = &rest[end + 1..];
            }
            '\n' => {
                flush(&mut text, current, &mut paragraphs);
                paragraphs.push(Vec::new());
                rest = &rest[1..];
            }
            _ => {
                text.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
    }

    if stack.len() != 1 {
        bail!("{} unclosed <span>", stack.len() - 1);
    }
    flush(&mut text, RunStyle::default(), &mut paragraphs);
    Ok(paragraphs)
}

fn parse_span(tag: &str, inherited: RunStyle) -> Result<RunStyle> {
    let attrs = tag
        .strip_prefix("span")
        .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
        .ok_or_else(|| anyhow!("unsupported tag <{}>", tag))?;

    let mut style = inherited;
    for (name, value) in parse_attributes(attrs)? {
        match name {
            "foreground" | "fgcolor" | "color" => {
                style.foreground =
                    Some(HexColor::parse(&value).ok_or_else(|| anyhow!("invalid color '{}'", value))?);
            }
            "background" | "bgcolor" => {
                style.background =
                    Some(HexColor::parse(&value).ok_or_else(|| anyhow!("invalid color '{}'", value))?);
            }
            "size" => {
                let units: f32 = value
                    .parse()
                    .map_err(|_| anyhow!("unsupported size '{}'", value))?;
                style.size_points = Some(units / PANGO_SCALE as f32);
            }
            other => bail!("unsupported span attribute '{}'", other),
        }
    }
    Ok(style)
}

fn parse_attributes(mut rest: &str) -> Result<Vec<(&str, String)>> {
    let mut attrs = Vec::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return Ok(attrs);
        }
        let eq = rest.find('=').ok_or_else(|| anyhow!("attribute without value"))?;
        let name = rest[..eq].trim();
        rest = rest[eq + 1..].trim_start();

        let quote = rest
            .chars()
            .next()
            .filter(|c| *c == '"' || *c == '\'')
            .ok_or_else(|| anyhow!("unquoted value for '{}'", name))?;
        let close = rest[1..]
            .find(quote)
            .ok_or_else(|| anyhow!("unterminated value for '{}'", name))?;
        let raw = &rest[1..close + 1];
        rest = &rest[close + 2..];

        let mut value = String::with_capacity(raw.len());
        let mut tail = raw;
        while let Some(amp) = tail.find('&') {
            value.push_str(&tail[..amp]);
            let end = tail[amp..]
                .find(';')
                .ok_or_else(|| anyhow!("unterminated entity in attribute"))?;
            value.push(decode_entity(&tail[amp + 1..amp + end])?);
            tail = &tail[amp + end + 1..];
        }
        value.push_str(tail);
        attrs.push((name, value));
    }
}

fn decode_entity(name: &str) -> Result<char> {
    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse().ok()
            } else {
                None
            };
            code.and_then(char::from_u32)
                .ok_or_else(|| anyhow!("unknown entity '&{};'", name))?
        }
    };
    Ok(ch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::content::Entry;
    use crate::markup;

    fn plain(paragraph: &Paragraph) -> String {
        paragraph.iter().map(|run| run.text.as_str()).collect()
    }

    #[test]
    fn test_plain_text_and_paragraphs() {
        let paragraphs = parse("one\n\ntwo").unwrap();
        assert_eq!(paragraphs.len(), 3);
        assert_eq!(plain(&paragraphs[0]), "one");
        assert!(paragraphs[1].is_empty());
        assert_eq!(plain(&paragraphs[2]), "two");
    }

    #[test]
    fn test_nested_span_inherits_and_overrides() {
        let paragraphs =
            parse(r##"<span foreground="#ff0000" background="#000000">a<span size="20480">b</span></span>c"##)
                .unwrap();
        let runs = &paragraphs[0];
        assert_eq!(runs.len(), 3);

        assert_eq!(runs[0].style.foreground, Some(HexColor::rgb(0xff, 0, 0)));
        assert_eq!(runs[0].style.size_points, None);

        assert_eq!(runs[1].text, "b");
        assert_eq!(runs[1].style.foreground, Some(HexColor::rgb(0xff, 0, 0)));
        assert_eq!(runs[1].style.background, Some(HexColor::BLACK));
        assert_eq!(runs[1].style.size_points, Some(20.0));

        assert_eq!(runs[2].style, RunStyle::default());
    }

    #[test]
    fn test_entities() {
        let paragraphs = parse("&lt;b&gt; &amp; &quot;x&quot; &apos;y&apos; &#65;&#x42;").unwrap();
        assert_eq!(plain(&paragraphs[0]), r#"<b> & "x" 'y' AB"#);
    }

    #[test]
    fn test_malformed_markup() {
        assert!(parse("<span>unclosed").is_err());
        assert!(parse("</span>").is_err());
        assert!(parse("<b>bold</b>").is_err());
        assert!(parse("<span foreground=\"nope\">x</span>").is_err());
        assert!(parse("a &unknown; b").is_err());
        assert!(parse("<span size=\"10\"").is_err());
    }

    #[test]
    fn test_parse_or_plain_falls_back() {
        let paragraphs = parse_or_plain("<b>x</b>\nnext");
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(plain(&paragraphs[0]), "<b>x</b>");
        assert_eq!(paragraphs[0][0].style, RunStyle::default());
    }

    #[test]
    fn test_parses_rendered_entry() {
        let entry = Entry {
            arabic: Some("نص & نص".into()),
            english: Some("<Text>".into()),
            source: Some("Muslim".into()),
            ..Default::default()
        };
        let settings = Settings::default();
        let document = markup::render(Some(&entry), &settings);

        let paragraphs = parse(&document).unwrap();
        let texts: Vec<String> = paragraphs.iter().map(plain).collect();
        assert_eq!(texts[0], "نص & نص");
        assert!(texts.iter().any(|t| t == "\u{200E}\u{200E}\u{200E}<Text>\u{200E}"));
        assert!(texts.last().unwrap().contains("Source: Muslim"));

        let arabic = &paragraphs[0][0].style;
        assert_eq!(arabic.background, HexColor::parse(&settings.arabic_background_color));
        assert!((arabic.size_points.unwrap() - 15.4).abs() < 0.01);
    }

    #[test]
    fn test_parses_warning_document() {
        let document = markup::render(Some(&Entry::default()), &Settings {
            enabled_languages: Vec::new(),
            ..Default::default()
        });
        let paragraphs = parse(&document).unwrap();
        assert_eq!(paragraphs[0][0].style.foreground, Some(HexColor::rgb(0xFF, 0, 0)));
    }
}
