//! Text shaping and rasterization using cosmic-text
//!
//! cosmic-text does the bidi reordering, Arabic joining (ligatures and mark
//! placement through rustybuzz), font fallback and line wrapping. This module
//! turns parsed runs into one `Buffer` with per-run attributes and draws the
//! result, plus the rounded widget box, into a premultiplied ARGB bitmap.

use anyhow::Result;
use cosmic_text::{Attrs, Buffer, Color, Family, FontSystem, Metrics, Shaping, SwashCache, Wrap};
use tracing::{debug, info};

use crate::color::HexColor;
use crate::constants::display::PIXELS_PER_POINT;
use crate::style::WidgetStyle;

use super::font_discovery;
use super::richtext::{Paragraph, RunStyle};

/// Rendered widget as an ARGB bitmap
pub struct RenderedImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u32>, // ARGB pixels (premultiplied alpha)
}

/// Shapes and draws widget text. Holds the font database, which is expensive
/// to build, for the daemon's lifetime.
pub struct TextRenderer {
    font_system: FontSystem,
    swash_cache: SwashCache,
    /// Family requested for runs containing Arabic script
    arabic_family: Option<String>,
}

/// A shaped buffer and the box it will be drawn into
struct ShapedText {
    buffer: Buffer,
    /// Style of each span, indexed by glyph metadata
    styles: Vec<RunStyle>,
    /// Content box size, padding excluded
    width: f32,
    height: f32,
}

impl TextRenderer {
    /// Load system fonts, making sure the preferred Arabic face is present
    pub fn from_system() -> Result<Self> {
        let mut font_system = FontSystem::new();

        let arabic_family = match font_discovery::arabic_font() {
            Some((family, path)) => {
                if !has_family(&font_system, &family) {
                    font_system
                        .db_mut()
                        .load_font_file(&path)
                        .map_err(|e| anyhow::anyhow!("Failed to load font {}: {}", path.display(), e))?;
                    debug!(family = %family, path = %path.display(), "Loaded Arabic font into database");
                }
                Some(family)
            }
            None => None,
        };

        if font_system.db().is_empty() {
            anyhow::bail!("No system fonts found, install a TrueType font (e.g. DejaVu Sans)");
        }
        info!(faces = font_system.db().len(), arabic_family = ?arabic_family, "Font database ready");
        Ok(Self::with_font_system(font_system, arabic_family))
    }

    pub fn with_font_system(font_system: FontSystem, arabic_family: Option<String>) -> Self {
        Self {
            font_system,
            swash_cache: SwashCache::new(),
            arabic_family,
        }
    }

    /// Shape and wrap `paragraphs` for the widget's width limits
    fn shape(&mut self, paragraphs: &[Paragraph], style: &WidgetStyle) -> ShapedText {
        let base_px = style.font_size * PIXELS_PER_POINT;
        let (_, content_max) = content_bounds(style);
        let fs = &mut self.font_system;

        let mut buffer = Buffer::new(fs, Metrics::new(base_px, base_px * style.line_height));
        buffer.set_wrap(fs, Wrap::WordOrGlyph);
        buffer.set_size(fs, Some(content_max), None);

        let spans = spans(paragraphs);
        let styles: Vec<RunStyle> = spans.iter().map(|(_, run)| *run).collect();
        let family = self.arabic_family.as_deref();
        let default_attrs = span_attrs(Attrs::new(), "", &RunStyle::default(), 0, style, family);
        buffer.set_rich_text(
            fs,
            spans
                .iter()
                .enumerate()
                .map(|(index, (text, run))| (*text, span_attrs(default_attrs, text, run, index, style, family))),
            default_attrs,
            Shaping::Advanced,
        );
        buffer.shape_until_scroll(fs, false);

        let widest = buffer.layout_runs().map(|run| run.line_w).fold(0.0f32, f32::max);
        let width = content_width(widest, style);

        // Right-to-left lines align against the final width, not the maximum
        buffer.set_size(fs, Some(width), None);
        buffer.shape_until_scroll(fs, false);

        let height = buffer
            .layout_runs()
            .map(|run| run.line_top + run.line_height)
            .fold(0.0f32, f32::max);

        ShapedText {
            buffer,
            styles,
            width,
            height,
        }
    }

    /// Draw the widget box and its text
    pub fn render(&mut self, paragraphs: &[Paragraph], style: &WidgetStyle) -> RenderedImage {
        let shaped = self.shape(paragraphs, style);
        let padding = style.padding as f32;
        let width = ((shaped.width + 2.0 * padding).ceil() as usize).max(1);
        let height = ((shaped.height + 2.0 * padding).ceil() as usize).max(1);
        let mut canvas = Canvas {
            width,
            height,
            data: vec![0x00000000; width * height],
        };

        let radius = style.border_radius as f32;
        for y in 0..height {
            for x in 0..width {
                let coverage = rounded_rect_coverage(x, y, width, height, radius);
                if coverage > 0.0 {
                    canvas.data[y * width + x] = premultiply(style.background, coverage);
                }
            }
        }

        let mut glyphs = 0;
        for run in shaped.buffer.layout_runs() {
            for glyph in run.glyphs {
                glyphs += 1;
                let background = shaped.styles.get(glyph.metadata).and_then(|s| s.background);
                if let Some(background) = background {
                    canvas.fill_rect(
                        glyph.x + padding,
                        run.line_top + padding,
                        glyph.w,
                        run.line_height,
                        background,
                    );
                }
            }
        }

        let offset = padding.round() as i32;
        shaped.buffer.draw(
            &mut self.font_system,
            &mut self.swash_cache,
            to_cosmic(HexColor::WHITE),
            |x, y, w, h, color| {
                canvas.fill_rect(
                    (x + offset) as f32,
                    (y + offset) as f32,
                    w as f32,
                    h as f32,
                    from_cosmic(color),
                );
            },
        );

        debug!(width = width, height = height, glyphs = glyphs, "Rendered widget");
        RenderedImage {
            width,
            height,
            data: canvas.data,
        }
    }
}

fn has_family(font_system: &FontSystem, family: &str) -> bool {
    font_system
        .db()
        .faces()
        .any(|face| face.families.iter().any(|(name, _)| name.eq_ignore_ascii_case(family)))
}

/// Paragraph runs flattened into one span list, paragraphs split by `\n`
fn spans(paragraphs: &[Paragraph]) -> Vec<(&str, RunStyle)> {
    let mut spans = Vec::new();
    for (i, paragraph) in paragraphs.iter().enumerate() {
        if i > 0 {
            spans.push(("\n", RunStyle::default()));
        }
        spans.extend(paragraph.iter().map(|run| (run.text.as_str(), run.style)));
    }
    spans
}

fn is_arabic(text: &str) -> bool {
    text.chars().any(|ch| {
        matches!(ch as u32,
            0x0600..=0x06FF | 0x0750..=0x077F | 0x08A0..=0x08FF | 0xFB50..=0xFDFF | 0xFE70..=0xFEFF)
    })
}

/// cosmic-text attributes for one span; `metadata` indexes the span's style
fn span_attrs<'a>(
    base: Attrs<'a>,
    text: &str,
    run: &RunStyle,
    index: usize,
    style: &WidgetStyle,
    arabic_family: Option<&'a str>,
) -> Attrs<'a> {
    let px = run.size_points.map_or(style.font_size * PIXELS_PER_POINT, |pt| pt * PIXELS_PER_POINT);
    let family = match arabic_family {
        Some(name) if is_arabic(text) => Family::Name(name),
        _ => Family::SansSerif,
    };
    base.family(family)
        .color(to_cosmic(run.foreground.unwrap_or(HexColor::WHITE)))
        .metrics(Metrics::new(px, px * style.line_height))
        .metadata(index)
}

/// Content box limits (min, max) for the style, padding excluded
fn content_bounds(style: &WidgetStyle) -> (f32, f32) {
    let padding = 2.0 * style.padding as f32;
    let max = (style.max_width as f32 - padding).max(1.0);
    let min = (style.min_width as f32 - padding).clamp(0.0, max);
    (min, max)
}

fn content_width(widest: f32, style: &WidgetStyle) -> f32 {
    let (min, max) = content_bounds(style);
    widest.ceil().clamp(min, max)
}

fn to_cosmic(color: HexColor) -> Color {
    Color(color.argb32())
}

fn from_cosmic(color: Color) -> HexColor {
    HexColor {
        r: color.r(),
        g: color.g(),
        b: color.b(),
        a: color.a(),
    }
}

/// Blend a premultiplied ARGB pixel over another
fn blend_over(dst: u32, src: u32) -> u32 {
    let src_a = src >> 24;
    if src_a == 0xFF {
        return src;
    }
    if src_a == 0 {
        return dst;
    }
    let inv = 255 - src_a;
    let channel = |shift: u32| {
        let s = (src >> shift) & 0xFF;
        let d = (dst >> shift) & 0xFF;
        (s + (d * inv + 127) / 255).min(255) << shift
    };
    channel(24) | channel(16) | channel(8) | channel(0)
}

/// Premultiplied ARGB of `color` at `coverage` (0.0..=1.0)
fn premultiply(color: HexColor, coverage: f32) -> u32 {
    let alpha = color.a as f32 / 255.0 * coverage;
    let a = (alpha * 255.0).round() as u32;
    let r = (color.r as f32 * alpha).round() as u32;
    let g = (color.g as f32 * alpha).round() as u32;
    let b = (color.b as f32 * alpha).round() as u32;
    (a << 24) | (r << 16) | (g << 8) | b
}

/// Coverage of a rounded rectangle at pixel centre (x, y)
fn rounded_rect_coverage(x: usize, y: usize, width: usize, height: usize, radius: f32) -> f32 {
    let px = x as f32 + 0.5;
    let py = y as f32 + 0.5;
    let cx = px.clamp(radius, (width as f32 - radius).max(radius));
    let cy = py.clamp(radius, (height as f32 - radius).max(radius));
    let distance = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt();
    (radius - distance + 0.5).clamp(0.0, 1.0)
}

struct Canvas {
    width: usize,
    height: usize,
    data: Vec<u32>,
}

impl Canvas {
    fn blend(&mut self, x: i32, y: i32, pixel: u32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        self.data[idx] = blend_over(self.data[idx], pixel);
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: HexColor) {
        let pixel = premultiply(color, 1.0);
        for py in y.floor() as i32..(y + h).ceil() as i32 {
            for px in x.floor() as i32..(x + w).ceil() as i32 {
                self.blend(px, py, pixel);
            }
        }
    }
}
