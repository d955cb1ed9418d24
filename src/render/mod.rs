//! # Rendering Module
//!
//! Composes print content into monochrome bitmaps sized for the sticky-note
//! printer's fixed 576-dot width.
//!
//! ## Modules
//!
//! - [`dither`]: Floyd-Steinberg error diffusion for binary conversion
//! - [`font`]: Spleen bitmap fonts and procedural fallback glyphs
//! - [`wrap`]: word wrapping for monospace layout
//! - [`qr`]: QR code generation and fit-to-width scaling
//!
//! ## Pipeline
//!
//! Every render path ends the same way: the grayscale composition is
//! dithered to 1-bit and then flipped vertically. The printer feeds paper
//! inverted relative to normal raster order, so images are stored upside
//! down. Rendering is deterministic: identical content and configuration
//! produce byte-identical bitmaps.

pub mod dither;
pub mod font;
pub mod qr;
pub mod wrap;

use std::io::Cursor;

use chrono::{DateTime, NaiveDateTime};
use image::{imageops, GrayImage, ImageFormat, Luma};
use tracing::warn;

use crate::config::AppConfig;
use crate::error::StickyError;
use crate::ha::{CalendarEvent, TodoItem};
use font::FontKind;

/// Fixed print width of the sticky-note printer, in pixels.
pub const PRINT_WIDTH: u32 = 576;

const WHITE: Luma<u8> = Luma([255]);
const BLACK: Luma<u8> = Luma([0]);

/// Layout parameters for the renderer.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Target glyph height in pixels.
    pub font_size: u32,
    /// Margin applied on all four sides, in pixels.
    pub margin: u32,
    /// Line height multiplier applied to the glyph height.
    pub line_spacing: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_size: 48,
            margin: 20,
            line_spacing: 1.3,
        }
    }
}

impl RenderConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            font_size: config.font_size,
            margin: config.margin,
            line_spacing: config.line_spacing,
        }
    }
}

/// A printer-ready bitmap plus the logical content it represents.
///
/// The stored bitmap is already dithered and vertically flipped; encode it
/// with [`crate::printer::bmp::encode_bmp1`] for submission, or call
/// [`to_preview_png`](Self::to_preview_png) for a human-orientation preview.
pub struct RenderedImage {
    label: String,
    mono: GrayImage,
}

impl RenderedImage {
    fn new(label: &str, mono: GrayImage) -> Self {
        Self {
            label: label.to_string(),
            mono,
        }
    }

    /// The logical content label, used for job naming and logging.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn width(&self) -> u32 {
        self.mono.width()
    }

    pub fn height(&self) -> u32 {
        self.mono.height()
    }

    /// The printer-ready bitmap (dithered, flipped).
    pub fn bitmap(&self) -> &GrayImage {
        &self.mono
    }

    /// Encode a PNG preview in reading orientation (flipped back upright).
    pub fn to_preview_png(&self) -> Result<Vec<u8>, StickyError> {
        let upright = imageops::flip_vertical(&self.mono);
        let mut buf = Cursor::new(Vec::new());
        upright
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| StickyError::Render(format!("PNG encoding failed: {}", e)))?;
        Ok(buf.into_inner())
    }
}

/// Renders text, QR codes, calendar digests, and todo lists.
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Line height in pixels for a font at the configured size and spacing.
    pub fn line_height(&self, font: FontKind) -> u32 {
        let (_, glyph_h) = font.metrics_for(self.config.font_size);
        (glyph_h as f32 * self.config.line_spacing).round() as u32
    }

    /// Printable width between the left and right margins.
    fn printable_width(&self) -> u32 {
        PRINT_WIDTH.saturating_sub(2 * self.config.margin).max(1)
    }

    /// Render plain text, word-wrapped to the printable width.
    pub fn render_text(&self, text: &str, font: FontKind, label: &str) -> RenderedImage {
        let gray = self.compose_text(text, font);
        self.finalize(gray, label)
    }

    /// Render a QR code, centered, scaled to fit the printable width.
    ///
    /// Encoding failures degrade to a wrapped-text rendition of the payload
    /// prefixed with `QR:` instead of failing the request.
    pub fn render_qr(&self, data: &str, label: &str) -> RenderedImage {
        match qr::render_qr(data, self.printable_width()) {
            Ok(qr_img) => {
                let margin = self.config.margin;
                let height = qr_img.height() + 2 * margin;
                let mut canvas = GrayImage::from_pixel(PRINT_WIDTH, height, WHITE);
                let x = (PRINT_WIDTH - qr_img.width()) / 2;
                imageops::overlay(&mut canvas, &qr_img, x as i64, margin as i64);
                self.finalize(canvas, label)
            }
            Err(e) => {
                warn!(error = %e, "QR encoding failed, falling back to text");
                let shown: String = data.chars().take(50).collect();
                let fallback = if shown.len() < data.len() {
                    format!("QR: {}...", shown)
                } else {
                    format!("QR: {}", shown)
                };
                self.render_text(&fallback, FontKind::Sans, label)
            }
        }
    }

    /// Render today's calendar events as a header plus one bullet per event.
    pub fn render_calendar(&self, events: &[CalendarEvent], font: FontKind) -> RenderedImage {
        let content = calendar_lines(events).join("\n");
        self.render_text(&content, font, "Calendar")
    }

    /// Render a todo list as a header plus one checkbox line per item.
    pub fn render_todo(&self, items: &[TodoItem], font: FontKind) -> RenderedImage {
        let content = todo_lines(items).join("\n");
        self.render_text(&content, font, "TodoList")
    }

    /// Compose wrapped text lines onto a white canvas.
    fn compose_text(&self, text: &str, font: FontKind) -> GrayImage {
        let (glyph_w, _) = font.metrics_for(self.config.font_size);
        let max_chars = (self.printable_width() as usize / glyph_w).max(1);
        let lines = wrap::wrap_text(text, max_chars);

        let margin = self.config.margin;
        let line_height = self.line_height(font);
        let height = lines.len() as u32 * line_height + 2 * margin;
        let mut canvas = GrayImage::from_pixel(PRINT_WIDTH, height, WHITE);

        let scale = font.scale_for(self.config.font_size);
        for (i, line) in lines.iter().enumerate() {
            let y = margin + i as u32 * line_height;
            draw_line(&mut canvas, line, font, scale, margin, y, glyph_w);
        }

        canvas
    }

    /// Final step for every render path: dither to 1-bit, then flip
    /// vertically for the printer's inverted feed direction.
    fn finalize(&self, gray: GrayImage, label: &str) -> RenderedImage {
        let mono = dither::floyd_steinberg(&gray);
        let flipped = imageops::flip_vertical(&mono);
        RenderedImage::new(label, flipped)
    }
}

/// Draw one line of text at (x0, y0), clipping at the canvas edge.
fn draw_line(
    canvas: &mut GrayImage,
    line: &str,
    font: FontKind,
    scale: usize,
    x0: u32,
    y0: u32,
    glyph_w: usize,
) {
    let (base_w, base_h) = font.base_metrics();
    let canvas_w = canvas.width() as usize;
    let canvas_h = canvas.height() as usize;

    for (i, ch) in line.chars().enumerate() {
        let cx = x0 as usize + i * glyph_w;
        if cx + glyph_w > canvas_w {
            break;
        }
        let glyph = font::generate_glyph(font, ch);
        for gy in 0..base_h {
            for gx in 0..base_w {
                if glyph[gy * base_w + gx] == 0 {
                    continue;
                }
                // Expand each base pixel into a scale x scale block.
                for sy in 0..scale {
                    for sx in 0..scale {
                        let px = cx + gx * scale + sx;
                        let py = y0 as usize + gy * scale + sy;
                        if px < canvas_w && py < canvas_h {
                            canvas.put_pixel(px as u32, py as u32, BLACK);
                        }
                    }
                }
            }
        }
    }
}

/// Build the display lines for a calendar digest.
fn calendar_lines(events: &[CalendarEvent]) -> Vec<String> {
    if events.is_empty() {
        return vec!["No events today".to_string()];
    }

    let mut lines = vec!["Today's Events:".to_string(), String::new()];
    for event in events {
        let title = event.summary.as_deref().unwrap_or("Untitled Event");
        let time = event
            .start
            .as_ref()
            .and_then(|s| s.date_time.as_deref())
            .and_then(format_event_time);
        let line = match time {
            Some(t) => format!("\u{2022} {} - {}", t, title),
            None => format!("\u{2022} {}", title),
        };
        lines.push(line);
    }
    lines
}

/// Build the display lines for a todo list.
fn todo_lines(items: &[TodoItem]) -> Vec<String> {
    if items.is_empty() {
        return vec!["No items".to_string()];
    }

    let mut lines = vec!["Todo List:".to_string(), String::new()];
    for item in items {
        let title = item.summary.as_deref().unwrap_or("Untitled Task");
        let checkbox = if item.completed {
            '\u{2611}'
        } else {
            '\u{2610}'
        };
        lines.push(format!("{} {}", checkbox, title));
    }
    lines
}

/// Format an event start time as HH:MM.
///
/// Accepts RFC 3339 timestamps (with offset or Z) and the offset-less form
/// Home Assistant emits for local times. Unparseable input yields None and
/// the event renders without a time prefix.
fn format_event_time(raw: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.format("%H:%M").to_string());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.format("%H:%M").to_string());
    }
    None
}

// ============================================================================
// TESTS
// ============================================================================
