//! Font metrics and glyph generation.
//!
//! Uses the Spleen bitmap font family. Each named face maps to one of the
//! embedded PSF2 fonts; the configured pixel size is reached with integer
//! nearest-neighbour scaling so rendering stays fully deterministic.

use spleen_font::{FONT_6X12, FONT_8X16, FONT_12X24, PSF2Font};

/// A named font face selectable per print request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontKind {
    /// Clean, readable face (Spleen 12x24).
    Sans,
    /// Compact monospace face (Spleen 8x16).
    Console,
    /// Loose, rounded face (Spleen 6x12).
    Handwriting,
}

impl FontKind {
    /// Parse a font name from API/CLI input. Unknown names fall back to Sans.
    pub fn parse(name: &str) -> FontKind {
        match name {
            "console" => FontKind::Console,
            "handwriting" => FontKind::Handwriting,
            _ => FontKind::Sans,
        }
    }

    /// Base glyph dimensions of the underlying PSF2 font.
    pub fn base_metrics(&self) -> (usize, usize) {
        match self {
            FontKind::Sans => (12, 24),
            FontKind::Console => (8, 16),
            FontKind::Handwriting => (6, 12),
        }
    }

    /// Integer scale factor bringing the base glyph closest to the target
    /// pixel height. Never below 1.
    pub fn scale_for(&self, target_height: u32) -> usize {
        let (_, base_h) = self.base_metrics();
        let scale = (target_height as usize + base_h / 2) / base_h;
        scale.max(1)
    }

    /// Scaled glyph dimensions for a target pixel height.
    pub fn metrics_for(&self, target_height: u32) -> (usize, usize) {
        let (w, h) = self.base_metrics();
        let scale = self.scale_for(target_height);
        (w * scale, h * scale)
    }

    fn psf_data(&self) -> &'static [u8] {
        match self {
            FontKind::Sans => FONT_12X24,
            FontKind::Console => FONT_8X16,
            FontKind::Handwriting => FONT_6X12,
        }
    }
}

impl Default for FontKind {
    fn default() -> Self {
        FontKind::Sans
    }
}

/// Generate a glyph bitmap for a character at base size.
/// Returns a `Vec<u8>` of `width * height` entries, 0 (white) or 1 (black).
pub fn generate_glyph(font: FontKind, ch: char) -> Vec<u8> {
    let (width, height) = font.base_metrics();
    let mut glyph = vec![0u8; width * height];

    let mut spleen = PSF2Font::new(font.psf_data()).unwrap();
    let utf8 = ch.to_string();

    if let Some(spleen_glyph) = spleen.glyph_for_utf8(utf8.as_bytes()) {
        for (row_y, row) in spleen_glyph.enumerate() {
            for (col_x, on) in row.enumerate() {
                let idx = row_y * width + col_x;
                if idx < glyph.len() {
                    glyph[idx] = if on { 1 } else { 0 };
                }
            }
        }
    } else if let Some(fallback) = fallback_glyph(ch, width, height) {
        glyph = fallback;
    } else {
        draw_box(&mut glyph, width, height);
    }

    glyph
}

/// Draw a box outline in the glyph buffer (unknown-character marker).
fn draw_box(glyph: &mut [u8], width: usize, height: usize) {
    for x in 0..width {
        glyph[x] = 1;
        glyph[(height - 1) * width + x] = 1;
    }
    for y in 0..height {
        glyph[y * width] = 1;
        glyph[y * width + width - 1] = 1;
    }
}

/// Fill a rectangular region in a glyph buffer. Coordinates are clamped.
fn fill_rect(g: &mut [u8], stride: usize, x1: usize, y1: usize, x2: usize, y2: usize) {
    let h = g.len() / stride;
    for y in y1..y2.min(h) {
        for x in x1..x2.min(stride) {
            g[y * stride + x] = 1;
        }
    }
}

/// Outline a rectangle with 1px strokes.
fn outline_rect(g: &mut [u8], stride: usize, x1: usize, y1: usize, x2: usize, y2: usize) {
    fill_rect(g, stride, x1, y1, x2, y1 + 1);
    fill_rect(g, stride, x1, y2 - 1, x2, y2);
    fill_rect(g, stride, x1, y1, x1 + 1, y2);
    fill_rect(g, stride, x2 - 1, y1, x2, y2);
}

/// Procedurally draw fallback glyphs for characters the Spleen fonts miss.
/// The todo checkboxes and the calendar bullet must render distinctly even
/// when the PSF font has no coverage for them.
fn fallback_glyph(ch: char, w: usize, h: usize) -> Option<Vec<u8>> {
    let mut g = vec![0u8; w * h];

    // Checkbox body: a centered square with a small breathing margin.
    let mx = w / 6;
    let my = h / 4;
    let (bx1, by1, bx2, by2) = (mx, my, w - mx, h - my);

    match ch {
        '\u{2610}' => {
            // ☐ empty checkbox
            outline_rect(&mut g, w, bx1, by1, bx2, by2);
        }
        '\u{2611}' => {
            // ☑ checked checkbox: outline plus a diagonal cross
            outline_rect(&mut g, w, bx1, by1, bx2, by2);
            let span = (bx2 - bx1).min(by2 - by1);
            for i in 0..span {
                let y = by1 + i;
                let x_fwd = bx1 + i;
                let x_rev = bx2 - 1 - i;
                for x in [x_fwd, x_rev] {
                    if x > 0 {
                        g[y * w + x - 1] = 1;
                    }
                    g[y * w + x] = 1;
                }
            }
        }
        '\u{2022}' => {
            // • bullet: filled square in the center third
            let cx = w / 2;
            let cy = h / 2;
            let r = (w / 4).max(1);
            fill_rect(
                &mut g,
                w,
                cx.saturating_sub(r),
                cy.saturating_sub(r),
                cx + r,
                cy + r,
            );
        }
        _ => return None,
    }

    Some(g)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_metrics() {
        assert_eq!(FontKind::Sans.base_metrics(), (12, 24));
        assert_eq!(FontKind::Console.base_metrics(), (8, 16));
        assert_eq!(FontKind::Handwriting.base_metrics(), (6, 12));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(FontKind::parse("sans-serif"), FontKind::Sans);
        assert_eq!(FontKind::parse("console"), FontKind::Console);
        assert_eq!(FontKind::parse("handwriting"), FontKind::Handwriting);
        assert_eq!(FontKind::parse("anything-else"), FontKind::Sans);
    }

    #[test]
    fn test_scale_for_target_height() {
        // 48px target: 12x24 base doubles, 8x16 base triples.
        assert_eq!(FontKind::Sans.scale_for(48), 2);
        assert_eq!(FontKind::Console.scale_for(48), 3);
        assert_eq!(FontKind::Handwriting.scale_for(48), 4);
        // Tiny targets never collapse below 1x.
        assert_eq!(FontKind::Sans.scale_for(4), 1);
    }

    #[test]
    fn test_metrics_for() {
        assert_eq!(FontKind::Sans.metrics_for(48), (24, 48));
        assert_eq!(FontKind::Console.metrics_for(48), (24, 48));
    }

    #[test]
    fn test_generate_glyph_ascii() {
        let glyph = generate_glyph(FontKind::Sans, 'A');
        assert_eq!(glyph.len(), 12 * 24);
        assert!(glyph.iter().any(|&p| p != 0));
    }

    #[test]
    fn test_space_is_blank() {
        let glyph = generate_glyph(FontKind::Console, ' ');
        assert!(glyph.iter().all(|&p| p == 0));
    }

    #[test]
    fn test_checkbox_glyphs_are_distinct() {
        let open = generate_glyph(FontKind::Console, '\u{2610}');
        let done = generate_glyph(FontKind::Console, '\u{2611}');
        assert!(open.iter().any(|&p| p != 0));
        assert!(done.iter().any(|&p| p != 0));
        assert_ne!(open, done);
        // The checked box carries strictly more ink.
        let ink = |g: &[u8]| g.iter().filter(|&&p| p != 0).count();
        assert!(ink(&done) > ink(&open));
    }

    #[test]
    fn test_bullet_fallback_has_ink() {
        let (w, h) = FontKind::Sans.base_metrics();
        if let Some(glyph) = fallback_glyph('\u{2022}', w, h) {
            assert!(glyph.iter().any(|&p| p != 0));
        }
    }

    #[test]
    fn test_deterministic_glyphs() {
        let a = generate_glyph(FontKind::Sans, 'x');
        let b = generate_glyph(FontKind::Sans, 'x');
        assert_eq!(a, b);
    }
}
