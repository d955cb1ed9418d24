//! QR code generation.
//!
//! Encodes payloads with the `qrcode` crate at the lowest error-correction
//! level (maximizing capacity) and automatic version selection. Modules are
//! drawn directly into a grayscale buffer; if the grid would overflow the
//! printable width it is downscaled with a high-quality filter.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use qrcode::{Color, EcLevel, QrCode};

use crate::error::StickyError;

/// Pixels per QR module before any downscaling.
const MODULE_SIZE: usize = 8;

/// Quiet-zone border width in modules (the standard requires 4).
const QUIET_ZONE_MODULES: usize = 4;

/// Render a QR code for `data`, no wider than `max_width` pixels.
///
/// The encoder picks the smallest version that holds the payload at error
/// correction level L. The module grid is drawn at [`MODULE_SIZE`] pixels
/// per module inside a 4-module quiet zone; a grid wider than `max_width`
/// is downscaled preserving aspect ratio.
///
/// ## Errors
///
/// Returns a render error when the payload exceeds QR capacity; callers are
/// expected to degrade to a textual rendition.
pub fn render_qr(data: &str, max_width: u32) -> Result<GrayImage, StickyError> {
    let code = QrCode::with_error_correction_level(data, EcLevel::L)
        .map_err(|e| StickyError::Render(format!("QR encoding failed: {}", e)))?;

    let quiet = QUIET_ZONE_MODULES * MODULE_SIZE;
    let qr_size = code.width();
    let pixel_size = (qr_size * MODULE_SIZE + 2 * quiet) as u32;

    let mut img = GrayImage::from_pixel(pixel_size, pixel_size, Luma([255]));
    for qy in 0..qr_size {
        for qx in 0..qr_size {
            if code[(qx, qy)] != Color::Dark {
                continue;
            }
            let x0 = (quiet + qx * MODULE_SIZE) as u32;
            let y0 = (quiet + qy * MODULE_SIZE) as u32;
            for dy in 0..MODULE_SIZE as u32 {
                for dx in 0..MODULE_SIZE as u32 {
                    img.put_pixel(x0 + dx, y0 + dy, Luma([0]));
                }
            }
        }
    }

    if img.width() > max_width {
        let new_size = max_width.max(1);
        Ok(imageops::resize(
            &img,
            new_size,
            new_size,
            FilterType::Lanczos3,
        ))
    } else {
        Ok(img)
    }
}

// ============================================================================
// TESTS
// ============================================================================
