//! # Floyd-Steinberg Error Diffusion
//!
//! Converts continuous-tone (grayscale) images to binary (black/white)
//! output suitable for the sticky-note printer.
//!
//! ## What is Dithering?
//!
//! Dithering simulates grayscale on a device that can only print black or
//! white. By varying the density of black dots, we create the illusion of
//! different gray levels.
//!
//! ## Error Diffusion
//!
//! Floyd-Steinberg processes pixels left-to-right, top-to-bottom. Each pixel
//! is snapped to pure black or white, and the quantization error is pushed
//! onto the neighbours that have not been visited yet:
//!
//! ```text
//!             ┌───────┬───────┐
//!             │   *   │ 7/16  │
//!     ┌───────┼───────┼───────┤
//!     │ 3/16  │ 5/16  │ 1/16  │
//!     └───────┴───────┴───────┘
//! ```
//!
//! The weights sum to 1, so total image intensity is preserved. The scan
//! order is fixed, which makes the output fully deterministic: the same
//! input buffer always dithers to the same output buffer.
//!
//! Text and line art pass through essentially unchanged (pure black/white
//! input has zero quantization error); anti-aliased edges and downscaled QR
//! codes are where the diffusion earns its keep.

use image::{GrayImage, Luma};

/// Threshold separating "snaps to black" from "snaps to white".
const MID_GRAY: f32 = 128.0;

/// Dither a grayscale image to pure black (0) and white (255) pixels.
///
/// ## Parameters
///
/// - `image`: 8-bit grayscale input, 0 = black, 255 = white
///
/// ## Returns
///
/// An image of the same dimensions containing only the values 0 and 255.
pub fn floyd_steinberg(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let w = width as usize;
    let h = height as usize;

    let mut buf: Vec<f32> = image.pixels().map(|p| p.0[0] as f32).collect();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let old = buf[idx];
            let new = if old < MID_GRAY { 0.0 } else { 255.0 };
            let err = old - new;
            buf[idx] = new;

            if x + 1 < w {
                buf[idx + 1] += err * 7.0 / 16.0;
            }
            if y + 1 < h {
                if x > 0 {
                    buf[idx + w - 1] += err * 3.0 / 16.0;
                }
                buf[idx + w] += err * 5.0 / 16.0;
                if x + 1 < w {
                    buf[idx + w + 1] += err * 1.0 / 16.0;
                }
            }
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        Luma([buf[y as usize * w + x as usize] as u8])
    })
}

/// Check that an image contains only pure black and pure white pixels.
pub fn is_monochrome(image: &GrayImage) -> bool {
    image.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255)
}

// ============================================================================
// TESTS
// ============================================================================
