//! # Stickyprint - Sticky Note IPP Printer Service
//!
//! Stickyprint renders content to a fixed-width monochrome bitmap and ships
//! it to a networked IPP sticky-note printer. It provides:
//!
//! - **Rendering**: text, QR codes, calendar digests, and todo lists laid out
//!   for the printer's 576-dot width, dithered to 1-bit
//! - **Discovery**: `ippfind`-based service discovery with a concurrent TCP
//!   port sweep as fallback
//! - **Submission**: 1-bpp BMP encoding and `ipptool` job submission
//! - **Glue**: an HTTP API (including a Home Assistant notification
//!   endpoint) and a CLI for direct printing
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use stickyprint::{config::AppConfig, service::StickyPrintService};
//!
//! # async fn example() -> Result<(), stickyprint::StickyError> {
//! let config = AppConfig::load(None)?;
//! let service = Arc::new(StickyPrintService::new(config)?);
//! service.initialize().await;
//!
//! service.print_text("Buy milk", "sans-serif", "Note").await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`render`] | Bitmap composition, fonts, dithering |
//! | [`ipp`] | Printer endpoints and the external IPP tool interface |
//! | [`discovery`] | Discovery strategies (advertisement + network sweep) |
//! | [`printer`] | BMP encoding and job submission |
//! | [`ha`] | Home Assistant REST client |
//! | [`service`] | The composed print service |
//! | [`server`] | HTTP API |
//! | [`config`] | Multi-source configuration loading |
//! | [`error`] | Error types |

pub mod config;
pub mod discovery;
pub mod error;
pub mod ha;
pub mod ipp;
pub mod printer;
pub mod render;
pub mod server;
pub mod service;

// Re-exports for convenience
pub use config::AppConfig;
pub use error::StickyError;
pub use ipp::PrinterEndpoint;
pub use service::StickyPrintService;
