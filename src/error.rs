//! # Error Types
//!
//! This module defines error types used throughout the stickyprint crate.

use thiserror::Error;

/// Main error type for stickyprint operations
#[derive(Debug, Error)]
pub enum StickyError {
    /// Image composition or encoding error
    #[error("Render error: {0}")]
    Render(String),

    /// Printer discovery error
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Print submission error
    #[error("Printer error: {0}")]
    Printer(String),

    /// Configuration loading error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Home Assistant API error
    #[error("Home Assistant error: {0}")]
    HomeAssistant(String),

    /// An external tool exceeded its time budget and was killed
    #[error("Tool timed out after {0:?}")]
    ToolTimeout(std::time::Duration),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
