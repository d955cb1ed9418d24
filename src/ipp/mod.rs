//! # IPP Endpoints and the External Tool Interface
//!
//! The crate never speaks IPP on the wire itself; discovery, verification,
//! and job submission all go through the CUPS command-line tools (`ippfind`
//! and `ipptool`). The [`IppTools`] trait is the narrow seam isolating that
//! dependency: everything above it works against the trait, so a native
//! protocol client could be swapped in without touching callers, and tests
//! substitute a mock.

pub mod tools;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::StickyError;

pub use tools::CupsTools;

/// A reachable IPP device: URI plus its parsed components.
///
/// Immutable once created; rediscovery replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrinterEndpoint {
    /// Full printer URI, e.g. `ipp://192.168.1.50:631/ipp/print`.
    pub uri: String,
    /// Hostname or IP address.
    pub hostname: String,
    /// TCP port.
    pub port: u16,
    /// IPP resource path, always starting with `/`.
    pub path: String,
}

impl PrinterEndpoint {
    /// Build an endpoint from its components.
    pub fn new(hostname: &str, port: u16, path: &str) -> Self {
        Self {
            uri: format!("ipp://{}:{}{}", hostname, port, path),
            hostname: hostname.to_string(),
            port,
            path: path.to_string(),
        }
    }

    /// Parse a line of discovery-tool output of the form
    /// `ipp://host:port/path`. Anything else yields None.
    pub fn parse_uri(line: &str) -> Option<Self> {
        let rest = line.trim().strip_prefix("ipp://")?;
        let (host, rest) = rest.split_once(':')?;
        let slash = rest.find('/')?;
        let port: u16 = rest[..slash].parse().ok()?;
        let path = &rest[slash..];
        if host.is_empty() {
            return None;
        }
        Some(Self::new(host, port, path))
    }
}

impl fmt::Display for PrinterEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IPP printer at {}", self.uri)
    }
}

/// The narrow interface over the external IPP tooling.
///
/// Expected failures never cross this boundary as errors: `discover`
/// returns an empty list, `verify` returns false, and only `submit` carries
/// diagnostic text back for logging.
#[async_trait]
pub trait IppTools: Send + Sync {
    /// Locate advertised IPP printers on the local network.
    ///
    /// Failures (missing tool, non-zero exit, timeout) are logged and
    /// yield an empty list.
    async fn discover(&self) -> Vec<PrinterEndpoint>;

    /// Check that an endpoint answers a minimal status query.
    async fn verify(&self, endpoint: &PrinterEndpoint) -> bool;

    /// Submit an encoded document as a print job.
    ///
    /// `content_type` is the device's expected encoding hint. The error
    /// carries the tool's diagnostic output verbatim; it is not classified.
    async fn submit(
        &self,
        endpoint: &PrinterEndpoint,
        file: &Path,
        content_type: &str,
        job_name: &str,
    ) -> Result<(), StickyError>;
}

// ============================================================================
// TESTS
// ============================================================================
