//! # Printer Discovery
//!
//! Finds a candidate IPP endpoint using two strategies in order:
//!
//! 1. **Advertisement discovery** via the external `ippfind` tool, bounded
//!    by the configured timeout.
//! 2. **Network sweep** ([`sweep`]), only when advertisement discovery
//!    yields nothing.
//!
//! Selection is deliberately naive: the first endpoint found wins. Nothing
//! ranks multiple candidates, so with several printers on the network the
//! one adopted is whichever answered first. Verification of a known
//! endpoint is a separate operation so manual configuration can reuse it.

pub mod sweep;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::{AppConfig, DEFAULT_IPP_PATH, DEFAULT_IPP_PORT};
use crate::ipp::{IppTools, PrinterEndpoint};
use sweep::SweepConfig;

/// Discovery behavior knobs.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Whether the TCP sweep runs when advertisement discovery is empty.
    pub sweep_fallback: bool,
    /// Sweep tuning.
    pub sweep: SweepConfig,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            sweep_fallback: true,
            sweep: SweepConfig::default(),
        }
    }
}

impl DiscoveryOptions {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            sweep_fallback: config.sweep_fallback,
            sweep: SweepConfig {
                concurrency: config.sweep_concurrency,
                ..SweepConfig::default()
            },
        }
    }
}

/// Orchestrates the two discovery strategies over the tool interface.
pub struct PrinterDiscovery {
    tools: Arc<dyn IppTools>,
    options: DiscoveryOptions,
}

impl PrinterDiscovery {
    pub fn new(tools: Arc<dyn IppTools>, options: DiscoveryOptions) -> Self {
        Self { tools, options }
    }

    /// Find the first available sticky-note printer.
    ///
    /// The sweep only runs when advertisement discovery returns nothing.
    pub async fn find_printer(&self) -> Option<PrinterEndpoint> {
        let printers = self.tools.discover().await;
        if let Some(printer) = printers.into_iter().next() {
            info!(printer = %printer, "selected advertised printer");
            return Some(printer);
        }

        if !self.options.sweep_fallback {
            warn!("no advertised printers found and sweep fallback is disabled");
            return None;
        }

        info!("no advertised printers found, falling back to network sweep");
        let hosts = sweep::scan(&self.options.sweep).await;
        let endpoint = hosts.into_iter().next().map(|host| {
            PrinterEndpoint::new(&host.to_string(), DEFAULT_IPP_PORT, DEFAULT_IPP_PATH)
        });

        match &endpoint {
            Some(printer) => info!(printer = %printer, "selected printer from network sweep"),
            None => warn!("no printers found on the network"),
        }
        endpoint
    }

    /// Check that an endpoint answers a minimal status query.
    pub async fn verify(&self, endpoint: &PrinterEndpoint) -> bool {
        self.tools.verify(endpoint).await
    }

    /// Build an endpoint from a manually configured address, bypassing
    /// discovery. Callers are expected to verify it before adoption.
    pub fn manual_endpoint(ip: &str, port: u16, path: &str) -> PrinterEndpoint {
        PrinterEndpoint::new(ip, port, path)
    }
}

/// Convenience: the discovery timeout from config as a `Duration`.
pub fn discovery_timeout(config: &AppConfig) -> Duration {
    Duration::from_secs(config.discovery_timeout)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::StickyError;

    struct StaticTools {
        endpoints: Vec<PrinterEndpoint>,
        discover_calls: AtomicUsize,
    }

    impl StaticTools {
        fn returning(endpoints: Vec<PrinterEndpoint>) -> Arc<Self> {
            Arc::new(Self {
                endpoints,
                discover_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl IppTools for StaticTools {
        async fn discover(&self) -> Vec<PrinterEndpoint> {
            self.discover_calls.fetch_add(1, Ordering::SeqCst);
            self.endpoints.clone()
        }

        async fn verify(&self, _endpoint: &PrinterEndpoint) -> bool {
            true
        }

        async fn submit(
            &self,
            _endpoint: &PrinterEndpoint,
            _file: &Path,
            _content_type: &str,
            _job_name: &str,
        ) -> Result<(), StickyError> {
            Ok(())
        }
    }

    fn no_sweep_options() -> DiscoveryOptions {
        DiscoveryOptions {
            sweep_fallback: false,
            ..DiscoveryOptions::default()
        }
    }

    #[tokio::test]
    async fn test_first_advertised_printer_wins() {
        let tools = StaticTools::returning(vec![
            PrinterEndpoint::new("printer-a.local", 631, "/ipp/print"),
            PrinterEndpoint::new("printer-b.local", 631, "/ipp/print"),
        ]);
        let discovery = PrinterDiscovery::new(tools.clone(), no_sweep_options());

        let found = discovery.find_printer().await.unwrap();
        assert_eq!(found.hostname, "printer-a.local");
        assert_eq!(tools.discover_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_discovery_without_sweep_yields_none() {
        let tools = StaticTools::returning(Vec::new());
        let discovery = PrinterDiscovery::new(tools, no_sweep_options());
        assert!(discovery.find_printer().await.is_none());
    }

    #[test]
    fn test_manual_endpoint_uri() {
        let endpoint = PrinterDiscovery::manual_endpoint("192.168.1.50", 631, "/ipp/print");
        assert_eq!(endpoint.uri, "ipp://192.168.1.50:631/ipp/print");
    }

    #[test]
    fn test_options_from_app_config() {
        let mut config = AppConfig::default();
        config.sweep_concurrency = 25;
        config.sweep_fallback = false;
        let options = DiscoveryOptions::from_app(&config);
        assert_eq!(options.sweep.concurrency, 25);
        assert!(!options.sweep_fallback);
    }
}
