//! # TCP Network Sweep
//!
//! Brute-force fallback for when advertisement-based discovery finds
//! nothing: derive the local IPv4 networks, then probe every host address
//! on the IPP port with a short TCP connect.
//!
//! ## Bounding the sweep
//!
//! Two limits keep the sweep from eating the machine:
//!
//! - a per-connection timeout (~1s) so a silent host costs at most its own
//!   timeout, and
//! - a global semaphore cap on simultaneous connection attempts (default
//!   100) so a /24 sweep cannot exhaust file descriptors.
//!
//! Ranges wider than /24 are clamped to the /24 containing the interface
//! address; sweeping a full /16 would take minutes even fully parallel, and
//! printers sit on the local segment in practice. Worst case with defaults:
//! 254 hosts / 100 concurrent at 1s each is about 3 seconds per range.
//!
//! A failed or refused probe yields nothing; probe errors never abort the
//! sweep, each host fails in isolation.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Well-known IPP port.
pub const IPP_PORT: u16 = 631;

/// Sweep tuning knobs.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Port to probe on every candidate host.
    pub port: u16,
    /// Per-connection timeout.
    pub connect_timeout: Duration,
    /// Maximum simultaneous connection attempts.
    pub concurrency: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            port: IPP_PORT,
            connect_timeout: Duration::from_secs(1),
            concurrency: 100,
        }
    }
}

/// Sweep the local networks for hosts accepting connections on the IPP port.
///
/// Returns responding hosts in address order. Interface enumeration failure
/// falls back to a fixed set of common private /24 ranges.
pub async fn scan(config: &SweepConfig) -> Vec<Ipv4Addr> {
    let networks = match local_networks().await {
        Ok(networks) if !networks.is_empty() => networks,
        Ok(_) => {
            warn!("no usable local interfaces found, sweeping common private ranges");
            fallback_networks()
        }
        Err(e) => {
            warn!(error = %e, "interface enumeration failed, sweeping common private ranges");
            fallback_networks()
        }
    };

    let mut hosts = BTreeSet::new();
    for (addr, prefix) in &networks {
        for host in hosts_in_network(*addr, *prefix) {
            hosts.insert(host);
        }
    }
    let hosts: Vec<Ipv4Addr> = hosts.into_iter().collect();

    info!(
        networks = networks.len(),
        hosts = hosts.len(),
        port = config.port,
        "starting network sweep"
    );
    let found = probe_hosts(&hosts, config).await;
    info!(found = found.len(), "network sweep complete");
    found
}

/// Probe a list of hosts concurrently, bounded by the configured cap.
pub async fn probe_hosts(hosts: &[Ipv4Addr], config: &SweepConfig) -> Vec<Ipv4Addr> {
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let mut tasks = Vec::with_capacity(hosts.len());

    for &host in hosts {
        let semaphore = Arc::clone(&semaphore);
        let port = config.port;
        let connect_timeout = config.connect_timeout;

        tasks.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok()?;
            match tokio::time::timeout(connect_timeout, TcpStream::connect((host, port))).await {
                Ok(Ok(_stream)) => {
                    debug!(host = %host, port, "host accepts connections");
                    Some(host)
                }
                _ => None,
            }
        }));
    }

    let mut found = Vec::new();
    for task in tasks {
        // A panicked probe task only loses its own host.
        if let Ok(Some(host)) = task.await {
            found.push(host);
        }
    }
    found
}

/// All host addresses in a network, excluding network and broadcast.
///
/// Prefixes shorter than /24 are clamped to the /24 containing `addr`;
/// /31 and /32 have no sweepable hosts.
pub fn hosts_in_network(addr: Ipv4Addr, prefix: u8) -> Vec<Ipv4Addr> {
    if prefix > 30 {
        return Vec::new();
    }
    let prefix = prefix.max(24);

    let mask = u32::MAX << (32 - prefix);
    let network = u32::from(addr) & mask;
    let size = 1u32 << (32 - prefix);

    (1..size - 1).map(|i| Ipv4Addr::from(network + i)).collect()
}

/// Enumerate local non-loopback IPv4 interface addresses with prefixes,
/// by parsing `ip -o -4 addr show` output.
async fn local_networks() -> Result<Vec<(Ipv4Addr, u8)>, std::io::Error> {
    let output = Command::new("ip")
        .args(["-o", "-4", "addr", "show"])
        .stdin(Stdio::null())
        .output()
        .await?;
    Ok(parse_ip_addr_output(&String::from_utf8_lossy(
        &output.stdout,
    )))
}

/// Parse `ip -o -4 addr show` lines like:
/// `2: wlan0    inet 192.168.1.23/24 brd 192.168.1.255 scope global ...`
fn parse_ip_addr_output(output: &str) -> Vec<(Ipv4Addr, u8)> {
    let mut networks = Vec::new();

    for line in output.lines() {
        let mut tokens = line.split_whitespace();
        let Some(cidr) = tokens
            .by_ref()
            .skip_while(|&token| token != "inet")
            .nth(1)
        else {
            continue;
        };
        let Some((addr_s, prefix_s)) = cidr.split_once('/') else {
            continue;
        };
        let (Ok(addr), Ok(prefix)) = (addr_s.parse::<Ipv4Addr>(), prefix_s.parse::<u8>()) else {
            continue;
        };
        if addr.is_loopback() || prefix > 32 {
            continue;
        }
        networks.push((addr, prefix));
    }

    networks
}

/// Common private ranges probed when interface enumeration fails.
fn fallback_networks() -> Vec<(Ipv4Addr, u8)> {
    vec![
        (Ipv4Addr::new(192, 168, 0, 1), 24),
        (Ipv4Addr::new(192, 168, 1, 1), 24),
        (Ipv4Addr::new(10, 0, 0, 1), 24),
    ]
}

// ============================================================================
// TESTS
// ============================================================================
