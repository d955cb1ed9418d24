//! # Configuration Loading
//!
//! Loads service configuration from several sources, in priority order:
//!
//! 1. An explicit `--config` file path
//! 2. Home Assistant add-on options (`/data/options.json` plus the
//!    `SUPERVISOR_TOKEN` environment variable)
//! 3. `./config.json`, then `/config/config.json`
//! 4. `STICKYPRINT_*` environment variables
//!
//! Config files may use either the flat key layout or the nested
//! (`printer`/`fonts`/`calendar`/...) layout; both normalize into the same
//! [`AppConfig`] structure with documented defaults.

use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::StickyError;

/// Default IPP port used for manual printer configuration.
pub const DEFAULT_IPP_PORT: u16 = 631;

/// Default IPP resource path used for manual printer configuration.
pub const DEFAULT_IPP_PATH: &str = "/ipp/print";

/// Fully resolved service configuration.
///
/// Every field has a documented default so the service can start with no
/// config file at all (printing then requires auto-discovery to succeed or a
/// manual endpoint to be configured over the API).
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Try to discover a printer on startup (default: true).
    pub auto_discover: bool,
    /// Manually configured printer IP, empty when unset.
    pub manual_ip: String,
    /// Port for the manual printer (default: 631).
    pub manual_port: u16,
    /// IPP resource path for the manual printer (default: "/ipp/print").
    pub manual_path: String,
    /// Target glyph height in pixels (default: 48).
    pub font_size: u32,
    /// Top/bottom/left margin in pixels (default: 20).
    pub margin: u32,
    /// Line height multiplier (default: 1.3).
    pub line_spacing: f32,
    /// Default calendar entity for calendar prints (default: "calendar.family").
    pub calendar_entity: String,
    /// Discovery tool timeout in seconds (default: 30).
    pub discovery_timeout: u64,
    /// Whether the TCP sweep fallback runs when discovery finds nothing (default: true).
    pub sweep_fallback: bool,
    /// Maximum simultaneous TCP connection attempts during a sweep (default: 100).
    pub sweep_concurrency: usize,
    /// Home Assistant base URL, empty when unset.
    pub ha_url: String,
    /// Home Assistant long-lived access token, empty when unset.
    pub ha_token: String,
    /// HTTP listen port (default: 8099).
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            auto_discover: true,
            manual_ip: String::new(),
            manual_port: DEFAULT_IPP_PORT,
            manual_path: DEFAULT_IPP_PATH.to_string(),
            font_size: 48,
            margin: 20,
            line_spacing: 1.3,
            calendar_entity: "calendar.family".to_string(),
            discovery_timeout: 30,
            sweep_fallback: true,
            sweep_concurrency: 100,
            ha_url: String::new(),
            ha_token: String::new(),
            port: 8099,
        }
    }
}

impl AppConfig {
    /// Load configuration from the highest-priority available source.
    ///
    /// An explicit path that cannot be read or parsed is an error; the
    /// implicit sources fall through silently to the next one.
    pub fn load(explicit: Option<&Path>) -> Result<Self, StickyError> {
        if let Some(path) = explicit {
            let raw = read_raw(path)?;
            return Ok(raw.normalize());
        }

        // Home Assistant add-on environment: options file + supervisor token.
        let addon_options = Path::new("/data/options.json");
        if addon_options.exists()
            && let Ok(token) = env::var("SUPERVISOR_TOKEN")
            && !token.is_empty()
        {
            let mut config = read_raw(addon_options)
                .map(RawConfig::normalize)
                .unwrap_or_default();
            config.ha_url = "http://supervisor/core".to_string();
            config.ha_token = token;
            return Ok(config);
        }

        for candidate in ["config.json", "/config/config.json"] {
            let path = Path::new(candidate);
            if path.exists() {
                match read_raw(path) {
                    Ok(raw) => return Ok(raw.normalize()),
                    Err(e) => {
                        tracing::warn!(path = candidate, error = %e, "skipping unreadable config file");
                    }
                }
            }
        }

        Ok(Self::from_env())
    }

    /// Build a config from `STICKYPRINT_*` environment variables, using
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            auto_discover: env_parse("STICKYPRINT_AUTO_DISCOVER", defaults.auto_discover),
            manual_ip: env_string("STICKYPRINT_MANUAL_IP", &defaults.manual_ip),
            manual_port: env_parse("STICKYPRINT_MANUAL_PORT", defaults.manual_port),
            manual_path: env_string("STICKYPRINT_MANUAL_PATH", &defaults.manual_path),
            font_size: env_parse("STICKYPRINT_FONT_SIZE", defaults.font_size),
            margin: env_parse("STICKYPRINT_MARGIN", defaults.margin),
            line_spacing: env_parse("STICKYPRINT_LINE_SPACING", defaults.line_spacing),
            calendar_entity: env_string("STICKYPRINT_CALENDAR_ENTITY", &defaults.calendar_entity),
            discovery_timeout: env_parse("STICKYPRINT_DISCOVERY_TIMEOUT", defaults.discovery_timeout),
            sweep_fallback: env_parse("STICKYPRINT_SWEEP_FALLBACK", defaults.sweep_fallback),
            sweep_concurrency: env_parse("STICKYPRINT_SWEEP_CONCURRENCY", defaults.sweep_concurrency),
            ha_url: env_string("STICKYPRINT_HA_URL", &defaults.ha_url),
            ha_token: env_string("STICKYPRINT_HA_TOKEN", &defaults.ha_token),
            port: env_parse("STICKYPRINT_PORT", defaults.port),
        }
    }

    /// Whether enough Home Assistant settings are present to build a client.
    pub fn has_homeassistant_api(&self) -> bool {
        !self.ha_url.is_empty() && !self.ha_token.is_empty()
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn read_raw(path: &Path) -> Result<RawConfig, StickyError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| StickyError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&contents)
        .map_err(|e| StickyError::Config(format!("failed to parse {}: {}", path.display(), e)))
}

// ============================================================================
// RAW CONFIG FILE SHAPES
// ============================================================================

/// On-disk config shape. Accepts both flat keys and nested sections; any
/// key present in both places resolves nested-first.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    // Flat layout
    auto_discover: Option<bool>,
    manual_ip: Option<String>,
    manual_port: Option<u16>,
    manual_path: Option<String>,
    font_size: Option<u32>,
    margin: Option<u32>,
    line_spacing: Option<f32>,
    calendar_entity: Option<String>,
    discovery_timeout: Option<u64>,
    sweep_fallback: Option<bool>,
    sweep_concurrency: Option<usize>,
    ha_url: Option<String>,
    ha_token: Option<String>,
    port: Option<u16>,

    // Nested layout
    printer: Option<PrinterSection>,
    fonts: Option<FontsSection>,
    calendar: Option<CalendarSection>,
    discovery: Option<DiscoverySection>,
    homeassistant: Option<HomeAssistantSection>,
    server: Option<ServerSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PrinterSection {
    auto_discover: Option<bool>,
    manual_ip: Option<String>,
    manual_port: Option<u16>,
    manual_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FontsSection {
    default_size: Option<u32>,
    margin: Option<u32>,
    line_spacing: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CalendarSection {
    default_entity: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DiscoverySection {
    timeout: Option<u64>,
    sweep_fallback: Option<bool>,
    sweep_concurrency: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HomeAssistantSection {
    url: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerSection {
    port: Option<u16>,
}

impl RawConfig {
    fn normalize(self) -> AppConfig {
        let defaults = AppConfig::default();
        let printer = self.printer.unwrap_or_default();
        let fonts = self.fonts.unwrap_or_default();
        let calendar = self.calendar.unwrap_or_default();
        let discovery = self.discovery.unwrap_or_default();
        let ha = self.homeassistant.unwrap_or_default();
        let server = self.server.unwrap_or_default();

        AppConfig {
            auto_discover: printer
                .auto_discover
                .or(self.auto_discover)
                .unwrap_or(defaults.auto_discover),
            manual_ip: printer
                .manual_ip
                .or(self.manual_ip)
                .unwrap_or(defaults.manual_ip),
            manual_port: printer
                .manual_port
                .or(self.manual_port)
                .unwrap_or(defaults.manual_port),
            manual_path: printer
                .manual_path
                .or(self.manual_path)
                .unwrap_or(defaults.manual_path),
            font_size: fonts
                .default_size
                .or(self.font_size)
                .unwrap_or(defaults.font_size),
            margin: fonts.margin.or(self.margin).unwrap_or(defaults.margin),
            line_spacing: fonts
                .line_spacing
                .or(self.line_spacing)
                .unwrap_or(defaults.line_spacing),
            calendar_entity: calendar
                .default_entity
                .or(self.calendar_entity)
                .unwrap_or(defaults.calendar_entity),
            discovery_timeout: discovery
                .timeout
                .or(self.discovery_timeout)
                .unwrap_or(defaults.discovery_timeout),
            sweep_fallback: discovery
                .sweep_fallback
                .or(self.sweep_fallback)
                .unwrap_or(defaults.sweep_fallback),
            sweep_concurrency: discovery
                .sweep_concurrency
                .or(self.sweep_concurrency)
                .unwrap_or(defaults.sweep_concurrency),
            ha_url: ha.url.or(self.ha_url).unwrap_or(defaults.ha_url),
            ha_token: ha.token.or(self.ha_token).unwrap_or(defaults.ha_token),
            port: server.port.or(self.port).unwrap_or(defaults.port),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.auto_discover);
        assert_eq!(config.manual_port, 631);
        assert_eq!(config.manual_path, "/ipp/print");
        assert_eq!(config.font_size, 48);
        assert_eq!(config.discovery_timeout, 30);
        assert_eq!(config.sweep_concurrency, 100);
        assert_eq!(config.port, 8099);
    }

    #[test]
    fn test_flat_layout() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "auto_discover": false,
                "manual_ip": "192.168.1.50",
                "font_size": 36,
                "calendar_entity": "calendar.work",
                "port": 9000
            }"#,
        )
        .unwrap();
        let config = raw.normalize();
        assert!(!config.auto_discover);
        assert_eq!(config.manual_ip, "192.168.1.50");
        assert_eq!(config.font_size, 36);
        assert_eq!(config.calendar_entity, "calendar.work");
        assert_eq!(config.port, 9000);
        // Untouched keys keep their defaults
        assert_eq!(config.margin, 20);
    }

    #[test]
    fn test_nested_layout() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "printer": {"auto_discover": true, "manual_ip": "10.0.0.9"},
                "fonts": {"default_size": 64, "margin": 10, "line_spacing": 1.5},
                "calendar": {"default_entity": "calendar.home"},
                "discovery": {"timeout": 10},
                "homeassistant": {"url": "http://ha.local:8123", "token": "abc"},
                "server": {"port": 8080}
            }"#,
        )
        .unwrap();
        let config = raw.normalize();
        assert_eq!(config.manual_ip, "10.0.0.9");
        assert_eq!(config.font_size, 64);
        assert_eq!(config.margin, 10);
        assert_eq!(config.line_spacing, 1.5);
        assert_eq!(config.calendar_entity, "calendar.home");
        assert_eq!(config.discovery_timeout, 10);
        assert_eq!(config.ha_url, "http://ha.local:8123");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_nested_wins_over_flat() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "font_size": 36,
                "fonts": {"default_size": 80}
            }"#,
        )
        .unwrap();
        assert_eq!(raw.normalize().font_size, 80);
    }

    #[test]
    fn test_has_homeassistant_api() {
        let mut config = AppConfig::default();
        assert!(!config.has_homeassistant_api());
        config.ha_url = "http://ha.local:8123".to_string();
        assert!(!config.has_homeassistant_api());
        config.ha_token = "token".to_string();
        assert!(config.has_homeassistant_api());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let raw: Result<RawConfig, _> = serde_json::from_str(r#"{"unrelated": 1}"#);
        assert!(raw.is_ok());
    }
}
