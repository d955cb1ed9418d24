//! # Sticky Print Service
//!
//! Composes the renderer, discovery, and printer client behind named
//! operations: print text / QR / calendar / todo, notification dispatch,
//! rediscovery, manual configuration, and status.
//!
//! The service owns the only mutable state in the process: the current
//! printer endpoint and the last generated artifact name. Discovery and
//! configuration are the sole writers of the endpoint and serialize on a
//! dedicated mutex; a second discovery/configure request arriving while one
//! is in flight is rejected rather than interleaved.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::discovery::{discovery_timeout, DiscoveryOptions, PrinterDiscovery};
use crate::error::StickyError;
use crate::ha::{CalendarEvent, HaClient, TodoItem};
use crate::ipp::{CupsTools, IppTools, PrinterEndpoint};
use crate::printer::PrintClient;
use crate::render::{font::FontKind, RenderConfig, RenderedImage, Renderer};

/// Extra fields of a Home Assistant notification payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationData {
    /// Selects QR / calendar / todo behavior; anything else is plain text.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Calendar or todo entity for the corresponding kinds.
    #[serde(default)]
    pub entity: Option<String>,
    /// Font face override.
    #[serde(default)]
    pub font: Option<String>,
}

/// Printer section of a status report.
#[derive(Debug, Serialize)]
pub struct PrinterStatus {
    /// "connected", "disconnected", or "no_printer".
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Config section of a status report.
#[derive(Debug, Serialize)]
pub struct ConfigSummary {
    pub auto_discover: bool,
    pub manual_ip: String,
    pub default_calendar: String,
}

/// Full status report returned by [`StickyPrintService::status`].
#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub service: String,
    pub printer: PrinterStatus,
    pub config: ConfigSummary,
    pub timestamp: String,
}

/// The composed print service.
pub struct StickyPrintService {
    config: AppConfig,
    renderer: Renderer,
    discovery: PrinterDiscovery,
    client: PrintClient,
    ha: Option<HaClient>,
    endpoint: RwLock<Option<PrinterEndpoint>>,
    reconfigure: Mutex<()>,
    workdir: TempDir,
    last_image: RwLock<Option<String>>,
}

impl StickyPrintService {
    /// Create a service backed by the CUPS command-line tools.
    pub fn new(config: AppConfig) -> Result<Self, StickyError> {
        let workdir = tempfile::Builder::new().prefix("stickyprint-").tempdir()?;
        let tools: Arc<dyn IppTools> =
            Arc::new(CupsTools::new(discovery_timeout(&config), workdir.path())?);
        Self::assemble(config, tools, workdir)
    }

    /// Create a service with an injected tool implementation (tests).
    pub fn with_tools(config: AppConfig, tools: Arc<dyn IppTools>) -> Result<Self, StickyError> {
        let workdir = tempfile::Builder::new().prefix("stickyprint-").tempdir()?;
        Self::assemble(config, tools, workdir)
    }

    fn assemble(
        config: AppConfig,
        tools: Arc<dyn IppTools>,
        workdir: TempDir,
    ) -> Result<Self, StickyError> {
        let ha = if config.has_homeassistant_api() {
            Some(HaClient::new(&config.ha_url, &config.ha_token)?)
        } else {
            info!("no Home Assistant API configured, calendar/todo fetching disabled");
            None
        };

        Ok(Self {
            renderer: Renderer::new(RenderConfig::from_app(&config)),
            discovery: PrinterDiscovery::new(
                Arc::clone(&tools),
                DiscoveryOptions::from_app(&config),
            ),
            client: PrintClient::new(tools, workdir.path().to_path_buf()),
            ha,
            endpoint: RwLock::new(None),
            reconfigure: Mutex::new(()),
            workdir,
            last_image: RwLock::new(None),
            config,
        })
    }

    /// Run the startup printer setup sequence. Never fails: a missing
    /// printer leaves the service in a "no printer" state visible in status.
    pub async fn initialize(&self) {
        info!("initializing sticky print service");
        let _guard = self.reconfigure.lock().await;
        self.setup_printer().await;
    }

    /// The active configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Directory holding preview/print artifacts.
    pub fn artifact_dir(&self) -> &Path {
        self.workdir.path()
    }

    /// The currently configured endpoint, if any.
    pub async fn endpoint(&self) -> Option<PrinterEndpoint> {
        self.endpoint.read().await.clone()
    }

    /// File name of the most recently generated artifact, if any.
    pub async fn last_image(&self) -> Option<String> {
        self.last_image.read().await.clone()
    }

    // -- print operations ---------------------------------------------------

    /// Render and print plain text.
    pub async fn print_text(&self, text: &str, font: &str, job_name: &str) -> bool {
        info!(job = job_name, "printing text");
        let image = self
            .renderer
            .render_text(text, FontKind::parse(font), job_name);
        self.submit(image, job_name).await
    }

    /// Render and print a QR code.
    pub async fn print_qr_code(&self, data: &str, job_name: &str) -> bool {
        info!(job = job_name, "printing QR code");
        let image = self.renderer.render_qr(data, job_name);
        self.submit(image, job_name).await
    }

    /// Render and print today's events from a calendar entity.
    pub async fn print_calendar_today(
        &self,
        calendar_entity: Option<&str>,
        font: &str,
        job_name: &str,
    ) -> bool {
        let entity = calendar_entity.unwrap_or(&self.config.calendar_entity);
        info!(entity, job = job_name, "printing calendar");
        let events = self.fetch_calendar(entity).await;
        let image = self.renderer.render_calendar(&events, FontKind::parse(font));
        self.submit(image, job_name).await
    }

    /// Render and print the items of a todo entity.
    pub async fn print_todo_list(&self, todo_entity: &str, font: &str, job_name: &str) -> bool {
        info!(entity = todo_entity, job = job_name, "printing todo list");
        let items = self.fetch_todos(todo_entity).await;
        let image = self.renderer.render_todo(&items, FontKind::parse(font));
        self.submit(image, job_name).await
    }

    /// Dispatch a Home Assistant notification to the matching print
    /// operation based on its `type` tag; plain text is the default.
    pub async fn handle_notification(
        &self,
        message: &str,
        title: &str,
        data: &NotificationData,
    ) -> bool {
        let font = data.font.as_deref().unwrap_or("sans-serif");
        let job_name = if title.is_empty() { "Notification" } else { title };

        match data.kind.as_deref() {
            Some("qr") => self.print_qr_code(message, job_name).await,
            Some("calendar") => {
                self.print_calendar_today(data.entity.as_deref(), font, job_name)
                    .await
            }
            Some("todo") => match data.entity.as_deref() {
                Some(entity) => self.print_todo_list(entity, font, job_name).await,
                None => {
                    error!("todo notifications require an entity");
                    false
                }
            },
            _ => {
                let full_text = if title.is_empty() {
                    message.to_string()
                } else {
                    format!("{}\n\n{}", title, message)
                };
                self.print_text(&full_text, font, job_name).await
            }
        }
    }

    // -- preview operations -------------------------------------------------

    /// Render text without printing; returns the artifact file name.
    pub async fn preview_text(&self, text: &str, font: &str) -> Result<String, StickyError> {
        let image = self
            .renderer
            .render_text(text, FontKind::parse(font), "Preview");
        self.save_artifact(&image, "preview_text.png").await
    }

    /// Render a QR code without printing; returns the artifact file name.
    pub async fn preview_qr_code(&self, data: &str) -> Result<String, StickyError> {
        let image = self.renderer.render_qr(data, "QR-Preview");
        self.save_artifact(&image, "preview_qr.png").await
    }

    /// Render a calendar digest without printing. Without a Home Assistant
    /// connection (or an entity) sample events are used so the preview
    /// still shows the layout.
    pub async fn preview_calendar(
        &self,
        calendar_entity: Option<&str>,
        font: &str,
    ) -> Result<String, StickyError> {
        let events = match (&self.ha, calendar_entity) {
            (Some(_), Some(entity)) => self.fetch_calendar(entity).await,
            _ => sample_events(),
        };
        let image = self.renderer.render_calendar(&events, FontKind::parse(font));
        self.save_artifact(&image, "preview_calendar.png").await
    }

    /// Render a todo list without printing; sample items stand in when no
    /// Home Assistant connection or entity is available.
    pub async fn preview_todo(
        &self,
        todo_entity: Option<&str>,
        font: &str,
    ) -> Result<String, StickyError> {
        let items = match (&self.ha, todo_entity) {
            (Some(_), Some(entity)) => self.fetch_todos(entity).await,
            _ => sample_todos(),
        };
        let image = self.renderer.render_todo(&items, FontKind::parse(font));
        self.save_artifact(&image, "preview_todo.png").await
    }

    // -- discovery / configuration ------------------------------------------

    /// Force printer rediscovery. Returns whether an endpoint is configured
    /// afterwards; failure leaves a previously adopted endpoint untouched.
    pub async fn rediscover(&self) -> bool {
        let Ok(_guard) = self.reconfigure.try_lock() else {
            warn!("rediscovery rejected: another discovery/configuration is in flight");
            return false;
        };
        info!("forcing printer rediscovery");
        self.setup_printer().await;
        self.endpoint.read().await.is_some()
    }

    /// Configure a printer from a manual address. The endpoint is only
    /// adopted after a successful verification probe.
    pub async fn configure_manual(&self, ip: &str, port: u16, path: &str) -> bool {
        let Ok(_guard) = self.reconfigure.try_lock() else {
            warn!("manual configuration rejected: another discovery/configuration is in flight");
            return false;
        };

        let endpoint = PrinterDiscovery::manual_endpoint(ip, port, path);
        info!(uri = %endpoint.uri, "configuring manual printer");

        if self.discovery.verify(&endpoint).await {
            self.adopt(endpoint).await;
            true
        } else {
            error!(uri = %endpoint.uri, "manual printer is not accessible");
            false
        }
    }

    /// Report service status, including a live reachability check of the
    /// configured endpoint.
    pub async fn status(&self) -> ServiceStatus {
        let printer = match self.endpoint().await {
            Some(endpoint) => {
                let reachable = self.discovery.verify(&endpoint).await;
                PrinterStatus {
                    status: if reachable { "connected" } else { "disconnected" }.to_string(),
                    uri: Some(endpoint.uri),
                    hostname: Some(endpoint.hostname),
                    port: Some(endpoint.port),
                }
            }
            None => PrinterStatus {
                status: "no_printer".to_string(),
                uri: None,
                hostname: None,
                port: None,
            },
        };

        ServiceStatus {
            service: "running".to_string(),
            printer,
            config: ConfigSummary {
                auto_discover: self.config.auto_discover,
                manual_ip: self.config.manual_ip.clone(),
                default_calendar: self.config.calendar_entity.clone(),
            },
            timestamp: chrono::Local::now().to_rfc3339(),
        }
    }

    // -- internals ----------------------------------------------------------

    /// Startup/rediscovery sequence: advertisement discovery (when enabled),
    /// then the manually configured address as fallback. Callers must hold
    /// the reconfigure lock.
    async fn setup_printer(&self) {
        if self.config.auto_discover {
            if let Some(endpoint) = self.discovery.find_printer().await {
                self.adopt(endpoint).await;
                return;
            }
            warn!("no printer found via auto-discovery");
        }

        let manual_ip = self.config.manual_ip.trim();
        if !manual_ip.is_empty() && self.endpoint.read().await.is_none() {
            let endpoint = PrinterDiscovery::manual_endpoint(
                manual_ip,
                self.config.manual_port,
                &self.config.manual_path,
            );
            if self.discovery.verify(&endpoint).await {
                self.adopt(endpoint).await;
            } else {
                error!(uri = %endpoint.uri, "configured manual printer is not accessible");
            }
        }

        if self.endpoint.read().await.is_none() {
            warn!("no printer configured, print jobs will fail");
        }
    }

    async fn adopt(&self, endpoint: PrinterEndpoint) {
        info!(printer = %endpoint, "printer configured");
        *self.endpoint.write().await = Some(endpoint);
    }

    /// Shared tail of every print operation: check the endpoint
    /// precondition, retain an artifact, submit once.
    async fn submit(&self, image: RenderedImage, job_name: &str) -> bool {
        let Some(endpoint) = self.endpoint().await else {
            error!(job = job_name, "no printer configured");
            return false;
        };

        if let Err(e) = self.save_artifact(&image, "last_print.png").await {
            warn!(error = %e, "failed to retain print artifact");
        }

        self.client.print_image(&endpoint, &image, job_name).await
    }

    async fn save_artifact(
        &self,
        image: &RenderedImage,
        name: &str,
    ) -> Result<String, StickyError> {
        let png = image.to_preview_png()?;
        tokio::fs::write(self.workdir.path().join(name), png).await?;
        *self.last_image.write().await = Some(name.to_string());
        Ok(name.to_string())
    }

    async fn fetch_calendar(&self, entity: &str) -> Vec<CalendarEvent> {
        match &self.ha {
            Some(ha) => ha.calendar_events_today(entity).await,
            None => {
                warn!("calendar print requested without a Home Assistant connection");
                Vec::new()
            }
        }
    }

    async fn fetch_todos(&self, entity: &str) -> Vec<TodoItem> {
        match &self.ha {
            Some(ha) => ha.todo_items(entity).await,
            None => {
                warn!("todo print requested without a Home Assistant connection");
                Vec::new()
            }
        }
    }
}

/// Stand-in events for calendar previews without a data source.
fn sample_events() -> Vec<CalendarEvent> {
    let event = |summary: &str, time: Option<&str>| CalendarEvent {
        summary: Some(summary.to_string()),
        start: time.map(|t| crate::ha::EventStart {
            date_time: Some(t.to_string()),
            date: None,
        }),
    };
    vec![
        event("Sample Event 1", Some("2026-01-01T10:00:00")),
        event("Sample Event 2", Some("2026-01-01T14:30:00")),
        event("All Day Event", None),
    ]
}

/// Stand-in items for todo previews without a data source.
fn sample_todos() -> Vec<TodoItem> {
    let item = |summary: &str, completed: bool| TodoItem {
        summary: Some(summary.to_string()),
        completed,
    };
    vec![
        item("Sample Task 1", false),
        item("Completed Task", true),
        item("Another Task", false),
    ]
}
