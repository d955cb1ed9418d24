//! End-to-end service tests against a mock tool implementation.
//!
//! The external `ippfind`/`ipptool` dependency is replaced with an
//! in-process mock so the full facade pipeline (precondition checks,
//! discovery, verification, rendering, submission) runs without a network
//! or a printer.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use stickyprint::config::AppConfig;
use stickyprint::error::StickyError;
use stickyprint::ipp::{IppTools, PrinterEndpoint};
use stickyprint::service::{NotificationData, StickyPrintService};

/// A recorded submission.
#[derive(Debug, Clone)]
struct Submission {
    uri: String,
    content_type: String,
    job_name: String,
    file_len: u64,
}

/// Scriptable in-process stand-in for the CUPS tools.
struct MockTools {
    /// Each discovery call pops one result set; exhausted queue means empty.
    discover_results: Mutex<VecDeque<Vec<PrinterEndpoint>>>,
    verify_ok: bool,
    submit_ok: bool,
    discover_delay: Option<Duration>,
    discover_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    submit_calls: AtomicUsize,
    submissions: Mutex<Vec<Submission>>,
}

impl MockTools {
    fn new() -> Self {
        Self {
            discover_results: Mutex::new(VecDeque::new()),
            verify_ok: true,
            submit_ok: true,
            discover_delay: None,
            discover_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
        }
    }

    fn with_discovered(self, endpoints: Vec<PrinterEndpoint>) -> Self {
        self.discover_results.lock().unwrap().push_back(endpoints);
        self
    }

    fn with_verify(mut self, ok: bool) -> Self {
        self.verify_ok = ok;
        self
    }

    fn with_discover_delay(mut self, delay: Duration) -> Self {
        self.discover_delay = Some(delay);
        self
    }

    fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl IppTools for MockTools {
    async fn discover(&self) -> Vec<PrinterEndpoint> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.discover_delay {
            tokio::time::sleep(delay).await;
        }
        self.discover_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default()
    }

    async fn verify(&self, _endpoint: &PrinterEndpoint) -> bool {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.verify_ok
    }

    async fn submit(
        &self,
        endpoint: &PrinterEndpoint,
        file: &Path,
        content_type: &str,
        job_name: &str,
    ) -> Result<(), StickyError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let file_len = std::fs::metadata(file).map(|m| m.len()).unwrap_or(0);
        self.submissions.lock().unwrap().push(Submission {
            uri: endpoint.uri.clone(),
            content_type: content_type.to_string(),
            job_name: job_name.to_string(),
            file_len,
        });
        if self.submit_ok {
            Ok(())
        } else {
            Err(StickyError::Printer("print job rejected: offline".into()))
        }
    }
}

/// Config with all network-touching behavior disabled.
fn quiet_config() -> AppConfig {
    AppConfig {
        auto_discover: false,
        sweep_fallback: false,
        ..AppConfig::default()
    }
}

fn service_with(tools: Arc<MockTools>, config: AppConfig) -> StickyPrintService {
    StickyPrintService::with_tools(config, tools).expect("service construction failed")
}

#[tokio::test]
async fn print_without_endpoint_fails_before_any_tool_call() {
    let tools = Arc::new(MockTools::new());
    let service = service_with(tools.clone(), quiet_config());
    service.initialize().await;

    assert!(!service.print_text("hello", "sans-serif", "Job").await);
    assert_eq!(tools.submit_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn manual_configuration_adopts_verified_endpoint() {
    let tools = Arc::new(MockTools::new());
    let service = service_with(tools.clone(), quiet_config());

    assert!(
        service
            .configure_manual("192.168.1.50", 631, "/ipp/print")
            .await
    );
    assert_eq!(tools.verify_calls.load(Ordering::SeqCst), 1);

    let status = service.status().await;
    assert_eq!(status.printer.status, "connected");
    assert_eq!(
        status.printer.uri.as_deref(),
        Some("ipp://192.168.1.50:631/ipp/print")
    );
}

#[tokio::test]
async fn manual_configuration_discards_unreachable_candidate() {
    let tools = Arc::new(MockTools::new().with_verify(false));
    let service = service_with(tools, quiet_config());

    assert!(
        !service
            .configure_manual("192.168.1.50", 631, "/ipp/print")
            .await
    );
    assert!(service.endpoint().await.is_none());

    let status = service.status().await;
    assert_eq!(status.printer.status, "no_printer");
}

#[tokio::test]
async fn initialization_adopts_first_discovered_printer() {
    let tools = Arc::new(MockTools::new().with_discovered(vec![
        PrinterEndpoint::new("printer-a.local", 631, "/ipp/print"),
        PrinterEndpoint::new("printer-b.local", 631, "/ipp/print"),
    ]));
    let config = AppConfig {
        auto_discover: true,
        ..quiet_config()
    };
    let service = service_with(tools.clone(), config);
    service.initialize().await;

    let endpoint = service.endpoint().await.expect("endpoint adopted");
    assert_eq!(endpoint.hostname, "printer-a.local");
    assert_eq!(tools.discover_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn initialization_falls_back_to_manual_address() {
    // Discovery finds nothing; the configured manual address verifies fine.
    let tools = Arc::new(MockTools::new());
    let config = AppConfig {
        auto_discover: true,
        manual_ip: "10.0.0.42".to_string(),
        ..quiet_config()
    };
    let service = service_with(tools.clone(), config);
    service.initialize().await;

    let endpoint = service.endpoint().await.expect("manual endpoint adopted");
    assert_eq!(endpoint.uri, "ipp://10.0.0.42:631/ipp/print");
    assert_eq!(tools.verify_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_rediscovery_keeps_previous_endpoint() {
    // First discovery adopts a printer; the rediscovery finds nothing.
    let tools = Arc::new(
        MockTools::new().with_discovered(vec![PrinterEndpoint::new(
            "printer-a.local",
            631,
            "/ipp/print",
        )]),
    );
    let config = AppConfig {
        auto_discover: true,
        ..quiet_config()
    };
    let service = service_with(tools.clone(), config);
    service.initialize().await;
    assert!(service.endpoint().await.is_some());

    // Queue exhausted: the second discovery returns empty.
    assert!(service.rediscover().await);
    let endpoint = service.endpoint().await.expect("prior endpoint untouched");
    assert_eq!(endpoint.hostname, "printer-a.local");
    assert_eq!(tools.discover_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn empty_calendar_prints_against_configured_endpoint() {
    let tools = Arc::new(MockTools::new());
    let service = service_with(tools.clone(), quiet_config());
    assert!(
        service
            .configure_manual("192.168.1.50", 631, "/ipp/print")
            .await
    );

    // No Home Assistant connection: the event list is empty, which still
    // renders (the "no events" note) and submits.
    assert!(
        service
            .print_calendar_today(None, "sans-serif", "Calendar")
            .await
    );

    let submissions = tools.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].uri, "ipp://192.168.1.50:631/ipp/print");
    assert_eq!(submissions[0].content_type, "image/reverse-encoding-bmp");
    assert_eq!(submissions[0].job_name, "Calendar");
    // A real BMP was on disk at submission time (62-byte header minimum).
    assert!(submissions[0].file_len > 62);
}

#[tokio::test]
async fn notification_without_type_prints_text() {
    let tools = Arc::new(MockTools::new());
    let service = service_with(tools.clone(), quiet_config());
    service.configure_manual("10.0.0.5", 631, "/ipp/print").await;

    let data = NotificationData::default();
    assert!(service.handle_notification("ding", "Doorbell", &data).await);

    let submissions = tools.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].job_name, "Doorbell");
}

#[tokio::test]
async fn qr_notification_dispatches_to_qr_printing() {
    let tools = Arc::new(MockTools::new());
    let service = service_with(tools.clone(), quiet_config());
    service.configure_manual("10.0.0.5", 631, "/ipp/print").await;

    let data: NotificationData =
        serde_json::from_str(r#"{"type": "qr"}"#).expect("payload parses");
    assert!(
        service
            .handle_notification("https://example.com", "", &data)
            .await
    );

    let submissions = tools.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].job_name, "Notification");
}

#[tokio::test]
async fn todo_notification_without_entity_fails_without_submission() {
    let tools = Arc::new(MockTools::new());
    let service = service_with(tools.clone(), quiet_config());
    service.configure_manual("10.0.0.5", 631, "/ipp/print").await;

    let data: NotificationData =
        serde_json::from_str(r#"{"type": "todo"}"#).expect("payload parses");
    assert!(!service.handle_notification("ignored", "", &data).await);
    assert_eq!(tools.submit_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn submission_failure_surfaces_as_false() {
    let mut mock = MockTools::new();
    mock.submit_ok = false;
    let tools = Arc::new(mock);
    let service = service_with(tools.clone(), quiet_config());
    service.configure_manual("10.0.0.5", 631, "/ipp/print").await;

    assert!(!service.print_text("hello", "console", "Job").await);
    // Exactly one attempt, no retries.
    assert_eq!(tools.submit_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_reconfiguration_is_rejected() {
    // A slow rediscovery holds the single-writer guard; a configuration
    // request arriving mid-flight is rejected instead of interleaving.
    let tools = Arc::new(
        MockTools::new()
            .with_discover_delay(Duration::from_millis(300))
            .with_discovered(vec![PrinterEndpoint::new(
                "printer-a.local",
                631,
                "/ipp/print",
            )]),
    );
    let config = AppConfig {
        auto_discover: true,
        ..quiet_config()
    };
    let service = Arc::new(service_with(tools, config));

    let slow = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.rediscover().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(
        !service.configure_manual("10.0.0.9", 631, "/ipp/print").await,
        "second writer must be rejected while rediscovery runs"
    );

    assert!(slow.await.expect("rediscovery task"));
    let endpoint = service.endpoint().await.expect("discovered endpoint");
    assert_eq!(endpoint.hostname, "printer-a.local");
}

#[tokio::test]
async fn previews_render_without_submitting() {
    let tools = Arc::new(MockTools::new());
    let service = service_with(tools.clone(), quiet_config());

    let name = service
        .preview_text("preview me", "sans-serif")
        .await
        .expect("preview rendered");
    assert_eq!(name, "preview_text.png");
    assert!(service.artifact_dir().join(&name).exists());

    let name = service
        .preview_qr_code("https://example.com")
        .await
        .expect("preview rendered");
    assert_eq!(name, "preview_qr.png");

    let name = service
        .preview_calendar(None, "sans-serif")
        .await
        .expect("preview rendered");
    assert_eq!(name, "preview_calendar.png");

    let name = service
        .preview_todo(None, "console")
        .await
        .expect("preview rendered");
    assert_eq!(name, "preview_todo.png");

    assert_eq!(tools.submit_calls.load(Ordering::SeqCst), 0);
    assert_eq!(service.last_image().await.as_deref(), Some("preview_todo.png"));
}
