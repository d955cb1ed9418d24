//! # HTTP Server
//!
//! Exposes the print service over a JSON API, including the notification
//! endpoint Home Assistant posts to.
//!
//! ## Usage
//!
//! ```bash
//! stickyprint serve
//! ```
//!
//! Then open http://localhost:8099 for the endpoint overview.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::StickyError;
use crate::service::StickyPrintService;
use state::AppState;

/// Start the HTTP server on the configured port. Runs until the process
/// terminates.
pub async fn serve(service: Arc<StickyPrintService>) -> Result<(), StickyError> {
    let port = service.config().port;
    let state = Arc::new(AppState::new(service));

    let app = Router::new()
        // Frontend
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        // Status
        .route("/api/status", get(handlers::status))
        // Print API
        .route("/api/print/text", post(handlers::print_text))
        .route("/api/print/qr", post(handlers::print_qr))
        .route("/api/print/calendar", post(handlers::print_calendar))
        .route("/api/print/todo", post(handlers::print_todo))
        // Preview API
        .route("/api/preview/text", post(handlers::preview_text))
        .route("/api/preview/qr", post(handlers::preview_qr))
        .route("/api/preview/calendar", post(handlers::preview_calendar))
        .route("/api/preview/todo", post(handlers::preview_todo))
        // Home Assistant notifications
        .route("/api/notify", post(handlers::notify))
        // Printer management
        .route("/api/rediscover", post(handlers::rediscover))
        .route("/api/configure_printer", post(handlers::configure_printer))
        // Generated artifacts
        .route("/api/image/:filename", get(handlers::serve_image))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| StickyError::Config(format!("failed to bind to {}: {}", addr, e)))?;

    info!(addr = %addr, "sticky print server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| StickyError::Config(format!("server error: {}", e)))?;

    Ok(())
}
