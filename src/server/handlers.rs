//! HTTP API handlers.
//!
//! Every print/preview handler follows the same shape: validate required
//! fields (400 on violation), run the service operation, and answer with a
//! JSON body carrying `success`, the echoed parameters, and an `image_url`
//! pointing at the generated artifact when one exists.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::service::NotificationData;

use super::state::AppState;

fn default_sans() -> String {
    "sans-serif".to_string()
}

fn default_console() -> String {
    "console".to_string()
}

/// Form data for text printing and preview.
#[derive(Debug, Deserialize)]
pub struct TextForm {
    pub text: String,
    #[serde(default = "default_sans")]
    pub font: String,
    #[serde(default)]
    pub job_name: Option<String>,
}

/// Form data for QR printing and preview.
#[derive(Debug, Deserialize)]
pub struct QrForm {
    pub data: String,
    #[serde(default)]
    pub job_name: Option<String>,
}

/// Form data for calendar printing and preview.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct CalendarForm {
    pub calendar_entity: Option<String>,
    #[serde(default = "default_sans")]
    pub font: String,
    pub job_name: Option<String>,
}

/// Form data for todo printing and preview.
#[derive(Debug, Deserialize)]
pub struct TodoForm {
    #[serde(default)]
    pub todo_entity: String,
    #[serde(default = "default_console")]
    pub font: String,
    #[serde(default)]
    pub job_name: Option<String>,
}

/// Home Assistant notification payload.
#[derive(Debug, Deserialize)]
pub struct NotifyForm {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub data: NotificationData,
}

/// Manual printer configuration payload.
#[derive(Debug, Deserialize)]
pub struct ConfigureForm {
    #[serde(default)]
    pub printer_ip: String,
    #[serde(default = "default_ipp_port")]
    pub port: u16,
    #[serde(default = "default_ipp_path")]
    pub path: String,
}

fn default_ipp_port() -> u16 {
    crate::config::DEFAULT_IPP_PORT
}

fn default_ipp_path() -> String {
    crate::config::DEFAULT_IPP_PATH.to_string()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

fn artifact_url(name: Option<String>) -> Option<String> {
    name.map(|n| format!("/api/image/{}", n))
}

// -- status -----------------------------------------------------------------

/// Handle GET /api/status.
pub async fn status(State(state): State<Arc<AppState>>) -> Response {
    Json(state.service.status().await).into_response()
}

/// Handle GET /health.
pub async fn health() -> Response {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Local::now().to_rfc3339(),
    }))
    .into_response()
}

/// Handle GET / with a minimal landing page.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// -- print ------------------------------------------------------------------

/// Handle POST /api/print/text.
pub async fn print_text(State(state): State<Arc<AppState>>, Json(form): Json<TextForm>) -> Response {
    if form.text.trim().is_empty() {
        return bad_request("Text is required");
    }
    let job_name = form.job_name.as_deref().unwrap_or("Text");
    let success = state
        .service
        .print_text(&form.text, &form.font, job_name)
        .await;
    let image_url = if success {
        artifact_url(state.service.last_image().await)
    } else {
        None
    };

    Json(json!({
        "success": success,
        "job_name": job_name,
        "font_type": form.font,
        "image_url": image_url,
    }))
    .into_response()
}

/// Handle POST /api/print/qr.
pub async fn print_qr(State(state): State<Arc<AppState>>, Json(form): Json<QrForm>) -> Response {
    if form.data.trim().is_empty() {
        return bad_request("QR data is required");
    }
    let job_name = form.job_name.as_deref().unwrap_or("QRCode");
    let success = state.service.print_qr_code(&form.data, job_name).await;
    let image_url = if success {
        artifact_url(state.service.last_image().await)
    } else {
        None
    };

    Json(json!({
        "success": success,
        "job_name": job_name,
        "image_url": image_url,
    }))
    .into_response()
}

/// Handle POST /api/print/calendar.
pub async fn print_calendar(
    State(state): State<Arc<AppState>>,
    Json(form): Json<CalendarForm>,
) -> Response {
    let job_name = form.job_name.as_deref().unwrap_or("Calendar");
    let success = state
        .service
        .print_calendar_today(form.calendar_entity.as_deref(), &form.font, job_name)
        .await;
    let entity = form
        .calendar_entity
        .clone()
        .unwrap_or_else(|| state.service.config().calendar_entity.clone());
    let image_url = if success {
        artifact_url(state.service.last_image().await)
    } else {
        None
    };

    Json(json!({
        "success": success,
        "job_name": job_name,
        "calendar_entity": entity,
        "image_url": image_url,
    }))
    .into_response()
}

/// Handle POST /api/print/todo.
pub async fn print_todo(State(state): State<Arc<AppState>>, Json(form): Json<TodoForm>) -> Response {
    if form.todo_entity.trim().is_empty() {
        return bad_request("Todo entity is required");
    }
    let job_name = form.job_name.as_deref().unwrap_or("TodoList");
    let success = state
        .service
        .print_todo_list(&form.todo_entity, &form.font, job_name)
        .await;
    let image_url = if success {
        artifact_url(state.service.last_image().await)
    } else {
        None
    };

    Json(json!({
        "success": success,
        "job_name": job_name,
        "todo_entity": form.todo_entity,
        "image_url": image_url,
    }))
    .into_response()
}

/// Handle POST /api/notify - Home Assistant notification dispatch.
pub async fn notify(State(state): State<Arc<AppState>>, Json(form): Json<NotifyForm>) -> Response {
    if form.message.trim().is_empty() {
        return bad_request("Message is required");
    }
    let success = state
        .service
        .handle_notification(&form.message, &form.title, &form.data)
        .await;
    let image_url = if success {
        artifact_url(state.service.last_image().await)
    } else {
        None
    };

    Json(json!({
        "success": success,
        "message": if success { "Notification printed" } else { "Failed to print notification" },
        "image_url": image_url,
    }))
    .into_response()
}

// -- preview ----------------------------------------------------------------

/// Handle POST /api/preview/text.
pub async fn preview_text(
    State(state): State<Arc<AppState>>,
    Json(form): Json<TextForm>,
) -> Response {
    if form.text.trim().is_empty() {
        return bad_request("Text is required");
    }
    match state.service.preview_text(&form.text, &form.font).await {
        Ok(name) => Json(json!({
            "success": true,
            "font_type": form.font,
            "image_url": artifact_url(Some(name)),
            "preview_only": true,
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// Handle POST /api/preview/qr.
pub async fn preview_qr(State(state): State<Arc<AppState>>, Json(form): Json<QrForm>) -> Response {
    if form.data.trim().is_empty() {
        return bad_request("QR data is required");
    }
    match state.service.preview_qr_code(&form.data).await {
        Ok(name) => Json(json!({
            "success": true,
            "qr_data": form.data,
            "image_url": artifact_url(Some(name)),
            "preview_only": true,
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// Handle POST /api/preview/calendar.
pub async fn preview_calendar(
    State(state): State<Arc<AppState>>,
    Json(form): Json<CalendarForm>,
) -> Response {
    match state
        .service
        .preview_calendar(form.calendar_entity.as_deref(), &form.font)
        .await
    {
        Ok(name) => Json(json!({
            "success": true,
            "font_type": form.font,
            "image_url": artifact_url(Some(name)),
            "preview_only": true,
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// Handle POST /api/preview/todo.
pub async fn preview_todo(
    State(state): State<Arc<AppState>>,
    Json(form): Json<TodoForm>,
) -> Response {
    let entity = if form.todo_entity.trim().is_empty() {
        None
    } else {
        Some(form.todo_entity.as_str())
    };
    match state.service.preview_todo(entity, &form.font).await {
        Ok(name) => Json(json!({
            "success": true,
            "font_type": form.font,
            "image_url": artifact_url(Some(name)),
            "preview_only": true,
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

// -- discovery / configuration ----------------------------------------------

/// Handle POST /api/rediscover.
pub async fn rediscover(State(state): State<Arc<AppState>>) -> Response {
    let success = state.service.rediscover().await;
    Json(json!({
        "success": success,
        "message": if success { "Printer rediscovery completed" } else { "No printer found" },
    }))
    .into_response()
}

/// Handle POST /api/configure_printer.
pub async fn configure_printer(
    State(state): State<Arc<AppState>>,
    Json(form): Json<ConfigureForm>,
) -> Response {
    let ip = form.printer_ip.trim();
    if ip.is_empty() {
        return bad_request("Printer IP is required");
    }
    let success = state
        .service
        .configure_manual(ip, form.port, &form.path)
        .await;
    let message = if success {
        format!("Printer configured at {}:{}", ip, form.port)
    } else {
        "Failed to configure printer".to_string()
    };

    Json(json!({ "success": success, "message": message })).into_response()
}

// -- artifacts --------------------------------------------------------------

/// Handle GET /api/image/:filename - serve generated artifacts.
pub async fn serve_image(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Response {
    // Only flat PNG names from the artifact directory are servable.
    if !filename.ends_with(".png") || filename.contains('/') || filename.contains("..") {
        return (StatusCode::BAD_REQUEST, "Invalid filename").into_response();
    }

    let path = state.service.artifact_dir().join(&filename);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "image/png"),
                (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            ],
            bytes,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Image not found").into_response(),
    }
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Sticky Note Printer</title>
    <meta charset="utf-8">
</head>
<body>
    <h1>Sticky Note Printer</h1>
    <p>Service is running. API endpoints:</p>
    <ul>
        <li><strong>GET /api/status</strong> - service and printer status</li>
        <li><strong>POST /api/print/text</strong> - print plain text</li>
        <li><strong>POST /api/print/qr</strong> - print a QR code</li>
        <li><strong>POST /api/print/calendar</strong> - print today's events</li>
        <li><strong>POST /api/print/todo</strong> - print a todo list</li>
        <li><strong>POST /api/preview/{text,qr,calendar,todo}</strong> - render without printing</li>
        <li><strong>POST /api/notify</strong> - Home Assistant notification endpoint</li>
        <li><strong>POST /api/rediscover</strong> - force printer rediscovery</li>
        <li><strong>POST /api/configure_printer</strong> - set a manual printer address</li>
    </ul>
    <p>Fonts: <code>sans-serif</code>, <code>console</code>, <code>handwriting</code></p>
</body>
</html>
"#;
