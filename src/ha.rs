//! # Home Assistant REST Client
//!
//! Fetches calendar events and todo items from a Home Assistant instance so
//! they can be rendered and printed. Authentication uses a long-lived access
//! token (or the supervisor token when running as an add-on).
//!
//! All requests are bounded by a client-level timeout; API failures degrade
//! to empty lists at the call site rather than failing the print request.

use chrono::Local;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::StickyError;

/// Request timeout for Home Assistant API calls (seconds).
const HTTP_TIMEOUT_SECS: u64 = 10;

/// A calendar event as returned by `/api/calendars/{entity}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarEvent {
    /// Event title.
    #[serde(default)]
    pub summary: Option<String>,
    /// Event start; absent for some all-day events.
    #[serde(default)]
    pub start: Option<EventStart>,
}

/// Start marker of a calendar event. Timed events carry `dateTime`,
/// all-day events carry only `date`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventStart {
    #[serde(rename = "dateTime", default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// A todo item from a todo entity's `todos` attribute.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoItem {
    /// Item title.
    #[serde(default)]
    pub summary: Option<String>,
    /// Whether the item is done.
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Default, Deserialize)]
struct EntityState {
    #[serde(default)]
    attributes: EntityAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct EntityAttributes {
    #[serde(default)]
    todos: Vec<TodoItem>,
}

/// Client for the Home Assistant REST API.
pub struct HaClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl HaClient {
    /// Create a client for the given base URL and access token.
    pub fn new(base_url: &str, token: &str) -> Result<Self, StickyError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| StickyError::HomeAssistant(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http,
        })
    }

    /// Fetch today's events from a calendar entity.
    ///
    /// Errors are logged and surface as an empty list; a failed calendar
    /// fetch prints the "no events" note rather than failing the request.
    pub async fn calendar_events_today(&self, entity_id: &str) -> Vec<CalendarEvent> {
        let today = Local::now().date_naive();
        let url = format!("{}/api/calendars/{}", self.base_url, entity_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("start", format!("{}T00:00:00", today)),
                ("end", format!("{}T23:59:59", today)),
            ])
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<Vec<CalendarEvent>>().await
            {
                Ok(events) => {
                    debug!(entity = entity_id, count = events.len(), "fetched calendar events");
                    events
                }
                Err(e) => {
                    warn!(entity = entity_id, error = %e, "failed to decode calendar events");
                    Vec::new()
                }
            },
            Ok(resp) => {
                warn!(entity = entity_id, status = %resp.status(), "calendar request rejected");
                Vec::new()
            }
            Err(e) => {
                warn!(entity = entity_id, error = %e, "calendar request failed");
                Vec::new()
            }
        }
    }

    /// Fetch the items of a todo entity.
    ///
    /// Errors are logged and surface as an empty list.
    pub async fn todo_items(&self, entity_id: &str) -> Vec<TodoItem> {
        let url = format!("{}/api/states/{}", self.base_url, entity_id);

        let response = self.http.get(&url).bearer_auth(&self.token).send().await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<EntityState>().await {
                Ok(state) => {
                    debug!(
                        entity = entity_id,
                        count = state.attributes.todos.len(),
                        "fetched todo items"
                    );
                    state.attributes.todos
                }
                Err(e) => {
                    warn!(entity = entity_id, error = %e, "failed to decode todo items");
                    Vec::new()
                }
            },
            Ok(resp) => {
                warn!(entity = entity_id, status = %resp.status(), "todo request rejected");
                Vec::new()
            }
            Err(e) => {
                warn!(entity = entity_id, error = %e, "todo request failed");
                Vec::new()
            }
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
    fn test_event_deserializes_camel_case_start() {
        let event: CalendarEvent = serde_json::from_str(
            r#"{"summary": "Dentist", "start": {"dateTime": "2026-08-06T10:00:00+02:00"}}"#,
        )
        .unwrap();
        assert_eq!(event.summary.as_deref(), Some("Dentist"));
        assert_eq!(
            event.start.unwrap().date_time.as_deref(),
            Some("2026-08-06T10:00:00+02:00")
        );
    }

    #[test]
    fn test_all_day_event_has_no_date_time() {
        let event: CalendarEvent =
            serde_json::from_str(r#"{"summary": "Holiday", "start": {"date": "2026-08-06"}}"#)
                .unwrap();
        let start = event.start.unwrap();
        assert!(start.date_time.is_none());
        assert_eq!(start.date.as_deref(), Some("2026-08-06"));
    }

    #[test]
    fn test_todo_items_from_state_attributes() {
        let state: EntityState = serde_json::from_str(
            r#"{
                "state": "2",
                "attributes": {
                    "todos": [
                        {"summary": "Milk", "completed": false},
                        {"summary": "Eggs", "completed": true}
                    ]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(state.attributes.todos.len(), 2);
        assert!(state.attributes.todos[1].completed);
    }

    #[test]
    fn test_missing_fields_default() {
        let event: CalendarEvent = serde_json::from_str("{}").unwrap();
        assert!(event.summary.is_none());
        assert!(event.start.is_none());

        let item: TodoItem = serde_json::from_str("{}").unwrap();
        assert!(!item.completed);
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = HaClient::new("http://ha.local:8123/", "token").unwrap();
        assert_eq!(client.base_url, "http://ha.local:8123");
    }
}
